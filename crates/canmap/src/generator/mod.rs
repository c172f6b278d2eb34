// crates/canmap/src/generator/mod.rs

//! Emission of indexed source tables for assembled message sets.
//!
//! [`Layout`] decides row order and indices; a [`Backend`] turns each table of
//! the layout into source text. Sections are always emitted in the same order:
//! header, inlined extra sources, message sets, buses, messages, signal states,
//! signals, initializers, loopers, commands, diagnostic requests, decoder and
//! footer.

use crate::config::{BackendKind, CompileOptions};
use crate::error::CompileError;
use crate::loader::SearchPaths;
use crate::types::MessageSet;
use core::fmt;

// --- Sub-modules ---

mod cpp;
pub mod layout;
mod python;

pub use cpp::CppBackend;
pub use layout::{Layout, SetLayout};
pub use python::PythonBackend;

/// Upper bound on the states emitted for one signal.
pub const MAX_SIGNAL_STATES: usize = 12;

/// The firmware drives two CAN controllers.
pub const MAX_CAN_BUS_COUNT: usize = 2;

/// Counts of rows left out of the generated tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmissionStats {
    pub skipped_messages: usize,
    pub skipped_signals: usize,
    pub skipped_commands: usize,
    /// States beyond [`MAX_SIGNAL_STATES`], summed over all signals.
    pub dropped_states: usize,
}

/// The generated source together with what was left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub source: String,
    pub stats: EmissionStats,
}

/// Surface syntax for the generated tables.
///
/// Every method appends one section to `out`. Sections a target has no use for
/// keep the default (empty) implementation.
pub trait Backend {
    /// Version of the generated-code format.
    fn version(&self) -> &'static str;

    fn header(&self, _out: &mut String, _layout: &Layout<'_>) -> fmt::Result {
        Ok(())
    }

    /// Contents of every extra source file, in set order.
    fn extra_sources(&self, _out: &mut String, _sources: &[String]) -> fmt::Result {
        Ok(())
    }

    fn message_sets(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result;

    fn buses(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result;

    fn messages(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result;

    fn signal_states(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result;

    fn signals(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result;

    fn initializers(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result;

    fn loopers(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result;

    fn commands(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result;

    fn diagnostic_messages(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result;

    /// Decode dispatch; targets that leave decoding to their runtime skip it.
    fn decoder(&self, _out: &mut String, _layout: &Layout<'_>) -> fmt::Result {
        Ok(())
    }

    fn footer(&self, _out: &mut String, _layout: &Layout<'_>) -> fmt::Result {
        Ok(())
    }
}

/// Returns the backend implementation for `kind`.
pub fn backend(kind: BackendKind) -> Box<dyn Backend> {
    match kind {
        BackendKind::Cpp => Box::new(CppBackend),
        BackendKind::Python => Box::new(PythonBackend),
    }
}

/// Generates source for `sets` with the backend selected in `options`.
///
/// The sets are expected to have passed [`MessageSet::validate`].
pub fn generate(sets: &[MessageSet], options: &CompileOptions) -> Result<Generated, CompileError> {
    let layout = Layout::new(sets)?;
    let sources = read_extra_sources(&layout, &options.search_paths)?;
    let backend = backend(options.backend);

    let mut out = String::new();
    emit(backend.as_ref(), &layout, &sources, &mut out)?;

    log::info!(
        "Generated {} bytes of {} source for {} message set(s)",
        out.len(),
        options.backend,
        layout.sets.len()
    );
    Ok(Generated {
        source: out,
        stats: layout.stats,
    })
}

fn emit(
    backend: &dyn Backend,
    layout: &Layout<'_>,
    sources: &[String],
    out: &mut String,
) -> fmt::Result {
    backend.header(out, layout)?;
    backend.extra_sources(out, sources)?;
    backend.message_sets(out, layout)?;
    backend.buses(out, layout)?;
    backend.messages(out, layout)?;
    backend.signal_states(out, layout)?;
    backend.signals(out, layout)?;
    backend.initializers(out, layout)?;
    backend.loopers(out, layout)?;
    backend.commands(out, layout)?;
    backend.diagnostic_messages(out, layout)?;
    backend.decoder(out, layout)?;
    backend.footer(out, layout)
}

/// Reads every extra source of every set. A missing file is fatal.
fn read_extra_sources(
    layout: &Layout<'_>,
    search_paths: &SearchPaths,
) -> Result<Vec<String>, CompileError> {
    layout
        .sets
        .iter()
        .flat_map(|set| set.set.extra_sources.iter())
        .map(|name| search_paths.read_to_string(name))
        .collect()
}

// --- Helper Functions ---

/// Formats `s` as a double-quoted literal valid in both C++ and Python.
pub(crate) fn quoted(s: &str) -> String {
    let mut literal = String::with_capacity(s.len() + 2);
    literal.push('"');
    for c in s.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            // Octal escapes stop after three digits in both target languages.
            c if c.is_control() && u32::from(c) < 0x80 => {
                literal.push_str(&format!("\\{:03o}", u32::from(c)))
            }
            _ => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(quoted("speed"), "\"speed\"");
        assert_eq!(quoted("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }

    #[test]
    fn quoting_escapes_control_characters() {
        assert_eq!(quoted("a\tb\r\n"), "\"a\\tb\\r\\n\"");
        assert_eq!(quoted("x\u{1}1\u{7f}"), "\"x\\0011\\177\"");
    }

    #[test]
    fn no_sets_still_produce_tables() {
        let generated = generate(&[], &CompileOptions::default()).unwrap();
        assert!(generated.source.contains("MESSAGE_SET_COUNT = 0"));
        assert_eq!(generated.stats, EmissionStats::default());
    }
}
