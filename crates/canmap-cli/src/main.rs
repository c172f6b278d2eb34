// crates/canmap-cli/src/main.rs
//! `canmap-generate`: compiles message sets into vehicle interface source.
//!
//! Examples:
//!   canmap-generate -m passenger.json -s configs -o signals.cpp
//!   canmap-generate --super-set all.json -b python
//!
//! Set `RUST_LOG=info` to see every emitted row.

use canmap::{BackendKind, CompileOptions, Generated, SearchPaths};
use clap::{ArgGroup, Parser};
use log::{error, info, warn};
use std::{fs, io::Write, path::PathBuf, process};

#[derive(Parser, Debug)]
#[command(name = "canmap-generate")]
#[command(about = "Generate vehicle interface signal tables from message sets")]
#[command(group(ArgGroup::new("input").required(true).args(["message_sets", "super_set"])))]
struct Args {
    /// Message set files to compile together
    #[arg(short, long, num_args = 1..)]
    message_sets: Vec<String>,

    /// Superset file listing the message sets
    #[arg(long)]
    super_set: Option<String>,

    /// Directories searched for referenced files
    #[arg(short, long, num_args = 1..)]
    search_paths: Vec<PathBuf>,

    /// Output syntax (cpp or python)
    #[arg(short, long, default_value_t = BackendKind::Cpp)]
    backend: BackendKind,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Load disabled mappings with their content disabled
    #[arg(long)]
    keep_disabled_mappings: bool,
}

impl Args {
    fn options(&self) -> CompileOptions {
        let mut options = CompileOptions::new()
            .skip_disabled_mappings(!self.keep_disabled_mappings)
            .backend(self.backend);
        if !self.search_paths.is_empty() {
            options.search_paths = SearchPaths::new(self.search_paths.iter().cloned());
        }
        options
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.options();
    let generated: Generated = match &args.super_set {
        Some(file) => canmap::compile_superset(file, &options)?,
        None => canmap::compile(args.message_sets.as_slice(), &options)?,
    };

    let stats = generated.stats;
    if stats.skipped_messages + stats.skipped_signals + stats.skipped_commands > 0 {
        warn!(
            "Skipped {} message(s), {} signal(s), {} command(s)",
            stats.skipped_messages, stats.skipped_signals, stats.skipped_commands
        );
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &generated.source)?;
            info!("Wrote {}", path.display());
        }
        None => std::io::stdout().write_all(generated.source.as_bytes())?,
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(line: &str) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("canmap-generate").chain(line.split_whitespace()))
    }

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_message_sets_and_options() {
        let args = parse("-m a.json b.json -s configs shared -b python -o out.py").unwrap();
        assert_eq!(args.message_sets, vec!["a.json", "b.json"]);
        assert_eq!(args.super_set, None);
        assert_eq!(
            args.search_paths,
            vec![PathBuf::from("configs"), PathBuf::from("shared")]
        );
        assert_eq!(args.backend, BackendKind::Python);
        assert_eq!(args.output, Some(PathBuf::from("out.py")));
        assert!(args.options().skip_disabled_mappings);
    }

    #[test]
    fn parses_superset() {
        let args = parse("--super-set all.json --keep-disabled-mappings").unwrap();
        assert_eq!(args.super_set.as_deref(), Some("all.json"));
        assert!(args.message_sets.is_empty());
        assert_eq!(args.backend, BackendKind::Cpp);
        assert!(!args.options().skip_disabled_mappings);
        assert_eq!(args.options().search_paths, SearchPaths::default());
    }

    #[test]
    fn rejects_missing_or_conflicting_inputs() {
        assert!(parse("-b cpp").is_err());
        assert!(parse("-m a.json --super-set all.json").is_err());
        assert!(parse("-m").is_err());
        assert!(parse("-b java -m a.json").is_err());
        assert!(parse("--frobnicate").is_err());
    }
}
