// crates/canmap/src/diag.rs

//! Context-prefixed diagnostics.
//!
//! Compilation diagnostics go through the `log` facade with a
//! `[message_set=..., message=...]` prefix so that warnings from several sets
//! compiled together can be told apart.

/// Trait for values that describe where a diagnostic originated.
pub(crate) trait LogMetadata {
    fn meta(&self) -> String;
}

/// Location of a diagnostic within a message set.
pub(crate) struct SetContext<'a> {
    pub message_set: &'a str,
    pub message_id: Option<u32>,
}

impl<'a> SetContext<'a> {
    pub(crate) fn new(message_set: &'a str) -> Self {
        Self {
            message_set,
            message_id: None,
        }
    }

    pub(crate) fn message(message_set: &'a str, message_id: u32) -> Self {
        Self {
            message_set,
            message_id: Some(message_id),
        }
    }
}

impl LogMetadata for SetContext<'_> {
    fn meta(&self) -> String {
        match self.message_id {
            Some(id) => format!("message_set={}, message=0x{:x}", self.message_set, id),
            None => format!("message_set={}", self.message_set),
        }
    }
}

impl<T: LogMetadata + ?Sized> LogMetadata for &T {
    fn meta(&self) -> String {
        (**self).meta()
    }
}

// ===== set_info! =====
macro_rules! set_info {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::diag::LogMetadata::meta(&$ctx);
        ::log::info!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// ===== set_warn! =====
macro_rules! set_warn {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::diag::LogMetadata::meta(&$ctx);
        ::log::warn!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

// ===== set_debug! =====
macro_rules! set_debug {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::diag::LogMetadata::meta(&$ctx);
        ::log::debug!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
}

#[cfg(test)]
mod tests {
    use super::{LogMetadata, SetContext};

    #[test]
    fn message_context_includes_hex_id() {
        let ctx = SetContext::message("passenger", 0x128);
        assert_eq!(ctx.meta(), "message_set=passenger, message=0x128");
    }

    #[test]
    fn set_context_omits_message() {
        assert_eq!(SetContext::new("passenger").meta(), "message_set=passenger");
    }
}
