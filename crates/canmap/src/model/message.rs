// crates/canmap/src/model/message.rs

//! Partial record for one message layer.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One layer of a message definition.
///
/// `signals` holds the raw signal objects of this layer; the assembler parses
/// them individually so that errors can name the signal.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageConfig {
    #[serde(default)]
    pub bus: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub bit_numbering_inverted: Option<bool>,

    #[serde(default)]
    pub handlers: Option<Vec<String>>,

    #[serde(default)]
    pub max_frequency: Option<f32>,

    #[serde(default)]
    pub max_signal_frequency: Option<f32>,

    #[serde(default)]
    pub force_send_changed: Option<bool>,

    #[serde(default)]
    pub force_send_changed_signals: Option<bool>,

    #[serde(default)]
    pub signals: Map<String, Value>,
}

impl MessageConfig {
    /// Attribute names a message object may carry.
    pub const FIELDS: &'static [&'static str] = &[
        "bus",
        "name",
        "enabled",
        "bit_numbering_inverted",
        "handlers",
        "max_frequency",
        "max_signal_frequency",
        "force_send_changed",
        "force_send_changed_signals",
        "signals",
    ];

    /// Applies `incoming` on top of this layer. Signals are merged separately.
    pub fn merge(&mut self, incoming: MessageConfig) {
        overlay_fields!(
            self,
            incoming,
            bus,
            name,
            enabled,
            bit_numbering_inverted,
            handlers,
            max_frequency,
            max_signal_frequency,
            force_send_changed,
            force_send_changed_signals,
        );
    }
}
