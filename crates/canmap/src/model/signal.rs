// crates/canmap/src/model/signal.rs

//! Partial record for one signal layer.

use serde::Deserialize;
use std::collections::BTreeMap;

/// One layer of a signal definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalConfig {
    #[serde(default)]
    pub generic_name: Option<String>,

    #[serde(default)]
    pub bit_position: Option<u32>,

    #[serde(default)]
    pub bit_size: Option<u32>,

    #[serde(default)]
    pub factor: Option<f64>,

    #[serde(default)]
    pub offset: Option<f64>,

    #[serde(default)]
    pub min_value: Option<f64>,

    #[serde(default)]
    pub max_value: Option<f64>,

    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub ignore: Option<bool>,

    /// State name to the raw values that map onto it.
    #[serde(default)]
    pub states: Option<BTreeMap<String, Vec<i64>>>,

    #[serde(default)]
    pub max_frequency: Option<f32>,

    #[serde(default)]
    pub send_same: Option<bool>,

    #[serde(default)]
    pub force_send_changed: Option<bool>,

    #[serde(default)]
    pub writable: Option<bool>,

    #[serde(default)]
    pub decoder: Option<String>,

    #[serde(default)]
    pub encoder: Option<String>,

    #[serde(default)]
    pub bit_numbering_inverted: Option<bool>,
}

impl SignalConfig {
    /// Attribute names a signal object may carry.
    pub const FIELDS: &'static [&'static str] = &[
        "generic_name",
        "bit_position",
        "bit_size",
        "factor",
        "offset",
        "min_value",
        "max_value",
        "enabled",
        "ignore",
        "states",
        "max_frequency",
        "send_same",
        "force_send_changed",
        "writable",
        "decoder",
        "encoder",
        "bit_numbering_inverted",
    ];

    /// Applies `incoming` on top of this layer.
    ///
    /// A layer carrying `states` replaces the earlier states wholesale.
    pub fn merge(&mut self, incoming: SignalConfig) {
        overlay_fields!(
            self,
            incoming,
            generic_name,
            bit_position,
            bit_size,
            factor,
            offset,
            min_value,
            max_value,
            enabled,
            ignore,
            states,
            max_frequency,
            send_same,
            force_send_changed,
            writable,
            decoder,
            encoder,
            bit_numbering_inverted,
        );
    }
}
