// crates/canmap/src/model/bus.rs

//! Record for one entry of the `buses` object.

use crate::types::RawCanMode;
use serde::Deserialize;

/// A bus declaration as written in a message-set file.
///
/// `speed` is mandatory but kept optional here so that its absence is reported
/// as a dedicated error naming the bus.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    #[serde(default)]
    pub speed: Option<u32>,

    #[serde(default)]
    pub controller: Option<u8>,

    #[serde(default)]
    pub max_message_frequency: Option<f32>,

    #[serde(default)]
    pub raw_can_mode: Option<RawCanMode>,

    #[serde(default)]
    pub raw_writable: Option<bool>,

    #[serde(default)]
    pub loopback: Option<bool>,
}
