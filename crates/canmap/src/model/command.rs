// crates/canmap/src/model/command.rs

//! Records for `commands` and `diagnostic_messages` entries.

use super::IdValue;
use serde::Deserialize;

/// A control command declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub name: String,

    #[serde(default)]
    pub handler: Option<String>,

    #[serde(default)]
    pub enabled: Option<bool>,
}

/// A recurring diagnostic request declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticConfig {
    #[serde(default)]
    pub bus: Option<String>,

    pub id: IdValue,

    pub mode: IdValue,

    #[serde(default)]
    pub pid: Option<IdValue>,

    #[serde(default)]
    pub pid_length: Option<u8>,

    #[serde(default)]
    pub frequency: Option<f32>,

    #[serde(default)]
    pub decoder: Option<String>,

    #[serde(default)]
    pub callback: Option<String>,

    #[serde(default)]
    pub multiple_responses: Option<bool>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub enabled: Option<bool>,
}
