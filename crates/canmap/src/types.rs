// crates/canmap/src/types.rs

//! Public, resolved data structures for an assembled message set.
//!
//! Entities live in flat arenas owned by [`MessageSet`] and refer to each other
//! through integer handles ([`BusId`], [`MessageId`], [`SignalId`]) rather than
//! back-references. Inherited properties (enabled state, frequencies, bit
//! numbering) are resolved through the owning set.

use crate::bits::{self, BitInversionError};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Controller addresses a bus may be attached to. The firmware drives exactly
/// two CAN controllers.
pub const VALID_BUS_ADDRESSES: [u8; 2] = [1, 2];

/// Decoder used for signals flagged `ignore`.
pub const IGNORE_DECODER: &str = "openxc::signals::handlers::ignoreDecoder";
/// Decoder used for enumerated signals.
pub const STATE_DECODER: &str = "openxc::signals::handlers::stateDecoder";
/// Encoder used for writable enumerated signals.
pub const STATE_ENCODER: &str = "openxc::signals::handlers::stateEncoder";

// --- Handles ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignalId(pub usize);

// --- Bus ---

/// Whether raw traffic on a bus is passed through alongside decoded signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawCanMode {
    #[default]
    Off,
    /// Only messages that are part of the set pass through.
    Filtered,
    /// Everything on the bus passes through.
    Unfiltered,
}

/// One physical CAN channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub name: String,
    pub speed: u32,
    pub controller: Option<u8>,
    pub max_message_frequency: f32,
    pub raw_can_mode: RawCanMode,
    pub raw_writable: bool,
    pub loopback: bool,
    /// Messages declared on this bus, sorted by id.
    pub messages: Vec<MessageId>,
}

impl Bus {
    /// A bus is usable only when attached to one of the two controllers.
    pub fn is_valid(&self) -> bool {
        self.controller
            .is_some_and(|c| VALID_BUS_ADDRESSES.contains(&c))
    }
}

// --- Message ---

/// One CAN frame identifier and its signals.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u32,
    pub name: Option<String>,
    /// The bus name as written in the configuration.
    pub bus_name: Option<String>,
    /// The resolved bus, if `bus_name` names a bus of the set.
    pub bus: Option<BusId>,
    /// The message's own flag; see [`MessageSet::message_enabled`].
    pub enabled: bool,
    pub bit_numbering_inverted: Option<bool>,
    pub max_frequency: Option<f32>,
    pub max_signal_frequency: Option<f32>,
    pub force_send_changed: bool,
    pub force_send_changed_signals: bool,
    pub handlers: Vec<String>,
    /// Signals of this message, sorted by generic name.
    pub signals: Vec<SignalId>,
}

impl Message {
    /// Display name used in comments and diagnostics.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

// --- Signal ---

/// One `(value, name)` pair of an enumerated signal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignalState {
    pub value: i64,
    pub name: String,
}

/// One physical quantity packed into a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub message: MessageId,
    /// The signal's key in the configuration (usually the database name).
    pub name: String,
    pub generic_name: String,
    /// Raw bit position, before any numbering inversion.
    pub bit_position: Option<u32>,
    pub bit_size: Option<u32>,
    pub factor: f64,
    pub offset: f64,
    pub min_value: f64,
    pub max_value: f64,
    /// The signal's own flag; see [`MessageSet::signal_enabled`].
    pub enabled: bool,
    pub ignore: bool,
    pub max_frequency: Option<f32>,
    pub send_same: bool,
    pub force_send_changed: Option<bool>,
    pub bit_numbering_inverted: Option<bool>,
    pub writable: bool,
    pub decoder: Option<String>,
    pub encoder: Option<String>,
    /// Sorted by value, unique by value.
    pub states: Vec<SignalState>,
}

impl Signal {
    /// Explicit decoder, else the one implied by `ignore` or `states`.
    pub fn effective_decoder(&self) -> Option<&str> {
        if let Some(decoder) = self.decoder.as_deref() {
            return Some(decoder);
        }
        if self.ignore {
            Some(IGNORE_DECODER)
        } else if !self.states.is_empty() {
            Some(STATE_DECODER)
        } else {
            None
        }
    }

    /// Explicit encoder, else the state encoder for writable enumerations.
    pub fn effective_encoder(&self) -> Option<&str> {
        match self.encoder.as_deref() {
            Some(encoder) => Some(encoder),
            None if self.writable && !self.states.is_empty() => Some(STATE_ENCODER),
            None => None,
        }
    }
}

// --- Commands & Diagnostics ---

/// A named control-plane operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub handler: Option<String>,
    pub enabled: bool,
}

/// A recurring diagnostic request.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticMessage {
    pub name: Option<String>,
    pub bus_name: Option<String>,
    pub id: u32,
    pub mode: u32,
    pub pid: Option<u32>,
    pub pid_length: u8,
    pub frequency: f32,
    pub decoder: Option<String>,
    pub callback: Option<String>,
    pub multiple_responses: bool,
    pub enabled: bool,
}

// --- Message Set ---

/// A complete, assembled configuration for one vehicle variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageSet {
    pub name: String,
    pub bit_numbering_inverted: bool,
    /// Every declared bus, sorted by name.
    pub buses: Vec<Bus>,
    /// Every message, grouped by bus and sorted by id within a bus.
    pub messages: Vec<Message>,
    pub signals: Vec<Signal>,
    pub commands: Vec<Command>,
    pub diagnostic_messages: Vec<DiagnosticMessage>,
    pub initializers: Vec<String>,
    pub loopers: Vec<String>,
    pub extra_sources: BTreeSet<String>,
}

impl MessageSet {
    pub fn bus(&self, id: BusId) -> &Bus {
        &self.buses[id.0]
    }

    pub fn message(&self, id: MessageId) -> &Message {
        &self.messages[id.0]
    }

    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id.0]
    }

    pub fn bus_by_name(&self, name: &str) -> Option<BusId> {
        self.buses.iter().position(|b| b.name == name).map(BusId)
    }

    pub fn find_message(&self, bus_name: &str, id: u32) -> Option<MessageId> {
        self.messages
            .iter()
            .position(|m| m.id == id && m.bus_name.as_deref() == Some(bus_name))
            .map(MessageId)
    }

    /// Finds a signal by generic name within a message.
    pub fn find_signal(&self, message: MessageId, generic_name: &str) -> Option<SignalId> {
        self.message(message)
            .signals
            .iter()
            .copied()
            .find(|s| self.signal(*s).generic_name == generic_name)
    }

    /// Valid buses sorted by controller address.
    pub fn valid_buses(&self) -> Vec<BusId> {
        let mut buses: Vec<BusId> = (0..self.buses.len())
            .map(BusId)
            .filter(|id| self.bus(*id).is_valid())
            .collect();
        buses.sort_by_key(|id| self.bus(*id).controller);
        buses
    }

    /// Messages on valid buses, in bus then id order, enabled or not.
    pub fn all_messages(&self) -> Vec<MessageId> {
        self.valid_buses()
            .into_iter()
            .flat_map(|bus| self.bus(bus).messages.iter().copied())
            .collect()
    }

    pub fn active_messages(&self) -> Vec<MessageId> {
        self.all_messages()
            .into_iter()
            .filter(|m| self.message_enabled(*m))
            .collect()
    }

    /// Signals of [`all_messages`](Self::all_messages), in message then
    /// generic-name order.
    pub fn all_signals(&self) -> Vec<SignalId> {
        self.all_messages()
            .into_iter()
            .flat_map(|m| self.message(m).signals.iter().copied())
            .collect()
    }

    pub fn active_signals(&self) -> Vec<SignalId> {
        self.all_signals()
            .into_iter()
            .filter(|s| self.signal_enabled(*s))
            .collect()
    }

    /// Commands sorted by name, enabled or not.
    pub fn all_commands(&self) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self.commands.iter().collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    pub fn active_commands(&self) -> Vec<&Command> {
        self.all_commands().into_iter().filter(|c| c.enabled).collect()
    }

    /// Enabled diagnostic messages sorted by bus name, id, mode then pid.
    pub fn active_diagnostic_messages(&self) -> Vec<&DiagnosticMessage> {
        let mut diagnostics: Vec<&DiagnosticMessage> =
            self.diagnostic_messages.iter().filter(|d| d.enabled).collect();
        diagnostics.sort_by(|a, b| {
            (&a.bus_name, a.id, a.mode, a.pid).cmp(&(&b.bus_name, b.id, b.mode, b.pid))
        });
        diagnostics
    }

    // --- Inherited properties ---

    /// Enabled when the message flag is set and its bus resolves to a valid bus.
    pub fn message_enabled(&self, id: MessageId) -> bool {
        let message = self.message(id);
        message.enabled && message.bus.is_some_and(|bus| self.bus(bus).is_valid())
    }

    pub fn message_max_frequency(&self, id: MessageId) -> f32 {
        let message = self.message(id);
        message.max_frequency.unwrap_or_else(|| {
            message
                .bus
                .map_or(0.0, |bus| self.bus(bus).max_message_frequency)
        })
    }

    pub fn message_bit_numbering_inverted(&self, id: MessageId) -> bool {
        self.message(id)
            .bit_numbering_inverted
            .unwrap_or(self.bit_numbering_inverted)
    }

    /// Conjunction of the signal flag and its message's enabled state.
    pub fn signal_enabled(&self, id: SignalId) -> bool {
        let signal = self.signal(id);
        signal.enabled && self.message_enabled(signal.message)
    }

    pub fn signal_max_frequency(&self, id: SignalId) -> f32 {
        let signal = self.signal(id);
        signal
            .max_frequency
            .or(self.message(signal.message).max_signal_frequency)
            .unwrap_or(0.0)
    }

    pub fn signal_force_send_changed(&self, id: SignalId) -> bool {
        let signal = self.signal(id);
        signal
            .force_send_changed
            .unwrap_or(self.message(signal.message).force_send_changed_signals)
    }

    pub fn signal_bit_numbering_inverted(&self, id: SignalId) -> bool {
        let signal = self.signal(id);
        signal
            .bit_numbering_inverted
            .unwrap_or_else(|| self.message_bit_numbering_inverted(signal.message))
    }

    /// The bit position to emit, inverted when the signal's effective
    /// numbering is inverted.
    pub fn signal_bit_position(&self, id: SignalId) -> Result<Option<u32>, BitInversionError> {
        let signal = self.signal(id);
        match (signal.bit_position, signal.bit_size) {
            (Some(position), Some(size)) if self.signal_bit_numbering_inverted(id) => {
                bits::invert_bit_index(position, size).map(Some)
            }
            (position, _) => Ok(position),
        }
    }

    // --- Validation ---

    /// Checks the set before code generation.
    ///
    /// Messages without a usable bus are reported and stay disabled; they do
    /// not fail validation. A missing name or an incomplete signal does.
    pub fn validate(&self) -> bool {
        self.validate_name() && self.validate_messages()
    }

    pub fn validate_name(&self) -> bool {
        if self.name.is_empty() {
            log::warn!("Message set is missing a name");
            return false;
        }
        true
    }

    /// Reports every message without a usable bus, then checks the signals
    /// of the messages that will actually be emitted.
    pub fn validate_messages(&self) -> bool {
        for index in 0..self.messages.len() {
            self.validate_message_bus(MessageId(index));
        }
        let mut valid = true;
        for signal in self.all_signals() {
            valid &= self.validate_signal(signal);
        }
        valid
    }

    fn validate_message_bus(&self, id: MessageId) -> bool {
        let message = self.message(id);
        let ctx = crate::diag::SetContext::message(&self.name, message.id);
        match (&message.bus_name, message.bus) {
            (None, _) => {
                set_warn!(ctx, "No default or explicit bus for message, it will be disabled");
                false
            }
            (Some(name), None) => {
                set_warn!(ctx, "Bus '{}' is not defined, message will be disabled", name);
                false
            }
            (Some(name), Some(bus)) if !self.bus(bus).is_valid() => {
                set_warn!(
                    ctx,
                    "Bus '{}' has controller {:?}, only {:?} are allowed - message will be disabled",
                    name,
                    self.bus(bus).controller,
                    VALID_BUS_ADDRESSES
                );
                false
            }
            _ => true,
        }
    }

    fn validate_signal(&self, id: SignalId) -> bool {
        let signal = self.signal(id);
        let ctx = crate::diag::SetContext::message(&self.name, self.message(signal.message).id);
        if !signal.send_same && self.signal_max_frequency(id) != 0.0 {
            set_warn!(
                ctx,
                "Signal {} combines send_same=false and max_frequency - this is not recommended",
                signal.generic_name
            );
        }
        if signal.bit_position.is_none() || signal.bit_size.is_none() {
            set_warn!(
                ctx,
                "{} (generic name: {}) is incomplete, bit_position and bit_size are required",
                signal.name,
                signal.generic_name
            );
            return false;
        }
        true
    }
}
