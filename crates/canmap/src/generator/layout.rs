// crates/canmap/src/generator/layout.rs

//! Ordering and index assignment shared by every backend.
//!
//! The layout fixes, once, which rows each table contains and at which
//! position. Backends only format what the layout decided, so "signal 3 of set
//! 0" means the same thing whatever syntax is emitted.

use super::{EmissionStats, MAX_SIGNAL_STATES};
use crate::diag::SetContext;
use crate::error::CompileError;
use crate::types::{
    Bus, BusId, Command, DiagnosticMessage, Message, MessageId, MessageSet, Signal, SignalId,
    SignalState,
};
use std::collections::BTreeMap;

/// A row of the message table.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: MessageId,
    /// Position of the message's bus in the set's bus table.
    pub bus_index: usize,
    /// Positions of the message's active signals in the set's signal table.
    pub signals: Vec<usize>,
}

/// A row of the signal table.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub id: SignalId,
    pub message_index: usize,
    /// Effective bit position, inverted when the signal's numbering is.
    pub bit_position: u32,
    pub bit_size: u32,
    /// Position in the set's state table and number of emitted states.
    pub states: Option<(usize, usize)>,
}

/// A row of the diagnostic request table.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticRow<'a> {
    pub bus_index: usize,
    pub request: &'a DiagnosticMessage,
}

/// Emission plan for one message set.
#[derive(Debug)]
pub struct SetLayout<'a> {
    /// Rank of the set among all sets sorted by name.
    pub index: usize,
    pub set: &'a MessageSet,
    pub buses: Vec<BusId>,
    pub messages: Vec<MessageRow>,
    pub signals: Vec<SignalRow>,
    pub commands: Vec<&'a Command>,
    pub diagnostics: Vec<DiagnosticRow<'a>>,
}

impl<'a> SetLayout<'a> {
    pub fn name(&self) -> &str {
        &self.set.name
    }

    pub fn bus(&self, id: BusId) -> &'a Bus {
        self.set.bus(id)
    }

    pub fn message(&self, row: &MessageRow) -> &'a Message {
        self.set.message(row.id)
    }

    pub fn signal(&self, row: &SignalRow) -> &'a Signal {
        self.set.signal(row.id)
    }

    /// States emitted for a signal row, capped.
    pub fn states(&self, row: &SignalRow) -> &'a [SignalState] {
        match row.states {
            Some((_, count)) => &self.set.signal(row.id).states[..count],
            None => &[],
        }
    }

    /// Signal rows that carry states, in state-table order.
    pub fn state_rows(&self) -> impl Iterator<Item = &SignalRow> {
        self.signals.iter().filter(|row| row.states.is_some())
    }

    /// Message rows on one bus of the table, in id order.
    pub fn messages_on(&self, bus: BusId) -> impl Iterator<Item = &MessageRow> {
        self.messages
            .iter()
            .filter(move |row| self.set.message(row.id).bus == Some(bus))
    }
}

/// Emission plan for a group of message sets compiled together.
#[derive(Debug)]
pub struct Layout<'a> {
    /// Sets in name order; `sets[i].index == i`.
    pub sets: Vec<SetLayout<'a>>,
    pub max_message_count: usize,
    pub max_signal_count: usize,
    pub max_command_count: usize,
    pub max_diagnostic_count: usize,
    pub stats: EmissionStats,
}

impl<'a> Layout<'a> {
    /// Orders and indexes every table row of `sets`.
    ///
    /// Fails when a signal cannot be placed (incomplete or not invertible) or
    /// when a diagnostic request does not resolve to a valid bus.
    pub fn new(sets: &'a [MessageSet]) -> Result<Self, CompileError> {
        let mut ordered: Vec<&MessageSet> = sets.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        let mut stats = EmissionStats::default();
        let sets = ordered
            .into_iter()
            .enumerate()
            .map(|(index, set)| plan_set(index, set, &mut stats))
            .collect::<Result<Vec<_>, _>>()?;

        let max = |f: fn(&SetLayout<'a>) -> usize| sets.iter().map(f).max().unwrap_or(0);
        Ok(Layout {
            max_message_count: max(|s| s.messages.len()),
            max_signal_count: max(|s| s.signals.len()),
            max_command_count: max(|s| s.commands.len()),
            max_diagnostic_count: max(|s| s.diagnostics.len()),
            sets,
            stats,
        })
    }
}

fn plan_set<'a>(
    index: usize,
    set: &'a MessageSet,
    stats: &mut EmissionStats,
) -> Result<SetLayout<'a>, CompileError> {
    let ctx = SetContext::new(&set.name);
    set_info!(ctx, "Added message set '{}' at index {}", set.name, index);

    let buses = set.valid_buses();
    let bus_index = |id: Option<BusId>| id.and_then(|id| buses.iter().position(|b| *b == id));

    // Messages
    let mut message_index: BTreeMap<MessageId, usize> = BTreeMap::new();
    let mut messages = Vec::new();
    for id in set.all_messages() {
        let message = set.message(id);
        if !set.message_enabled(id) {
            set_warn!(
                ctx,
                "Skipping disabled message {} (0x{:x})",
                message.label(),
                message.id
            );
            stats.skipped_messages += 1;
            continue;
        }
        let Some(bus_index) = bus_index(message.bus) else {
            continue;
        };
        set_info!(ctx, "Added message '{}'", message.label());
        message_index.insert(id, messages.len());
        messages.push(MessageRow {
            id,
            bus_index,
            signals: Vec::new(),
        });
    }

    // Signals and states
    let mut signals = Vec::new();
    let mut states_index = 0;
    for id in set.all_signals() {
        let signal = set.signal(id);
        let owner = set.message(signal.message);
        if !set.signal_enabled(id) {
            set_warn!(
                ctx,
                "Skipping disabled signal '{}' (in 0x{:x})",
                signal.generic_name,
                owner.id
            );
            stats.skipped_signals += 1;
            continue;
        }
        let Some(&message_row) = message_index.get(&signal.message) else {
            continue;
        };

        let position = set
            .signal_bit_position(id)
            .map_err(|source| CompileError::BitInversion {
                message_set: set.name.clone(),
                message_id: owner.id,
                signal: signal.generic_name.clone(),
                source,
            })?;
        let (Some(bit_position), Some(bit_size)) = (position, signal.bit_size) else {
            return Err(CompileError::InvalidMessageSet {
                name: set.name.clone(),
            });
        };

        let states = if signal.states.is_empty() {
            None
        } else {
            let count = signal.states.len().min(MAX_SIGNAL_STATES);
            if count < signal.states.len() {
                set_warn!(
                    ctx,
                    "Ignoring anything beyond {} states for {}",
                    MAX_SIGNAL_STATES,
                    signal.generic_name
                );
                stats.dropped_states += signal.states.len() - count;
            }
            states_index += 1;
            Some((states_index - 1, count))
        };

        set_info!(ctx, "Added signal '{}'", signal.generic_name);
        messages[message_row].signals.push(signals.len());
        signals.push(SignalRow {
            id,
            message_index: message_row,
            bit_position,
            bit_size,
            states,
        });
    }

    // Commands
    let mut commands = Vec::new();
    for command in set.all_commands() {
        if !command.enabled {
            set_warn!(ctx, "Skipping disabled command {}", command.name);
            stats.skipped_commands += 1;
            continue;
        }
        set_info!(ctx, "Added command '{}'", command.name);
        commands.push(command);
    }

    // Diagnostic requests
    let mut diagnostics = Vec::new();
    for request in set.active_diagnostic_messages() {
        let bus = request.bus_name.as_deref().and_then(|name| set.bus_by_name(name));
        let Some(bus_index) = bus_index(bus) else {
            return Err(CompileError::UnresolvedDiagnosticBus {
                bus: request.bus_name.clone(),
                id: request.id,
            });
        };
        set_debug!(ctx, "Added diagnostic request 0x{:x} mode 0x{:x}", request.id, request.mode);
        diagnostics.push(DiagnosticRow { bus_index, request });
    }

    Ok(SetLayout {
        index,
        set,
        buses,
        messages,
        signals,
        commands,
        diagnostics,
    })
}
