// crates/canmap/src/assembler/builder.rs

//! Accumulates layered partial records and produces the final [`MessageSet`].

use crate::diag::SetContext;
use crate::error::CompileError;
use crate::model::{
    BusConfig, CommandConfig, DiagnosticConfig, MessageConfig, SignalConfig, check_attributes,
    parse_identifier, parse_record,
};
use crate::types::{
    Bus, Command, DiagnosticMessage, Message, MessageId, MessageSet, Signal, SignalId,
    SignalState,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Merged layers of one message, identified by `(bus, id)`.
#[derive(Debug, Default)]
struct PendingMessage {
    id: u32,
    config: MessageConfig,
    signals: BTreeMap<String, SignalConfig>,
}

/// Builder for one message set.
///
/// Layers are applied in precedence order (lowest first); nothing is resolved
/// until [`build`](Self::build).
#[derive(Debug)]
pub(crate) struct MessageSetBuilder {
    name: String,
    bit_numbering_inverted: bool,
    buses: BTreeMap<String, BusConfig>,
    messages: Vec<PendingMessage>,
    commands: Vec<CommandConfig>,
    diagnostic_messages: Vec<DiagnosticConfig>,
    initializers: Vec<String>,
    loopers: Vec<String>,
    extra_sources: BTreeSet<String>,
}

impl MessageSetBuilder {
    pub(crate) fn new(name: impl Into<String>, bit_numbering_inverted: bool) -> Self {
        Self {
            name: name.into(),
            bit_numbering_inverted,
            buses: BTreeMap::new(),
            messages: Vec::new(),
            commands: Vec::new(),
            diagnostic_messages: Vec::new(),
            initializers: Vec::new(),
            loopers: Vec::new(),
            extra_sources: BTreeSet::new(),
        }
    }

    /// Declares the buses of the set. Every bus must carry a `speed`.
    pub(crate) fn buses(&mut self, buses: BTreeMap<String, BusConfig>) -> Result<(), CompileError> {
        if let Some((name, _)) = buses.iter().find(|(_, bus)| bus.speed.is_none()) {
            return Err(CompileError::MissingBusSpeed { bus: name.clone() });
        }
        self.buses = buses;
        Ok(())
    }

    pub(crate) fn has_bus(&self, name: &str) -> bool {
        self.buses.contains_key(name)
    }

    pub(crate) fn initializers(&mut self, hooks: impl IntoIterator<Item = String>) {
        self.initializers.extend(hooks);
    }

    pub(crate) fn loopers(&mut self, hooks: impl IntoIterator<Item = String>) {
        self.loopers.extend(hooks);
    }

    pub(crate) fn extra_sources(&mut self, sources: impl IntoIterator<Item = String>) {
        self.extra_sources.extend(sources);
    }

    pub(crate) fn commands(&mut self, commands: impl IntoIterator<Item = CommandConfig>) {
        self.commands.extend(commands);
    }

    pub(crate) fn diagnostic_messages(
        &mut self,
        diagnostics: impl IntoIterator<Item = DiagnosticConfig>,
    ) {
        self.diagnostic_messages.extend(diagnostics);
    }

    /// Merges one raw message layer keyed by its canonical id.
    ///
    /// The layer's attributes and those of each of its signals are checked
    /// against the recognized schema before anything is merged.
    pub(crate) fn merge_message(&mut self, key: &str, raw: Value) -> Result<(), CompileError> {
        let id = parse_identifier(key)?;
        let mut object = match raw {
            Value::Object(object) => object,
            other => {
                return parse_record::<MessageConfig>(other, || format!("message {}", key)).map(|_| ());
            }
        };
        check_attributes(&object, MessageConfig::FIELDS, "message", key, key)?;

        let raw_signals = object.remove("signals");
        let layer: MessageConfig = parse_record(Value::Object(object), || format!("message {}", key))?;

        let mut signals = Vec::new();
        if let Some(raw_signals) = raw_signals {
            let raw_signals: serde_json::Map<String, Value> =
                parse_record(raw_signals, || format!("signals of message {}", key))?;
            for (name, raw_signal) in raw_signals {
                if let Value::Object(signal_object) = &raw_signal {
                    check_attributes(signal_object, SignalConfig::FIELDS, "signal", &name, key)?;
                }
                let signal: SignalConfig =
                    parse_record(raw_signal, || format!("signal {} of message {}", name, key))?;
                signals.push((name, signal));
            }
        }

        let index = self.get_or_create_message(layer.bus.as_deref(), id);
        let pending = &mut self.messages[index];
        pending.config.merge(layer);
        for (name, signal) in signals {
            pending.signals.entry(name).or_default().merge(signal);
        }
        Ok(())
    }

    /// Returns the message with the given bus and id, creating it on first use.
    ///
    /// A layer without a bus joins the single existing message with that id;
    /// a layer with a bus adopts a still bus-less message with that id.
    fn get_or_create_message(&mut self, bus: Option<&str>, id: u32) -> usize {
        let found = match bus {
            Some(bus) => self
                .messages
                .iter()
                .position(|m| m.id == id && m.config.bus.as_deref() == Some(bus))
                .or_else(|| {
                    self.messages
                        .iter()
                        .position(|m| m.id == id && m.config.bus.is_none())
                }),
            None => {
                let mut candidates = self
                    .messages
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.id == id)
                    .map(|(index, _)| index);
                match (candidates.next(), candidates.next()) {
                    (Some(index), None) => Some(index),
                    _ => None,
                }
            }
        };

        found.unwrap_or_else(|| {
            self.messages.push(PendingMessage {
                id,
                ..Default::default()
            });
            self.messages.len() - 1
        })
    }

    /// Resolves every accumulated layer into the immutable message set.
    pub(crate) fn build(self) -> Result<MessageSet, CompileError> {
        let mut set = MessageSet {
            name: self.name,
            bit_numbering_inverted: self.bit_numbering_inverted,
            initializers: self.initializers,
            loopers: self.loopers,
            extra_sources: self.extra_sources,
            ..Default::default()
        };

        set.buses = self
            .buses
            .into_iter()
            .map(|(name, config)| Bus {
                name,
                speed: config.speed.unwrap_or_default(),
                controller: config.controller,
                max_message_frequency: config.max_message_frequency.unwrap_or(0.0),
                raw_can_mode: config.raw_can_mode.unwrap_or_default(),
                raw_writable: config.raw_writable.unwrap_or(false),
                loopback: config.loopback.unwrap_or(false),
                messages: Vec::new(),
            })
            .collect();

        let mut pending = self.messages;
        pending.sort_by(|a, b| (&a.config.bus, a.id).cmp(&(&b.config.bus, b.id)));
        for message in pending {
            add_message(&mut set, message);
        }

        set.commands = self
            .commands
            .into_iter()
            .map(|c| Command {
                name: c.name,
                handler: c.handler,
                enabled: c.enabled.unwrap_or(true),
            })
            .collect();

        set.diagnostic_messages = self
            .diagnostic_messages
            .into_iter()
            .map(build_diagnostic)
            .collect::<Result<_, _>>()?;

        set_debug!(
            SetContext::new(&set.name),
            "Built {} bus(es), {} message(s), {} signal(s)",
            set.buses.len(),
            set.messages.len(),
            set.signals.len()
        );
        Ok(set)
    }
}

fn add_message(set: &mut MessageSet, pending: PendingMessage) {
    let message_id = MessageId(set.messages.len());
    let config = pending.config;
    let bus = config.bus.as_deref().and_then(|name| set.bus_by_name(name));
    let ctx = SetContext::message(&set.name, pending.id);

    let mut signals: Vec<Signal> = pending
        .signals
        .into_iter()
        .map(|(name, layer)| build_signal(&ctx, message_id, name, layer))
        .collect();
    signals.sort_by(|a, b| a.generic_name.cmp(&b.generic_name));

    let first_signal = set.signals.len();
    let signal_ids = (first_signal..first_signal + signals.len()).map(SignalId).collect();
    set.signals.extend(signals);

    set.messages.push(Message {
        id: pending.id,
        name: config.name,
        bus_name: config.bus,
        bus,
        enabled: config.enabled.unwrap_or(true),
        bit_numbering_inverted: config.bit_numbering_inverted,
        max_frequency: config.max_frequency,
        max_signal_frequency: config.max_signal_frequency,
        force_send_changed: config.force_send_changed.unwrap_or(false),
        force_send_changed_signals: config.force_send_changed_signals.unwrap_or(false),
        handlers: config.handlers.unwrap_or_default(),
        signals: signal_ids,
    });
    if let Some(bus) = bus {
        set.buses[bus.0].messages.push(message_id);
    }
}

fn build_signal(ctx: &SetContext<'_>, message: MessageId, name: String, layer: SignalConfig) -> Signal {
    let generic_name = layer.generic_name.unwrap_or_else(|| name.clone());
    let states = build_states(ctx, &generic_name, layer.states.unwrap_or_default());
    Signal {
        message,
        name,
        generic_name,
        bit_position: layer.bit_position,
        bit_size: layer.bit_size,
        factor: layer.factor.unwrap_or(1.0),
        offset: layer.offset.unwrap_or(0.0),
        min_value: layer.min_value.unwrap_or(0.0),
        max_value: layer.max_value.unwrap_or(0.0),
        enabled: layer.enabled.unwrap_or(true),
        ignore: layer.ignore.unwrap_or(false),
        max_frequency: layer.max_frequency,
        send_same: layer.send_same.unwrap_or(true),
        force_send_changed: layer.force_send_changed,
        bit_numbering_inverted: layer.bit_numbering_inverted,
        writable: layer.writable.unwrap_or(false),
        decoder: layer.decoder,
        encoder: layer.encoder,
        states,
    }
}

/// Flattens `name -> [values]` into states sorted and unique by value.
fn build_states(
    ctx: &SetContext<'_>,
    signal: &str,
    raw: BTreeMap<String, Vec<i64>>,
) -> Vec<SignalState> {
    let mut by_value: BTreeMap<i64, String> = BTreeMap::new();
    for (name, values) in raw {
        for value in values {
            if let Some(existing) = by_value.get(&value) {
                set_warn!(
                    ctx,
                    "Signal {} maps value {} to both '{}' and '{}', keeping '{}'",
                    signal,
                    value,
                    existing,
                    name,
                    existing
                );
                continue;
            }
            by_value.insert(value, name.clone());
        }
    }
    by_value
        .into_iter()
        .map(|(value, name)| SignalState { value, name })
        .collect()
}

fn build_diagnostic(config: DiagnosticConfig) -> Result<DiagnosticMessage, CompileError> {
    let id = config.id.resolve()?;
    let mode = config.mode.resolve()?;
    let frequency = config
        .frequency
        .ok_or(CompileError::MissingDiagnosticFrequency { id })?;
    Ok(DiagnosticMessage {
        name: config.name,
        bus_name: config.bus,
        id,
        mode,
        pid: config.pid.as_ref().map(|pid| pid.resolve()).transpose()?,
        // Enhanced (0x22) requests use two-byte PIDs.
        pid_length: config.pid_length.unwrap_or(if mode == 0x22 { 2 } else { 1 }),
        frequency,
        decoder: config.decoder,
        callback: config.callback,
        multiple_responses: config.multiple_responses.unwrap_or(false),
        enabled: config.enabled.unwrap_or(true),
    })
}
