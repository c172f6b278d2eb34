// crates/canmap/src/generator/python.rs

//! Flat Python records for small interpreters.
//!
//! Tables are plain lists of dicts that loosely follow the firmware structs.
//! Decoding, filtering and handler dispatch are left to the consumer.

use super::layout::{Layout, SetLayout};
use super::{Backend, MAX_CAN_BUS_COUNT, MAX_SIGNAL_STATES, quoted};
use crate::types::MessageSet;
use core::fmt::{self, Write};

pub const PYTHON_CODE_VERSION: &str = "1.0";

/// Python backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonBackend;

impl Backend for PythonBackend {
    fn version(&self) -> &'static str {
        PYTHON_CODE_VERSION
    }

    fn header(&self, out: &mut String, _layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "GENERATED_CODE_VERSION = {}", quoted(self.version()))?;
        writeln!(out)
    }

    fn message_sets(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "MESSAGE_SET_COUNT = {}", layout.sets.len())?;
        writeln!(out, "MESSAGE_SETS = []")?;
        for set in &layout.sets {
            writeln!(out, "set = {{}}")?;
            writeln!(out, "set['index'] = {}", set.index)?;
            writeln!(out, "set['name'] = {}", quoted(set.name()))?;
            writeln!(out, "set['busCount'] = {}", set.buses.len())?;
            writeln!(out, "set['messageCount'] = {}", set.messages.len())?;
            writeln!(out, "set['signalCount'] = {}", set.signals.len())?;
            writeln!(out, "set['commandCount'] = {}", set.commands.len())?;
            writeln!(out, "MESSAGE_SETS.append(set)")?;
            writeln!(out)?;
        }
        Ok(())
    }

    fn buses(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "MAX_CAN_BUS_COUNT = {}", MAX_CAN_BUS_COUNT)?;
        writeln!(out, "CAN_BUSES = []")?;
        lister(out, layout, |out, set| {
            for id in &set.buses {
                let bus = set.bus(*id);
                writeln!(out, "bus = {{}}")?;
                writeln!(out, "bus['message_set_index'] = {}", set.index)?;
                writeln!(out, "bus['bus_speed'] = {}", bus.speed)?;
                writeln!(out, "bus['address'] = {}", bus.controller.unwrap_or_default())?;
                writeln!(out, "bus['raw_writable'] = {}", py_bool(bus.raw_writable))?;
                writeln!(out, "CAN_BUSES.append(bus)")?;
                writeln!(out)?;
            }
            Ok(())
        })
    }

    fn messages(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "MAX_MESSAGE_COUNT = {}", layout.max_message_count)?;
        writeln!(out, "CAN_MESSAGES = []")?;
        lister(out, layout, |out, set| {
            for row in &set.messages {
                let message = set.message(row);
                writeln!(out, "message = {{}}")?;
                writeln!(out, "message['message_set_index'] = {}", set.index)?;
                writeln!(out, "message['bus_index'] = {}", row.bus_index)?;
                writeln!(out, "message['id'] = {}", message.id)?;
                writeln!(out, "message['name'] = {}", quoted(message.label()))?;
                writeln!(out, "CAN_MESSAGES.append(message)")?;
                writeln!(out)?;
            }
            Ok(())
        })
    }

    fn signal_states(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "MAX_SIGNAL_STATES = {}", MAX_SIGNAL_STATES)?;
        writeln!(out, "MAX_SIGNAL_COUNT = {}", layout.max_signal_count)?;
        writeln!(out, "SIGNAL_STATES = []")?;
        lister(out, layout, |out, set| {
            for row in set.state_rows() {
                writeln!(out, "states = []")?;
                for state in set.states(row) {
                    writeln!(
                        out,
                        "states.append({{'value': {}, 'name': {}}})",
                        state.value,
                        quoted(&state.name)
                    )?;
                }
                writeln!(out, "SIGNAL_STATES.append(states)")?;
                writeln!(out)?;
            }
            Ok(())
        })
    }

    fn signals(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "SIGNALS = []")?;
        lister(out, layout, |out, set| {
            for row in &set.signals {
                let signal = set.signal(row);
                writeln!(out, "signal = {{}}")?;
                writeln!(out, "signal['message_set_index'] = {}", set.index)?;
                writeln!(out, "signal['message_index'] = {}", row.message_index)?;
                writeln!(out, "signal['generic_name'] = {}", quoted(&signal.generic_name))?;
                writeln!(out, "signal['bit_position'] = {}", row.bit_position)?;
                writeln!(out, "signal['bit_size'] = {}", row.bit_size)?;
                writeln!(out, "signal['factor'] = {:.6}", signal.factor)?;
                writeln!(out, "signal['offset'] = {:.6}", signal.offset)?;
                writeln!(out, "signal['min_value'] = {:.6}", signal.min_value)?;
                writeln!(out, "signal['max_value'] = {:.6}", signal.max_value)?;
                writeln!(
                    out,
                    "signal['max_frequency'] = {:.6}",
                    set.set.signal_max_frequency(row.id)
                )?;
                writeln!(out, "signal['send_same'] = {}", py_bool(signal.send_same))?;
                writeln!(
                    out,
                    "signal['force_send_changed'] = {}",
                    py_bool(set.set.signal_force_send_changed(row.id))
                )?;
                if let Some((index, count)) = row.states {
                    writeln!(out, "signal['states_index'] = {}", index)?;
                    writeln!(out, "signal['state_count'] = {}", count)?;
                }
                writeln!(out, "signal['writable'] = {}", py_bool(signal.writable))?;
                writeln!(out, "signal['decoder'] = {}", py_str(signal.effective_decoder()))?;
                writeln!(out, "signal['encoder'] = {}", py_str(signal.effective_encoder()))?;
                writeln!(out, "signal['name'] = {}", quoted(&signal.name))?;
                writeln!(out, "SIGNALS.append(signal)")?;
                writeln!(out)?;
            }
            Ok(())
        })
    }

    fn initializers(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        hook_function(out, layout, "openxc_signals_initialize", |set| {
            set.initializers.as_slice()
        })
    }

    fn loopers(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        hook_function(out, layout, "openxc_signals_loop", |set| set.loopers.as_slice())
    }

    fn commands(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "MAX_COMMAND_COUNT = {}", layout.max_command_count)?;
        writeln!(out, "COMMANDS = []")?;
        lister(out, layout, |out, set| {
            for command in &set.commands {
                writeln!(out, "command = {{}}")?;
                writeln!(out, "command['message_set_index'] = {}", set.index)?;
                writeln!(out, "command['name'] = {}", quoted(&command.name))?;
                writeln!(out, "command['handler'] = {}", py_str(command.handler.as_deref()))?;
                writeln!(out, "COMMANDS.append(command)")?;
                writeln!(out)?;
            }
            Ok(())
        })
    }

    fn diagnostic_messages(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(
            out,
            "MAX_DIAGNOSTIC_REQUEST_COUNT = {}",
            layout.max_diagnostic_count
        )?;
        writeln!(out, "DIAGNOSTIC_REQUESTS = []")?;
        lister(out, layout, |out, set| {
            for row in &set.diagnostics {
                let request = row.request;
                writeln!(out, "request = {{}}")?;
                writeln!(out, "request['message_set_index'] = {}", set.index)?;
                writeln!(out, "request['bus_index'] = {}", row.bus_index)?;
                writeln!(out, "request['id'] = {}", request.id)?;
                writeln!(out, "request['mode'] = {}", request.mode)?;
                match request.pid {
                    Some(pid) => writeln!(out, "request['pid'] = {}", pid)?,
                    None => writeln!(out, "request['pid'] = None")?,
                }
                writeln!(out, "request['pid_length'] = {}", request.pid_length)?;
                writeln!(out, "request['frequency'] = {:.6}", request.frequency)?;
                writeln!(out, "request['decoder'] = {}", py_str(request.decoder.as_deref()))?;
                writeln!(out, "request['callback'] = {}", py_str(request.callback.as_deref()))?;
                writeln!(
                    out,
                    "request['multiple_responses'] = {}",
                    py_bool(request.multiple_responses)
                )?;
                writeln!(out, "request['name'] = {}", py_str(request.name.as_deref()))?;
                writeln!(out, "DIAGNOSTIC_REQUESTS.append(request)")?;
                writeln!(out)?;
            }
            Ok(())
        })
    }
}

fn py_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

fn py_str(value: Option<&str>) -> String {
    value.map_or_else(|| "None".to_string(), quoted)
}

fn lister<F>(out: &mut String, layout: &Layout<'_>, mut block: F) -> fmt::Result
where
    F: FnMut(&mut String, &SetLayout<'_>) -> fmt::Result,
{
    for set in &layout.sets {
        writeln!(out, "# message set: {}", set.name())?;
        block(out, set)?;
    }
    writeln!(out)
}

/// Emits a function calling the hooks of the set selected by its argument.
fn hook_function(
    out: &mut String,
    layout: &Layout<'_>,
    name: &str,
    hooks: fn(&MessageSet) -> &[String],
) -> fmt::Result {
    writeln!(out, "def {}(message_set_index):", name)?;
    if layout.sets.is_empty() {
        writeln!(out, "    pass")?;
    }
    for set in &layout.sets {
        writeln!(
            out,
            "    if message_set_index == {}:  # message set: {}",
            set.index,
            set.name()
        )?;
        let hooks = hooks(set.set);
        if hooks.is_empty() {
            writeln!(out, "        pass")?;
        }
        for hook in hooks {
            writeln!(out, "        {}()", hook)?;
        }
    }
    writeln!(out)
}
