// crates/canmap/src/generator/cpp.rs

//! C++ tables and decode dispatch for the vehicle interface firmware.
//!
//! Every table is a two-dimensional array indexed `[set][row]`; the active set
//! is chosen at runtime through `getConfiguration()->messageSetIndex`.

use super::layout::{Layout, SetLayout};
use super::{Backend, MAX_CAN_BUS_COUNT, MAX_SIGNAL_STATES, quoted};
use crate::types::RawCanMode;
use core::fmt::{self, Write};

/// Version of the table layout expected by the firmware.
pub const CPP_CODE_VERSION: &str = "5.x";

const HEADER: &str = r#"#include <stdint.h>
#include <stdlib.h>
#include "can/canread.h"
#include "can/canwrite.h"
#include "signals.h"
#include "diagnostics.h"
#include "config.h"
#include "util/log.h"
#include "shared_handlers.h"

namespace can = openxc::can;

using openxc::pipeline::Pipeline;
using openxc::config::getConfiguration;
using openxc::signals::handlers::ignoreDecoder;
using openxc::signals::handlers::stateDecoder;
using openxc::signals::handlers::stateEncoder;
"#;

const FOOTER: &str = r#"CanMessageSet* openxc::signals::getActiveMessageSet() {
    return &MESSAGE_SETS[getConfiguration()->messageSetIndex];
}

CanMessageSet* openxc::signals::getMessageSets() {
    return MESSAGE_SETS;
}

int openxc::signals::getMessageSetCount() {
    return MESSAGE_SET_COUNT;
}

CanBus* openxc::signals::getCanBuses() {
    return CAN_BUSES[getActiveMessageSet()->index];
}

int openxc::signals::getCanBusCount() {
    return getActiveMessageSet()->busCount;
}

CanMessageDefinition* openxc::signals::getMessages() {
    return CAN_MESSAGES[getActiveMessageSet()->index];
}

int openxc::signals::getMessageCount() {
    return getActiveMessageSet()->messageCount;
}

CanSignal* openxc::signals::getSignals() {
    return SIGNALS[getActiveMessageSet()->index];
}

int openxc::signals::getSignalCount() {
    return getActiveMessageSet()->signalCount;
}

CanCommand* openxc::signals::getCommands() {
    return COMMANDS[getActiveMessageSet()->index];
}

int openxc::signals::getCommandCount() {
    return getActiveMessageSet()->commandCount;
}

const DiagnosticRequestConfig* openxc::signals::getDiagnosticRequests() {
    return DIAGNOSTIC_REQUESTS[getActiveMessageSet()->index];
}
"#;

/// Firmware C++ backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct CppBackend;

impl Backend for CppBackend {
    fn version(&self) -> &'static str {
        CPP_CODE_VERSION
    }

    fn header(&self, out: &mut String, _layout: &Layout<'_>) -> fmt::Result {
        out.push_str(HEADER);
        writeln!(
            out,
            "const char* openxc::signals::GENERATED_CODE_VERSION = {};",
            quoted(self.version())
        )?;
        writeln!(out)
    }

    fn extra_sources(&self, out: &mut String, sources: &[String]) -> fmt::Result {
        for source in sources {
            writeln!(out, "{}", source)?;
        }
        Ok(())
    }

    fn message_sets(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "const int MESSAGE_SET_COUNT = {};", layout.sets.len())?;
        writeln!(out, "CanMessageSet MESSAGE_SETS[MESSAGE_SET_COUNT] = {{")?;
        for set in &layout.sets {
            writeln!(
                out,
                "    {{ {}, {}, {}, {}, {}, {} }},",
                set.index,
                quoted(set.name()),
                set.buses.len(),
                set.messages.len(),
                set.signals.len(),
                set.commands.len()
            )?;
        }
        writeln!(out, "}};")?;
        writeln!(out)
    }

    fn buses(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "const int MAX_CAN_BUS_COUNT = {};", MAX_CAN_BUS_COUNT)?;
        writeln!(out, "CanBus CAN_BUSES[][MAX_CAN_BUS_COUNT] = {{")?;
        lister(out, layout, |out, set| {
            for id in &set.buses {
                let bus = set.bus(*id);
                let controller = bus.controller.unwrap_or_default();
                writeln!(
                    out,
                    "        {{ {}, {}, can{}, {:.6}, {}, {}, {},",
                    bus.speed,
                    controller,
                    controller,
                    bus.max_message_frequency,
                    raw_can_mode(bus.raw_can_mode),
                    bus.raw_writable,
                    bus.loopback
                )?;
                writeln!(out, "            #ifdef __PIC32__")?;
                writeln!(out, "            handleCan{}Interrupt,", controller)?;
                writeln!(out, "            #endif // __PIC32__")?;
                writeln!(out, "        }},")?;
            }
            Ok(())
        })?;
        writeln!(out, "}};")?;
        writeln!(out)
    }

    fn messages(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "const int MAX_MESSAGE_COUNT = {};", layout.max_message_count)?;
        writeln!(out, "CanMessageDefinition CAN_MESSAGES[][MAX_MESSAGE_COUNT] = {{")?;
        lister(out, layout, |out, set| {
            for row in &set.messages {
                let message = set.message(row);
                writeln!(
                    out,
                    "        {{&CAN_BUSES[{}][{}], 0x{:x}, {{{:.6}}}, {}}}, // {}",
                    set.index,
                    row.bus_index,
                    message.id,
                    set.set.message_max_frequency(row.id),
                    message.force_send_changed,
                    message.label()
                )?;
            }
            Ok(())
        })?;
        writeln!(out, "}};")?;
        writeln!(out)
    }

    fn signal_states(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "const int MAX_SIGNAL_STATES = {};", MAX_SIGNAL_STATES)?;
        writeln!(out, "const int MAX_SIGNAL_COUNT = {};", layout.max_signal_count)?;
        writeln!(
            out,
            "const CanSignalState SIGNAL_STATES[][MAX_SIGNAL_COUNT][MAX_SIGNAL_STATES] = {{"
        )?;
        lister(out, layout, |out, set| {
            for row in set.state_rows() {
                out.push_str("        { ");
                for state in set.states(row) {
                    write!(out, "{{{}, {}}}, ", state.value, quoted(&state.name))?;
                }
                writeln!(out, "}},")?;
            }
            Ok(())
        })?;
        writeln!(out, "}};")?;
        writeln!(out)
    }

    fn signals(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "CanSignal SIGNALS[][MAX_SIGNAL_COUNT] = {{")?;
        lister(out, layout, |out, set| {
            for row in &set.signals {
                let signal = set.signal(row);
                write!(
                    out,
                    "        {{&CAN_MESSAGES[{}][{}], {}, {}, {}, {:.6}, {:.6}, {:.6}, {:.6}, {{{:.6}}}, {}, {}, ",
                    set.index,
                    row.message_index,
                    quoted(&signal.generic_name),
                    row.bit_position,
                    row.bit_size,
                    signal.factor,
                    signal.offset,
                    signal.min_value,
                    signal.max_value,
                    set.set.signal_max_frequency(row.id),
                    signal.send_same,
                    set.set.signal_force_send_changed(row.id)
                )?;
                match row.states {
                    Some((index, count)) => {
                        write!(out, "SIGNAL_STATES[{}][{}], {}", set.index, index, count)?
                    }
                    None => out.push_str("NULL, 0"),
                }
                writeln!(
                    out,
                    ", {}, {}, {}}}, // {}",
                    signal.writable,
                    signal.effective_decoder().unwrap_or("NULL"),
                    signal.effective_encoder().unwrap_or("NULL"),
                    signal.name
                )?;
            }
            Ok(())
        })?;
        writeln!(out, "}};")?;
        writeln!(out)
    }

    fn initializers(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "void openxc::signals::initialize() {{")?;
        switcher(out, layout, |out, set| {
            for hook in &set.set.initializers {
                writeln!(out, "        {}();", hook)?;
            }
            Ok(())
        })?;
        writeln!(out, "}}")?;
        writeln!(out)
    }

    fn loopers(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "void openxc::signals::loop() {{")?;
        switcher(out, layout, |out, set| {
            for hook in &set.set.loopers {
                writeln!(out, "        {}();", hook)?;
            }
            Ok(())
        })?;
        writeln!(out, "}}")?;
        writeln!(out)
    }

    fn commands(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(out, "const int MAX_COMMAND_COUNT = {};", layout.max_command_count)?;
        writeln!(out, "CanCommand COMMANDS[][MAX_COMMAND_COUNT] = {{")?;
        lister(out, layout, |out, set| {
            for command in &set.commands {
                writeln!(
                    out,
                    "        {{ {}, {} }},",
                    quoted(&command.name),
                    command.handler.as_deref().unwrap_or("NULL")
                )?;
            }
            Ok(())
        })?;
        writeln!(out, "}};")?;
        writeln!(out)
    }

    fn diagnostic_messages(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(
            out,
            "const int MAX_DIAGNOSTIC_REQUEST_COUNT = {};",
            layout.max_diagnostic_count
        )?;
        writeln!(
            out,
            "const DiagnosticRequestConfig DIAGNOSTIC_REQUESTS[][MAX_DIAGNOSTIC_REQUEST_COUNT] = {{"
        )?;
        lister(out, layout, |out, set| {
            for row in &set.diagnostics {
                let request = row.request;
                writeln!(
                    out,
                    "        {{&CAN_BUSES[{}][{}], 0x{:x}, 0x{:x}, {}, {}, {:.6}, {}, {}, {}, {}}},",
                    set.index,
                    row.bus_index,
                    request.id,
                    request.mode,
                    request.pid.map_or("0".to_string(), |pid| format!("0x{:x}", pid)),
                    request.pid_length,
                    request.frequency,
                    request.decoder.as_deref().unwrap_or("NULL"),
                    request.callback.as_deref().unwrap_or("NULL"),
                    request.multiple_responses,
                    request.name.as_deref().map_or("NULL".to_string(), quoted)
                )?;
            }
            Ok(())
        })?;
        writeln!(out, "}};")?;
        writeln!(out)
    }

    fn decoder(&self, out: &mut String, layout: &Layout<'_>) -> fmt::Result {
        writeln!(
            out,
            "void openxc::signals::decodeCanMessage(Pipeline* pipeline, CanBus* bus, int id, uint64_t data) {{"
        )?;
        switcher(out, layout, |out, set| {
            writeln!(out, "        switch(bus->address) {{")?;
            for id in &set.buses {
                let bus = set.bus(*id);
                writeln!(out, "        case {}:", bus.controller.unwrap_or_default())?;
                writeln!(out, "            switch (id) {{")?;
                for row in set.messages_on(*id) {
                    let message = set.message(row);
                    if row.signals.is_empty() && message.handlers.is_empty() {
                        continue;
                    }
                    writeln!(out, "            case 0x{:x}: // {}", message.id, message.label())?;
                    for handler in &message.handlers {
                        writeln!(
                            out,
                            "                {}(id, data, SIGNALS[{}], getSignalCount(), pipeline);",
                            handler, set.index
                        )?;
                    }
                    for signal_index in &row.signals {
                        let signal = set.signal(&set.signals[*signal_index]);
                        writeln!(
                            out,
                            "                can::read::translateSignal(&SIGNALS[{}][{}], data, SIGNALS[{}], getSignalCount(), pipeline); // {}",
                            set.index, signal_index, set.index, signal.name
                        )?;
                    }
                    writeln!(out, "                break;")?;
                }
                writeln!(out, "            }}")?;
                if bus.raw_can_mode != RawCanMode::Off {
                    writeln!(
                        out,
                        "            can::read::passthroughMessage(bus, id, data, getMessages(), getMessageCount(), pipeline);"
                    )?;
                }
                writeln!(out, "            break;")?;
            }
            writeln!(out, "        }}")
        })?;
        writeln!(out, "}}")?;
        writeln!(out)
    }

    fn footer(&self, out: &mut String, _layout: &Layout<'_>) -> fmt::Result {
        out.push_str(FOOTER);
        Ok(())
    }
}

fn raw_can_mode(mode: RawCanMode) -> &'static str {
    match mode {
        RawCanMode::Off => "RawCanMode::OFF",
        RawCanMode::Filtered => "RawCanMode::FILTERED",
        RawCanMode::Unfiltered => "RawCanMode::UNFILTERED",
    }
}

/// Wraps one block per set in `{ // message set: name ... },`.
fn lister<F>(out: &mut String, layout: &Layout<'_>, mut block: F) -> fmt::Result
where
    F: FnMut(&mut String, &SetLayout<'_>) -> fmt::Result,
{
    for set in &layout.sets {
        writeln!(out, "    {{ // message set: {}", set.name())?;
        block(out, set)?;
        writeln!(out, "    }},")?;
    }
    Ok(())
}

/// Wraps one block per set in a `case` of a switch on the active set index.
fn switcher<F>(out: &mut String, layout: &Layout<'_>, mut block: F) -> fmt::Result
where
    F: FnMut(&mut String, &SetLayout<'_>) -> fmt::Result,
{
    writeln!(out, "    switch(getConfiguration()->messageSetIndex) {{")?;
    for set in &layout.sets {
        writeln!(out, "    case {}: // message set: {}", set.index, set.name())?;
        block(out, set)?;
        writeln!(out, "        break;")?;
    }
    writeln!(out, "    }}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Layout;
    use crate::types::{Bus, BusId, Message, MessageId, MessageSet, Signal, SignalId, SignalState};

    fn speed_set() -> MessageSet {
        MessageSet {
            name: "passenger".into(),
            bit_numbering_inverted: false,
            buses: vec![Bus {
                name: "hs".into(),
                speed: 500_000,
                controller: Some(1),
                max_message_frequency: 0.0,
                raw_can_mode: RawCanMode::Filtered,
                raw_writable: false,
                loopback: false,
                messages: vec![MessageId(0)],
            }],
            messages: vec![Message {
                id: 0x100,
                name: Some("Speed".into()),
                bus_name: Some("hs".into()),
                bus: Some(BusId(0)),
                enabled: true,
                bit_numbering_inverted: None,
                max_frequency: None,
                max_signal_frequency: None,
                force_send_changed: false,
                force_send_changed_signals: false,
                handlers: vec!["handleSpeed".into()],
                signals: vec![SignalId(0)],
            }],
            signals: vec![Signal {
                message: MessageId(0),
                name: "VehSpd".into(),
                generic_name: "vehicle_speed".into(),
                bit_position: Some(0),
                bit_size: Some(16),
                factor: 0.01,
                offset: 0.0,
                min_value: 0.0,
                max_value: 655.35,
                enabled: true,
                ignore: false,
                max_frequency: None,
                send_same: true,
                force_send_changed: None,
                bit_numbering_inverted: None,
                writable: false,
                decoder: None,
                encoder: None,
                states: vec![SignalState {
                    value: 0,
                    name: "stopped".into(),
                }],
            }],
            ..Default::default()
        }
    }

    fn render(sets: &[MessageSet]) -> String {
        let layout = Layout::new(sets).unwrap();
        let mut out = String::new();
        let backend = CppBackend;
        backend.messages(&mut out, &layout).unwrap();
        backend.signal_states(&mut out, &layout).unwrap();
        backend.signals(&mut out, &layout).unwrap();
        backend.decoder(&mut out, &layout).unwrap();
        out
    }

    #[test]
    fn emits_message_and_signal_rows() {
        let out = render(&[speed_set()]);
        assert!(out.contains("{&CAN_BUSES[0][0], 0x100, {0.000000}, false}, // Speed"));
        assert!(out.contains(
            "{&CAN_MESSAGES[0][0], \"vehicle_speed\", 0, 16, 0.010000, 0.000000, 0.000000, 655.350000, {0.000000}, true, false, SIGNAL_STATES[0][0], 1, false, openxc::signals::handlers::stateDecoder, NULL}, // VehSpd"
        ));
        assert!(out.contains("{0, \"stopped\"}, "));
    }

    #[test]
    fn decoder_dispatches_on_bus_then_id() {
        let out = render(&[speed_set()]);
        assert!(out.contains("    case 0: // message set: passenger"));
        assert!(out.contains("        case 1:"));
        assert!(out.contains("            case 0x100: // Speed"));
        assert!(out.contains("handleSpeed(id, data, SIGNALS[0], getSignalCount(), pipeline);"));
        assert!(out.contains("can::read::translateSignal(&SIGNALS[0][0], data, SIGNALS[0], getSignalCount(), pipeline); // VehSpd"));
        assert!(out.contains("can::read::passthroughMessage("));
    }

    #[test]
    fn disabled_message_leaves_no_case() {
        let mut set = speed_set();
        set.messages[0].enabled = false;
        let out = render(&[set]);
        assert!(!out.contains("case 0x100"));
        assert!(!out.contains("vehicle_speed"));
    }
}
