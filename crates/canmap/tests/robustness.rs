// crates/canmap/tests/robustness.rs

//! Malformed or inconsistent configurations must fail loudly, never produce
//! partial output.

use canmap::{CompileError, CompileOptions, SearchPaths, assemble, compile};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

/// Writes each `(name, json)` pair into a fresh directory and returns options
/// searching it.
fn scratch(files: &[(&str, Value)]) -> (TempDir, CompileOptions) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, data) in files {
        fs::write(dir.path().join(name), data.to_string()).expect("Failed to write fixture");
    }
    let options = CompileOptions {
        search_paths: SearchPaths::new([dir.path()]),
        ..CompileOptions::default()
    };
    (dir, options)
}

fn single_message(signal: Value) -> Value {
    json!({
        "name": "test",
        "buses": {"hs": {"controller": 1, "speed": 500000}},
        "messages": {"0x100": {"bus": "hs", "signals": {"speed": signal}}}
    })
}

#[test]
fn test_unknown_signal_attribute_is_rejected() {
    let (_dir, options) = scratch(&[(
        "set.json",
        single_message(json!({"bit_position": 0, "bit_size": 8, "unit_of_measure": "km/h"})),
    )]);

    match assemble("set.json", &options) {
        Err(CompileError::UnknownAttribute {
            entity, attribute, ..
        }) => {
            assert_eq!(entity, "signal");
            assert_eq!(attribute, "unit_of_measure");
        }
        other => panic!("Expected UnknownAttribute, got {:?}", other),
    }
}

#[test]
fn test_unknown_message_attribute_is_rejected() {
    let (_dir, options) = scratch(&[(
        "set.json",
        json!({
            "buses": {"hs": {"controller": 1, "speed": 500000}},
            "messages": {"0x100": {"bus": "hs", "priority": 3}}
        }),
    )]);
    assert!(matches!(
        assemble("set.json", &options),
        Err(CompileError::UnknownAttribute {
            entity: "message",
            ..
        })
    ));
}

#[test]
fn test_parent_cycle_is_fatal() {
    let (_dir, options) = scratch(&[
        ("a.json", json!({"parents": ["b.json"]})),
        ("b.json", json!({"parents": ["a.json"]})),
    ]);
    assert!(matches!(
        assemble("a.json", &options),
        Err(CompileError::ParentCycle { .. })
    ));
}

#[test]
fn test_missing_parent_is_fatal() {
    let (_dir, options) = scratch(&[("a.json", json!({"parents": ["gone.json"]}))]);
    match assemble("a.json", &options) {
        Err(CompileError::FileNotFound { name, .. }) => assert_eq!(name, "gone.json"),
        other => panic!("Expected FileNotFound, got {:?}", other),
    }
}

#[test]
fn test_bus_without_speed_is_fatal() {
    let (_dir, options) = scratch(&[("set.json", json!({"buses": {"hs": {"controller": 1}}}))]);
    match assemble("set.json", &options) {
        Err(CompileError::MissingBusSpeed { bus }) => assert_eq!(bus, "hs"),
        other => panic!("Expected MissingBusSpeed, got {:?}", other),
    }
}

#[test]
fn test_mapping_on_undefined_bus_is_fatal() {
    let (_dir, options) = scratch(&[
        (
            "set.json",
            json!({
                "buses": {"hs": {"controller": 1, "speed": 500000}},
                "mappings": [{"mapping": "map.json", "bus": "nope"}]
            }),
        ),
        ("map.json", json!({"messages": {}})),
    ]);
    assert!(matches!(
        assemble("set.json", &options),
        Err(CompileError::UndefinedMappingBus { .. })
    ));
}

#[test]
fn test_invalid_json_is_fatal() {
    let (dir, options) = scratch(&[]);
    fs::write(dir.path().join("set.json"), "{ \"name\": ").unwrap();
    assert!(matches!(
        assemble("set.json", &options),
        Err(CompileError::JsonParsing { .. })
    ));
}

#[test]
fn test_missing_extra_source_is_fatal() {
    let mut set = single_message(json!({"bit_position": 0, "bit_size": 8}));
    set["bit_numbering_inverted"] = json!(false);
    set["extra_sources"] = json!(["handlers.cpp"]);
    let (_dir, options) = scratch(&[("set.json", set)]);
    assert!(matches!(
        compile(&["set.json"], &options),
        Err(CompileError::FileNotFound { .. })
    ));
}

/// Position 0 with a 16-bit width reaches below bit 0 once inverted.
#[test]
fn test_uninvertible_signal_aborts_generation() {
    let (_dir, options) = scratch(&[(
        "set.json",
        single_message(json!({"bit_position": 0, "bit_size": 16})),
    )]);
    assert!(matches!(
        compile(&["set.json"], &options),
        Err(CompileError::BitInversion { .. })
    ));
}

/// The same signal at position 24 lands on bit 16 when inverted.
#[test]
fn test_inverted_position_is_emitted() {
    let (_dir, options) = scratch(&[(
        "set.json",
        single_message(json!({"bit_position": 24, "bit_size": 16})),
    )]);
    let generated = compile(&["set.json"], &options).expect("Compilation failed");
    assert!(generated.source.contains("\"speed\", 16, 16, "));
}

#[test]
fn test_incomplete_signal_fails_validation() {
    let (_dir, options) = scratch(&[("set.json", single_message(json!({"bit_position": 0})))]);
    match compile(&["set.json"], &options) {
        Err(CompileError::InvalidMessageSet { name }) => assert_eq!(name, "test"),
        other => panic!("Expected InvalidMessageSet, got {:?}", other.map(|g| g.source)),
    }
}

/// A disabled message keeps its disabled signals out of the output even
/// though each signal is enabled on its own.
#[test]
fn test_enable_flags_combine() {
    let (_dir, options) = scratch(&[(
        "set.json",
        json!({
            "bit_numbering_inverted": false,
            "buses": {"hs": {"controller": 1, "speed": 500000}},
            "messages": {
                "0x100": {
                    "bus": "hs",
                    "enabled": false,
                    "signals": {"speed": {"bit_position": 0, "bit_size": 8, "enabled": true}}
                }
            }
        }),
    )]);

    let set = assemble("set.json", &options).expect("Assembly failed");
    let signal = set.active_signals();
    assert!(signal.is_empty());

    let generated = compile(&["set.json"], &options).expect("Compilation failed");
    assert!(!generated.source.contains("\"speed\""));
    assert_eq!(generated.stats.skipped_messages, 1);
    assert_eq!(generated.stats.skipped_signals, 1);
}

/// A message whose bus is not declared is dropped with a warning only.
#[test]
fn test_message_on_unknown_bus_is_dropped() {
    let (_dir, options) = scratch(&[(
        "set.json",
        json!({
            "bit_numbering_inverted": false,
            "buses": {"hs": {"controller": 1, "speed": 500000}},
            "messages": {
                "0x100": {"bus": "hs", "signals": {"a": {"bit_position": 0, "bit_size": 8}}},
                "0x200": {"bus": "body", "signals": {"b": {"bit_position": 0, "bit_size": 8}}}
            }
        }),
    )]);

    let generated = compile(&["set.json"], &options).expect("Compilation failed");
    assert!(generated.source.contains("0x100"));
    assert!(!generated.source.contains("0x200"));
}

/// Signals of a message on an undefined bus are not validated; the message
/// is simply left out.
#[test]
fn test_incomplete_signal_on_unknown_bus_still_compiles() {
    let (_dir, options) = scratch(&[(
        "set.json",
        json!({
            "name": "test",
            "bit_numbering_inverted": false,
            "buses": {"hs": {"controller": 1, "speed": 500000}},
            "messages": {
                "0x100": {"bus": "hs", "signals": {"a": {"bit_position": 0, "bit_size": 8}}},
                "0x200": {"bus": "ms", "signals": {"partial": {"factor": 2}}}
            }
        }),
    )]);

    let set = assemble("set.json", &options).expect("Assembly failed");
    assert!(set.validate());

    let generated = compile(&["set.json"], &options).expect("Compilation failed");
    assert!(generated.source.contains("0x100"));
    assert!(!generated.source.contains("partial"));
}
