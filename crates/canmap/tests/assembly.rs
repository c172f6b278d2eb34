// crates/canmap/tests/assembly.rs

use canmap::{CompileOptions, MessageSet, RawCanMode, SearchPaths, assemble, load_superset};
use std::path::PathBuf;

/// Helper returning options that resolve files from the `tests/data/` directory.
fn data_options() -> CompileOptions {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("data");
    CompileOptions {
        search_paths: SearchPaths::new([path]),
        ..CompileOptions::default()
    }
}

fn load(name: &str, options: &CompileOptions) -> MessageSet {
    let _ = env_logger::builder().is_test(true).try_init();
    assemble(name, options).unwrap_or_else(|e| panic!("Failed to assemble {}: {}", name, e))
}

/// The child file only overrides `factor`; everything else about `foo`
/// comes from the parent.
#[test]
fn test_child_layer_overrides_parent_fields() {
    let set = load("passenger.json", &data_options());

    let message = set.find_message("hs", 0x100).expect("Message 0x100 missing");
    let foo = set.find_signal(message, "foo").expect("Signal foo missing");
    let foo = set.signal(foo);

    assert_eq!(foo.bit_position, Some(8), "bit_position not inherited from parent");
    assert_eq!(foo.bit_size, Some(8), "bit_size not inherited from parent");
    assert_eq!(foo.factor, 2.0, "factor not overridden by child");
    assert_eq!(set.message(message).name.as_deref(), Some("Speed"));
}

#[test]
fn test_set_level_properties_come_from_parent() {
    let set = load("passenger.json", &data_options());

    assert_eq!(set.name, "passenger");
    assert!(!set.bit_numbering_inverted);
    assert_eq!(set.buses.len(), 2);

    let hs = set.bus(set.bus_by_name("hs").expect("Bus hs missing"));
    assert_eq!(hs.speed, 500_000);
    assert_eq!(hs.controller, Some(1));
    assert_eq!(hs.raw_can_mode, RawCanMode::Filtered);

    let ms = set.bus(set.bus_by_name("ms").expect("Bus ms missing"));
    assert_eq!(ms.raw_can_mode, RawCanMode::Off);
}

/// Mapping values win over the database; the database fills in the layout.
#[test]
fn test_mapping_merges_over_database_import() {
    let set = load("passenger.json", &data_options());

    let engine = set.find_message("hs", 0x110).expect("Message 0x110 missing");
    assert_eq!(set.message(engine).name.as_deref(), Some("Engine"));

    let speed = set
        .find_signal(engine, "engine_speed")
        .expect("engine_speed missing");
    let speed = set.signal(speed);
    assert_eq!(speed.name, "EngSpd");
    assert_eq!(speed.bit_position, Some(16));
    assert_eq!(speed.bit_size, Some(16));
    assert_eq!(speed.factor, 0.25);
    assert_eq!(speed.max_value, 16383.75);
    assert_eq!(speed.max_frequency, Some(5.0));
    assert!(!speed.send_same);

    let gear = set
        .find_signal(engine, "transmission_gear_position")
        .expect("gear position missing");
    let states: Vec<(i64, &str)> = set
        .signal(gear)
        .states
        .iter()
        .map(|s| (s.value, s.name.as_str()))
        .collect();
    assert_eq!(states, vec![(0, "neutral"), (1, "first"), (2, "second")]);

    // Signals the mapping never references stay out.
    assert_eq!(set.message(engine).signals.len(), 2);
}

#[test]
fn test_commands_and_hooks_from_every_layer() {
    let set = load("passenger.json", &data_options());

    let commands: Vec<&str> = set
        .active_commands()
        .into_iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(commands, vec!["device_id", "turn_signal_status", "version"]);

    assert_eq!(set.initializers, vec!["initializeBase", "initializePowertrain"]);
    assert_eq!(set.loopers, vec!["flushQueues"]);
    assert!(set.extra_sources.contains("handlers.cpp"));

    let diagnostics = set.active_diagnostic_messages();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].id, 0x7df);
    assert_eq!(diagnostics[0].pid, Some(0xc));
    assert_eq!(diagnostics[0].pid_length, 1);
}

/// By default a disabled mapping contributes nothing at all.
#[test]
fn test_disabled_mapping_is_skipped() {
    let set = load("passenger.json", &data_options());

    assert!(set.find_message("ms", 0x200).is_none());
    assert!(set.all_commands().iter().all(|c| c.name != "unlock"));
    assert!(!set.initializers.iter().any(|i| i == "initializeBody"));
}

/// When kept, its messages and commands exist but are disabled.
#[test]
fn test_disabled_mapping_can_be_kept() {
    let options = data_options().skip_disabled_mappings(false);
    let set = load("passenger.json", &options);

    let doors = set.find_message("ms", 0x200).expect("Message 0x200 missing");
    assert!(!set.message_enabled(doors));
    let door = set.find_signal(doors, "door_status").expect("door_status missing");
    assert!(set.signal(door).enabled, "signal keeps its own flag");
    assert!(!set.signal_enabled(door), "but inherits the disabled message");

    let unlock = set
        .all_commands()
        .into_iter()
        .find(|c| c.name == "unlock")
        .expect("unlock missing");
    assert!(!unlock.enabled);
    assert!(set.active_commands().iter().all(|c| c.name != "unlock"));
    assert!(!set.initializers.iter().any(|i| i == "initializeBody"));
}

#[test]
fn test_valid_set_passes_validation() {
    let set = load("passenger.json", &data_options());
    assert!(set.validate());
    assert!(load("speedometer.json", &data_options()).validate());
}

#[test]
fn test_superset_assembles_members_in_order() {
    let _ = env_logger::builder().is_test(true).try_init();
    let sets = load_superset("superset.json", &data_options()).expect("Failed to load superset");
    let names: Vec<&str> = sets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["passenger", "speedometer"]);
}
