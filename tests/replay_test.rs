// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Replay integration tests.

These tests validate:
- A TOML file loads into a working engine through the umbrella crate
- CLI overrides reach the engine parameters
- A trace file replays into programming commands
*/

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use synaplast::prelude::*;
use synaplast::trace;

const CONFIG: &str = r#"
[learning]
learning_rate = 8.0

[history]
capacity = 1000
max_age_us = 1000
max_pairs = 64

[[layers]]
name = "input"
kind = "input"
chip = 1
first_core = 0
width = 8

[[layers]]
name = "output"
kind = "output"
chip = 1
first_core = 1
width = 1
slot_capacity = 8

[[projections]]
from = "input"
to = "output"
initial_probability = 1.0
initial_weight = 5.0
"#;

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create file");
    file.write_all(content.as_bytes()).expect("Failed to write file");
    path
}

fn wired_engine(config_path: &Path) -> LearningEngine {
    let config = synaplast::load_engine_config(Some(config_path), None)
        .expect("Failed to load engine config");
    let mut engine = LearningEngine::new(config).expect("Failed to build engine");
    assert_eq!(engine.seed_connectivity().unwrap(), 8);
    engine
}

#[test]
fn test_config_file_builds_wired_engine() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_file(dir.path(), "synaplast.toml", CONFIG);

    let mut engine = wired_engine(&config_path);

    assert_eq!(engine.topology().neuron_count(), 9);
    let commands = engine.drain_commands();
    assert_eq!(commands.len(), 8);
    assert!(commands.iter().all(|c| c.class == SynapseClass::SlowExcit));

    // every input lands in a distinct slot of the one output neuron
    let output = engine.topology().address_of("output", 0).unwrap();
    let slots: ahash::AHashSet<usize> = commands
        .iter()
        .inspect(|c| assert_eq!(c.destination, output))
        .map(|c| c.slot)
        .collect();
    assert_eq!(slots.len(), 8);
}

#[test]
fn test_cli_overrides_reach_engine() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_file(dir.path(), "synaplast.toml", CONFIG);
    let mut overrides = HashMap::new();
    overrides.insert("learning_rate".to_string(), "2.5".to_string());
    overrides.insert("max_pairs".to_string(), "16".to_string());

    let config = synaplast::load_engine_config(Some(&config_path), Some(&overrides)).unwrap();

    assert_eq!(config.learning.learning_rate, 2.5);
    assert_eq!(config.scan.max_pairs, 16);
}

#[test]
fn test_invalid_config_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let broken = CONFIG.replace("slot_capacity = 8", "slot_capacity = 0");
    let config_path = write_file(dir.path(), "synaplast.toml", &broken);

    assert!(synaplast::load_engine_config(Some(&config_path), None).is_err());
}

#[test]
fn test_trace_replay_promotes_causal_input() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_file(dir.path(), "synaplast.toml", CONFIG);
    let trace_path = write_file(
        dir.path(),
        "spikes.csv",
        "# chip,core,neuron,timestamp_us\n\
         1,0,2,100\n\
         1,1,0,110   # output fires\n\
         3,3,255,120 # nobody lives here\n",
    );

    let mut engine = wired_engine(&config_path);
    engine.drain_commands();
    let events = trace::read_trace(&trace_path).unwrap();
    assert_eq!(events.len(), 3);

    let report = engine.process_batch(&events);

    assert_eq!(report.spikes_processed, 2);
    assert_eq!(report.spikes_ignored, 1);
    assert_eq!(report.pairs_evaluated, 1);

    let pre = engine.topology().address_of("input", 2).unwrap();
    let commands = engine.drain_commands();
    let promoted = commands.iter().find(|c| c.source == pre).unwrap();
    assert_eq!(promoted.class, SynapseClass::FastExcit);

    // commands serialize one object per line for the hardware transport
    let line = serde_json::to_string(promoted).unwrap();
    assert!(line.contains("fast_excit"));
    assert!(!line.contains('\n'));
}

#[test]
fn test_trace_wrap_separates_epochs() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_file(dir.path(), "synaplast.toml", CONFIG);
    let trace_path = write_file(dir.path(), "spikes.csv", "1,0,0,100\nWRAP\n1,1,0,150\n");

    let mut engine = wired_engine(&config_path);
    engine.drain_commands();
    let report = engine.process_batch(&trace::read_trace(&trace_path).unwrap());

    assert_eq!(report.timestamp_wraps, 1);
    assert_eq!(report.pairs_evaluated, 0);
    assert!(engine.drain_commands().is_empty());
}

#[test]
fn test_missing_trace_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = trace::read_trace(&dir.path().join("absent.csv"));
    assert!(matches!(result, Err(trace::TraceError::Io(_))));
}
