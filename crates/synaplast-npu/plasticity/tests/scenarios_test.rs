// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end learning scenarios through the public API

use synaplast_npu_neural::{
    LayerKind, LayerPlacement, LayerShape, LayerSpec, NeuronAddress, SynapseClass,
};
use synaplast_npu_plasticity::normalizer;
use synaplast_npu_plasticity::*;

fn layer(name: &str, kind: LayerKind, width: u32, core: u8, capacity: usize) -> LayerSetup {
    LayerSetup {
        spec: LayerSpec {
            name: name.to_string(),
            kind,
            shape: LayerShape::new(width, 1, 1),
            placement: LayerPlacement {
                chip: 1,
                first_core: core,
                first_neuron: 0,
            },
        },
        profile: LayerProfile {
            slot_capacity: capacity,
            ..LayerProfile::default()
        },
    }
}

/// 8 inputs fully wired onto a single output neuron at weight 5
fn wired_engine() -> LearningEngine {
    let config = EngineConfig {
        layers: vec![
            layer("input", LayerKind::Input, 8, 0, 64),
            layer("output", LayerKind::Output, 1, 1, 8),
        ],
        projections: vec![Projection {
            from: "input".to_string(),
            to: "output".to_string(),
            initial_probability: 1.0,
            initial_weight: 5.0,
        }],
        scan: ScanBounds {
            max_age_us: 1_000,
            max_pairs: 64,
            min_isi_us: 10,
        },
        ..EngineConfig::default()
    };
    let mut engine = LearningEngine::new(config).unwrap();
    assert_eq!(engine.seed_connectivity().unwrap(), 8);
    engine.drain_commands();
    engine
}

fn input(engine: &LearningEngine, i: u32) -> NeuronAddress {
    engine.topology().address_of("input", i).unwrap()
}

fn output(engine: &LearningEngine) -> NeuronAddress {
    engine.topology().address_of("output", 0).unwrap()
}

fn addr(n: u16) -> NeuronAddress {
    NeuronAddress::from_core_neuron(1, 0, n).unwrap()
}

fn dest() -> NeuronAddress {
    NeuronAddress::from_core_neuron(1, 1, 0).unwrap()
}

fn table_of_three() -> SynapticTable {
    let mut table = SynapticTable::new(3).unwrap();
    for (n, w) in [(1, 4.0), (2, -3.0), (3, 7.5)] {
        table.insert_or_replace(addr(n), dest(), w, SynapseClass::None);
    }
    table
}

#[test]
fn test_full_table_rejects_weaker_candidate() {
    let mut table = table_of_three();
    let before: Vec<Synapse> = table.synapses(dest()).collect();

    let admission = table.insert_or_replace(addr(4), dest(), -3.5, SynapseClass::None);

    assert_eq!(admission, Admission::Rejected);
    assert_eq!(table.occupancy(dest()), 3);
    assert_eq!(table.synapses(dest()).collect::<Vec<_>>(), before);
}

#[test]
fn test_full_table_evicts_minimum_for_stronger_candidate() {
    let mut table = table_of_three();

    let admission = table.insert_or_replace(addr(4), dest(), -1.0, SynapseClass::None);

    let Admission::Replaced { evicted, .. } = admission else {
        panic!("expected replacement, got {:?}", admission);
    };
    assert_eq!(evicted.source, addr(2));
    assert_eq!(evicted.weight, -3.0);
    assert_eq!(table.occupancy(dest()), 3);
    assert!(table.lookup(addr(2), dest()).is_none());
    assert_eq!(table.lookup(addr(4), dest()).unwrap().weight, -1.0);
}

#[test]
fn test_causal_pair_in_window_potentiates() {
    let mut engine = wired_engine();
    let pre = input(&engine, 0);
    let post = output(&engine);

    let report = engine.process_spikes(&[SpikeEvent::new(pre, 100), SpikeEvent::new(post, 150)]);

    let delta = DecayLut::exponential(1_000, 1_000.0).factor(1_000, 50).unwrap();
    let share = delta / 8.0;
    assert_eq!(report.pairs_evaluated, 1);
    assert_eq!(engine.stats().weight_updates, 1);

    let paired = engine.table().lookup(pre, post).unwrap().weight;
    assert!((paired - (5.0 + delta - share)).abs() < 1e-9);
    assert!(paired > 5.0);
    for i in 1..8 {
        let other = engine.table().lookup(input(&engine, i), post).unwrap().weight;
        assert!((other - (5.0 - share)).abs() < 1e-9);
    }
}

#[test]
fn test_pair_outside_window_is_ignored() {
    let mut engine = wired_engine();
    let pre = input(&engine, 0);
    let post = output(&engine);

    let report = engine.process_spikes(&[SpikeEvent::new(pre, 100), SpikeEvent::new(post, 2_100)]);

    assert_eq!(report.pairs_evaluated, 0);
    assert_eq!(report.commands_emitted, 0);
    assert!(engine.table().synapses(post).all(|s| s.weight == 5.0));
    assert_eq!(engine.stats().normalizations, 0);
}

#[test]
fn test_rebalance_is_even_and_reproducible() {
    let profile = LayerProfile::default();
    let run = || {
        let mut table = SynapticTable::new(2).unwrap();
        for (n, w) in [(1, 50.0), (2, -10.0)] {
            table.insert_or_replace(addr(n), dest(), w, profile.thresholds.classify(w));
        }
        let changes = normalizer::normalize(&mut table, dest(), 20.0, &profile);
        let weights: Vec<f64> = table.synapses(dest()).map(|s| s.weight).collect();
        (weights, changes)
    };

    let (weights, changes) = run();
    assert_eq!(weights, vec![40.0, -20.0]);
    assert!(changes.is_empty());
    assert_eq!(run().0, weights);
}

#[test]
fn test_timestamp_wrap_blocks_cross_epoch_pairs() {
    let mut control = wired_engine();
    let pre = input(&control, 0);
    let post = output(&control);
    let report = control.process_spikes(&[SpikeEvent::new(pre, 10), SpikeEvent::new(post, 50)]);
    assert_eq!(report.pairs_evaluated, 1);

    let mut engine = wired_engine();
    let report = engine.process_batch(&[
        SpikeEvent::new(pre, 10).into(),
        PipelineEvent::TimestampWrap,
        SpikeEvent::new(post, 50).into(),
    ]);
    assert_eq!(report.timestamp_wraps, 1);
    assert_eq!(report.pairs_evaluated, 0);
    assert!(engine.table().synapses(post).all(|s| s.weight == 5.0));

    // pairs inside the new epoch still form
    let late = input(&engine, 1);
    let report = engine.process_spikes(&[SpikeEvent::new(late, 60), SpikeEvent::new(post, 100)]);
    assert_eq!(report.pairs_evaluated, 1);
    assert_eq!(engine.history().epoch(), 1);
}

#[test]
fn test_history_overflow_is_silent() {
    let mut config = wired_engine().config().clone();
    config.history_capacity = 4;
    let mut engine = LearningEngine::new(config).unwrap();
    let spikes: Vec<SpikeEvent> = (0..32u64)
        .map(|t| SpikeEvent::new(input(&engine, (t % 8) as u32), t * 20))
        .collect();

    let report = engine.process_spikes(&spikes);

    assert_eq!(report.spikes_processed, 32);
    assert_eq!(engine.history().len(), 4);
}

#[test]
fn test_saturation_cap_turns_later_pairs_depressive() {
    let mut engine = wired_engine();
    let mut config = engine.config().clone();
    config.learning.saturation_cap = 1.0;
    assert_eq!(engine.reload_config(config).unwrap(), ReloadKind::Parameters);

    let post = output(&engine);
    let spikes: Vec<SpikeEvent> = (0..4)
        .map(|i| SpikeEvent::new(input(&engine, i), 100 + 100 * i as u64))
        .chain(std::iter::once(SpikeEvent::new(post, 600)))
        .collect();
    engine.process_spikes(&spikes);

    // newest pre is paired before the cap is reached, the oldest after it
    let newest = engine.table().lookup(input(&engine, 3), post).unwrap().weight;
    let oldest = engine.table().lookup(input(&engine, 0), post).unwrap().weight;
    assert!(newest > oldest);
    assert_eq!(engine.stats().pairs_evaluated, 4);
}

#[test]
fn test_class_changes_emit_commands_in_order() {
    let mut engine = wired_engine();
    let mut config = engine.config().clone();
    config.learning.learning_rate = 8.0;
    engine.reload_config(config).unwrap();

    let pre = input(&engine, 2);
    let post = output(&engine);
    engine.process_spikes(&[SpikeEvent::new(pre, 100), SpikeEvent::new(post, 110)]);

    let commands = engine.drain_commands();
    assert!(!commands.is_empty());
    for command in &commands {
        let synapse = engine.table().lookup(command.source, command.destination).unwrap();
        assert_eq!(synapse.slot, command.slot);
    }
    let promoted = commands.iter().find(|c| c.source == pre).unwrap();
    assert_eq!(promoted.class, SynapseClass::FastExcit);
    // initial wiring programmed all 8 slots first
    assert_eq!(engine.stats().commands_emitted, 8 + commands.len() as u64);
}
