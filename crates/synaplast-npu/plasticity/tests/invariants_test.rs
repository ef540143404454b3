// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Property tests for the synaptic table, quantization and spike history

use std::collections::HashSet;

use proptest::prelude::*;
use synaplast_npu_neural::{
    ClassThresholds, LayerId, LayerKind, LayerPlacement, LayerShape, LayerSpec, NeuronAddress,
};
use synaplast_npu_plasticity::normalizer;
use synaplast_npu_plasticity::*;

fn addr(n: u16) -> NeuronAddress {
    NeuronAddress::from_core_neuron(4, 0, n).unwrap()
}

fn dest(n: u16) -> NeuronAddress {
    NeuronAddress::from_core_neuron(4, 2, n).unwrap()
}

fn assert_table_invariants(table: &SynapticTable, destinations: &[NeuronAddress]) {
    for &d in destinations {
        let synapses: Vec<Synapse> = table.synapses(d).collect();
        assert!(synapses.len() <= table.capacity_of(d));
        assert_eq!(synapses.len(), table.occupancy(d));

        let sources: HashSet<NeuronAddress> = synapses.iter().map(|s| s.source).collect();
        assert_eq!(sources.len(), synapses.len());
    }
}

proptest! {
    #[test]
    fn prop_admission_respects_capacity_and_monotonicity(
        capacity in 1usize..6,
        ops in prop::collection::vec((0u16..12, 0u16..3, -50.0f64..50.0), 1..120)
    ) {
        let mut table = SynapticTable::new(capacity).unwrap();
        let destinations: Vec<NeuronAddress> = (0..3).map(dest).collect();

        for (source, d, weight) in ops {
            let (source, d) = (addr(source), dest(d));
            let existing = table.slot_of(source, d).is_some();
            let full = table.occupancy(d) == table.capacity_of(d);
            let minimum = table
                .synapses(d)
                .map(|s| s.weight)
                .fold(f64::INFINITY, f64::min);
            let before: Vec<Synapse> = table.synapses(d).collect();

            let admission = table.insert_or_replace(source, d, weight, ClassThresholds::default().classify(weight));

            match admission {
                Admission::Updated(_) => prop_assert!(existing),
                Admission::Allocated(_) => prop_assert!(!existing && !full),
                Admission::Replaced { evicted, .. } => {
                    prop_assert!(!existing && full);
                    prop_assert!(evicted.weight < weight);
                    prop_assert_eq!(evicted.weight, minimum);
                    prop_assert!(table.lookup(evicted.source, d).is_none());
                }
                Admission::Rejected => {
                    prop_assert!(!existing && full);
                    prop_assert!(weight <= minimum);
                    prop_assert_eq!(table.synapses(d).collect::<Vec<_>>(), before);
                }
            }
            assert_table_invariants(&table, &destinations);
        }
    }

    #[test]
    fn prop_quantization_is_idempotent(
        weights in prop::collection::vec(-150.0f64..150.0, 1..10),
        total_delta in -40.0f64..40.0
    ) {
        let profile = LayerProfile::default();
        let mut table = SynapticTable::new(16).unwrap();
        for (i, w) in weights.iter().enumerate() {
            table.insert_or_replace(addr(i as u16), dest(0), *w, profile.thresholds.classify(*w));
        }

        let changes = normalizer::normalize(&mut table, dest(0), total_delta, &profile);
        let mut emitter = ChangeEmitter::new();
        prop_assert_eq!(emitter.apply(&mut table, &changes), changes.len());

        let slots = table.destination(dest(0)).unwrap();
        prop_assert!(normalizer::quantize(dest(0), slots, &profile).is_empty());
        for synapse in table.synapses(dest(0)) {
            prop_assert_eq!(synapse.class, profile.thresholds.classify(synapse.weight));
        }
    }

    #[test]
    fn prop_clamp_keeps_weights_within_limits(
        weights in prop::collection::vec(-400.0f64..400.0, 1..10)
    ) {
        let profile = LayerProfile::default();
        let mut table = SynapticTable::new(16).unwrap();
        for (i, w) in weights.iter().enumerate() {
            table.insert_or_replace(addr(i as u16), dest(0), *w, profile.thresholds.classify(*w));
        }

        normalizer::normalize(&mut table, dest(0), 0.0, &profile);

        for synapse in table.synapses(dest(0)) {
            prop_assert!(synapse.weight <= profile.excitatory_ceiling + 1e-9);
            prop_assert!(synapse.weight >= profile.inhibitory_floor - 1e-9);
        }
    }

    #[test]
    fn prop_history_never_exceeds_capacity(
        capacity in 1usize..32,
        count in 0usize..200
    ) {
        let mut history = SpikeHistoryQueue::new(capacity);
        for t in 0..count {
            history.push(addr((t % 256) as u16), LayerId(0), t as u64);
            prop_assert!(history.len() <= capacity);
        }
        prop_assert_eq!(history.len(), count.min(capacity));
    }
}

fn small_engine() -> LearningEngine {
    let layer = |name: &str, kind, width, core, capacity| LayerSetup {
        spec: LayerSpec {
            name: name.to_string(),
            kind,
            shape: LayerShape::new(width, 1, 1),
            placement: LayerPlacement {
                chip: 4,
                first_core: core,
                first_neuron: 0,
            },
        },
        profile: LayerProfile {
            slot_capacity: capacity,
            ..LayerProfile::default()
        },
    };
    let config = EngineConfig {
        layers: vec![
            layer("input", LayerKind::Input, 4, 0, 64),
            layer("output", LayerKind::Output, 1, 2, 2),
        ],
        projections: vec![Projection {
            from: "input".to_string(),
            to: "output".to_string(),
            initial_probability: 0.5,
            initial_weight: 3.0,
        }],
        history_capacity: 16,
        ..EngineConfig::default()
    };
    LearningEngine::new(config).unwrap()
}

proptest! {
    #[test]
    fn prop_reset_clears_everything_learned(
        spikes in prop::collection::vec((0u32..5, 1u64..200), 1..60),
        wrap_at in 0usize..60
    ) {
        let mut engine = small_engine();
        engine.seed_connectivity().unwrap();

        let mut events = Vec::new();
        let mut t = 0u64;
        for (i, (neuron, gap)) in spikes.iter().enumerate() {
            if i == wrap_at {
                events.push(PipelineEvent::TimestampWrap);
            }
            t += gap;
            let address = match *neuron {
                4 => engine.topology().address_of("output", 0).unwrap(),
                n => engine.topology().address_of("input", n).unwrap(),
            };
            events.push(SpikeEvent::new(address, t).into());
        }
        engine.process_batch(&events);
        prop_assert!(!engine.history().is_empty());

        engine.reset();

        let output = engine.topology().address_of("output", 0).unwrap();
        prop_assert!(engine.table().is_empty());
        prop_assert!(engine.history().is_empty());
        prop_assert_eq!(engine.history().epoch(), 0);
        prop_assert_eq!(engine.pending_commands(), 0);
        prop_assert_eq!(engine.stats(), EngineStats::default());
        prop_assert_eq!(engine.table().capacity_of(output), 2);
    }
}
