// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Seeded random initial wiring along declared projections

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use synaplast_npu_neural::TopologyIndex;

use crate::change_emitter::ChangeEmitter;
use crate::config::{LayerProfile, Projection};
use crate::error::{PlasticityError, PlasticityResult};
use crate::synaptic_table::{Admission, SynapticTable};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WiringReport {
    /// Source/destination pairs drawn against the projection probability
    pub considered: u64,
    pub allocated: u64,
}

/// Connect each projected pair with its projection's probability
///
/// Only free slots are used; a full destination is skipped rather than
/// evicting. The same seed over the same topology yields the same wiring.
pub fn seed_connectivity(
    topology: &TopologyIndex,
    projections: &[Projection],
    profiles: &[LayerProfile],
    table: &mut SynapticTable,
    emitter: &mut ChangeEmitter,
    seed: u64,
) -> PlasticityResult<WiringReport> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut report = WiringReport::default();

    for projection in projections {
        if projection.initial_probability <= 0.0 {
            continue;
        }
        let (Some(src), Some(dst)) = (
            topology.layer(&projection.from),
            topology.layer(&projection.to),
        ) else {
            return Err(PlasticityError::InvalidConfig(format!(
                "projection {} -> {} references an unknown layer",
                projection.from, projection.to
            )));
        };
        let profile = profiles
            .get(dst.id.0 as usize)
            .copied()
            .unwrap_or_default();
        let class = profile.thresholds.classify(projection.initial_weight);
        let mut allocated = 0u64;

        for &destination in dst.addresses() {
            for &source in src.addresses() {
                if source == destination {
                    continue;
                }
                report.considered += 1;
                if !rng.gen_bool(projection.initial_probability) {
                    continue;
                }
                if table.occupancy(destination) >= table.capacity_of(destination)
                    || table.slot_of(source, destination).is_some()
                {
                    continue;
                }
                let admission =
                    table.insert_or_replace(source, destination, projection.initial_weight, class);
                if let Admission::Allocated(_) = admission {
                    emitter.emit_admission(&admission, source, class);
                    allocated += 1;
                }
            }
        }

        tracing::debug!(target: "plasticity",
            "[PLASTICITY] Wired {} -> {}: {} synapses (p={})",
            projection.from, projection.to, allocated, projection.initial_probability
        );
        report.allocated += allocated;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synaplast_npu_neural::{LayerKind, LayerPlacement, LayerShape, LayerSpec, SynapseClass};

    fn topology() -> TopologyIndex {
        TopologyIndex::build(&[
            LayerSpec {
                name: "input".to_string(),
                kind: LayerKind::Input,
                shape: LayerShape::new(8, 1, 1),
                placement: LayerPlacement {
                    chip: 0,
                    first_core: 0,
                    first_neuron: 0,
                },
            },
            LayerSpec {
                name: "output".to_string(),
                kind: LayerKind::Output,
                shape: LayerShape::new(4, 1, 1),
                placement: LayerPlacement {
                    chip: 0,
                    first_core: 1,
                    first_neuron: 0,
                },
            },
        ])
        .unwrap()
    }

    fn projection(p: f64) -> Projection {
        Projection {
            from: "input".to_string(),
            to: "output".to_string(),
            initial_probability: p,
            initial_weight: 12.0,
        }
    }

    fn wire(p: f64, capacity: usize, seed: u64) -> (SynapticTable, ChangeEmitter, WiringReport) {
        let topology = topology();
        let mut table = SynapticTable::new(capacity).unwrap();
        let mut emitter = ChangeEmitter::new();
        let profiles = vec![LayerProfile::default(); 2];
        let report = seed_connectivity(
            &topology,
            &[projection(p)],
            &profiles,
            &mut table,
            &mut emitter,
            seed,
        )
        .unwrap();
        (table, emitter, report)
    }

    #[test]
    fn test_full_probability_fills_up_to_capacity() {
        let (table, mut emitter, report) = wire(1.0, 3, 7);
        assert_eq!(report.considered, 32);
        assert_eq!(report.allocated, 12);
        assert_eq!(table.len(), 12);

        let commands = emitter.drain();
        assert_eq!(commands.len(), 12);
        assert!(commands.iter().all(|c| c.class == SynapseClass::FastExcit));
    }

    #[test]
    fn test_same_seed_same_wiring() {
        let (a, _, ra) = wire(0.3, 8, 99);
        let (b, _, rb) = wire(0.3, 8, 99);
        assert_eq!(ra, rb);

        let mut wa: Vec<_> = a.iter().map(|s| (s.destination, s.source, s.slot)).collect();
        let mut wb: Vec<_> = b.iter().map(|s| (s.destination, s.source, s.slot)).collect();
        wa.sort();
        wb.sort();
        assert_eq!(wa, wb);
    }

    #[test]
    fn test_zero_probability_is_skipped() {
        let (table, emitter, report) = wire(0.0, 8, 1);
        assert_eq!(report, WiringReport::default());
        assert!(table.is_empty());
        assert_eq!(emitter.pending(), 0);
    }

    #[test]
    fn test_unknown_layer_is_an_error() {
        let mut table = SynapticTable::new(4).unwrap();
        let mut emitter = ChangeEmitter::new();
        let mut bad = projection(0.5);
        bad.to = "missing".to_string();
        assert!(seed_connectivity(&topology(), &[bad], &[], &mut table, &mut emitter, 0).is_err());
    }
}
