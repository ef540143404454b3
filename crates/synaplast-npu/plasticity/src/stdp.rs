// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! STDP weight update - pairs each post-synaptic spike with earlier
//! pre-synaptic spikes from the history.
//!
//! One streaming causal pass per post spike, bounded by the scan limits:
//! - Connected pairs are potentiated by `lut[max_age - dt] * learning_rate`
//! - Once the accumulated delta passes the saturation cap, further deltas in
//!   the same walk are negated
//! - Projected but unconnected pairs may be recruited into the synaptic table
//! - The reverse connection, if any, is depressed at the backward rate

use ahash::AHashMap;
use synaplast_npu_neural::{LayerId, NeuronAddress};

use crate::change_emitter::ChangeEmitter;
use crate::config::{LayerProfile, LearningParams, ScanBounds};
use crate::spike_history::{HistoryCursor, SpikeHistoryQueue};
use crate::synaptic_table::{Admission, SynapticTable};

/// Decay lookup table indexed by `max_age_us - dt`
#[derive(Debug, Clone, PartialEq)]
pub struct DecayLut {
    values: Vec<f64>,
}

impl DecayLut {
    /// `lut[i] = exp(i / tau_us)` for `i` in `0..=max_delay_us`
    pub fn exponential(max_delay_us: u64, tau_us: f64) -> Self {
        let values = (0..=max_delay_us)
            .map(|i| (i as f64 / tau_us).exp())
            .collect();
        Self { values }
    }

    pub fn from_table(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every gap in `0..=max_delay_us` has an entry
    pub fn covers(&self, max_delay_us: u64) -> bool {
        self.values.len() as u64 > max_delay_us
    }

    /// Factor for a pre-to-post gap of `dt`, `None` outside the window
    #[inline]
    pub fn factor(&self, max_delay_us: u64, dt: u64) -> Option<f64> {
        if dt > max_delay_us {
            return None;
        }
        self.values.get((max_delay_us - dt) as usize).copied()
    }
}

/// Layer-level rules the walk consults
pub trait ProjectionRules {
    /// Whether `from` may form connections onto `to`
    fn allows(&self, from: LayerId, to: LayerId) -> bool;
}

/// The post-synaptic spike being paired
#[derive(Debug, Clone, Copy)]
pub struct PostSpike {
    pub address: NeuronAddress,
    pub layer: LayerId,
    pub cursor: HistoryCursor,
}

/// Everything one walk changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairingOutcome {
    /// Sum of deltas applied to the post neuron's slots
    pub total_delta: f64,
    /// Per reverse destination, in first-seen order: accumulated depression
    pub backward: Vec<(NeuronAddress, LayerId, f64)>,
    /// Position of each destination in `backward`
    backward_index: AHashMap<NeuronAddress, usize>,
    pub pairs_evaluated: u64,
    pub weight_updates: u64,
    pub recruitments: u64,
    pub evictions: u64,
    pub rejections: u64,
}

impl PairingOutcome {
    fn add_backward(&mut self, destination: NeuronAddress, layer: LayerId, delta: f64) {
        match self.backward_index.get(&destination) {
            Some(&i) => self.backward[i].2 += delta,
            None => {
                self.backward_index.insert(destination, self.backward.len());
                self.backward.push((destination, layer, delta));
            }
        }
    }
}

/// STDP rule with its current parameters
#[derive(Debug, Clone)]
pub struct StdpRule {
    pub learning: LearningParams,
    pub scan: ScanBounds,
    pub lut: DecayLut,
}

impl StdpRule {
    pub fn new(learning: LearningParams, scan: ScanBounds, lut: DecayLut) -> Self {
        Self { learning, scan, lut }
    }

    /// Delta for a gap of `dt`, before saturation and layer scaling
    #[inline]
    pub fn base_delta(&self, dt: u64) -> Option<f64> {
        self.lut
            .factor(self.scan.max_age_us, dt)
            .map(|f| f * self.learning.learning_rate)
    }

    /// Pair `post` against the history and apply every resulting update
    ///
    /// `profiles` is indexed by `LayerId`. Admissions caused by recruitment are
    /// emitted immediately; class changes are left to the normalizer.
    pub fn pair_post_spike(
        &self,
        post: PostSpike,
        history: &SpikeHistoryQueue,
        table: &mut SynapticTable,
        rules: &impl ProjectionRules,
        profiles: &[LayerProfile],
        emitter: &mut ChangeEmitter,
    ) -> PairingOutcome {
        let mut outcome = PairingOutcome::default();
        let Some(anchor) = history.get(post.cursor).copied() else {
            return outcome;
        };
        let Some(profile) = profiles.get(post.layer.0 as usize) else {
            return outcome;
        };

        let scan = history.scan_backward_from(post.cursor, self.scan.max_age_us, self.scan.max_pairs);
        for pre in scan {
            if pre.address == post.address {
                continue;
            }
            let dt = anchor.timestamp_us - pre.timestamp_us;
            if dt < self.scan.min_isi_us {
                continue;
            }
            let Some(factor) = self.lut.factor(self.scan.max_age_us, dt) else {
                continue;
            };
            outcome.pairs_evaluated += 1;

            let mut delta = factor * self.learning.learning_rate;
            if outcome.total_delta > self.learning.saturation_cap {
                delta = -delta;
            }
            delta *= profile.multiplier;

            if table.update_weight(pre.address, post.address, delta).is_some() {
                outcome.total_delta += delta;
                outcome.weight_updates += 1;
            } else if self.learning.recruitment
                && delta > self.learning.recruitment_threshold
                && rules.allows(pre.layer, post.layer)
            {
                let class = profile.thresholds.classify(delta);
                let admission = table.insert_or_replace(pre.address, post.address, delta, class);
                match admission {
                    Admission::Rejected => {
                        outcome.rejections += 1;
                        tracing::trace!(target: "plasticity",
                            "[PLASTICITY] Candidate {} -> {} rejected (delta={:.4})",
                            pre.address, post.address, delta
                        );
                    }
                    _ => {
                        if let Admission::Replaced { evicted, .. } = admission {
                            outcome.evictions += 1;
                            tracing::trace!(target: "plasticity",
                                "[PLASTICITY] {} evicted {} from {} (weight {:.4} < {:.4})",
                                pre.address, evicted.source, post.address, evicted.weight, delta
                            );
                        }
                        outcome.recruitments += 1;
                        outcome.total_delta += delta;
                        emitter.emit_admission(&admission, pre.address, class);
                    }
                }
            }

            if self.learning.backward_learning_rate > 0.0 {
                let multiplier = profiles
                    .get(pre.layer.0 as usize)
                    .map_or(1.0, |p| p.multiplier);
                let depression = -factor * self.learning.backward_learning_rate * multiplier;
                if table.update_weight(post.address, pre.address, depression).is_some() {
                    outcome.add_backward(pre.address, pre.layer, depression);
                    outcome.weight_updates += 1;
                }
            }
        }

        outcome
    }
}
