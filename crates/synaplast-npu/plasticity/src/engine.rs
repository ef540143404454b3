// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Learning engine - owns all learning state and runs one batch at a time
//!
//! Per spike:
//! 1. Resolve the address once through the topology index
//! 2. Log it in the spike history
//! 3. If its layer is a projection target, pair it against the history
//! 4. Normalize and quantize every destination the walk touched
//! 5. Queue one command per class change
//!
//! Single-threaded and run-to-completion: the caller owns the engine and
//! serializes access to it. Nothing inside a batch can fail; unknown
//! addresses are counted and skipped.

use serde::{Deserialize, Serialize};
use synaplast_npu_neural::{LayerId, NeuronAddress, TopologyError, TopologyIndex};

use crate::change_emitter::{ChangeEmitter, ProgramConnection};
use crate::config::{EngineConfig, LayerProfile, Projection};
use crate::error::PlasticityResult;
use crate::normalizer;
use crate::spike_history::SpikeHistoryQueue;
use crate::stdp::{PostSpike, ProjectionRules, StdpRule};
use crate::synaptic_table::{ClassChange, SynapticTable};
use crate::wiring;

/// One spike from the upstream pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpikeEvent {
    pub address: NeuronAddress,
    pub timestamp_us: u64,
}

impl SpikeEvent {
    pub fn new(address: NeuronAddress, timestamp_us: u64) -> Self {
        Self {
            address,
            timestamp_us,
        }
    }
}

/// Event stream item, in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
    Spike(SpikeEvent),
    /// The timestamp counter wrapped; nothing before this may pair with anything after
    TimestampWrap,
}

impl From<SpikeEvent> for PipelineEvent {
    fn from(spike: SpikeEvent) -> Self {
        PipelineEvent::Spike(spike)
    }
}

/// What a single batch did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub spikes_processed: u64,
    pub spikes_ignored: u64,
    pub pairs_evaluated: u64,
    pub commands_emitted: u64,
    pub timestamp_wraps: u64,
}

/// Effect of [`LearningEngine::reload_config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Parameters swapped in place; learned state kept
    Parameters,
    /// Layers, projections or capacities changed; the engine was rebuilt empty
    Structural,
}

/// Cumulative counters since construction or the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub spikes_processed: u64,
    /// Spikes whose address belongs to no layer
    pub spikes_ignored: u64,
    pub pairs_evaluated: u64,
    pub weight_updates: u64,
    pub recruitments: u64,
    pub admissions_rejected: u64,
    pub evictions: u64,
    pub normalizations: u64,
    pub commands_emitted: u64,
    pub timestamp_wraps: u64,
}

impl EngineStats {
    fn since(&self, before: &EngineStats) -> BatchReport {
        BatchReport {
            spikes_processed: self.spikes_processed - before.spikes_processed,
            spikes_ignored: self.spikes_ignored - before.spikes_ignored,
            pairs_evaluated: self.pairs_evaluated - before.pairs_evaluated,
            commands_emitted: self.commands_emitted - before.commands_emitted,
            timestamp_wraps: self.timestamp_wraps - before.timestamp_wraps,
        }
    }
}

/// Layer-to-layer projection matrix, indexed by `LayerId`
#[derive(Debug, Clone)]
struct ProjectionSet {
    layer_count: usize,
    allowed: Vec<bool>,
    targets: Vec<bool>,
}

impl ProjectionSet {
    fn build(topology: &TopologyIndex, projections: &[Projection]) -> PlasticityResult<Self> {
        let layer_count = topology.layers().len();
        let mut set = Self {
            layer_count,
            allowed: vec![false; layer_count * layer_count],
            targets: vec![false; layer_count],
        };
        for projection in projections {
            let from = topology
                .layer_id(&projection.from)
                .ok_or_else(|| TopologyError::UnknownLayer(projection.from.clone()))?;
            let to = topology
                .layer_id(&projection.to)
                .ok_or_else(|| TopologyError::UnknownLayer(projection.to.clone()))?;
            set.allowed[from.0 as usize * layer_count + to.0 as usize] = true;
            set.targets[to.0 as usize] = true;
        }
        Ok(set)
    }

    /// Whether spikes of `layer` act as post-synaptic spikes
    #[inline]
    fn is_target(&self, layer: LayerId) -> bool {
        self.targets.get(layer.0 as usize).copied().unwrap_or(false)
    }
}

impl ProjectionRules for ProjectionSet {
    #[inline]
    fn allows(&self, from: LayerId, to: LayerId) -> bool {
        let (from, to) = (from.0 as usize, to.0 as usize);
        from < self.layer_count
            && to < self.layer_count
            && self.allowed[from * self.layer_count + to]
    }
}

pub struct LearningEngine {
    config: EngineConfig,
    topology: TopologyIndex,
    /// Indexed by `LayerId`
    profiles: Vec<LayerProfile>,
    projections: ProjectionSet,
    rule: StdpRule,
    history: SpikeHistoryQueue,
    table: SynapticTable,
    emitter: ChangeEmitter,
    stats: EngineStats,
}

impl LearningEngine {
    /// Build an engine, refusing any invalid configuration
    pub fn new(config: EngineConfig) -> PlasticityResult<Self> {
        config.validate()?;
        let topology = config.build_topology()?;
        let projections = ProjectionSet::build(&topology, &config.projections)?;
        let profiles: Vec<LayerProfile> = config.layers.iter().map(|s| s.profile).collect();

        let mut table = SynapticTable::new(LayerProfile::default().slot_capacity)?;
        let mut destinations = 0usize;
        for layer in topology.layers() {
            if !projections.is_target(layer.id) {
                continue;
            }
            let capacity = profiles[layer.id.0 as usize].slot_capacity;
            for &address in layer.addresses() {
                table.register_destination(address, capacity)?;
            }
            destinations += layer.len();
        }

        tracing::info!(target: "plasticity",
            "[PLASTICITY] Learning engine ready: {} layers, {} neurons, {} plastic destinations, history {}",
            topology.layers().len(),
            topology.neuron_count(),
            destinations,
            config.history_capacity
        );

        Ok(Self {
            rule: StdpRule::new(config.learning.clone(), config.scan, config.decay.clone()),
            history: SpikeHistoryQueue::new(config.history_capacity),
            emitter: ChangeEmitter::new(),
            stats: EngineStats::default(),
            config,
            topology,
            profiles,
            projections,
            table,
        })
    }

    /// Process one batch of events in order
    pub fn process_batch(&mut self, events: &[PipelineEvent]) -> BatchReport {
        let before = self.stats();
        for event in events {
            match event {
                PipelineEvent::Spike(spike) => self.process_spike(*spike),
                PipelineEvent::TimestampWrap => self.signal_timestamp_wrap(),
            }
        }
        let report = self.stats().since(&before);
        tracing::debug!(target: "plasticity",
            "[PLASTICITY] Batch: {} spikes, {} ignored, {} pairs, {} commands",
            report.spikes_processed,
            report.spikes_ignored,
            report.pairs_evaluated,
            report.commands_emitted
        );
        report
    }

    /// Process spikes with no wrap in between
    pub fn process_spikes(&mut self, spikes: &[SpikeEvent]) -> BatchReport {
        let events: Vec<PipelineEvent> = spikes.iter().copied().map(PipelineEvent::from).collect();
        self.process_batch(&events)
    }

    fn process_spike(&mut self, spike: SpikeEvent) {
        let Some(resolved) = self.topology.resolve(spike.address) else {
            self.stats.spikes_ignored += 1;
            tracing::trace!(target: "plasticity",
                "[PLASTICITY] Ignoring spike from unknown address {}", spike.address
            );
            return;
        };
        self.stats.spikes_processed += 1;

        let cursor = self
            .history
            .push(spike.address, resolved.layer, spike.timestamp_us);
        if !self.projections.is_target(resolved.layer) {
            return;
        }

        let outcome = self.rule.pair_post_spike(
            PostSpike {
                address: spike.address,
                layer: resolved.layer,
                cursor,
            },
            &self.history,
            &mut self.table,
            &self.projections,
            &self.profiles,
            &mut self.emitter,
        );

        self.stats.pairs_evaluated += outcome.pairs_evaluated;
        self.stats.weight_updates += outcome.weight_updates;
        self.stats.recruitments += outcome.recruitments;
        self.stats.evictions += outcome.evictions;
        self.stats.admissions_rejected += outcome.rejections;

        if outcome.total_delta != 0.0 {
            self.normalize_destination(spike.address, resolved.layer, outcome.total_delta);
        }
        for (destination, layer, delta) in outcome.backward {
            if delta != 0.0 {
                self.normalize_destination(destination, layer, delta);
            }
        }
    }

    fn normalize_destination(&mut self, destination: NeuronAddress, layer: LayerId, total_delta: f64) {
        let Some(profile) = self.profiles.get(layer.0 as usize).copied() else {
            return;
        };
        let changes = normalizer::normalize(&mut self.table, destination, total_delta, &profile);
        self.stats.normalizations += 1;
        self.apply_class_changes(destination, &changes);
    }

    /// Persist and emit class changes of one destination, then free idle slots if configured
    fn apply_class_changes(&mut self, destination: NeuronAddress, changes: &[ClassChange]) -> usize {
        if changes.is_empty() {
            return 0;
        }
        let queued = self.emitter.apply(&mut self.table, changes);

        if self.config.learning.release_on_none {
            let released = self.table.release_unconnected(destination);
            if !released.is_empty() {
                tracing::trace!(target: "plasticity",
                    "[PLASTICITY] Released {} idle slots of {}", released.len(), destination
                );
            }
        }
        queued
    }

    /// Requantize every destination of the layers whose thresholds changed
    fn requantize_layers(&mut self, layers: &[LayerId]) -> usize {
        let destinations: Vec<(NeuronAddress, LayerId)> = layers
            .iter()
            .filter_map(|&id| self.topology.layers().get(id.0 as usize))
            .flat_map(|layer| layer.addresses().iter().map(move |&a| (a, layer.id)))
            .collect();

        let mut queued = 0;
        for (destination, layer) in destinations {
            let Some(profile) = self.profiles.get(layer.0 as usize).copied() else {
                continue;
            };
            let changes = match self.table.destination(destination) {
                Some(slots) => normalizer::quantize(destination, slots, &profile),
                None => continue,
            };
            queued += self.apply_class_changes(destination, &changes);
        }
        queued
    }

    /// Start a new history epoch after a timestamp overflow
    pub fn signal_timestamp_wrap(&mut self) {
        self.history.mark_epoch_boundary();
        self.stats.timestamp_wraps += 1;
        tracing::debug!(target: "plasticity",
            "[PLASTICITY] Timestamp wrap, history epoch {}", self.history.epoch()
        );
    }

    /// Take every queued command in production order
    pub fn drain_commands(&mut self) -> Vec<ProgramConnection> {
        self.emitter.drain()
    }

    pub fn pending_commands(&self) -> usize {
        self.emitter.pending()
    }

    /// Clear the table, the history, pending commands and counters together
    pub fn reset(&mut self) {
        self.table.clear();
        self.history.clear();
        self.emitter.clear();
        self.stats = EngineStats::default();
        tracing::info!(target: "plasticity", "[PLASTICITY] Learning engine reset");
    }

    /// Apply a new configuration from the next spike on
    ///
    /// Parameter-only changes keep every learned synapse; slots of layers whose
    /// thresholds changed are requantized and reprogrammed at once. Anything that changes
    /// the shape of the state rebuilds the engine empty. On error the engine is
    /// left untouched.
    pub fn reload_config(&mut self, config: EngineConfig) -> PlasticityResult<ReloadKind> {
        config.validate()?;

        if self.config.structure_matches(&config) {
            let profiles: Vec<LayerProfile> = config.layers.iter().map(|s| s.profile).collect();
            let requantize: Vec<LayerId> = self
                .topology
                .layers()
                .iter()
                .filter(|layer| self.projections.is_target(layer.id))
                .filter(|layer| {
                    let i = layer.id.0 as usize;
                    self.profiles.get(i).map(|p| p.thresholds) != profiles.get(i).map(|p| p.thresholds)
                })
                .map(|layer| layer.id)
                .collect();

            self.profiles = profiles;
            self.rule = StdpRule::new(config.learning.clone(), config.scan, config.decay.clone());
            self.config = config;
            let queued = self.requantize_layers(&requantize);
            tracing::info!(target: "plasticity",
                "[PLASTICITY] Reloaded parameters (learning_rate={}, max_age_us={}), {} classes reprogrammed",
                self.config.learning.learning_rate,
                self.config.scan.max_age_us,
                queued
            );
            return Ok(ReloadKind::Parameters);
        }

        let rebuilt = LearningEngine::new(config)?;
        *self = rebuilt;
        tracing::warn!(target: "plasticity",
            "[PLASTICITY] Structural configuration change, learned state discarded"
        );
        Ok(ReloadKind::Structural)
    }

    /// Randomly wire every projection with its initial probability
    ///
    /// Returns the number of synapses created.
    pub fn seed_connectivity(&mut self) -> PlasticityResult<usize> {
        let report = wiring::seed_connectivity(
            &self.topology,
            &self.config.projections,
            &self.profiles,
            &mut self.table,
            &mut self.emitter,
            self.config.wiring_seed,
        )?;
        tracing::info!(target: "plasticity",
            "[PLASTICITY] Initial wiring: {} of {} candidate pairs connected (seed {})",
            report.allocated, report.considered, self.config.wiring_seed
        );
        Ok(report.allocated as usize)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            commands_emitted: self.emitter.emitted(),
            ..self.stats
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn table(&self) -> &SynapticTable {
        &self.table
    }

    pub fn history(&self) -> &SpikeHistoryQueue {
        &self.history
    }

    pub fn topology(&self) -> &TopologyIndex {
        &self.topology
    }

    /// Profile a destination in `layer` learns with
    pub fn profile(&self, layer: &str) -> Option<&LayerProfile> {
        let id = self.topology.layer_id(layer)?;
        self.profiles.get(id.0 as usize)
    }
}
