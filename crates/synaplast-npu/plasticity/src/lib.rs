// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Synaplast Plasticity
//!
//! Online spike-timing-dependent learning over the bounded connection memory
//! of spiking neuron hardware:
//! - Spike history with epoch-aware backward scans
//! - Capacity-bounded synaptic table with monotonic admission
//! - STDP weight updates driven by a decay lookup table
//! - Zero-sum rebalancing, ratchet clamping and 5-class quantization
//! - One programming command per synapse class change
//!
//! ## Architecture
//! - One [`LearningEngine`] owns all state; no globals, no locks
//! - Per-layer behaviour comes from [`LayerProfile`] records
//! - Per-spike processing never fails

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod change_emitter;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod spike_history;
pub mod stdp;
pub mod synaptic_table;
pub mod wiring;

// Re-export key types
pub use change_emitter::{ChangeEmitter, ProgramConnection};
pub use config::{EngineConfig, LayerProfile, LayerSetup, LearningParams, Projection, ScanBounds};
pub use engine::{BatchReport, EngineStats, LearningEngine, PipelineEvent, ReloadKind, SpikeEvent};
pub use error::{PlasticityError, PlasticityResult};
pub use spike_history::{BackwardScan, HistoryCursor, SpikeHistoryQueue, SpikeRecord};
pub use stdp::{DecayLut, PairingOutcome, PostSpike, ProjectionRules, StdpRule};
pub use synaptic_table::{Admission, ClassChange, DestinationSlots, SlotRef, Synapse, SynapticTable};
pub use wiring::{seed_connectivity, WiringReport};
