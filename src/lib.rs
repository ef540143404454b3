// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # synaplast - online synaptic learning for spiking neuron hardware
//!
//! synaplast consumes a stream of spike events, learns which connections
//! matter with a spike-timing-dependent rule, and keeps a capacity-bounded
//! connection table that mirrors the limited per-neuron memory of the target
//! hardware. Every time a connection's quantized class changes, a
//! programming command is queued for the hardware transport.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use synaplast::prelude::*;
//!
//! let config = synaplast::load_engine_config(None, None)?;
//! let mut engine = LearningEngine::new(config)?;
//! engine.seed_connectivity()?;
//!
//! let address = engine.topology().address_of("input", 0)?;
//! engine.process_spikes(&[SpikeEvent::new(address, 100)]);
//! for command in engine.drain_commands() {
//!     println!("{:?}", command);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: synaplast-npu-neural                       │
//! │  (NeuronAddress, layers, synapse classes, topology)     │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Configuration: synaplast-config                        │
//! │  (TOML schema, env/CLI overrides, validation)           │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Learning: synaplast-npu-plasticity                     │
//! │  (history, synaptic table, STDP, normalizer, emitter)   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - **`tools`** (default): the `replay_spikes` binary
//! - **`file-logging`**: per-run JSON log files
//!
//! ## License
//!
//! Apache-2.0

use std::collections::HashMap;
use std::path::Path;

// Re-export member crates
pub use synaplast_config as config;
pub use synaplast_npu_neural as neural;
pub use synaplast_npu_plasticity as plasticity;
pub use synaplast_observability as observability;

pub mod trace;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config, SynaplastConfig};
    pub use crate::neural::{
        ClassThresholds, LayerId, LayerKind, NeuronAddress, SynapseClass, TopologyIndex,
    };
    pub use crate::plasticity::{
        EngineConfig, EngineStats, LearningEngine, PipelineEvent, PlasticityError,
        ProgramConnection, ReloadKind, SpikeEvent,
    };
}

/// Load a configuration file (or discover one) and convert it for the engine
///
/// Same search order and overrides as [`synaplast_config::load_config`].
pub fn load_engine_config(
    path: Option<&Path>,
    cli_overrides: Option<&HashMap<String, String>>,
) -> plasticity::PlasticityResult<plasticity::EngineConfig> {
    let loaded = config::load_config(path, cli_overrides)?;
    let engine_config = plasticity::EngineConfig::try_from(&loaded)?;
    tracing::debug!(target: "replay",
        "[REPLAY] Loaded {} layers, {} projections",
        engine_config.layers.len(),
        engine_config.projections.len()
    );
    Ok(engine_config)
}
