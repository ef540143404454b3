// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `synaplast.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use synaplast_npu_neural::LayerKind;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SynaplastConfig {
    pub learning: LearningConfig,
    pub history: HistoryConfig,
    pub decay: DecayConfig,
    /// Layer profile applied to every layer unless the layer overrides a field
    pub defaults: LayerProfileConfig,
    pub layers: Vec<LayerConfig>,
    pub projections: Vec<ProjectionConfig>,
    pub wiring: WiringConfig,
    pub logging: LoggingConfig,
}

impl SynaplastConfig {
    /// Look up a layer section by name
    pub fn layer(&self, name: &str) -> Option<&LayerConfig> {
        self.layers.iter().find(|l| l.name == name)
    }
}

/// Learning rule parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Scale applied to causal (pre before post) pairings
    pub learning_rate: f64,
    /// Scale applied when depressing the reverse connection; 0 disables it
    pub backward_learning_rate: f64,
    /// Accumulated delta above which further pairings in the same walk are negated
    pub saturation_cap: f64,
    /// Offer unconnected but projected pairs to the synaptic table
    pub recruitment: bool,
    /// Minimum delta a candidate needs before it is offered
    pub recruitment_threshold: f64,
    /// Free a slot once its class quantizes to `none`
    pub release_on_none: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1.0,
            backward_learning_rate: 0.0,
            saturation_cap: 50.0,
            recruitment: true,
            recruitment_threshold: 0.0,
            release_on_none: false,
        }
    }
}

/// Spike history and backward-scan bounds
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub max_age_us: u64,
    pub max_pairs: usize,
    pub min_isi_us: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 20_000,
            max_age_us: 1_000,
            max_pairs: 256,
            min_isi_us: 10,
        }
    }
}

/// Decay lookup table source
///
/// An empty `table` selects the exponential table `exp(i / tau_us)`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecayConfig {
    pub tau_us: f64,
    pub table: Vec<f64>,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            tau_us: 1_000.0,
            table: Vec::new(),
        }
    }
}

/// Classification thresholds for one sign pair
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub slow_excitatory: f64,
    pub fast_excitatory: f64,
    pub slow_inhibitory: f64,
    pub fast_inhibitory: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            slow_excitatory: 1.0,
            fast_excitatory: 10.0,
            slow_inhibitory: -1.0,
            fast_inhibitory: -10.0,
        }
    }
}

/// Per-layer learning profile
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayerProfileConfig {
    /// Slots available to each destination neuron of the layer
    pub slot_capacity: usize,
    /// Multiplier applied to every delta landing in the layer
    pub multiplier: f64,
    pub thresholds: ThresholdsConfig,
    pub excitatory_ceiling: f64,
    pub inhibitory_floor: f64,
}

impl Default for LayerProfileConfig {
    fn default() -> Self {
        Self {
            slot_capacity: 64,
            multiplier: 1.0,
            thresholds: ThresholdsConfig::default(),
            excitatory_ceiling: 100.0,
            inhibitory_floor: -100.0,
        }
    }
}

/// One `[[layers]]` entry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayerConfig {
    pub name: String,
    pub kind: LayerKind,
    pub chip: u8,
    pub first_core: u8,
    pub first_neuron: u16,
    pub width: u32,
    pub height: u32,
    pub depth: u32,

    // Profile overrides
    pub slot_capacity: Option<usize>,
    pub multiplier: Option<f64>,
    pub thresholds: Option<ThresholdsConfig>,
    pub excitatory_ceiling: Option<f64>,
    pub inhibitory_floor: Option<f64>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: LayerKind::Input,
            chip: 0,
            first_core: 0,
            first_neuron: 0,
            width: 1,
            height: 1,
            depth: 1,
            slot_capacity: None,
            multiplier: None,
            thresholds: None,
            excitatory_ceiling: None,
            inhibitory_floor: None,
        }
    }
}

impl LayerConfig {
    /// Resolve this layer's profile against the shared defaults
    pub fn profile(&self, defaults: &LayerProfileConfig) -> LayerProfileConfig {
        LayerProfileConfig {
            slot_capacity: self.slot_capacity.unwrap_or(defaults.slot_capacity),
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
            thresholds: self.thresholds.unwrap_or(defaults.thresholds),
            excitatory_ceiling: self.excitatory_ceiling.unwrap_or(defaults.excitatory_ceiling),
            inhibitory_floor: self.inhibitory_floor.unwrap_or(defaults.inhibitory_floor),
        }
    }
}

/// One `[[projections]]` entry: potential connectivity between two layers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub from: String,
    pub to: String,
    /// Chance that a pair is wired when initial connectivity is seeded
    pub initial_probability: f64,
    pub initial_weight: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            initial_probability: 0.0,
            initial_weight: 1.0,
        }
    }
}

/// Initial wiring
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WiringConfig {
    pub seed: u64,
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}
