// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration for the learning engine
//!
//! `EngineConfig` is the validated, engine-facing form of a loaded
//! [`SynaplastConfig`]. It can also be assembled directly in code.

use synaplast_config::{
    validate_config, SynaplastConfig, ThresholdsConfig, MAX_AGE_US, MAX_HISTORY_CAPACITY,
};
use synaplast_npu_neural::{
    ClassThresholds, LayerPlacement, LayerShape, LayerSpec, TopologyIndex,
};

use crate::error::{PlasticityError, PlasticityResult};
use crate::stdp::DecayLut;

/// Learning rule parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LearningParams {
    pub learning_rate: f64,
    /// Depression applied to the reverse connection; 0 disables it
    pub backward_learning_rate: f64,
    pub saturation_cap: f64,
    pub recruitment: bool,
    pub recruitment_threshold: f64,
    pub release_on_none: bool,
}

impl Default for LearningParams {
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

/// Backward-scan bounds and pairing window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanBounds {
    /// Upper end of the pairing window; also the decay table span
    pub max_age_us: u64,
    pub max_pairs: usize,
    /// Pairs closer than this are skipped
    pub min_isi_us: u64,
}

impl Default for ScanBounds {
    fn default() -> Self {
        Self {
            max_age_us: 1_000,
            max_pairs: 256,
            min_isi_us: 10,
        }
    }
}

/// Per-layer record looked up once per destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerProfile {
    pub slot_capacity: usize,
    pub multiplier: f64,
    pub thresholds: ClassThresholds,
    pub excitatory_ceiling: f64,
    pub inhibitory_floor: f64,
}

impl Default for LayerProfile {
    fn default() -> Self {
        Self {
            slot_capacity: 64,
            multiplier: 1.0,
            thresholds: ClassThresholds::default(),
            excitatory_ceiling: 100.0,
            inhibitory_floor: -100.0,
        }
    }
}

/// A layer and the profile its destinations learn with
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSetup {
    pub spec: LayerSpec,
    pub profile: LayerProfile,
}

/// Potential connectivity from one layer onto another
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub from: String,
    pub to: String,
    pub initial_probability: f64,
    pub initial_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub layers: Vec<LayerSetup>,
    pub projections: Vec<Projection>,
    pub learning: LearningParams,
    pub scan: ScanBounds,
    pub history_capacity: usize,
    pub decay: DecayLut,
    pub wiring_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let scan = ScanBounds::default();
        Self {
            layers: Vec::new(),
            projections: Vec::new(),
            learning: LearningParams::default(),
            decay: DecayLut::exponential(scan.max_age_us, 1_000.0),
            scan,
            history_capacity: 20_000,
            wiring_seed: 42,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine must refuse to start with
    ///
    /// Address aliasing is reported when the topology is built.
    pub fn validate(&self) -> PlasticityResult<()> {
        let invalid = |msg: String| Err(PlasticityError::InvalidConfig(msg));

        if self.history_capacity == 0 {
            return invalid("history capacity must be > 0".to_string());
        }
        if self.history_capacity > MAX_HISTORY_CAPACITY {
            return invalid(format!(
                "history capacity {} exceeds the maximum of {}",
                self.history_capacity, MAX_HISTORY_CAPACITY
            ));
        }
        if self.scan.max_age_us > MAX_AGE_US {
            return invalid(format!(
                "max_age_us {} exceeds the maximum of {}",
                self.scan.max_age_us, MAX_AGE_US
            ));
        }
        if self.scan.max_pairs == 0 || self.scan.max_age_us == 0 {
            return invalid("scan bounds must be > 0".to_string());
        }
        if self.scan.min_isi_us > self.scan.max_age_us {
            return invalid(format!(
                "min_isi_us {} exceeds max_age_us {}",
                self.scan.min_isi_us, self.scan.max_age_us
            ));
        }
        if !self.decay.covers(self.scan.max_age_us) {
            return invalid(format!(
                "decay table has {} entries, window needs {}",
                self.decay.len(),
                self.scan.max_age_us + 1
            ));
        }
        let l = &self.learning;
        if !(l.learning_rate.is_finite() && l.learning_rate >= 0.0)
            || !(l.backward_learning_rate.is_finite() && l.backward_learning_rate >= 0.0)
            || !l.saturation_cap.is_finite()
            || !l.recruitment_threshold.is_finite()
        {
            return invalid("learning parameters must be finite and rates non-negative".to_string());
        }

        for setup in &self.layers {
            let name = &setup.spec.name;
            let p = &setup.profile;
            if p.slot_capacity == 0 {
                return invalid(format!("layer '{}' has non-positive slot capacity", name));
            }
            if !p.thresholds.is_valid() {
                return invalid(format!("layer '{}' has inverted thresholds", name));
            }
            if !(p.excitatory_ceiling.is_finite() && p.excitatory_ceiling > 0.0)
                || !(p.inhibitory_floor.is_finite() && p.inhibitory_floor < 0.0)
                || !p.multiplier.is_finite()
            {
                return invalid(format!("layer '{}' has invalid weight bounds", name));
            }
        }

        for projection in &self.projections {
            for end in [&projection.from, &projection.to] {
                if !self.layers.iter().any(|s| &s.spec.name == end) {
                    return invalid(format!("projection references unknown layer '{}'", end));
                }
            }
            if !(0.0..=1.0).contains(&projection.initial_probability)
                || !projection.initial_weight.is_finite()
            {
                return invalid(format!(
                    "projection {} -> {} has invalid initial wiring",
                    projection.from, projection.to
                ));
            }
        }

        Ok(())
    }

    pub fn build_topology(&self) -> PlasticityResult<TopologyIndex> {
        let specs: Vec<LayerSpec> = self.layers.iter().map(|s| s.spec.clone()).collect();
        Ok(TopologyIndex::build(&specs)?)
    }

    /// Whether `other` can be applied without rebuilding the engine's state
    pub fn structure_matches(&self, other: &EngineConfig) -> bool {
        self.history_capacity == other.history_capacity
            && self.layers.len() == other.layers.len()
            && self
                .layers
                .iter()
                .zip(&other.layers)
                .all(|(a, b)| a.spec == b.spec && a.profile.slot_capacity == b.profile.slot_capacity)
            && self.projections.len() == other.projections.len()
            && self
                .projections
                .iter()
                .zip(&other.projections)
                .all(|(a, b)| a.from == b.from && a.to == b.to)
    }
}

fn thresholds(t: &ThresholdsConfig) -> ClassThresholds {
    ClassThresholds {
        slow_excitatory: t.slow_excitatory,
        fast_excitatory: t.fast_excitatory,
        slow_inhibitory: t.slow_inhibitory,
        fast_inhibitory: t.fast_inhibitory,
    }
}

impl TryFrom<&SynaplastConfig> for EngineConfig {
    type Error = PlasticityError;

    fn try_from(config: &SynaplastConfig) -> Result<Self, Self::Error> {
        validate_config(config)?;

        let layers = config
            .layers
            .iter()
            .map(|layer| {
                let profile = layer.profile(&config.defaults);
                LayerSetup {
                    spec: LayerSpec {
                        name: layer.name.clone(),
                        kind: layer.kind,
                        shape: LayerShape::new(layer.width, layer.height, layer.depth),
                        placement: LayerPlacement {
                            chip: layer.chip,
                            first_core: layer.first_core,
                            first_neuron: layer.first_neuron,
                        },
                    },
                    profile: LayerProfile {
                        slot_capacity: profile.slot_capacity,
                        multiplier: profile.multiplier,
                        thresholds: thresholds(&profile.thresholds),
                        excitatory_ceiling: profile.excitatory_ceiling,
                        inhibitory_floor: profile.inhibitory_floor,
                    },
                }
            })
            .collect();

        let projections = config
            .projections
            .iter()
            .map(|p| Projection {
                from: p.from.clone(),
                to: p.to.clone(),
                initial_probability: p.initial_probability,
                initial_weight: p.initial_weight,
            })
            .collect();

        let decay = if config.decay.table.is_empty() {
            DecayLut::exponential(config.history.max_age_us, config.decay.tau_us)
        } else {
            DecayLut::from_table(config.decay.table.clone())
        };

        let engine_config = EngineConfig {
            layers,
            projections,
            learning: LearningParams {
                learning_rate: config.learning.learning_rate,
                backward_learning_rate: config.learning.backward_learning_rate,
                saturation_cap: config.learning.saturation_cap,
                recruitment: config.learning.recruitment,
                recruitment_threshold: config.learning.recruitment_threshold,
                release_on_none: config.learning.release_on_none,
            },
            scan: ScanBounds {
                max_age_us: config.history.max_age_us,
                max_pairs: config.history.max_pairs,
                min_isi_us: config.history.min_isi_us,
            },
            history_capacity: config.history.capacity,
            decay,
            wiring_seed: config.wiring.seed,
        };
        engine_config.validate()?;
        Ok(engine_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synaplast_config::{parse_config, LayerKind};

    const TOML: &str = r#"
        [history]
        max_age_us = 500
        min_isi_us = 5

        [defaults]
        slot_capacity = 12

        [[layers]]
        name = "input"
        kind = "input"
        chip = 1
        width = 16
        height = 16

        [[layers]]
        name = "output"
        kind = "output"
        chip = 1
        first_core = 3
        width = 4
        multiplier = 0.5

        [[projections]]
        from = "input"
        to = "output"
        initial_probability = 0.1
    "#;

    #[test]
    fn test_from_loaded_config() {
        let loaded = parse_config(TOML).unwrap();
        let config = EngineConfig::try_from(&loaded).unwrap();

        assert_eq!(config.layers.len(), 2);
        assert_eq!(config.layers[1].spec.kind, LayerKind::Output);
        assert_eq!(config.layers[1].profile.multiplier, 0.5);
        assert_eq!(config.layers[1].profile.slot_capacity, 12);
        assert_eq!(config.scan.max_age_us, 500);
        assert_eq!(config.decay.len(), 501);
        assert!(config.build_topology().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let loaded = parse_config(TOML).unwrap();
        let mut config = EngineConfig::try_from(&loaded).unwrap();
        config.layers[0].profile.thresholds.fast_excitatory = 0.5;
        assert!(matches!(
            config.validate(),
            Err(PlasticityError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let loaded = parse_config(TOML).unwrap();
        let mut config = EngineConfig::try_from(&loaded).unwrap();
        config.layers[1].profile.slot_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_history_is_refused_before_allocation() {
        let oversized = TOML.replace(
            "max_age_us = 500",
            "max_age_us = 1000000000000\ncapacity = 1099511627776",
        );
        assert!(parse_config(&oversized).is_err());

        let mut loaded = parse_config(TOML).unwrap();
        loaded.history.max_age_us = 1_000_000_000_000;
        assert!(matches!(
            EngineConfig::try_from(&loaded),
            Err(PlasticityError::Config(_))
        ));

        let mut config = EngineConfig::try_from(&parse_config(TOML).unwrap()).unwrap();
        config.history_capacity = MAX_HISTORY_CAPACITY + 1;
        assert!(matches!(
            config.validate(),
            Err(PlasticityError::InvalidConfig(_))
        ));
        config.history_capacity = MAX_HISTORY_CAPACITY;
        config.scan.max_age_us = MAX_AGE_US + 1;
        assert!(matches!(
            config.validate(),
            Err(PlasticityError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_structure_matches_ignores_parameters() {
        let loaded = parse_config(TOML).unwrap();
        let config = EngineConfig::try_from(&loaded).unwrap();

        let mut tuned = config.clone();
        tuned.learning.learning_rate = 3.0;
        tuned.layers[1].profile.multiplier = 2.0;
        assert!(config.structure_matches(&tuned));

        let mut resized = config.clone();
        resized.layers[1].profile.slot_capacity = 4;
        assert!(!config.structure_matches(&resized));
    }
}
