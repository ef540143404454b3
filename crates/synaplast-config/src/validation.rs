//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent, within valid ranges, and don't conflict with each other.

use std::collections::HashSet;

use crate::{ConfigError, ConfigResult, LayerProfileConfig, SynaplastConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];

/// Largest accepted `history.capacity` (records held by the spike history)
pub const MAX_HISTORY_CAPACITY: usize = 1 << 24;

/// Largest accepted `history.max_age_us`; the decay table holds one entry per microsecond
pub const MAX_AGE_US: u64 = 10_000_000;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    NonPositiveCapacity { field: String },
    InvertedThresholds { field: String, reason: String },
    DuplicateLayer { name: String },
    UnknownLayer { field: String, name: String },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveCapacity { field } => {
                write!(f, "{} must be greater than zero", field)
            }
            Self::InvertedThresholds { field, reason } => {
                write!(f, "Thresholds {} are inverted: {}", field, reason)
            }
            Self::DuplicateLayer { name } => {
                write!(f, "Layer '{}' is declared more than once", name)
            }
            Self::UnknownLayer { field, name } => {
                write!(f, "{} references unknown layer '{}'", field, name)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Positive capacities and scan bounds
/// - Threshold ordering for both signs
/// - Decay table coverage of the delay window
/// - Unique layer names and resolvable projections
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &SynaplastConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_learning(config, &mut errors);
    validate_history(config, &mut errors);
    validate_decay(config, &mut errors);
    validate_profile("defaults", &config.defaults, &mut errors);
    validate_layers(config, &mut errors);
    validate_projections(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn require_finite(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() {
        errors.push(ConfigValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} is not a finite number", value),
        });
    }
}

fn validate_learning(config: &SynaplastConfig, errors: &mut Vec<ConfigValidationError>) {
    let learning = &config.learning;
    for (field, value) in [
        ("learning.learning_rate", learning.learning_rate),
        ("learning.backward_learning_rate", learning.backward_learning_rate),
    ] {
        require_finite(field, value, errors);
        if value < 0.0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
    }
    require_finite("learning.saturation_cap", learning.saturation_cap, errors);
    require_finite(
        "learning.recruitment_threshold",
        learning.recruitment_threshold,
        errors,
    );
}

fn validate_history(config: &SynaplastConfig, errors: &mut Vec<ConfigValidationError>) {
    let history = &config.history;
    if history.capacity == 0 {
        errors.push(ConfigValidationError::NonPositiveCapacity {
            field: "history.capacity".to_string(),
        });
    }
    if history.max_pairs == 0 {
        errors.push(ConfigValidationError::NonPositiveCapacity {
            field: "history.max_pairs".to_string(),
        });
    }
    if history.max_age_us == 0 {
        errors.push(ConfigValidationError::NonPositiveCapacity {
            field: "history.max_age_us".to_string(),
        });
    }
    if history.capacity > MAX_HISTORY_CAPACITY {
        errors.push(ConfigValidationError::InvalidValue {
            field: "history.capacity".to_string(),
            reason: format!("{} exceeds the maximum of {}", history.capacity, MAX_HISTORY_CAPACITY),
        });
    }
    if history.max_age_us > MAX_AGE_US {
        errors.push(ConfigValidationError::InvalidValue {
            field: "history.max_age_us".to_string(),
            reason: format!("{} exceeds the maximum of {}", history.max_age_us, MAX_AGE_US),
        });
    }
    if history.min_isi_us > history.max_age_us {
        errors.push(ConfigValidationError::InvalidValue {
            field: "history.min_isi_us".to_string(),
            reason: format!(
                "{} exceeds history.max_age_us ({})",
                history.min_isi_us, history.max_age_us
            ),
        });
    }
}

fn validate_decay(config: &SynaplastConfig, errors: &mut Vec<ConfigValidationError>) {
    let decay = &config.decay;
    if decay.table.is_empty() {
        if !(decay.tau_us.is_finite() && decay.tau_us > 0.0) {
            errors.push(ConfigValidationError::InvalidValue {
                field: "decay.tau_us".to_string(),
                reason: "must be a positive finite number".to_string(),
            });
        }
        return;
    }

    let required = config.history.max_age_us as usize + 1;
    if decay.table.len() < required {
        errors.push(ConfigValidationError::InvalidValue {
            field: "decay.table".to_string(),
            reason: format!(
                "has {} entries but the delay window needs {}",
                decay.table.len(),
                required
            ),
        });
    }
    if decay.table.iter().any(|v| !v.is_finite()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "decay.table".to_string(),
            reason: "contains non-finite entries".to_string(),
        });
    }
}

fn validate_profile(
    scope: &str,
    profile: &LayerProfileConfig,
    errors: &mut Vec<ConfigValidationError>,
) {
    if profile.slot_capacity == 0 {
        errors.push(ConfigValidationError::NonPositiveCapacity {
            field: format!("{}.slot_capacity", scope),
        });
    }
    require_finite(&format!("{}.multiplier", scope), profile.multiplier, errors);

    let t = &profile.thresholds;
    if !(0.0 <= t.slow_excitatory && t.slow_excitatory < t.fast_excitatory) {
        errors.push(ConfigValidationError::InvertedThresholds {
            field: format!("{}.thresholds", scope),
            reason: format!(
                "expected 0 <= slow_excitatory ({}) < fast_excitatory ({})",
                t.slow_excitatory, t.fast_excitatory
            ),
        });
    }
    if !(t.fast_inhibitory < t.slow_inhibitory && t.slow_inhibitory <= 0.0) {
        errors.push(ConfigValidationError::InvertedThresholds {
            field: format!("{}.thresholds", scope),
            reason: format!(
                "expected fast_inhibitory ({}) < slow_inhibitory ({}) <= 0",
                t.fast_inhibitory, t.slow_inhibitory
            ),
        });
    }

    if !(profile.excitatory_ceiling.is_finite() && profile.excitatory_ceiling > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: format!("{}.excitatory_ceiling", scope),
            reason: "must be a positive finite number".to_string(),
        });
    }
    if !(profile.inhibitory_floor.is_finite() && profile.inhibitory_floor < 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: format!("{}.inhibitory_floor", scope),
            reason: "must be a negative finite number".to_string(),
        });
    }
}

fn validate_layers(config: &SynaplastConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.layers.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "layers".to_string(),
        });
        return;
    }

    let mut seen = HashSet::new();
    for (i, layer) in config.layers.iter().enumerate() {
        if layer.name.is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: format!("layers[{}].name", i),
            });
        } else if !seen.insert(layer.name.as_str()) {
            errors.push(ConfigValidationError::DuplicateLayer {
                name: layer.name.clone(),
            });
        }

        if layer.width == 0 || layer.height == 0 || layer.depth == 0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: format!("layers[{}] shape", i),
                reason: format!(
                    "{}x{}x{} has no neurons",
                    layer.width, layer.height, layer.depth
                ),
            });
        }

        // Only validate overrides once they are merged with the defaults
        let scope = format!("layers.{}", layer.name);
        if layer.slot_capacity.is_some()
            || layer.multiplier.is_some()
            || layer.thresholds.is_some()
            || layer.excitatory_ceiling.is_some()
            || layer.inhibitory_floor.is_some()
        {
            validate_profile(&scope, &layer.profile(&config.defaults), errors);
        }
    }
}

fn validate_projections(config: &SynaplastConfig, errors: &mut Vec<ConfigValidationError>) {
    for (i, projection) in config.projections.iter().enumerate() {
        for (end, name) in [("from", &projection.from), ("to", &projection.to)] {
            if config.layer(name).is_none() {
                errors.push(ConfigValidationError::UnknownLayer {
                    field: format!("projections[{}].{}", i, end),
                    name: name.clone(),
                });
            }
        }
        if !(0.0..=1.0).contains(&projection.initial_probability) {
            errors.push(ConfigValidationError::InvalidValue {
                field: format!("projections[{}].initial_probability", i),
                reason: format!("{} is outside [0, 1]", projection.initial_probability),
            });
        }
        require_finite(
            &format!("projections[{}].initial_weight", i),
            projection.initial_weight,
            errors,
        );
    }
}

fn validate_logging(config: &SynaplastConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        });
    }
}
