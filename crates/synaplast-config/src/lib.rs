// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # synaplast Configuration System
//!
//! Type-safe configuration loader for the learning engine with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//! - Whole-file validation with every problem reported at once
//!
//! ## Usage
//!
//! ```rust,no_run
//! use synaplast_config::{load_config, SynaplastConfig};
//!
//! // Load configuration with automatic file discovery and overrides
//! let config = load_config(None, None).expect("Failed to load config");
//!
//! println!("Learning rate: {}", config.learning.learning_rate);
//! println!("History capacity: {}", config.history.capacity);
//! ```
//!
//! Layer geometry is injected here, never hard-coded in the engine. Address
//! aliasing between layers is detected when the topology is built from this
//! configuration.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config, parse_config};

pub use types::*;
pub use validation::{validate_config, ConfigValidationError, MAX_AGE_US, MAX_HISTORY_CAPACITY};

/// Re-export for convenience
pub use serde;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_sane_sections() {
        let config = SynaplastConfig::default();
        assert!(config.history.capacity > 0);
        assert!(config.defaults.slot_capacity > 0);
        assert!(config.layers.is_empty());
    }

    #[test]
    fn test_toml_error_maps_to_parse_error() {
        let err: ConfigError = toml::from_str::<SynaplastConfig>("[learning\n")
            .unwrap_err()
            .into();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
