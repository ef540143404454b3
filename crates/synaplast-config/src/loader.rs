// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)
//!
//! The merged result is validated before it is returned.

use crate::{validate_config, ConfigError, ConfigResult, SynaplastConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "synaplast.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `SYNAPLAST_CONFIG_PATH` environment variable
/// 2. Current working directory: `./synaplast.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("SYNAPLAST_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by SYNAPLAST_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet SYNAPLAST_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Parse and validate configuration text without touching the environment
pub fn parse_config(content: &str) -> ConfigResult<SynaplastConfig> {
    let config: SynaplastConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SynaplastConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: SynaplastConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate_config(&config)?;
    Ok(config)
}

fn parse_bool(value: &str) -> bool {
    let lowered = value.to_lowercase();
    lowered == "true" || lowered == "1" || lowered == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SYNAPLAST_LEARNING_RATE` -> `learning.learning_rate`
/// - `SYNAPLAST_BACKWARD_LEARNING_RATE` -> `learning.backward_learning_rate`
/// - `SYNAPLAST_SATURATION_CAP` -> `learning.saturation_cap`
/// - `SYNAPLAST_HISTORY_CAPACITY` -> `history.capacity`
/// - `SYNAPLAST_MAX_AGE_US` -> `history.max_age_us`
/// - `SYNAPLAST_MAX_PAIRS` -> `history.max_pairs`
/// - `SYNAPLAST_WIRING_SEED` -> `wiring.seed`
/// - `SYNAPLAST_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut SynaplastConfig) {
    // Learning
    if let Ok(value) = env::var("SYNAPLAST_LEARNING_RATE") {
        if let Ok(rate) = value.parse::<f64>() {
            config.learning.learning_rate = rate;
        }
    }
    if let Ok(value) = env::var("SYNAPLAST_BACKWARD_LEARNING_RATE") {
        if let Ok(rate) = value.parse::<f64>() {
            config.learning.backward_learning_rate = rate;
        }
    }
    if let Ok(value) = env::var("SYNAPLAST_SATURATION_CAP") {
        if let Ok(cap) = value.parse::<f64>() {
            config.learning.saturation_cap = cap;
        }
    }

    // History
    if let Ok(value) = env::var("SYNAPLAST_HISTORY_CAPACITY") {
        if let Ok(capacity) = value.parse::<usize>() {
            config.history.capacity = capacity;
        }
    }
    if let Ok(value) = env::var("SYNAPLAST_MAX_AGE_US") {
        if let Ok(age) = value.parse::<u64>() {
            config.history.max_age_us = age;
        }
    }
    if let Ok(value) = env::var("SYNAPLAST_MAX_PAIRS") {
        if let Ok(pairs) = value.parse::<usize>() {
            config.history.max_pairs = pairs;
        }
    }

    if let Ok(value) = env::var("SYNAPLAST_WIRING_SEED") {
        if let Ok(seed) = value.parse::<u64>() {
            config.wiring.seed = seed;
        }
    }
    if let Ok(value) = env::var("SYNAPLAST_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"learning_rate": "0.5", "max_pairs": "64"}`)
pub fn apply_cli_overrides(config: &mut SynaplastConfig, cli_args: &HashMap<String, String>) {
    // Learning
    if let Some(value) = cli_args.get("learning_rate") {
        if let Ok(rate) = value.parse::<f64>() {
            config.learning.learning_rate = rate;
        }
    }
    if let Some(value) = cli_args.get("backward_learning_rate") {
        if let Ok(rate) = value.parse::<f64>() {
            config.learning.backward_learning_rate = rate;
        }
    }
    if let Some(value) = cli_args.get("saturation_cap") {
        if let Ok(cap) = value.parse::<f64>() {
            config.learning.saturation_cap = cap;
        }
    }
    if let Some(value) = cli_args.get("recruitment") {
        config.learning.recruitment = parse_bool(value);
    }

    // History
    if let Some(value) = cli_args.get("history_capacity") {
        if let Ok(capacity) = value.parse::<usize>() {
            config.history.capacity = capacity;
        }
    }
    if let Some(value) = cli_args.get("max_age_us") {
        if let Ok(age) = value.parse::<u64>() {
            config.history.max_age_us = age;
        }
    }
    if let Some(value) = cli_args.get("max_pairs") {
        if let Ok(pairs) = value.parse::<usize>() {
            config.history.max_pairs = pairs;
        }
    }
    if let Some(value) = cli_args.get("min_isi_us") {
        if let Ok(isi) = value.parse::<u64>() {
            config.history.min_isi_us = isi;
        }
    }

    if let Some(value) = cli_args.get("wiring_seed") {
        if let Ok(seed) = value.parse::<u64>() {
            config.wiring.seed = seed;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_minimal_config(path: &Path) {
        let mut file = File::create(path).unwrap();
        writeln!(file, "[learning]").unwrap();
        writeln!(file, "learning_rate = 0.5").unwrap();
        writeln!(file, "[history]").unwrap();
        writeln!(file, "max_pairs = 32").unwrap();
        writeln!(file, "[[layers]]").unwrap();
        writeln!(file, "name = \"input\"").unwrap();
        writeln!(file, "kind = \"input\"").unwrap();
        writeln!(file, "width = 8").unwrap();
        writeln!(file, "height = 8").unwrap();
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("SYNAPLAST_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("SYNAPLAST_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("SYNAPLAST_CONFIG_PATH", "/definitely/not/here/synaplast.toml");
        let result = find_config_file();
        env::remove_var("SYNAPLAST_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved_rate = env::var("SYNAPLAST_LEARNING_RATE").ok();
        env::remove_var("SYNAPLAST_LEARNING_RATE");

        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        write_minimal_config(&config_path);

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.learning.learning_rate, 0.5);
        assert_eq!(config.history.max_pairs, 32);
        assert_eq!(config.history.capacity, 20_000);
        assert_eq!(config.layers.len(), 1);

        if let Some(value) = saved_rate {
            env::set_var("SYNAPLAST_LEARNING_RATE", value);
        }
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[defaults]").unwrap();
        writeln!(file, "slot_capacity = 0").unwrap();
        writeln!(file, "[[layers]]").unwrap();
        writeln!(file, "name = \"input\"").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = SynaplastConfig::default();

        env::set_var("SYNAPLAST_LEARNING_RATE", "3.5");
        env::set_var("SYNAPLAST_MAX_PAIRS", "not-a-number");
        env::set_var("SYNAPLAST_WIRING_SEED", "7");

        apply_environment_overrides(&mut config);

        env::remove_var("SYNAPLAST_LEARNING_RATE");
        env::remove_var("SYNAPLAST_MAX_PAIRS");
        env::remove_var("SYNAPLAST_WIRING_SEED");

        assert_eq!(config.learning.learning_rate, 3.5);
        assert_eq!(config.history.max_pairs, 256);
        assert_eq!(config.wiring.seed, 7);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = SynaplastConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("max_age_us".to_string(), "500".to_string());
        cli_args.insert("recruitment".to_string(), "no".to_string());
        cli_args.insert("log_level".to_string(), "debug".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.history.max_age_us, 500);
        assert!(!config.learning.recruitment);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        // CLI overrides take precedence over environment variables
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        write_minimal_config(&config_path);

        env::set_var("SYNAPLAST_LEARNING_RATE", "2.0");
        env::set_var("SYNAPLAST_MAX_PAIRS", "48");

        let mut cli_args = HashMap::new();
        cli_args.insert("learning_rate".to_string(), "4.0".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("SYNAPLAST_LEARNING_RATE");
        env::remove_var("SYNAPLAST_MAX_PAIRS");

        assert_eq!(config.learning.learning_rate, 4.0);
        assert_eq!(config.history.max_pairs, 48);
    }
}
