// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console logging always goes to stderr so tools can keep stdout for data.
//! With the `file-logging` feature, each run also gets a timestamped folder of
//! per-crate JSON log files with configurable retention.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Build the `EnvFilter` for the configured level and debug flags
pub fn build_filter(
    debug_flags: &CrateDebugFlags,
    config: &LoggingConfig,
) -> Result<EnvFilter, LoggingError> {
    let filter = debug_flags.to_filter_string_with(&config.level);
    EnvFilter::try_new(&filter).map_err(|e| LoggingError::InvalidFilter {
        reason: e.to_string(),
        filter,
    })
}

/// Install a stderr console subscriber
pub fn init_console_logging(
    debug_flags: &CrateDebugFlags,
    config: &LoggingConfig,
) -> Result<(), LoggingError> {
    let filter = build_filter(debug_flags, config)?;
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(true);

    let result = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|_| LoggingError::AlreadyInitialized)
}

/// Remove run folders older than `retention_days`, then all but the newest
/// `retention_runs`. Returns how many folders were removed.
///
/// Folders not named `run_YYYYmmdd_HHMMSS` are left alone.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u64,
    retention_runs: usize,
) -> std::io::Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();

    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(stamp) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
        else {
            continue;
        };
        if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, RUN_TIMESTAMP_FORMAT) {
            runs.push((path, Utc.from_utc_datetime(&naive)));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (i, (path, started)) in runs.iter().enumerate() {
        if i < retention_runs && *started >= cutoff {
            continue;
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }

    Ok(removed)
}

#[cfg(feature = "file-logging")]
pub use file_logging::{init_logging, LoggingGuard};

#[cfg(feature = "file-logging")]
mod file_logging {
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use chrono::Utc;
    use tracing_appender::rolling;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer, Registry};

    use super::{build_filter, cleanup_old_logs, LoggingError, RUN_PREFIX, RUN_TIMESTAMP_FORMAT};
    use crate::cli::CrateDebugFlags;
    use crate::config::LoggingConfig;
    use crate::{crate_target, KNOWN_CRATES};

    /// Keeps the file writers alive; logs are flushed when dropped
    pub struct LoggingGuard {
        _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
        log_dir: PathBuf,
    }

    impl LoggingGuard {
        /// Run folder of this process
        pub fn log_dir(&self) -> &Path {
            &self.log_dir
        }
    }

    /// Initialize console logging plus per-crate file logging
    ///
    /// Creates a timestamped folder structure:
    /// ```text
    /// ./logs/
    ///   └── run_20250101_120000/
    ///       ├── synaplast-npu-plasticity.log
    ///       ├── synaplast.log
    ///       └── combined.log
    /// ```
    pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
        let timestamp = Utc::now().format(RUN_TIMESTAMP_FORMAT);
        let run_folder = config.log_dir.join(format!("{}{}", RUN_PREFIX, timestamp));
        std::fs::create_dir_all(&run_folder)
            .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

        cleanup_old_logs(&config.log_dir, config.retention_days, config.retention_runs)
            .with_context(|| format!("Failed to clean up {}", config.log_dir.display()))?;

        let env_filter = build_filter(debug_flags, config)?;
        let mut layers = Vec::new();
        let mut file_guards = Vec::new();

        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(env_filter.clone());
        layers.push(console_layer.boxed());

        // One file per crate, each filtered to that crate's target
        for crate_name in KNOWN_CRATES {
            let Some(target) = crate_target(crate_name) else {
                continue;
            };
            let file_appender = rolling::daily(&run_folder, format!("{}.log", crate_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            file_guards.push(guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(EnvFilter::new(format!("{}=debug", target)))
                .boxed();
            layers.push(file_layer);
        }

        let combined_appender = rolling::daily(&run_folder, "combined.log");
        let (combined_non_blocking, combined_guard) = tracing_appender::non_blocking(combined_appender);
        file_guards.push(combined_guard);

        let combined_layer = tracing_subscriber::fmt::layer()
            .with_writer(combined_non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(env_filter)
            .boxed();
        layers.push(combined_layer);

        Registry::default()
            .with(layers)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        Ok(LoggingGuard {
            _file_guards: file_guards,
            log_dir: run_folder,
        })
    }
}
