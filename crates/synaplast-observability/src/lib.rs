// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # synaplast-observability
//!
//! Logging setup shared by the synaplast crates and tools, with per-crate
//! debug flag support.
//!
//! ## Features
//! - `file-logging`: timestamped run folders with per-crate JSON log files

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use config::*;
pub use init::*;

/// Known synaplast crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &["synaplast-npu-plasticity", "synaplast"];

/// `tracing` target each known crate logs under
pub fn crate_target(crate_name: &str) -> Option<&'static str> {
    match crate_name {
        "synaplast-npu-plasticity" => Some("plasticity"),
        "synaplast" => Some("replay"),
        _ => None,
    }
}
