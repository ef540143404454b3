// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the learning engine
//!
//! Only construction and reload can fail. Per-spike processing never returns
//! an error: unknown addresses are counted and admission rejections are a
//! normal outcome.

use synaplast_config::ConfigError;
use synaplast_npu_neural::{NeuronAddress, TopologyError};

#[derive(Debug, thiserror::Error)]
pub enum PlasticityError {
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("slot capacity must be > 0 (destination {destination})")]
    ZeroCapacity { destination: NeuronAddress },

    #[error("capacity {capacity} for {destination} is below its occupancy {occupied}")]
    CapacityBelowOccupancy {
        destination: NeuronAddress,
        capacity: usize,
        occupied: usize,
    },
}

pub type PlasticityResult<T> = Result<T, PlasticityError>;
