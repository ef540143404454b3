// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # synaplast Neural Types
//!
//! Hardware-facing vocabulary shared by every other crate:
//! - **Types**: `NeuronAddress`, `LayerKind`, `LayerShape`, `SynapseClass`, `ClassThresholds`
//! - **Topology**: the bijection between `(layer, flat index)` and hardware addresses
//!
//! Addresses follow a chip / core / row / column geometry of 16 chips, 4 cores
//! per chip and 16x16 neurons per core.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod topology;
pub mod types;

pub use topology::{Layer, ResolvedNeuron, TopologyIndex};
pub use types::{
    ClassThresholds, LayerId, LayerKind, LayerPlacement, LayerShape, LayerSpec, NeuronAddress,
    SynapseClass, TopologyError, CORES_PER_CHIP, MAX_CHIPS, NEURONS_PER_CORE,
};
