// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neural Types Module
//!
//! Core type definitions for addressing neurons and classifying synapses.

pub mod address;
pub mod error;
pub mod layer;
pub mod synapse_class;

// Re-export commonly used types
pub use address::{NeuronAddress, CORES_PER_CHIP, MAX_CHIPS, NEURONS_PER_CORE};
pub use error::TopologyError;
pub use layer::{LayerId, LayerKind, LayerPlacement, LayerShape, LayerSpec};
pub use synapse_class::{ClassThresholds, SynapseClass};
