// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for addressing and topology construction

use super::address::NeuronAddress;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("address chip={chip} core={core} row={row} column={column} is outside the hardware geometry")]
    AddressOutOfRange {
        chip: u8,
        core: u8,
        row: u8,
        column: u8,
    },

    #[error("flat address {0:#x} has bits set above the chip field")]
    InvalidFlatAddress(u32),

    #[error("layer '{layer}' has no neurons")]
    EmptyLayer { layer: String },

    #[error("layer '{layer}' is declared more than once")]
    DuplicateLayer { layer: String },

    #[error("layer '{layer}' needs {needed} neurons from core {first_core} but chip {chip} runs out of cores")]
    LayerOverflow {
        layer: String,
        chip: u8,
        first_core: u8,
        needed: usize,
    },

    #[error("address {address} is claimed by both '{first}' and '{second}'")]
    AddressAliasing {
        address: NeuronAddress,
        first: String,
        second: String,
    },

    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    #[error("index {index} is out of range for layer '{layer}' with {len} neurons")]
    InvalidIndex { layer: String, index: u32, len: usize },

    #[error("address {0} does not belong to any layer")]
    UnknownAddress(NeuronAddress),
}
