// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hardware neuron addresses

use core::fmt;

use serde::{Deserialize, Serialize};

use super::error::TopologyError;

/// Neurons along one side of a core
pub const CORE_SIDE: u8 = 16;

/// Neurons per core (16x16 grid)
pub const NEURONS_PER_CORE: u16 = 256;

/// Cores per chip
pub const CORES_PER_CHIP: u8 = 4;

/// Chips addressable by the 4-bit chip field
pub const MAX_CHIPS: u8 = 16;

const FLAT_ADDRESS_BITS: u32 = 14;

/// Location of one neuron on the hardware array
///
/// Flat form packs as `chip << 10 | core << 8 | row << 4 | column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeuronAddress {
    pub chip: u8,
    pub core: u8,
    pub row: u8,
    pub column: u8,
}

impl NeuronAddress {
    /// Build an address, checking every field against the hardware geometry
    pub fn new(chip: u8, core: u8, row: u8, column: u8) -> Result<Self, TopologyError> {
        if chip >= MAX_CHIPS || core >= CORES_PER_CHIP || row >= CORE_SIDE || column >= CORE_SIDE {
            return Err(TopologyError::AddressOutOfRange {
                chip,
                core,
                row,
                column,
            });
        }
        Ok(Self {
            chip,
            core,
            row,
            column,
        })
    }

    /// Build an address from a neuron number within its core (0..256)
    pub fn from_core_neuron(chip: u8, core: u8, neuron: u16) -> Result<Self, TopologyError> {
        if neuron >= NEURONS_PER_CORE {
            return Err(TopologyError::AddressOutOfRange {
                chip,
                core,
                row: u8::MAX,
                column: u8::MAX,
            });
        }
        Self::new(
            chip,
            core,
            (neuron / CORE_SIDE as u16) as u8,
            (neuron % CORE_SIDE as u16) as u8,
        )
    }

    /// Neuron number within the core
    #[inline]
    pub const fn core_neuron(&self) -> u16 {
        self.row as u16 * CORE_SIDE as u16 + self.column as u16
    }

    #[inline]
    pub const fn to_flat(self) -> u32 {
        (self.chip as u32) << 10 | (self.core as u32) << 8 | (self.row as u32) << 4 | self.column as u32
    }

    pub fn from_flat(flat: u32) -> Result<Self, TopologyError> {
        if flat >> FLAT_ADDRESS_BITS != 0 {
            return Err(TopologyError::InvalidFlatAddress(flat));
        }
        Ok(Self {
            chip: ((flat >> 10) & 0xf) as u8,
            core: ((flat >> 8) & 0x3) as u8,
            row: ((flat >> 4) & 0xf) as u8,
            column: (flat & 0xf) as u8,
        })
    }
}

impl fmt::Display for NeuronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "U{}.C{}.N{}",
            self.chip,
            self.core,
            self.core_neuron()
        )
    }
}

impl TryFrom<u32> for NeuronAddress {
    type Error = TopologyError;

    fn try_from(flat: u32) -> Result<Self, Self::Error> {
        Self::from_flat(flat)
    }
}

impl From<NeuronAddress> for u32 {
    fn from(address: NeuronAddress) -> Self {
        address.to_flat()
    }
}
