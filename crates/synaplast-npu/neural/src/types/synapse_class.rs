// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Discrete synapse classes the hardware can represent

use core::fmt;

use serde::{Deserialize, Serialize};

/// Hardware-representable synapse strength and polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynapseClass {
    #[default]
    None,
    SlowInhib,
    FastInhib,
    SlowExcit,
    FastExcit,
}

impl SynapseClass {
    #[inline]
    pub fn is_excitatory(&self) -> bool {
        matches!(self, SynapseClass::SlowExcit | SynapseClass::FastExcit)
    }

    #[inline]
    pub fn is_inhibitory(&self) -> bool {
        matches!(self, SynapseClass::SlowInhib | SynapseClass::FastInhib)
    }

    /// Whether the slot drives its destination at all
    #[inline]
    pub fn is_connected(&self) -> bool {
        !matches!(self, SynapseClass::None)
    }
}

impl fmt::Display for SynapseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SynapseClass::None => "none",
            SynapseClass::SlowInhib => "slow_inhib",
            SynapseClass::FastInhib => "fast_inhib",
            SynapseClass::SlowExcit => "slow_excit",
            SynapseClass::FastExcit => "fast_excit",
        };
        f.write_str(name)
    }
}

/// Two thresholds per sign used to quantize a continuous weight
///
/// Valid when `0 <= slow_excitatory < fast_excitatory` and
/// `fast_inhibitory < slow_inhibitory <= 0`. Weights strictly between the two
/// slow (balance) thresholds quantize to [`SynapseClass::None`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassThresholds {
    pub slow_excitatory: f64,
    pub fast_excitatory: f64,
    pub slow_inhibitory: f64,
    pub fast_inhibitory: f64,
}

impl Default for ClassThresholds {
    fn default() -> Self {
        Self {
            slow_excitatory: 1.0,
            fast_excitatory: 10.0,
            slow_inhibitory: -1.0,
            fast_inhibitory: -10.0,
        }
    }
}

impl ClassThresholds {
    pub fn is_valid(&self) -> bool {
        0.0 <= self.slow_excitatory
            && self.slow_excitatory < self.fast_excitatory
            && self.fast_inhibitory < self.slow_inhibitory
            && self.slow_inhibitory <= 0.0
    }

    /// Map a weight to its class. Pure: same inputs always give the same class.
    pub fn classify(&self, weight: f64) -> SynapseClass {
        if weight > 0.0 {
            if weight >= self.fast_excitatory {
                SynapseClass::FastExcit
            } else if weight >= self.slow_excitatory {
                SynapseClass::SlowExcit
            } else {
                SynapseClass::None
            }
        } else if weight < 0.0 {
            if weight <= self.fast_inhibitory {
                SynapseClass::FastInhib
            } else if weight <= self.slow_inhibitory {
                SynapseClass::SlowInhib
            } else {
                SynapseClass::None
            }
        } else {
            // zero and NaN
            SynapseClass::None
        }
    }
}
