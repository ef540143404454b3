// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Layer descriptions used to build the topology

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of a layer in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Input,
    Feature1,
    Feature2,
    Feature3,
    Output,
}

impl LayerKind {
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Input,
        LayerKind::Feature1,
        LayerKind::Feature2,
        LayerKind::Feature3,
        LayerKind::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Input => "input",
            LayerKind::Feature1 => "feature1",
            LayerKind::Feature2 => "feature2",
            LayerKind::Feature3 => "feature3",
            LayerKind::Output => "output",
        }
    }

    pub fn is_feature(&self) -> bool {
        matches!(
            self,
            LayerKind::Feature1 | LayerKind::Feature2 | LayerKind::Feature3
        )
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown layer kind '{}'", s))
    }
}

/// Dense index of a layer inside a `TopologyIndex`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u16);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Layer({})", self.0)
    }
}

/// Declared shape; flat indices run x-fastest, then y, then z
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerShape {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl LayerShape {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of `(x, y, z)`, or `None` when outside the shape
    pub fn flat_index(&self, x: u32, y: u32, z: u32) -> Option<u32> {
        if x >= self.width || y >= self.height || z >= self.depth {
            return None;
        }
        Some((z * self.height + y) * self.width + x)
    }

    /// Inverse of [`LayerShape::flat_index`]
    pub fn coordinates(&self, index: u32) -> Option<(u32, u32, u32)> {
        if index as usize >= self.len() {
            return None;
        }
        let plane = self.width * self.height;
        let z = index / plane;
        let rem = index % plane;
        Some((rem % self.width, rem / self.width, z))
    }
}

/// Where a layer's neurons start on the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerPlacement {
    pub chip: u8,
    pub first_core: u8,
    /// Neuron number within `first_core` where the layer begins
    pub first_neuron: u16,
}

/// Declarative description of one layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub kind: LayerKind,
    pub shape: LayerShape,
    pub placement: LayerPlacement,
}
