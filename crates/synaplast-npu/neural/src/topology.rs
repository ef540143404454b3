// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Topology index: `(layer, flat index)` <-> `NeuronAddress`
//!
//! Built once from declarative layer specs and read-only afterwards. Each
//! layer occupies consecutive hardware neurons beginning at its placement and
//! spilling into the following cores of the same chip. Two layers claiming the
//! same address is a construction error.

use ahash::AHashMap;

use crate::types::{
    LayerId, LayerKind, LayerSpec, NeuronAddress, TopologyError, CORES_PER_CHIP, NEURONS_PER_CORE,
};

/// One resolved layer with its address table
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: LayerId,
    pub spec: LayerSpec,
    addresses: Vec<NeuronAddress>,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> LayerKind {
        self.spec.kind
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Addresses in flat-index order
    pub fn addresses(&self) -> &[NeuronAddress] {
        &self.addresses
    }
}

/// Result of resolving an address, carried forward instead of re-deriving it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedNeuron {
    pub layer: LayerId,
    pub kind: LayerKind,
    pub index: u32,
}

#[derive(Debug, Clone, Default)]
pub struct TopologyIndex {
    layers: Vec<Layer>,
    by_name: AHashMap<String, LayerId>,
    by_address: AHashMap<NeuronAddress, ResolvedNeuron>,
}

impl TopologyIndex {
    pub fn build(specs: &[LayerSpec]) -> Result<Self, TopologyError> {
        let mut index = TopologyIndex::default();

        for spec in specs {
            if spec.shape.is_empty() {
                return Err(TopologyError::EmptyLayer {
                    layer: spec.name.clone(),
                });
            }
            if index.by_name.contains_key(&spec.name) {
                return Err(TopologyError::DuplicateLayer {
                    layer: spec.name.clone(),
                });
            }

            let id = LayerId(index.layers.len() as u16);
            let addresses = place_layer(spec)?;

            for (i, address) in addresses.iter().enumerate() {
                let resolved = ResolvedNeuron {
                    layer: id,
                    kind: spec.kind,
                    index: i as u32,
                };
                if let Some(existing) = index.by_address.insert(*address, resolved) {
                    return Err(TopologyError::AddressAliasing {
                        address: *address,
                        first: index.layers[existing.layer.0 as usize].spec.name.clone(),
                        second: spec.name.clone(),
                    });
                }
            }

            index.by_name.insert(spec.name.clone(), id);
            index.layers.push(Layer {
                id,
                spec: spec.clone(),
                addresses,
            });
        }

        Ok(index)
    }

    pub fn address_of(&self, layer: &str, index: u32) -> Result<NeuronAddress, TopologyError> {
        let layer = self
            .layer(layer)
            .ok_or_else(|| TopologyError::UnknownLayer(layer.to_string()))?;
        layer
            .addresses
            .get(index as usize)
            .copied()
            .ok_or_else(|| TopologyError::InvalidIndex {
                layer: layer.spec.name.clone(),
                index,
                len: layer.len(),
            })
    }

    /// Inverse of [`TopologyIndex::address_of`]
    pub fn index_of(&self, address: NeuronAddress) -> Result<(&str, u32), TopologyError> {
        let resolved = self
            .resolve(address)
            .ok_or(TopologyError::UnknownAddress(address))?;
        Ok((self.layers[resolved.layer.0 as usize].name(), resolved.index))
    }

    #[inline]
    pub fn resolve(&self, address: NeuronAddress) -> Option<ResolvedNeuron> {
        self.by_address.get(&address).copied()
    }

    /// Layer owning `address`
    pub fn layer_of(&self, address: NeuronAddress) -> Option<&Layer> {
        self.resolve(address)
            .map(|resolved| &self.layers[resolved.layer.0 as usize])
    }

    /// Addresses of the named layer in flat-index order
    pub fn addresses(&self, layer: &str) -> Option<&[NeuronAddress]> {
        self.layer(layer).map(Layer::addresses)
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.by_name.get(name).map(|id| &self.layers[id.0 as usize])
    }

    pub fn layer_id(&self, name: &str) -> Option<LayerId> {
        self.by_name.get(name).copied()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Total number of addressed neurons
    pub fn neuron_count(&self) -> usize {
        self.by_address.len()
    }
}

fn place_layer(spec: &LayerSpec) -> Result<Vec<NeuronAddress>, TopologyError> {
    let placement = spec.placement;
    let needed = spec.shape.len();
    let overflow = || TopologyError::LayerOverflow {
        layer: spec.name.clone(),
        chip: placement.chip,
        first_core: placement.first_core,
        needed,
    };

    let start = placement.first_core as usize * NEURONS_PER_CORE as usize
        + placement.first_neuron as usize;
    let end = start + needed;
    if placement.first_neuron >= NEURONS_PER_CORE
        || end > CORES_PER_CHIP as usize * NEURONS_PER_CORE as usize
    {
        return Err(overflow());
    }

    (start..end)
        .map(|slot| {
            let core = (slot / NEURONS_PER_CORE as usize) as u8;
            let neuron = (slot % NEURONS_PER_CORE as usize) as u16;
            NeuronAddress::from_core_neuron(placement.chip, core, neuron)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LayerPlacement, LayerShape};

    fn spec(name: &str, kind: LayerKind, len: u32, chip: u8, core: u8, neuron: u16) -> LayerSpec {
        LayerSpec {
            name: name.to_string(),
            kind,
            shape: LayerShape::new(len, 1, 1),
            placement: LayerPlacement {
                chip,
                first_core: core,
                first_neuron: neuron,
            },
        }
    }

    #[test]
    fn test_bijection_across_layers() {
        let topology = TopologyIndex::build(&[
            spec("input", LayerKind::Input, 300, 1, 0, 0),
            spec("feature", LayerKind::Feature1, 64, 1, 2, 0),
            spec("output", LayerKind::Output, 4, 2, 3, 0),
        ])
        .unwrap();

        assert_eq!(topology.neuron_count(), 368);
        for layer in topology.layers() {
            for i in 0..layer.len() as u32 {
                let address = topology.address_of(layer.name(), i).unwrap();
                assert_eq!(topology.index_of(address).unwrap(), (layer.name(), i));
            }
        }

        // input spills from core 0 into core 1
        let spilled = topology.address_of("input", 256).unwrap();
        assert_eq!((spilled.chip, spilled.core, spilled.core_neuron()), (1, 1, 0));
    }

    #[test]
    fn test_resolve_carries_layer_kind() {
        let topology =
            TopologyIndex::build(&[spec("output", LayerKind::Output, 4, 3, 3, 8)]).unwrap();
        let address = topology.address_of("output", 2).unwrap();
        assert_eq!(address.core_neuron(), 10);

        let resolved = topology.resolve(address).unwrap();
        assert_eq!(resolved.kind, LayerKind::Output);
        assert_eq!(resolved.index, 2);
        assert_eq!(topology.layer_id("output"), Some(resolved.layer));
    }

    #[test]
    fn test_aliasing_is_fatal() {
        let err = TopologyIndex::build(&[
            spec("a", LayerKind::Input, 10, 1, 0, 0),
            spec("b", LayerKind::Feature1, 10, 1, 0, 5),
        ])
        .unwrap_err();
        match err {
            TopologyError::AddressAliasing { first, second, .. } => {
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_layer_overflow_and_empty_layer() {
        assert!(matches!(
            TopologyIndex::build(&[spec("big", LayerKind::Input, 300, 0, 3, 0)]),
            Err(TopologyError::LayerOverflow { .. })
        ));
        assert!(matches!(
            TopologyIndex::build(&[spec("none", LayerKind::Input, 0, 0, 0, 0)]),
            Err(TopologyError::EmptyLayer { .. })
        ));
        assert!(matches!(
            TopologyIndex::build(&[
                spec("x", LayerKind::Input, 1, 0, 0, 0),
                spec("x", LayerKind::Input, 1, 0, 1, 0),
            ]),
            Err(TopologyError::DuplicateLayer { .. })
        ));
    }

    #[test]
    fn test_lookup_failures() {
        let topology = TopologyIndex::build(&[spec("in", LayerKind::Input, 4, 0, 0, 0)]).unwrap();
        assert!(matches!(
            topology.address_of("in", 4),
            Err(TopologyError::InvalidIndex { index: 4, len: 4, .. })
        ));
        assert!(matches!(
            topology.address_of("missing", 0),
            Err(TopologyError::UnknownLayer(_))
        ));
        let stray = NeuronAddress::new(5, 0, 0, 0).unwrap();
        assert_eq!(topology.index_of(stray), Err(TopologyError::UnknownAddress(stray)));
        assert!(topology.resolve(stray).is_none());
        assert!(topology.layer_of(stray).is_none());

        let first = topology.addresses("in").unwrap()[0];
        assert_eq!(topology.layer_of(first).map(Layer::name), Some("in"));
        assert!(topology.addresses("missing").is_none());
    }
}
