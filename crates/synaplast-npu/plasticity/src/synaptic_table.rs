// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Synaptic table - capacity-bounded per-destination slot arrays.
//!
//! Mirrors the limited connection memory each hardware neuron has:
//! - Every destination owns a fixed number of slots
//! - A slot holds at most one synapse `(source, weight, class)`
//! - No two occupied slots of a destination share a source
//! - A full destination admits a newcomer only by evicting its weakest slot,
//!   and only when the newcomer's weight is strictly greater
//!
//! Each destination also tracks ratcheted max/min weights that the
//! normalizer uses to rescale its slots.

use ahash::AHashMap;
use synaplast_npu_neural::{ClassThresholds, NeuronAddress, SynapseClass};

use crate::error::{PlasticityError, PlasticityResult};

/// A synapse as seen from outside the table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Synapse {
    pub source: NeuronAddress,
    pub destination: NeuronAddress,
    pub weight: f64,
    pub class: SynapseClass,
    pub slot: usize,
}

/// Stable handle to one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub destination: NeuronAddress,
    pub index: usize,
}

/// Outcome of [`SynapticTable::insert_or_replace`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// The pair already held this slot; weight and class were overwritten
    Updated(SlotRef),
    /// A free slot was taken
    Allocated(SlotRef),
    /// The weakest slot was evicted for the candidate
    Replaced { slot: SlotRef, evicted: Synapse },
    /// The destination is full and no slot is weaker than the candidate
    Rejected,
}

impl Admission {
    pub fn slot(&self) -> Option<SlotRef> {
        match self {
            Admission::Updated(slot) | Admission::Allocated(slot) => Some(*slot),
            Admission::Replaced { slot, .. } => Some(*slot),
            Admission::Rejected => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Admission::Rejected)
    }
}

/// Class transition detected by quantization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassChange {
    pub slot: SlotRef,
    pub source: NeuronAddress,
    pub previous: SynapseClass,
    pub current: SynapseClass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Slot {
    pub(crate) source: NeuronAddress,
    pub(crate) weight: f64,
    pub(crate) class: SynapseClass,
}

/// Slot array and bookkeeping for one destination neuron
#[derive(Debug, Clone)]
pub struct DestinationSlots {
    slots: Vec<Option<Slot>>,
    occupied: usize,
    pub(crate) max_weight: f64,
    pub(crate) min_weight: f64,
}

impl DestinationSlots {
    fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            occupied: 0,
            max_weight: 0.0,
            min_weight: 0.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Ratcheted (max, min) weight
    pub fn bounds(&self) -> (f64, f64) {
        (self.max_weight, self.min_weight)
    }

    #[inline]
    pub(crate) fn ratchet(&mut self, weight: f64) {
        if weight > self.max_weight {
            self.max_weight = weight;
        }
        if weight < self.min_weight {
            self.min_weight = weight;
        }
    }

    #[inline]
    fn find(&self, source: NeuronAddress) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| matches!(s, Some(slot) if slot.source == source))
    }

    /// Occupied slot with the smallest signed weight; ties go to the lowest index
    fn weakest(&self) -> Option<(usize, Slot)> {
        let mut weakest: Option<(usize, Slot)> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(slot) = slot {
                match weakest {
                    Some((_, w)) if w.weight <= slot.weight => {}
                    _ => weakest = Some((i, *slot)),
                }
            }
        }
        weakest
    }

    pub(crate) fn occupied_slots(&self) -> impl Iterator<Item = (usize, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    pub(crate) fn occupied_slots_mut(&mut self) -> impl Iterator<Item = (usize, &mut Slot)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|s| (i, s)))
    }
}

#[derive(Debug, Clone)]
pub struct SynapticTable {
    destinations: AHashMap<NeuronAddress, DestinationSlots>,
    capacities: AHashMap<NeuronAddress, usize>,
    default_capacity: usize,
    synapse_count: usize,
}

impl SynapticTable {
    /// Create a table whose unregistered destinations get `default_capacity` slots
    pub fn new(default_capacity: usize) -> PlasticityResult<Self> {
        if default_capacity == 0 {
            return Err(PlasticityError::InvalidConfig(
                "default slot capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            destinations: AHashMap::new(),
            capacities: AHashMap::new(),
            default_capacity,
            synapse_count: 0,
        })
    }

    /// Fix the slot capacity of one destination
    pub fn register_destination(
        &mut self,
        destination: NeuronAddress,
        capacity: usize,
    ) -> PlasticityResult<()> {
        if capacity == 0 {
            return Err(PlasticityError::ZeroCapacity { destination });
        }
        if let Some(slots) = self.destinations.get_mut(&destination) {
            if slots.occupied_slots().any(|(i, _)| i >= capacity) {
                return Err(PlasticityError::CapacityBelowOccupancy {
                    destination,
                    capacity,
                    occupied: slots.occupied,
                });
            }
            slots.slots.resize(capacity, None);
        }
        self.capacities.insert(destination, capacity);
        Ok(())
    }

    pub fn capacity_of(&self, destination: NeuronAddress) -> usize {
        self.capacities
            .get(&destination)
            .copied()
            .unwrap_or(self.default_capacity)
    }

    pub fn occupancy(&self, destination: NeuronAddress) -> usize {
        self.destinations
            .get(&destination)
            .map_or(0, |d| d.occupied)
    }

    /// Ratcheted (max, min) weight of a destination
    pub fn bounds(&self, destination: NeuronAddress) -> Option<(f64, f64)> {
        self.destinations.get(&destination).map(|d| d.bounds())
    }

    /// Address-to-slot translation
    pub fn slot_of(&self, source: NeuronAddress, destination: NeuronAddress) -> Option<SlotRef> {
        let slots = self.destinations.get(&destination)?;
        slots.find(source).map(|index| SlotRef { destination, index })
    }

    pub fn lookup(&self, source: NeuronAddress, destination: NeuronAddress) -> Option<Synapse> {
        self.slot_of(source, destination).and_then(|slot| self.get(slot))
    }

    pub fn get(&self, slot: SlotRef) -> Option<Synapse> {
        let s = self
            .destinations
            .get(&slot.destination)?
            .slots
            .get(slot.index)?
            .as_ref()?;
        Some(Synapse {
            source: s.source,
            destination: slot.destination,
            weight: s.weight,
            class: s.class,
            slot: slot.index,
        })
    }

    pub fn insert_or_replace(
        &mut self,
        source: NeuronAddress,
        destination: NeuronAddress,
        weight: f64,
        class: SynapseClass,
    ) -> Admission {
        let capacity = self.capacity_of(destination);
        let slots = self
            .destinations
            .entry(destination)
            .or_insert_with(|| DestinationSlots::new(capacity));
        let new_slot = Slot {
            source,
            weight,
            class,
        };

        if let Some(index) = slots.find(source) {
            slots.slots[index] = Some(new_slot);
            slots.ratchet(weight);
            return Admission::Updated(SlotRef { destination, index });
        }

        if slots.occupied < slots.capacity() {
            if let Some(index) = slots.slots.iter().position(Option::is_none) {
                slots.slots[index] = Some(new_slot);
                slots.occupied += 1;
                slots.ratchet(weight);
                self.synapse_count += 1;
                return Admission::Allocated(SlotRef { destination, index });
            }
        }

        match slots.weakest() {
            Some((index, evictee)) if weight > evictee.weight => {
                slots.slots[index] = Some(new_slot);
                slots.ratchet(weight);
                Admission::Replaced {
                    slot: SlotRef { destination, index },
                    evicted: Synapse {
                        source: evictee.source,
                        destination,
                        weight: evictee.weight,
                        class: evictee.class,
                        slot: index,
                    },
                }
            }
            _ => Admission::Rejected,
        }
    }

    /// Add `delta` to an existing synapse's weight; does not reclassify
    pub fn update_weight(
        &mut self,
        source: NeuronAddress,
        destination: NeuronAddress,
        delta: f64,
    ) -> Option<f64> {
        let slots = self.destinations.get_mut(&destination)?;
        let index = slots.find(source)?;
        let slot = slots.slots[index].as_mut()?;
        slot.weight += delta;
        let weight = slot.weight;
        slots.ratchet(weight);
        Some(weight)
    }

    /// Report whether the pair's class would change under `thresholds`
    pub fn reclassify(
        &self,
        source: NeuronAddress,
        destination: NeuronAddress,
        thresholds: &ClassThresholds,
    ) -> Option<ClassChange> {
        let synapse = self.lookup(source, destination)?;
        let current = thresholds.classify(synapse.weight);
        (current != synapse.class).then_some(ClassChange {
            slot: SlotRef {
                destination,
                index: synapse.slot,
            },
            source,
            previous: synapse.class,
            current,
        })
    }

    /// Persist a class; returns false if the slot is empty
    pub fn set_class(&mut self, slot: SlotRef, class: SynapseClass) -> bool {
        match self
            .destinations
            .get_mut(&slot.destination)
            .and_then(|d| d.slots.get_mut(slot.index))
        {
            Some(Some(s)) => {
                s.class = class;
                true
            }
            _ => false,
        }
    }

    /// Free a slot, returning the synapse it held
    pub fn release(&mut self, slot: SlotRef) -> Option<Synapse> {
        let synapse = self.get(slot)?;
        let slots = self.destinations.get_mut(&slot.destination)?;
        slots.slots[slot.index] = None;
        slots.occupied -= 1;
        self.synapse_count -= 1;
        Some(synapse)
    }

    /// Free every slot of `destination` whose class is `None`
    pub fn release_unconnected(&mut self, destination: NeuronAddress) -> Vec<Synapse> {
        let idle: Vec<SlotRef> = self
            .synapses(destination)
            .filter(|s| !s.class.is_connected())
            .map(|s| SlotRef {
                destination,
                index: s.slot,
            })
            .collect();
        idle.into_iter().filter_map(|slot| self.release(slot)).collect()
    }

    pub fn synapses(&self, destination: NeuronAddress) -> impl Iterator<Item = Synapse> + '_ {
        self.destinations
            .get(&destination)
            .into_iter()
            .flat_map(move |d| {
                d.occupied_slots().map(move |(i, s)| Synapse {
                    source: s.source,
                    destination,
                    weight: s.weight,
                    class: s.class,
                    slot: i,
                })
            })
    }

    /// Every occupied synapse, in no particular destination order
    pub fn iter(&self) -> impl Iterator<Item = Synapse> + '_ {
        self.destinations
            .keys()
            .flat_map(move |destination| self.synapses(*destination))
    }

    pub(crate) fn destination_mut(&mut self, destination: NeuronAddress) -> Option<&mut DestinationSlots> {
        self.destinations.get_mut(&destination)
    }

    pub fn destination(&self, destination: NeuronAddress) -> Option<&DestinationSlots> {
        self.destinations.get(&destination)
    }

    /// Total occupied slots
    pub fn len(&self) -> usize {
        self.synapse_count
    }

    pub fn is_empty(&self) -> bool {
        self.synapse_count == 0
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    /// Drop every synapse and all bookkeeping; registered capacities are kept
    pub fn clear(&mut self) {
        self.destinations.clear();
        self.synapse_count = 0;
    }
}
