// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-destination normalization and quantization
//!
//! Runs after a walk changed a destination's weights:
//! 1. Rebalance: subtract `total_delta / occupied` from every occupied slot
//! 2. Clamp: rescale one polarity when its ratcheted bound passed the limit
//! 3. Quantize: report slots whose class no longer matches their weight

use synaplast_npu_neural::NeuronAddress;

use crate::config::LayerProfile;
use crate::synaptic_table::{ClassChange, DestinationSlots, SlotRef, SynapticTable};

/// Spread `total_delta` evenly and remove it from every occupied slot
pub fn rebalance(slots: &mut DestinationSlots, total_delta: f64) {
    let occupied = slots.occupied();
    if occupied == 0 || total_delta == 0.0 {
        return;
    }
    let share = total_delta / occupied as f64;
    let mut touched = Vec::with_capacity(occupied);
    for (_, slot) in slots.occupied_slots_mut() {
        slot.weight -= share;
        touched.push(slot.weight);
    }
    for weight in touched {
        slots.ratchet(weight);
    }
}

/// Ratchet clamp, identical in form for both signs
///
/// If the tracked maximum exceeds `ceiling`, every positive weight is scaled by
/// `ceiling / max` and the maximum becomes `ceiling`. If the tracked minimum is
/// below `floor`, every negative weight is scaled by `floor / min` and the
/// minimum becomes `floor`. Returns true when either side was rescaled.
pub fn clamp(slots: &mut DestinationSlots, ceiling: f64, floor: f64) -> bool {
    let mut rescaled = false;

    if slots.max_weight > ceiling {
        let ratio = ceiling / slots.max_weight;
        for (_, slot) in slots.occupied_slots_mut() {
            if slot.weight > 0.0 {
                slot.weight *= ratio;
            }
        }
        slots.max_weight = ceiling;
        rescaled = true;
    }

    if slots.min_weight < floor {
        let ratio = floor / slots.min_weight;
        for (_, slot) in slots.occupied_slots_mut() {
            if slot.weight < 0.0 {
                slot.weight *= ratio;
            }
        }
        slots.min_weight = floor;
        rescaled = true;
    }

    rescaled
}

/// Slots whose recorded class differs from the class of their weight, in slot order
pub fn quantize(
    destination: NeuronAddress,
    slots: &DestinationSlots,
    profile: &LayerProfile,
) -> Vec<ClassChange> {
    slots
        .occupied_slots()
        .filter_map(|(index, slot)| {
            let current = profile.thresholds.classify(slot.weight);
            (current != slot.class).then_some(ClassChange {
                slot: SlotRef { destination, index },
                source: slot.source,
                previous: slot.class,
                current,
            })
        })
        .collect()
}

/// Rebalance, clamp and quantize one destination
pub fn normalize(
    table: &mut SynapticTable,
    destination: NeuronAddress,
    total_delta: f64,
    profile: &LayerProfile,
) -> Vec<ClassChange> {
    let Some(slots) = table.destination_mut(destination) else {
        return Vec::new();
    };
    rebalance(slots, total_delta);
    if clamp(slots, profile.excitatory_ceiling, profile.inhibitory_floor) {
        tracing::trace!(target: "plasticity",
            "[PLASTICITY] Rescaled weights of {} to [{}, {}]",
            destination, profile.inhibitory_floor, profile.excitatory_ceiling
        );
    }
    quantize(destination, slots, profile)
}
