// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hardware programming commands
//!
//! Every class transition of a slot becomes one [`ProgramConnection`]. The
//! emitter persists the new class in the table before queueing the command, so
//! the queue and the table never disagree.

use serde::{Deserialize, Serialize};
use synaplast_npu_neural::{NeuronAddress, SynapseClass};

use crate::synaptic_table::{Admission, ClassChange, SynapticTable};

/// Program `source -> destination` into `slot` with `class`
///
/// `SynapseClass::None` means the slot is to be disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramConnection {
    pub source: NeuronAddress,
    pub destination: NeuronAddress,
    pub slot: usize,
    pub class: SynapseClass,
}

/// Ordered queue of pending commands
#[derive(Debug, Clone, Default)]
pub struct ChangeEmitter {
    queue: Vec<ProgramConnection>,
    emitted: u64,
}

impl ChangeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, command: ProgramConnection) {
        tracing::trace!(target: "plasticity",
            "[PLASTICITY] Program {} -> {} slot {} as {}",
            command.source, command.destination, command.slot, command.class
        );
        self.queue.push(command);
        self.emitted += 1;
    }

    /// Queue the command an admission implies
    ///
    /// A replacement always reprograms the slot. A fresh allocation is only
    /// programmed when it starts out connected. Returns whether a command was
    /// queued.
    pub fn emit_admission(
        &mut self,
        admission: &Admission,
        source: NeuronAddress,
        class: SynapseClass,
    ) -> bool {
        let slot = match admission {
            Admission::Allocated(slot) if class.is_connected() => *slot,
            Admission::Replaced { slot, .. } => *slot,
            _ => return false,
        };
        self.push(ProgramConnection {
            source,
            destination: slot.destination,
            slot: slot.index,
            class,
        });
        true
    }

    /// Persist each change in `table` and queue its command
    ///
    /// Changes whose slot is no longer occupied are dropped. Returns the
    /// number of commands queued.
    pub fn apply(&mut self, table: &mut SynapticTable, changes: &[ClassChange]) -> usize {
        let mut queued = 0;
        for change in changes {
            if !table.set_class(change.slot, change.current) {
                continue;
            }
            self.push(ProgramConnection {
                source: change.source,
                destination: change.slot.destination,
                slot: change.slot.index,
                class: change.current,
            });
            queued += 1;
        }
        queued
    }

    /// Take every pending command in production order
    pub fn drain(&mut self) -> Vec<ProgramConnection> {
        std::mem::take(&mut self.queue)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Commands queued since creation or the last [`clear`](Self::clear)
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.emitted = 0;
    }
}
