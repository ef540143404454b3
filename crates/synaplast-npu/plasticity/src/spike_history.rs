// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spike history - fixed-capacity circular log used for pre/post pairing.
//!
//! Key semantics:
//! - Never fails: a full queue silently overwrites its oldest record.
//! - Sequence-addressed: `push` returns a cursor that stays valid until the
//!   record it names is overwritten.
//! - Epoch-tagged: a timestamp wrap starts a new epoch and backward scans never
//!   cross an epoch boundary.

use synaplast_npu_neural::{LayerId, NeuronAddress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpikeRecord {
    pub address: NeuronAddress,
    /// Layer resolved when the spike entered the engine
    pub layer: LayerId,
    pub timestamp_us: u64,
    pub epoch: u32,
}

impl SpikeRecord {
    const EMPTY: SpikeRecord = SpikeRecord {
        address: NeuronAddress {
            chip: 0,
            core: 0,
            row: 0,
            column: 0,
        },
        layer: LayerId(0),
        timestamp_us: 0,
        epoch: 0,
    };
}

/// Position of a record in the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HistoryCursor(u64);

#[derive(Debug, Clone)]
pub struct SpikeHistoryQueue {
    records: Vec<SpikeRecord>,
    /// Sequence number the next push receives
    next_seq: u64,
    /// Sequence numbers below this were cleared
    first_valid_seq: u64,
    epoch: u32,
}

impl SpikeHistoryQueue {
    /// Create a queue holding `capacity` records (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            records: vec![SpikeRecord::EMPTY; capacity.max(1)],
            next_seq: 0,
            first_valid_seq: 0,
            epoch: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    pub fn len(&self) -> usize {
        (self.next_seq - self.oldest_seq()) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    #[inline]
    fn oldest_seq(&self) -> u64 {
        self.next_seq
            .saturating_sub(self.capacity() as u64)
            .max(self.first_valid_seq)
    }

    #[inline]
    fn slot(&self, seq: u64) -> usize {
        (seq % self.capacity() as u64) as usize
    }

    /// Append a spike, overwriting the oldest record when full
    #[inline]
    pub fn push(&mut self, address: NeuronAddress, layer: LayerId, timestamp_us: u64) -> HistoryCursor {
        let seq = self.next_seq;
        let slot = self.slot(seq);
        self.records[slot] = SpikeRecord {
            address,
            layer,
            timestamp_us,
            epoch: self.epoch,
        };
        self.next_seq += 1;
        HistoryCursor(seq)
    }

    /// Record behind `cursor`, if it has not been overwritten or cleared
    pub fn get(&self, cursor: HistoryCursor) -> Option<&SpikeRecord> {
        if cursor.0 < self.oldest_seq() || cursor.0 >= self.next_seq {
            return None;
        }
        Some(&self.records[self.slot(cursor.0)])
    }

    /// Most recent record
    pub fn latest(&self) -> Option<HistoryCursor> {
        (!self.is_empty()).then(|| HistoryCursor(self.next_seq - 1))
    }

    /// Start a new epoch; earlier records stay but can no longer pair with new ones
    pub fn mark_epoch_boundary(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Forget every record. Outstanding cursors become invalid.
    pub fn clear(&mut self) {
        self.first_valid_seq = self.next_seq;
        self.epoch = 0;
    }

    /// Walk records older than `from`, newest first
    ///
    /// Stops after `max_count` records, at the first record more than
    /// `max_age_us` older than the anchor, at an epoch change, at a record
    /// stamped after the anchor, or at the oldest retained record.
    pub fn scan_backward_from(
        &self,
        from: HistoryCursor,
        max_age_us: u64,
        max_count: usize,
    ) -> BackwardScan<'_> {
        BackwardScan {
            queue: self,
            anchor: self.get(from).copied(),
            next: from.0,
            floor: self.oldest_seq(),
            remaining: max_count,
            max_age_us,
        }
    }
}

/// Lazy reverse-chronological scan. Clone it to restart from the same point.
#[derive(Debug, Clone)]
pub struct BackwardScan<'a> {
    queue: &'a SpikeHistoryQueue,
    anchor: Option<SpikeRecord>,
    next: u64,
    floor: u64,
    remaining: usize,
    max_age_us: u64,
}

impl Iterator for BackwardScan<'_> {
    type Item = SpikeRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let anchor = self.anchor?;
        if self.remaining == 0 || self.next <= self.floor {
            return None;
        }

        let seq = self.next - 1;
        let record = self.queue.records[self.queue.slot(seq)];
        if record.epoch != anchor.epoch
            || record.timestamp_us > anchor.timestamp_us
            || anchor.timestamp_us - record.timestamp_us > self.max_age_us
        {
            self.remaining = 0;
            return None;
        }

        self.next = seq;
        self.remaining -= 1;
        Some(record)
    }
}
