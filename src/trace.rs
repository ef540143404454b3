// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spike trace files for offline replay
//!
//! One event per line:
//! ```text
//! # chip,core,neuron,timestamp_us
//! 1,0,17,100
//! 1,3,0,150
//! WRAP
//! ```
//! `#` starts a comment; blank lines are skipped.

use std::path::Path;

use crate::neural::{NeuronAddress, TopologyError};
use crate::plasticity::{PipelineEvent, SpikeEvent};

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected 'chip,core,neuron,timestamp_us' or 'WRAP', got '{content}'")]
    Malformed { line: usize, content: String },

    #[error("line {line}: {source}")]
    InvalidAddress {
        line: usize,
        #[source]
        source: TopologyError,
    },
}

/// Parse one line; `Ok(None)` for blank and comment lines
pub fn parse_trace_line(line_number: usize, line: &str) -> Result<Option<PipelineEvent>, TraceError> {
    let content = line.split('#').next().unwrap_or("").trim();
    if content.is_empty() {
        return Ok(None);
    }
    if content.eq_ignore_ascii_case("wrap") {
        return Ok(Some(PipelineEvent::TimestampWrap));
    }

    let malformed = || TraceError::Malformed {
        line: line_number,
        content: content.to_string(),
    };
    let fields: Vec<&str> = content.split(',').map(str::trim).collect();
    let [chip, core, neuron, timestamp] = fields.as_slice() else {
        return Err(malformed());
    };
    let chip: u8 = chip.parse().map_err(|_| malformed())?;
    let core: u8 = core.parse().map_err(|_| malformed())?;
    let neuron: u16 = neuron.parse().map_err(|_| malformed())?;
    let timestamp_us: u64 = timestamp.parse().map_err(|_| malformed())?;

    let address = NeuronAddress::from_core_neuron(chip, core, neuron).map_err(|source| {
        TraceError::InvalidAddress {
            line: line_number,
            source,
        }
    })?;
    Ok(Some(PipelineEvent::Spike(SpikeEvent::new(address, timestamp_us))))
}

/// Parse a whole trace, stopping at the first bad line
pub fn parse_trace(content: &str) -> Result<Vec<PipelineEvent>, TraceError> {
    let mut events = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if let Some(event) = parse_trace_line(i + 1, line)? {
            events.push(event);
        }
    }
    Ok(events)
}

pub fn read_trace(path: &Path) -> Result<Vec<PipelineEvent>, TraceError> {
    let content = std::fs::read_to_string(path)?;
    parse_trace(&content)
}
