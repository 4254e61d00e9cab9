// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unit of traffic: [`LogEntry`] and the [`Batch`] that carries it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Recognized metadata key carrying the producer's send timestamp, in
/// decimal milliseconds since the Unix epoch.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// A single tagged log message.
///
/// Immutable once enqueued onto a worker queue, except that the dispatcher
/// may add or remove the [`TIMESTAMP_KEY`] metadata entry before enqueue
/// (see the dispatcher's hop-latency accounting).
///
/// `Serialize`/`Deserialize` back the RPC wire encoding (`scribe-net`'s
/// framed binary protocol) — spec.md §1 treats wire framing as an external
/// collaborator, but the type it frames is this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub category: String,
    pub message: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

impl LogEntry {
    pub fn new(category: impl Into<String>, message: impl Into<Vec<u8>>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    /// Byte length counted toward a worker queue's pending-size counter.
    ///
    /// Only the message payload counts; category and metadata are not
    /// included, matching the original's queue size accounting.
    pub fn byte_len(&self) -> usize {
        self.message.len()
    }

    pub fn timestamp_ms(&self) -> Option<u64> {
        self.metadata.get(TIMESTAMP_KEY)?.parse().ok()
    }

    pub fn set_timestamp_ms(&mut self, ms: u64) {
        self.metadata.insert(TIMESTAMP_KEY.to_string(), ms.to_string());
    }

    pub fn remove_timestamp(&mut self) -> Option<String> {
        self.metadata.remove(TIMESTAMP_KEY)
    }
}

/// Ordered sequence of [`LogEntry`]. The unit of RPC, of worker-queue
/// draining, and of store retries.
pub type Batch = Vec<LogEntry>;

/// Total message bytes in a batch, matching the worker queue's running
/// byte-size counter (§8 "Universal invariants": `size() == Σ len(message)`).
pub fn batch_byte_len(batch: &[LogEntry]) -> usize {
    batch.iter().map(LogEntry::byte_len).sum()
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
