// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The abstract store contract (spec.md §4.1).
//!
//! Readable-store capability (`read_oldest`/`replace_oldest`/`delete_oldest`/
//! `empty`) is folded into the same trait rather than split into a second
//! one: a Buffer's secondary is the only caller of those four methods, and
//! giving every store a default "I have nothing to read" implementation
//! keeps `Box<dyn Store>` usable everywhere a child store is held, which is
//! what every composite (Buffer, Bucket, Multi) needs.

use std::sync::Arc;

use async_trait::async_trait;
use scribe_core::clock::CalendarNow;
use scribe_core::conf::ConfNode;
use scribe_core::entry::Batch;

use crate::error::StoreConfigError;

/// A destination for log entries. See spec.md §4.1 for the full contract.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads this store's keys from `conf` and recursively configures any
    /// children. Idempotent before the first `open`.
    async fn configure(&mut self, conf: &Arc<ConfNode>) -> Result<(), StoreConfigError>;

    /// Prepares the store for writes. Returns `true` on success.
    async fn open(&mut self) -> bool;

    /// Releases resources. Must tolerate being called while not open.
    async fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Attempts to deliver every entry in `batch`. On `true` the batch is
    /// fully consumed and `batch` is left empty. On `false`, every entry
    /// that *was* delivered has been removed from `batch`, in original
    /// order, leaving only the undelivered residual.
    async fn handle_batch(&mut self, batch: &mut Batch) -> bool;

    /// Best-effort sync of any buffered data.
    async fn flush(&mut self);

    /// Called at the worker queue's configured cadence: rotation,
    /// reconnection attempts, propagation to children. `pending_bytes` is
    /// the owning worker queue's current pending-FIFO byte count and
    /// `max_queue_size` its server-wide budget (`0` means unbounded) —
    /// a Buffer store needs both to decide whether to yield its
    /// secondary-draining work for this tick (spec.md §4.5,
    /// `buffer_bypass_max_ratio`); every other store ignores them.
    async fn periodic_check(&mut self, pending_bytes: u64, max_queue_size: u64);

    /// Deep-clones this store's configuration for a newly-seen concrete
    /// category. The clone holds no open file handles or live connections.
    fn copy(&self, category: &str) -> Box<dyn Store>;

    /// Empty when healthy; the first non-empty child status bubbles up.
    fn status(&self) -> String {
        String::new()
    }

    fn type_name(&self) -> &'static str;

    /// Whether this store actually implements the readable-store methods
    /// below. Buffer refuses to use a non-readable secondary at configure
    /// time.
    fn is_readable(&self) -> bool {
        false
    }

    async fn read_oldest(&mut self, _now: &CalendarNow) -> Batch {
        Vec::new()
    }

    async fn replace_oldest(&mut self, _batch: Batch, _now: &CalendarNow) -> bool {
        false
    }

    async fn delete_oldest(&mut self, _now: &CalendarNow) -> bool {
        false
    }

    async fn empty(&mut self, _now: &CalendarNow) -> bool {
        true
    }
}
