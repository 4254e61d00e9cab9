// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Null store (spec.md §4.4): acknowledges every batch, counting messages
//! ignored. A sink for drop-only categories and a testing scaffold.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use scribe_core::clock::CalendarNow;
use scribe_core::conf::ConfNode;
use scribe_core::entry::Batch;

use crate::error::StoreConfigError;
use crate::traits::Store;

#[derive(Debug, Default)]
pub struct NullStore {
    open: bool,
    ignored: Arc<AtomicU64>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignored_count(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Store for NullStore {
    async fn configure(&mut self, _conf: &Arc<ConfNode>) -> Result<(), StoreConfigError> {
        Ok(())
    }

    async fn open(&mut self) -> bool {
        self.open = true;
        true
    }

    async fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn handle_batch(&mut self, batch: &mut Batch) -> bool {
        self.ignored.fetch_add(batch.len() as u64, Ordering::Relaxed);
        batch.clear();
        true
    }

    async fn flush(&mut self) {}

    async fn periodic_check(&mut self, _pending_bytes: u64, _max_queue_size: u64) {}

    fn copy(&self, _category: &str) -> Box<dyn Store> {
        Box::new(NullStore {
            open: false,
            ignored: Arc::clone(&self.ignored),
        })
    }

    fn type_name(&self) -> &'static str {
        "null"
    }

    fn is_readable(&self) -> bool {
        true
    }

    async fn read_oldest(&mut self, _now: &CalendarNow) -> Batch {
        Vec::new()
    }

    async fn replace_oldest(&mut self, _batch: Batch, _now: &CalendarNow) -> bool {
        true
    }

    async fn delete_oldest(&mut self, _now: &CalendarNow) -> bool {
        true
    }

    async fn empty(&mut self, _now: &CalendarNow) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "null_tests.rs"]
mod tests;
