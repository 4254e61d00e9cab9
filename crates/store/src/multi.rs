// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi store: fans every batch out to an ordered list of independent
//! children (spec.md §2 "Data flow"; grounded in the original's
//! `MultiStore`, which the distillation's retrieval pack did not carry a
//! dedicated section for — see `SPEC_FULL.md` §B).
//!
//! `handle_batch` succeeds only if every child accepts the whole batch.
//! The combined residual is the union, in original order, of every
//! child's undelivered entries: an entry is only truly delivered once
//! every child that needed it has it.

use std::sync::Arc;

use async_trait::async_trait;
use scribe_core::conf::ConfNode;
use scribe_core::entry::{Batch, LogEntry};

use crate::error::StoreConfigError;
use crate::traits::Store;

pub struct MultiStore {
    children: Vec<Box<dyn Store>>,
}

impl MultiStore {
    pub fn new(children: Vec<Box<dyn Store>>) -> Self {
        Self { children }
    }
}

/// Walks `original` and `residual` in lockstep (both preserve the same
/// relative order per the `Store::handle_batch` contract) and returns,
/// for each index into `original`, whether that entry survived into
/// `residual` i.e. was *not* delivered by this child.
fn undelivered_mask(original: &[LogEntry], residual: &[LogEntry]) -> Vec<bool> {
    let mut mask = vec![false; original.len()];
    let mut r = 0;
    for (i, entry) in original.iter().enumerate() {
        if r < residual.len() && *entry == residual[r] {
            mask[i] = true;
            r += 1;
        }
    }
    mask
}

#[async_trait]
impl Store for MultiStore {
    async fn configure(&mut self, conf: &Arc<ConfNode>) -> Result<(), StoreConfigError> {
        if self.children.is_empty() {
            return Err(StoreConfigError::NoBuckets);
        }
        // `factory::build_store` built `self.children` by walking
        // `conf.all_stores()` in the same order; reconfiguring walks it
        // again and pairs each child config with the child built from it.
        for (child, (_, child_conf)) in self.children.iter_mut().zip(conf.all_stores()) {
            child.configure(&child_conf).await?;
        }
        Ok(())
    }

    async fn open(&mut self) -> bool {
        let mut all_ok = true;
        for child in &mut self.children {
            all_ok &= child.open().await;
        }
        all_ok
    }

    async fn close(&mut self) {
        for child in &mut self.children {
            child.close().await;
        }
    }

    fn is_open(&self) -> bool {
        self.children.iter().all(|c| c.is_open())
    }

    async fn handle_batch(&mut self, batch: &mut Batch) -> bool {
        let original = batch.clone();
        let mut combined_mask = vec![false; original.len()];
        let mut all_ok = true;

        for child in &mut self.children {
            let mut clone = original.clone();
            let ok = child.handle_batch(&mut clone).await;
            all_ok &= ok;
            let mask = undelivered_mask(&original, &clone);
            for (m, undelivered) in combined_mask.iter_mut().zip(mask) {
                *m |= undelivered;
            }
        }

        *batch = original
            .into_iter()
            .zip(combined_mask)
            .filter_map(|(entry, undelivered)| undelivered.then_some(entry))
            .collect();
        all_ok
    }

    async fn flush(&mut self) {
        for child in &mut self.children {
            child.flush().await;
        }
    }

    async fn periodic_check(&mut self, pending_bytes: u64, max_queue_size: u64) {
        for child in &mut self.children {
            child.periodic_check(pending_bytes, max_queue_size).await;
        }
    }

    fn copy(&self, category: &str) -> Box<dyn Store> {
        Box::new(MultiStore {
            children: self.children.iter().map(|c| c.copy(category)).collect(),
        })
    }

    fn status(&self) -> String {
        for child in &self.children {
            let status = child.status();
            if !status.is_empty() {
                return status;
            }
        }
        String::new()
    }

    fn type_name(&self) -> &'static str {
        "multi"
    }
}

#[cfg(test)]
#[path = "multi_tests.rs"]
mod tests;
