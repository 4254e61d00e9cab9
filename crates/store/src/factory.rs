// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds a [`Store`] shell from a configuration node's `type` key
//! (spec.md §6 "Per-store: `type`"), recursing into the composites'
//! children so that every nested store exists before `configure` walks
//! the tree a second time to fill in field values.
//!
//! The two-pass shape (build the tree of empty shells, then `configure`
//! each one) mirrors the original's `createStore` + `Store::configure`
//! split: `createStore` only needs a `type` string to pick a class: the
//! fields come later, via `configure`, which is also how a store knows
//! how to re-configure its already-built children on a reinit.

use std::sync::Arc;

use scribe_core::conf::ConfNode;
use scribe_net::pool::ConnectionPool;

use crate::bucket::BucketStore;
use crate::buffer::BufferStore;
use crate::error::StoreConfigError;
use crate::file::FileStore;
use crate::multi::MultiStore;
use crate::network::{NetworkStore, ServiceDirectory};
use crate::null::NullStore;
use crate::traits::Store;

/// The category placeholder every store built straight from the top-level
/// configuration carries until the category registry clones it for a
/// concrete category via `Store::copy` (spec.md §3 "Model store").
const MODEL_CATEGORY: &str = "model";

/// Dependencies a [`NetworkStore`] (or a composite holding one) needs that
/// don't come from the configuration tree itself: the shared connection
/// pool (spec.md §4.10) and, if the embedder supplies one, the service
/// directory `smc_service` resolves through (spec.md §4.3 mode 2). Carried
/// through the recursive build rather than reached for via a process
/// global, per spec.md §9's anti-singleton guidance.
///
/// `dynamic_config_type` (spec.md §4.3 mode 3) is deliberately not wired
/// here: the original names that mode's resolver by an externally
/// registered plugin class, which has no Rust equivalent without a
/// fabricated registry. An embedder that has a concrete
/// [`crate::network::DynamicEndpointSource`] can still attach one to a
/// built [`NetworkStore`] directly via `with_dynamic_source` before handing
/// it to a worker queue. See DESIGN.md.
#[derive(Clone, Default)]
pub struct StoreDeps {
    pub pool: Option<Arc<ConnectionPool>>,
    pub service_directory: Option<Arc<dyn ServiceDirectory>>,
}

/// Recursively builds a [`Store`] (and, for composites, its children) from
/// `conf`'s `type` key, with no external dependencies wired in. Equivalent
/// to `build_store_with(conf, &StoreDeps::default())`; network stores built
/// this way fall back to a dedicated (unpooled) connection per spec.md
/// §4.3 ("pooled connection... or a dedicated connection").
pub fn build_store(conf: &Arc<ConfNode>) -> Result<Box<dyn Store>, StoreConfigError> {
    build_store_with(conf, &StoreDeps::default())
}

/// Same as [`build_store`] but threads `deps` into every network store
/// built, directly or nested inside a buffer/bucket/multi composite. Does
/// not call `configure` — the caller configures the returned store (and,
/// for leaves, that's the whole job; composites configure their own
/// children from the same `conf` their `configure` is given).
pub fn build_store_with(conf: &Arc<ConfNode>, deps: &StoreDeps) -> Result<Box<dyn Store>, StoreConfigError> {
    let store_type = conf.store_type().ok_or(StoreConfigError::MissingKey("type"))?;
    match store_type {
        "file" => Ok(Box::new(FileStore::new(MODEL_CATEGORY))),
        "thriftfile" => Ok(Box::new(FileStore::new(MODEL_CATEGORY))),
        "network" => Ok(Box::new(wire_network_deps(NetworkStore::new(), deps))),
        "null" => Ok(Box::new(NullStore::new())),
        "buffer" => {
            let primary_conf = conf
                .get_store("primary")
                .ok_or(StoreConfigError::IncompleteBuffer)?;
            let secondary_conf = conf
                .get_store("secondary")
                .ok_or(StoreConfigError::IncompleteBuffer)?;
            let primary = build_store_with(&primary_conf, deps)?;
            let secondary = build_buffer_secondary(&secondary_conf, deps)?;
            Ok(Box::new(BufferStore::new(primary, secondary)?))
        }
        "bucket" => Ok(Box::new(BucketStore::new().with_deps(deps.clone()))),
        "multi" => {
            let mut children = Vec::new();
            for (_, child_conf) in conf.all_stores() {
                children.push(build_store_with(&child_conf, deps)?);
            }
            Ok(Box::new(MultiStore::new(children)))
        }
        other => Err(StoreConfigError::UnknownType(other.to_string())),
    }
}

/// Builds a Buffer store's secondary (spec.md §4.5). `file`/`thriftfile`
/// secondaries must use the framed backend and the `.buffer` filename
/// suffix (§4.2 "Buffer-role files have the `.buffer` suffix") so a
/// restart can recover record boundaries from a plain byte stream; other
/// readable types (e.g. `null`) need no such coercion.
fn build_buffer_secondary(conf: &Arc<ConfNode>, deps: &StoreDeps) -> Result<Box<dyn Store>, StoreConfigError> {
    match conf.store_type() {
        Some("file") | Some("thriftfile") => {
            Ok(Box::new(FileStore::new(MODEL_CATEGORY).as_buffer_secondary()))
        }
        _ => build_store_with(conf, deps),
    }
}

fn wire_network_deps(mut store: NetworkStore, deps: &StoreDeps) -> NetworkStore {
    if let Some(pool) = &deps.pool {
        store = store.with_pool(Arc::clone(pool));
    }
    if let Some(directory) = &deps.service_directory {
        store = store.with_service_directory(Arc::clone(directory));
    }
    store
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
