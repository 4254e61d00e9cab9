// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection pool (spec.md §4.10): shared, ref-counted client connections
//! keyed by `host:port` or service name.
//!
//! Per spec.md §5's lock ordering (`map_mutex -> conn.mutex`), the map is
//! a `parking_lot::Mutex` guarding only the refcount/entry bookkeeping; the
//! actual connection is behind its own `tokio::sync::Mutex` so a slow send
//! on one key never blocks lookups for other keys.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::client::RpcClient;

struct PoolEntry {
    refs: usize,
    conn: Arc<AsyncMutex<Box<dyn RpcClient>>>,
}

/// Shared map of pooled connections. `key` is whatever the caller uses to
/// identify a destination — `"host:port"` for fixed targets, the service
/// name for smc-resolved ones.
#[derive(Default)]
pub struct ConnectionPool {
    entries: SyncMutex<HashMap<String, PoolEntry>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts the existing open entry for `key` (incrementing its
    /// refcount) or installs `client` as a fresh entry. Returns a shared
    /// handle to the connection, guarded by its own mutex.
    pub fn open(&self, key: &str, client: Box<dyn RpcClient>) -> Arc<AsyncMutex<Box<dyn RpcClient>>> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.refs += 1;
            return Arc::clone(&entry.conn);
        }
        let conn = Arc::new(AsyncMutex::new(client));
        entries.insert(
            key.to_string(),
            PoolEntry {
                refs: 1,
                conn: Arc::clone(&conn),
            },
        );
        conn
    }

    /// Borrows the connection for `key`, if a pool entry exists for it.
    /// Used by a caller that already called `open` and wants to send
    /// without re-registering a refcount.
    pub fn get(&self, key: &str) -> Option<Arc<AsyncMutex<Box<dyn RpcClient>>>> {
        self.entries.lock().get(key).map(|e| Arc::clone(&e.conn))
    }

    /// Decrements the refcount for `key`, removing the entry once it
    /// reaches zero. A `key` with no entry is a no-op.
    pub fn close(&self, key: &str) {
        let mut entries = self.entries.lock();
        let remove = match entries.get_mut(key) {
            Some(entry) => {
                entry.refs = entry.refs.saturating_sub(1);
                entry.refs == 0
            }
            None => false,
        };
        if remove {
            entries.remove(key);
        }
    }

    pub fn ref_count(&self, key: &str) -> usize {
        self.entries.lock().get(key).map(|e| e.refs).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
