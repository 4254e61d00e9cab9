// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic bucket resolver (spec.md §4.11): a singleton cache of
//! `category -> (ttl, last_updated, bid -> host:port)`, refreshed through
//! the same framed RPC mechanism's `getMapping` method.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::client::RpcClient;

/// Where `getMapping` requests are sent: a fixed endpoint or one randomly
/// picked from a service list (spec.md §4.11 "Remote endpoint is either
/// fixed host:port or randomly picked from a service list").
#[derive(Debug, Clone)]
pub enum RemoteEndpoint {
    Fixed { host: String, port: u16 },
    ServiceList(Vec<(String, u16)>),
}

impl RemoteEndpoint {
    /// Picks the endpoint to dial for this refresh. `random_draw` is an
    /// index already reduced by the caller's random source, keeping this
    /// module free of a direct dependency on one.
    fn pick(&self, random_draw: usize) -> Option<(String, u16)> {
        match self {
            RemoteEndpoint::Fixed { host, port } => Some((host.clone(), *port)),
            RemoteEndpoint::ServiceList(list) => {
                if list.is_empty() {
                    None
                } else {
                    Some(list[random_draw % list.len()].clone())
                }
            }
        }
    }
}

struct CachedMapping {
    last_updated_ms: u64,
    by_bucket: HashMap<u32, (String, u16)>,
}

/// Builds a fresh, unconnected client pointed at `(host, port)`. A new
/// client is built per refresh rather than pooled, since refreshes are
/// bounded by `ttl_ms` and are not a hot path the way per-entry sends are.
pub type ClientFactory = Box<dyn Fn(&str, u16) -> Box<dyn RpcClient> + Send + Sync>;

/// The per-process cache. All errors during refresh are swallowed (the
/// caller reports them through a metrics counter) and leave whatever
/// mapping was previously cached in place, per spec.md §4.11.
pub struct BucketResolverCache {
    ttl_ms: u64,
    endpoint: RemoteEndpoint,
    entries: Mutex<HashMap<String, CachedMapping>>,
    client_factory: ClientFactory,
}

impl BucketResolverCache {
    pub fn new(ttl_ms: u64, endpoint: RemoteEndpoint, client_factory: ClientFactory) -> Self {
        Self {
            ttl_ms,
            endpoint,
            entries: Mutex::new(HashMap::new()),
            client_factory,
        }
    }

    /// Returns the cached `host:port` for `(category, bucket_id)`,
    /// refreshing from the remote resolver first if the TTL expired or
    /// nothing has been cached yet for `category`.
    pub async fn get_host(
        &self,
        category: &str,
        bucket_id: u32,
        now_ms: u64,
        random_draw: usize,
    ) -> Option<(String, u16)> {
        let needs_refresh = {
            let entries = self.entries.lock();
            match entries.get(category) {
                Some(cached) => now_ms.saturating_sub(cached.last_updated_ms) >= self.ttl_ms,
                None => true,
            }
        };
        if needs_refresh {
            self.refresh(category, now_ms, random_draw).await;
        }
        self.entries
            .lock()
            .get(category)
            .and_then(|c| c.by_bucket.get(&bucket_id).cloned())
    }

    async fn refresh(&self, category: &str, now_ms: u64, random_draw: usize) {
        let Some((host, port)) = self.endpoint.pick(random_draw) else {
            return;
        };
        let mut client = (self.client_factory)(&host, port);
        if client.connect().await.is_err() {
            return;
        }
        let Ok(mappings) = client.get_mapping(category).await else {
            return;
        };
        client.close().await;

        let mut by_bucket = HashMap::new();
        for m in mappings {
            by_bucket.insert(m.bucket_id, (m.host, m.port));
        }
        self.entries.lock().insert(
            category.to_string(),
            CachedMapping {
                last_updated_ms: now_ms,
                by_bucket,
            },
        );
    }
}

#[cfg(test)]
#[path = "bucket_resolver_tests.rs"]
mod tests;
