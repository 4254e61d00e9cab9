// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network store (spec.md §4.3): sends a batch to another instance of
//! this server, over a fixed host:port, a service name resolved through
//! an external directory, or a dynamically-resolved endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use scribe_core::conf::ConfNode;
use scribe_core::entry::{batch_byte_len, Batch};
use scribe_net::client::{RpcClient, RpcTimeouts, TcpRpcClient};
use scribe_net::pool::ConnectionPool;
use scribe_net::wire::LogCode;

use crate::error::StoreConfigError;
use crate::traits::Store;

/// Payload size above which a zero-length probe precedes the real batch,
/// per spec.md §4.3 ("~4 KiB").
const PROBE_THRESHOLD_BYTES: usize = 4096;

/// Returns a randomized list of `(host, port)` for a service name — the
/// "external directory" spec.md §4.3 mode 2 refers to. Supplied by the
/// caller (the daemon wires this to whatever service-discovery mechanism
/// it has, or a fixed table in tests); this crate does not reach out to a
/// process-global registry itself (spec.md §9's anti-singleton guidance).
pub trait ServiceDirectory: Send + Sync {
    fn resolve(&self, service_name: &str) -> Vec<(String, u16)>;
}

/// A module that is periodically asked for the current `(host, port)` a
/// dynamically-configured network store should target (spec.md §4.3 mode
/// 3). Returning a value different from the last one triggers a
/// close+reopen.
pub trait DynamicEndpointSource: Send + Sync {
    fn current_endpoint(&self) -> Option<(String, u16)>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetMode {
    Fixed { host: String, port: u16 },
    Service { name: String },
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct NetworkStoreConfig {
    pub service_cache_timeout_ms: u64,
    pub timeout_ms: u64,
    pub use_conn_pool: bool,
}

impl Default for NetworkStoreConfig {
    fn default() -> Self {
        Self {
            service_cache_timeout_ms: 5_000,
            timeout_ms: 5_000,
            use_conn_pool: true,
        }
    }
}

pub struct NetworkStore {
    target: Option<TargetMode>,
    config: NetworkStoreConfig,
    directory: Option<Arc<dyn ServiceDirectory>>,
    dynamic_source: Option<Arc<dyn DynamicEndpointSource>>,
    pool: Option<Arc<ConnectionPool>>,
    resolved: Option<(String, u16)>,
    resolved_at_ms: u64,
    owned_conn: Option<Box<dyn RpcClient>>,
    /// Set once this instance itself calls `pool.open` for the current
    /// target, so `close` only decrements a refcount it actually holds
    /// (spec.md §4.10's ref-counted open/close contract) instead of
    /// evicting an entry a different `NetworkStore` is still using.
    registered: bool,
    open: bool,
    status: String,
}

impl NetworkStore {
    pub fn new() -> Self {
        Self {
            target: None,
            config: NetworkStoreConfig::default(),
            directory: None,
            dynamic_source: None,
            pool: None,
            resolved: None,
            resolved_at_ms: 0,
            owned_conn: None,
            registered: false,
            open: false,
            status: String::new(),
        }
    }

    pub fn with_service_directory(mut self, directory: Arc<dyn ServiceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_dynamic_source(mut self, source: Arc<dyn DynamicEndpointSource>) -> Self {
        self.dynamic_source = Some(source);
        self
    }

    pub fn with_pool(mut self, pool: Arc<ConnectionPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    fn pool_key(&self) -> Option<String> {
        match &self.target {
            Some(TargetMode::Fixed { host, port }) => Some(format!("{host}:{port}")),
            Some(TargetMode::Service { name }) => Some(name.clone()),
            Some(TargetMode::Dynamic) => self
                .resolved
                .as_ref()
                .map(|(h, p)| format!("{h}:{p}")),
            None => None,
        }
    }

    fn timeouts(&self) -> RpcTimeouts {
        let t = Duration::from_millis(self.config.timeout_ms);
        RpcTimeouts {
            connect: t,
            send: t,
            recv: t,
        }
    }

    async fn resolve_endpoint(&mut self, now_ms: u64) -> Option<(String, u16)> {
        match self.target.clone()? {
            TargetMode::Fixed { host, port } => Some((host, port)),
            TargetMode::Service { name } => {
                let stale = now_ms.saturating_sub(self.resolved_at_ms)
                    >= self.config.service_cache_timeout_ms;
                if self.resolved.is_none() || stale {
                    let directory = self.directory.as_ref()?;
                    let candidates = directory.resolve(&name);
                    self.resolved = candidates.into_iter().next();
                    self.resolved_at_ms = now_ms;
                }
                self.resolved.clone()
            }
            TargetMode::Dynamic => {
                let source = self.dynamic_source.as_ref()?;
                source.current_endpoint()
            }
        }
    }

    /// Builds a fresh, unconnected client for direct (non-pooled) use.
    fn new_client(&self, host: &str, port: u16) -> Box<dyn RpcClient> {
        Box::new(TcpRpcClient::new(host, port, self.timeouts()))
    }

    async fn ensure_connection(&mut self) -> bool {
        if self.owned_conn.as_ref().map(|c| c.is_connected()).unwrap_or(false) {
            return true;
        }
        let Some((host, port)) = self.resolved.clone() else {
            return false;
        };
        let pool_key = self.pool_key();
        if self.config.use_conn_pool {
            if let (Some(pool), Some(key)) = (&self.pool, &pool_key) {
                let existing = if self.registered { pool.get(key) } else { None };
                let handle = match existing {
                    Some(handle) => handle,
                    None => {
                        let client = self.new_client(&host, port);
                        let handle = pool.open(key, client);
                        self.registered = true;
                        handle
                    }
                };
                let mut conn = handle.lock().await;
                return conn.is_connected() || conn.connect().await.is_ok();
            }
        }
        let mut client = self.new_client(&host, port);
        let ok = client.connect().await.is_ok();
        self.owned_conn = Some(client);
        ok
    }

    async fn send_via(&mut self, batch: &Batch) -> Result<LogCode, ()> {
        let pool_key = self.pool_key();
        if self.config.use_conn_pool {
            if let (Some(pool), Some(key)) = (&self.pool, &pool_key) {
                if let Some(handle) = pool.get(key) {
                    let mut conn = handle.lock().await;
                    return conn.send_log(batch).await.map_err(|_| ());
                }
            }
        }
        match &mut self.owned_conn {
            Some(conn) => conn.send_log(batch).await.map_err(|_| ()),
            None => Err(()),
        }
    }
}

impl Default for NetworkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for NetworkStore {
    async fn configure(&mut self, conf: &Arc<ConfNode>) -> Result<(), StoreConfigError> {
        if let (Some(host), Some(port)) = (
            conf.get_string("remote_host"),
            conf.get_unsigned("remote_port"),
        ) {
            self.target = Some(TargetMode::Fixed {
                host,
                port: port as u16,
            });
        } else if let Some(service) = conf.get_string("smc_service") {
            self.target = Some(TargetMode::Service { name: service });
        } else if conf.get_string("dynamic_config_type").is_some() {
            self.target = Some(TargetMode::Dynamic);
        } else {
            return Err(StoreConfigError::MissingKey("remote_host"));
        }

        self.config.service_cache_timeout_ms =
            conf.get_unsigned("service_cache_timeout").unwrap_or(5_000);
        self.config.timeout_ms = conf.get_unsigned("timeout").unwrap_or(5_000);
        self.config.use_conn_pool = conf.get_bool("use_conn_pool").unwrap_or(true);
        Ok(())
    }

    async fn open(&mut self) -> bool {
        let resolved = self.resolve_endpoint(0).await;
        self.resolved = resolved;
        if self.resolved.is_none() {
            self.status = "could not resolve network store target".to_string();
            self.open = false;
            return false;
        }
        let ok = self.ensure_connection().await;
        self.open = ok;
        if !ok {
            self.status = "connect failed".to_string();
        } else {
            self.status.clear();
        }
        ok
    }

    async fn close(&mut self) {
        if let Some(conn) = &mut self.owned_conn {
            conn.close().await;
        }
        self.owned_conn = None;
        if self.registered {
            if let (Some(pool), Some(key)) = (&self.pool, self.pool_key()) {
                pool.close(&key);
            }
            self.registered = false;
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn handle_batch(&mut self, batch: &mut Batch) -> bool {
        if !self.open {
            return false;
        }
        if batch_byte_len(batch) > PROBE_THRESHOLD_BYTES {
            let probe: Batch = Vec::new();
            match self.send_via(&probe).await {
                Ok(LogCode::Ok) => {}
                Ok(LogCode::TryLater) => return false,
                Err(()) => {
                    self.open = false;
                    self.status = "probe failed".to_string();
                    return false;
                }
            }
        }
        match self.send_via(batch).await {
            Ok(LogCode::Ok) => {
                batch.clear();
                true
            }
            Ok(LogCode::TryLater) => false,
            Err(()) => {
                self.open = false;
                self.status = "send failed".to_string();
                false
            }
        }
    }

    async fn flush(&mut self) {}

    async fn periodic_check(&mut self, _pending_bytes: u64, _max_queue_size: u64) {
        if matches!(self.target, Some(TargetMode::Dynamic)) {
            let current = self.dynamic_source.as_ref().and_then(|s| s.current_endpoint());
            if current != self.resolved {
                self.close().await;
                self.resolved = current;
                self.open = self.ensure_connection().await;
            }
        }
    }

    fn copy(&self, _category: &str) -> Box<dyn Store> {
        let mut clone = NetworkStore::new();
        clone.target = self.target.clone();
        clone.config = self.config.clone();
        clone.directory = self.directory.clone();
        clone.dynamic_source = self.dynamic_source.clone();
        clone.pool = self.pool.clone();
        Box::new(clone)
    }

    fn status(&self) -> String {
        self.status.clone()
    }

    fn type_name(&self) -> &'static str {
        "network"
    }
}

/// Serializes mutable access for a borrowed connection under the map
/// mutex (spec.md §4.10, §5 "map_mutex -> conn.mutex"); re-exported so a
/// connection pool shared across stores can be built once by the
/// dispatcher / worker-queue factory.
pub type SharedPool = Arc<AsyncMutex<ConnectionPool>>;

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
