// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher (spec.md §4.8): the server-facing entry point. Resolves a
//! batch's entries to worker queue(s) by category and enforces admission
//! control before anything is enqueued.
//!
//! Implements [`scribe_net::server::LogHandler`] directly so a
//! `Dispatcher` can be handed straight to an [`scribe_net::server::RpcServer`]
//! — the RPC surface's only method, `log(batch) -> code`, *is*
//! [`Dispatcher::log`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use scribe_core::category::is_portable_filename;
use scribe_core::clock::Clock;
use scribe_core::entry::{Batch, LogEntry, TIMESTAMP_KEY};
use scribe_core::metrics::MetricsSink;
use scribe_core::random::RandomSource;
use scribe_core::status::ServerStatus;
use scribe_net::server::LogHandler;
use scribe_net::wire::LogCode;
use tokio::sync::RwLock;

use crate::registry::CategoryRegistry;

/// Server-wide admission tunables (spec.md §6 "Global"): `max_msg_per_second`,
/// `max_queue_size`, `timestamp_sample_rate`.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// `0` disables the per-second rate check entirely.
    pub max_msg_per_second: u64,
    /// `0` disables the queue-size check entirely.
    pub max_queue_size: u64,
    /// Probability (`0.0..=1.0`) of stamping an outgoing entry's
    /// `timestamp` metadata with the current wall time.
    pub timestamp_sample_rate: f64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_msg_per_second: 0,
            max_queue_size: 5_000_000,
            timestamp_sample_rate: 1.0,
        }
    }
}

/// A one-second fixed window for the admission rate check. Reset whenever
/// a call observes a new wall-clock second, matching spec.md §8's boundary
/// scenario ("submitting two calls of size `M` within one second").
struct RateWindow {
    second: u64,
    admitted: u64,
}

pub struct Dispatcher {
    status: Arc<Mutex<ServerStatus>>,
    /// Behind a lock so `SIGHUP` reinit (spec.md §A.5) can swap in a freshly
    /// built registry without replacing the `Dispatcher` itself — the RPC
    /// server holds this by a fixed `Arc` for its whole run, so the part
    /// that changes on reinit has to be interior.
    registry: RwLock<Arc<CategoryRegistry>>,
    config: DispatcherConfig,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    metrics: Arc<dyn MetricsSink>,
    rate_window: Mutex<RateWindow>,
    messages_in: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        status: Arc<Mutex<ServerStatus>>,
        registry: Arc<CategoryRegistry>,
        config: DispatcherConfig,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            status,
            registry: RwLock::new(registry),
            config,
            clock,
            random,
            metrics,
            rate_window: Mutex::new(RateWindow { second: 0, admitted: 0 }),
            messages_in: AtomicU64::new(0),
        }
    }

    /// Installs `new_registry` and returns the previous one, for `SIGHUP`
    /// reinit (spec.md §A.5). The caller is responsible for stopping the
    /// returned registry's queues once it's satisfied any in-flight work
    /// against them has drained.
    pub async fn swap_registry(&self, new_registry: Arc<CategoryRegistry>) -> Arc<CategoryRegistry> {
        std::mem::replace(&mut *self.registry.write().await, new_registry)
    }

    /// The currently installed registry, for shutdown (`stop_all`) and for
    /// admission checks outside of `log` itself.
    pub async fn registry(&self) -> Arc<CategoryRegistry> {
        Arc::clone(&*self.registry.read().await)
    }

    /// spec.md §4.8: the dispatcher's one entry point.
    pub async fn log(&self, mut batch: Batch) -> LogCode {
        let batch_len = batch.len() as u64;
        self.metrics.counter("message.in", batch_len as i64);
        self.messages_in.fetch_add(batch_len, Ordering::Relaxed);

        // Step 1: server shutting down.
        if *self.status.lock() == ServerStatus::Stopping {
            self.metrics.counter("message.deny_stopping", batch_len as i64);
            return LogCode::TryLater;
        }

        // Step 2a: per-second admission rate, with the live-lock escape
        // hatch for batches so large that rejecting them would just mean
        // the client immediately resubmits the same oversized batch.
        if self.config.max_msg_per_second > 0 {
            let half = self.config.max_msg_per_second / 2;
            let catastrophic = batch_len > half;
            if !catastrophic {
                let now_sec = self.clock.wall_ms() / 1000;
                let mut window = self.rate_window.lock();
                if window.second != now_sec {
                    window.second = now_sec;
                    window.admitted = 0;
                }
                if window.admitted + batch_len > self.config.max_msg_per_second {
                    self.metrics.counter("message.deny_rate", batch_len as i64);
                    return LogCode::TryLater;
                }
                window.admitted += batch_len;
            } else {
                let now_sec = self.clock.wall_ms() / 1000;
                let mut window = self.rate_window.lock();
                if window.second != now_sec {
                    window.second = now_sec;
                    window.admitted = 0;
                }
                window.admitted += batch_len;
            }
        }

        let registry = Arc::clone(&*self.registry.read().await);

        // Step 2b: any worker queue over its byte budget.
        if self.config.max_queue_size > 0 {
            for queue in registry.all_queues().await {
                if queue.size() > self.config.max_queue_size {
                    self.metrics.counter("message.deny_queue", batch_len as i64);
                    return LogCode::TryLater;
                }
            }
        }

        // Step 3: per-entry validation, resolution, and enqueue.
        for mut entry in batch.drain(..) {
            if entry.category.is_empty() {
                self.metrics.counter("message.ignore", 1);
                continue;
            }
            if !is_portable_filename(&entry.category) {
                self.metrics.category_counter(&entry.category, "ignore", 1);
                continue;
            }

            let Some(queues) = registry.resolve(&entry.category).await else {
                self.metrics.category_counter(&entry.category, "ignore", 1);
                continue;
            };

            if let Some(sent_ms) = entry.timestamp_ms() {
                let now_ms = self.clock.wall_ms();
                let latency_ms = now_ms.saturating_sub(sent_ms) as i64;
                self.metrics.histogram(&format!("{}.hop_latency", entry.category), latency_ms);
                entry.remove_timestamp();
            }

            if self.random.next_f64() < self.config.timestamp_sample_rate {
                entry.set_timestamp_ms(self.clock.wall_ms());
            }

            self.metrics.category_counter(&entry.category, "admit", 1);
            self.enqueue_into(queues, entry);
        }

        LogCode::Ok
    }

    /// Clones `entry` into every resolved queue but the last, which gets
    /// the original (spec.md §4.8 step 3f: "shallow copy; shared body is
    /// acceptable if immutable").
    fn enqueue_into(&self, mut queues: Vec<Arc<crate::worker_queue::WorkerQueue>>, entry: LogEntry) {
        let Some(last) = queues.pop() else { return };
        for queue in queues {
            queue.enqueue(entry.clone());
        }
        last.enqueue(entry);
    }
}

#[async_trait]
impl LogHandler for Dispatcher {
    async fn handle_log(&self, batch: Batch) -> LogCode {
        self.log(batch).await
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
