// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker queue (spec.md §4.7): owns exactly one [`Store`] and runs a
//! single worker task that alternates between command handling, periodic
//! checks, and batch draining.
//!
//! Per spec.md §9's redesign guidance ("model the worker inbox as a
//! channel... the worker selects between that channel and a periodic
//! timer"), the command inbox is a `tokio::sync::mpsc` channel rather than
//! a mutex-guarded `VecDeque` plus a separate condvar; the pending-message
//! FIFO and byte counter remain worker-owned state behind a single
//! `parking_lot::Mutex` (the spec's `msg_mutex`), since `enqueue` and the
//! drain decision both need the two values to stay consistent with each
//! other (§8 "Universal invariants": `size() == Σ len(message)`).
//!
//! A *model* queue — one that exists only to be cloned per concrete
//! category (§3 "Model store / model queue") — never becomes a
//! [`WorkerQueue`] at all: [`crate::registry::CategoryRegistry`] holds its
//! store and config as a [`ModelQueue`] and only calls [`WorkerQueue::spawn`]
//! once a concrete category needs a live queue. This sidesteps the
//! original's `is_model` flag on a single class: a queue that is never
//! spawned cannot accidentally run.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use scribe_core::clock::Clock;
use scribe_core::conf::ConfNode;
use scribe_core::entry::{Batch, LogEntry};
use scribe_core::metrics::MetricsSink;
use scribe_store::Store;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Per-queue tunables read off a store's own configuration block
/// (spec.md §6 "Per-store": `target_write_size`, `max_write_interval`,
/// `must_succeed`). `check_period` and `max_queue_size` are the
/// server-wide `check_interval`/`max_queue_size` (spec.md §6 "Global") —
/// every queue shares one value of each, but they're carried per-queue so
/// a model's clones can be spawned without a back reference to the
/// registry. `max_queue_size` is handed to the store's `periodic_check`
/// (spec.md §4.5 `buffer_bypass_max_ratio`); `0` means unbounded.
#[derive(Debug, Clone, Copy)]
pub struct WorkerQueueConfig {
    pub target_write_size: u64,
    pub max_write_interval: Duration,
    pub check_period: Duration,
    pub must_succeed: bool,
    pub max_queue_size: u64,
}

impl Default for WorkerQueueConfig {
    fn default() -> Self {
        Self {
            target_write_size: 1_000_000,
            max_write_interval: Duration::from_secs(10),
            check_period: Duration::from_secs(5),
            must_succeed: false,
            max_queue_size: 0,
        }
    }
}

impl WorkerQueueConfig {
    /// Reads `target_write_size` / `max_write_interval` / `must_succeed`
    /// from `conf`; `check_period` and `max_queue_size` come from the
    /// server-wide config, not from this node.
    pub fn from_conf(conf: &Arc<ConfNode>, check_period: Duration, max_queue_size: u64) -> Self {
        let defaults = Self::default();
        Self {
            target_write_size: conf
                .get_unsigned("target_write_size")
                .unwrap_or(defaults.target_write_size),
            max_write_interval: conf
                .get_unsigned("max_write_interval")
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_write_interval),
            check_period,
            must_succeed: conf.get_bool("must_succeed").unwrap_or(defaults.must_succeed),
            max_queue_size,
        }
    }
}

/// A configured-but-never-run store + config, kept by the category
/// registry for a pattern or `default` entry so it can be cloned into a
/// live [`WorkerQueue`] the first time a matching concrete category is
/// seen (spec.md §3 "Model store / model queue").
pub struct ModelQueue {
    pub store: Box<dyn Store>,
    pub config: WorkerQueueConfig,
    /// The configuration block this model was built from, kept so a
    /// freshly-spawned clone can `configure` itself identically (model
    /// stores themselves don't expose their configuring node back).
    pub conf: Arc<ConfNode>,
}

impl ModelQueue {
    pub fn new(store: Box<dyn Store>, config: WorkerQueueConfig, conf: Arc<ConfNode>) -> Self {
        Self { store, config, conf }
    }

    /// Deep-clones the model's store for `category` without spawning a
    /// worker task — used both to create a dedicated per-category queue
    /// (`new_thread_per_category=yes`) and, when it's `false`, to build
    /// the one shared store every matching category funnels through.
    pub fn clone_store(&self, category: &str) -> Box<dyn Store> {
        self.store.copy(category)
    }
}

enum Command {
    Configure(Arc<ConfNode>),
    Open,
    Stop,
}

struct PendingState {
    pending: VecDeque<LogEntry>,
    byte_count: u64,
    failed_batch: Option<Batch>,
}

impl PendingState {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            byte_count: 0,
            failed_batch: None,
        }
    }
}

/// A live worker queue: exactly one store, one pending-message FIFO, and
/// one worker task (spec.md §4.7). Shared by [`crate::dispatcher::Dispatcher`]
/// (to `enqueue`) and [`crate::registry::CategoryRegistry`] (to `stop`
/// on shutdown or re-`configure` on reinit).
///
/// `multi_category` records that this queue is shared across more than
/// one concrete category (`new_thread_per_category=no`): the underlying
/// store still recovers each entry's own category from `LogEntry::category`
/// at write time (every store's `handle_batch` already writes per-entry
/// fields, not a queue-wide default), so this flag is bookkeeping for
/// `status`/metrics rather than a behavior switch on the store itself —
/// see DESIGN.md for why the store trait was not given a `set_multi_category`
/// method to carry this instead.
pub struct WorkerQueue {
    category: String,
    multi_category: bool,
    cmd_tx: mpsc::UnboundedSender<Command>,
    notify: Arc<Notify>,
    state: Arc<Mutex<PendingState>>,
    config: WorkerQueueConfig,
    stopped: Arc<AtomicBool>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerQueue {
    /// Spawns the worker task and returns a handle to it. `store` should
    /// already be `copy()`'d for `category`; this call pushes `Configure`
    /// then `Open` as its first two commands, matching how a top-level
    /// store config or a freshly-cloned model queue comes up (spec.md §3
    /// "Lifecycles").
    pub fn spawn(
        category: impl Into<String>,
        multi_category: bool,
        mut store: Box<dyn Store>,
        conf: Arc<ConfNode>,
        config: WorkerQueueConfig,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Arc<WorkerQueue> {
        let category = category.into();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let notify = Arc::new(Notify::new());
        let state = Arc::new(Mutex::new(PendingState::new()));
        let stopped = Arc::new(AtomicBool::new(false));

        let task_category = category.clone();
        let task_state = Arc::clone(&state);
        let task_notify = Arc::clone(&notify);
        let task_stopped = Arc::clone(&stopped);
        let task_config = config;

        let join = tokio::spawn(async move {
            // `store` isn't configured/opened yet; Configure/Open arrive
            // as the first two queued commands below.
            run_worker(
                &mut store,
                task_category,
                task_state,
                cmd_rx,
                task_notify,
                task_stopped,
                task_config,
                clock,
                metrics,
            )
            .await;
        });

        let queue = Arc::new(WorkerQueue {
            category,
            multi_category,
            cmd_tx,
            notify,
            state,
            config,
            stopped,
            join: Mutex::new(Some(join)),
        });
        queue.configure_and_open(conf);
        queue
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_multi_category(&self) -> bool {
        self.multi_category
    }

    /// Appends `entry` to the pending FIFO, adding its byte length to the
    /// running counter (spec.md §4.7 `enqueue`). Signals has-work once the
    /// counter reaches `target_write_size`.
    pub fn enqueue(&self, entry: LogEntry) {
        let mut state = self.state.lock();
        state.byte_count += entry.byte_len() as u64;
        state.pending.push_back(entry);
        let reached_threshold = state.byte_count >= self.config.target_write_size;
        drop(state);
        if reached_threshold {
            self.notify.notify_one();
        }
    }

    /// Racy snapshot of pending bytes, used by the dispatcher for
    /// admission decisions (spec.md §4.7 `size()`).
    pub fn size(&self) -> u64 {
        self.state.lock().byte_count
    }

    /// Pushes `Configure` then `Open` onto the command inbox.
    pub fn configure_and_open(&self, conf: Arc<ConfNode>) {
        let _ = self.cmd_tx.send(Command::Configure(conf));
        let _ = self.cmd_tx.send(Command::Open);
        self.notify.notify_one();
    }

    pub fn open(&self) {
        let _ = self.cmd_tx.send(Command::Open);
        self.notify.notify_one();
    }

    /// Pushes `Stop` and waits for the worker task to finish draining and
    /// exit (spec.md §4.7 `stop()`, §5 "joins each worker thread").
    pub async fn stop(&self) {
        let _ = self.cmd_tx.send(Command::Stop);
        self.notify.notify_one();
        let handle = self.join.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_worker(
    store: &mut Box<dyn Store>,
    category: String,
    state: Arc<Mutex<PendingState>>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    notify: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    config: WorkerQueueConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsSink>,
) {
    let mut last_check_ms = clock.monotonic_ms();
    let mut last_drain_ms = clock.monotonic_ms();

    loop {
        // 1. Drain all pending commands synchronously.
        let mut terminate = false;
        loop {
            match cmd_rx.try_recv() {
                Ok(Command::Configure(conf)) => {
                    if let Err(e) = store.configure(&conf).await {
                        tracing::warn!(category = %category, error = %e, "store configure failed");
                    }
                }
                Ok(Command::Open) => {
                    if !store.open().await {
                        tracing::warn!(category = %category, status = %store.status(), "store open failed");
                    } else {
                        tracing::info!(category = %category, "store opened");
                    }
                }
                Ok(Command::Stop) => terminate = true,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    terminate = true;
                    break;
                }
            }
        }

        let now = clock.monotonic_ms();
        if now.saturating_sub(last_check_ms) >= config.check_period.as_millis() as u64 {
            let pending_bytes = state.lock().byte_count;
            store.periodic_check(pending_bytes, config.max_queue_size).await;
            last_check_ms = now;
        }

        // 2. Decide whether to drain, preferring a held-over failed batch.
        let to_send = {
            let mut st = state.lock();
            let elapsed = now.saturating_sub(last_drain_ms);
            let should_drain = terminate
                || elapsed >= config.max_write_interval.as_millis() as u64
                || st.byte_count >= config.target_write_size;

            if let Some(failed) = st.failed_batch.take() {
                Some(failed)
            } else if should_drain {
                last_drain_ms = now;
                if st.pending.is_empty() {
                    None
                } else {
                    let batch: Batch = st.pending.drain(..).collect();
                    st.byte_count = 0;
                    Some(batch)
                }
            } else {
                None
            }
        };

        // 3. Hand off to the store; account for the residual.
        if let Some(mut batch) = to_send {
            let sent = batch.len();
            let ok = store.handle_batch(&mut batch).await;
            if ok {
                metrics.category_counter(&category, "dequeue", sent as i64);
            } else {
                let residual = batch.len();
                let delivered = sent - residual;
                if delivered > 0 {
                    metrics.category_counter(&category, "dequeue", delivered as i64);
                }
                if config.must_succeed {
                    metrics.category_counter(&category, "requeue", residual as i64);
                    state.lock().failed_batch = Some(batch);
                } else {
                    metrics.category_counter(&category, "lost", residual as i64);
                }
            }
            store.flush().await;
        }

        if terminate {
            store.close().await;
            stopped.store(true, Ordering::SeqCst);
            return;
        }

        // 4. Wait until the next periodic check or drain deadline, or
        // until signaled by `enqueue`/a new command.
        let next_check_ms = config.check_period.as_millis() as u64;
        let next_drain_ms = config.max_write_interval.as_millis() as u64;
        let wait_ms = next_check_ms.min(next_drain_ms).max(1);
        tokio::select! {
            _ = notify.notified() => {}
            _ = tokio::time::sleep(Duration::from_millis(wait_ms)) => {}
        }
    }
}

#[cfg(test)]
#[path = "worker_queue_tests.rs"]
mod tests;
