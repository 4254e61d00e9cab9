// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffer store (spec.md §4.5): a primary/secondary failover pair with a
//! `Streaming -> Disconnected -> SendingBuffer -> Streaming` state machine.

use std::sync::Arc;

use async_trait::async_trait;
use scribe_core::clock::{CalendarNow, Clock, SystemClock};
use scribe_core::conf::ConfNode;
use scribe_core::entry::Batch;
use scribe_core::random::{RandomSource, SystemRandom};

use crate::error::StoreConfigError;
use crate::traits::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Streaming,
    Disconnected,
    SendingBuffer,
}

#[derive(Debug, Clone)]
pub struct BufferStoreConfig {
    pub buffer_send_rate: u32,
    pub retry_interval_ms: u64,
    pub retry_interval_range_ms: u64,
    pub replay_buffer: bool,
    pub adaptive_backoff: bool,
    pub min_retry_interval_ms: u64,
    pub max_retry_interval_ms: u64,
    pub max_random_offset_ms: u64,
    pub flush_streaming: bool,
    pub buffer_bypass_max_ratio: f64,
    pub success_threshold: u32,
}

impl Default for BufferStoreConfig {
    fn default() -> Self {
        Self {
            buffer_send_rate: 5,
            retry_interval_ms: 5_000,
            retry_interval_range_ms: 0,
            replay_buffer: true,
            adaptive_backoff: false,
            min_retry_interval_ms: 1_000,
            max_retry_interval_ms: 60_000,
            max_random_offset_ms: 0,
            flush_streaming: false,
            buffer_bypass_max_ratio: 2.0,
            success_threshold: 3,
        }
    }
}

pub struct BufferStore {
    primary: Box<dyn Store>,
    secondary: Box<dyn Store>,
    config: BufferStoreConfig,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    state: BufferState,
    current_retry_ms: u64,
    retry_deadline_ms: Option<u64>,
    consecutive_successes: u32,
    open: bool,
}

impl BufferStore {
    pub fn new(primary: Box<dyn Store>, secondary: Box<dyn Store>) -> Result<Self, StoreConfigError> {
        if !secondary.is_readable() {
            return Err(StoreConfigError::IncompleteBuffer);
        }
        let config = BufferStoreConfig::default();
        let current_retry_ms = config.retry_interval_ms;
        Ok(Self {
            primary,
            secondary,
            config,
            random: Arc::new(SystemRandom::new()),
            clock: Arc::new(SystemClock),
            state: BufferState::Streaming,
            current_retry_ms,
            retry_deadline_ms: None,
            consecutive_successes: 0,
            open: false,
        })
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    fn next_retry_interval(&mut self, failed: bool) -> u64 {
        if self.config.adaptive_backoff {
            if failed {
                self.consecutive_successes = 0;
                let offset = self.random.next_u32_below(
                    self.config.max_random_offset_ms.max(1) as u32,
                ) as u64;
                let grown = (self.current_retry_ms as f64 * std::f64::consts::SQRT_2) as u64;
                self.current_retry_ms = (grown + offset).min(self.config.max_retry_interval_ms);
            } else {
                self.consecutive_successes += 1;
                if self.consecutive_successes >= self.config.success_threshold {
                    self.consecutive_successes = 0;
                    self.current_retry_ms = self
                        .current_retry_ms
                        .saturating_sub(2)
                        .max(self.config.min_retry_interval_ms);
                }
            }
            self.current_retry_ms
        } else {
            let avg = self.config.retry_interval_ms;
            let half_range = self.config.retry_interval_range_ms / 2;
            if half_range == 0 {
                avg
            } else {
                let low = avg.saturating_sub(half_range);
                let span = half_range * 2;
                low + self.random.next_u32_below(span.max(1) as u32) as u64
            }
        }
    }

    fn arm_retry_timer(&mut self) {
        let interval = self.next_retry_interval(true);
        self.retry_deadline_ms = Some(self.clock.monotonic_ms() + interval);
    }

    fn retry_timer_elapsed(&self) -> bool {
        match self.retry_deadline_ms {
            Some(deadline) => self.clock.monotonic_ms() >= deadline,
            None => true,
        }
    }

    async fn enter_disconnected(&mut self) {
        self.primary.close().await;
        self.secondary.open().await;
        self.arm_retry_timer();
        self.state = BufferState::Disconnected;
    }

    async fn enter_streaming(&mut self) {
        self.secondary.close().await;
        self.state = BufferState::Streaming;
    }

    async fn enter_sending_buffer(&mut self) {
        self.state = BufferState::SendingBuffer;
    }
}

#[async_trait]
impl Store for BufferStore {
    async fn configure(&mut self, conf: &Arc<ConfNode>) -> Result<(), StoreConfigError> {
        self.config.buffer_send_rate = conf.get_unsigned("buffer_send_rate").unwrap_or(5) as u32;
        self.config.retry_interval_ms =
            conf.get_unsigned("retry_interval").unwrap_or(5) * 1000;
        self.config.retry_interval_range_ms =
            conf.get_unsigned("retry_interval_range").unwrap_or(0) * 1000;
        self.config.replay_buffer = conf.get_bool("replay_buffer").unwrap_or(true);
        self.config.adaptive_backoff = conf.get_bool("adaptive_backoff").unwrap_or(false);
        self.config.min_retry_interval_ms =
            conf.get_unsigned("min_retry_interval").unwrap_or(1) * 1000;
        self.config.max_retry_interval_ms =
            conf.get_unsigned("max_retry_interval").unwrap_or(60) * 1000;
        self.config.max_random_offset_ms = conf.get_unsigned("max_random_offset").unwrap_or(0);
        self.config.flush_streaming = conf.get_bool("flush_streaming").unwrap_or(false);
        self.config.buffer_bypass_max_ratio =
            conf.get_float("buffer_bypass_max_ratio").unwrap_or(2.0);
        self.current_retry_ms = self.config.retry_interval_ms;

        if let Some(primary_conf) = conf.get_store("primary") {
            self.primary.configure(&primary_conf).await?;
        }
        if let Some(secondary_conf) = conf.get_store("secondary") {
            self.secondary.configure(&secondary_conf).await?;
        }
        Ok(())
    }

    async fn open(&mut self) -> bool {
        let primary_ok = self.primary.open().await;
        if primary_ok {
            if self.config.replay_buffer {
                self.enter_sending_buffer().await;
            } else {
                self.enter_streaming().await;
            }
        } else {
            self.enter_disconnected().await;
        }
        self.open = true;
        true
    }

    async fn close(&mut self) {
        self.primary.close().await;
        self.secondary.close().await;
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn handle_batch(&mut self, batch: &mut Batch) -> bool {
        match self.state {
            BufferState::Streaming => {
                let ok = self.primary.handle_batch(batch).await;
                if !ok {
                    self.enter_disconnected().await;
                }
                ok
            }
            BufferState::Disconnected => self.secondary.handle_batch(batch).await,
            BufferState::SendingBuffer => {
                if self.config.flush_streaming {
                    let ok = self.primary.handle_batch(batch).await;
                    if !ok {
                        self.enter_disconnected().await;
                    }
                    ok
                } else {
                    self.secondary.handle_batch(batch).await
                }
            }
        }
    }

    async fn flush(&mut self) {
        self.primary.flush().await;
        self.secondary.flush().await;
    }

    async fn periodic_check(&mut self, pending_bytes: u64, max_queue_size: u64) {
        self.primary.periodic_check(pending_bytes, max_queue_size).await;
        self.secondary.periodic_check(pending_bytes, max_queue_size).await;

        match self.state {
            BufferState::Streaming => {}
            BufferState::Disconnected => {
                if self.retry_timer_elapsed() && self.primary.open().await {
                    self.enter_sending_buffer().await;
                }
            }
            BufferState::SendingBuffer => {
                // spec.md §4.5: when new traffic is also being sent straight
                // to the primary (`flush_streaming`), yield this tick's
                // secondary-draining once the owning queue's backlog grows
                // past `buffer_bypass_max_ratio * max_queue_size`, so the
                // primary connection isn't monopolized by the backlog drain
                // (`examples/original_source/src/BufferStore.cpp`'s
                // `flushStreaming_` + `maxByPassRatio_` guard).
                if self.config.flush_streaming
                    && max_queue_size > 0
                    && pending_bytes as f64 >= self.config.buffer_bypass_max_ratio * max_queue_size as f64
                {
                    return;
                }
                let now = self.clock.calendar();
                let mut drained = 0u32;
                while drained < self.config.buffer_send_rate {
                    if self.secondary.empty(&now).await {
                        self.enter_streaming().await;
                        return;
                    }
                    let mut oldest = self.secondary.read_oldest(&now).await;
                    if oldest.is_empty() {
                        self.enter_streaming().await;
                        return;
                    }
                    let ok = self.primary.handle_batch(&mut oldest).await;
                    if ok {
                        self.secondary.delete_oldest(&now).await;
                        self.next_retry_interval(false);
                    } else if oldest.is_empty() {
                        // Should not happen alongside ok == false, but
                        // guards against a store returning an empty
                        // residual while still reporting failure.
                        self.secondary.delete_oldest(&now).await;
                    } else {
                        let replaced = self.secondary.replace_oldest(oldest, &now).await;
                        if !replaced {
                            tracing::warn!("buffer secondary replace_oldest failed, residual lost");
                        }
                        self.enter_disconnected().await;
                        return;
                    }
                    drained += 1;
                }
            }
        }
    }

    fn copy(&self, category: &str) -> Box<dyn Store> {
        Box::new(BufferStore {
            primary: self.primary.copy(category),
            secondary: self.secondary.copy(category),
            config: self.config.clone(),
            random: Arc::clone(&self.random),
            clock: Arc::clone(&self.clock),
            state: BufferState::Streaming,
            current_retry_ms: self.config.retry_interval_ms,
            retry_deadline_ms: None,
            consecutive_successes: 0,
            open: false,
        })
    }

    fn status(&self) -> String {
        let primary_status = self.primary.status();
        if !primary_status.is_empty() {
            return primary_status;
        }
        self.secondary.status()
    }

    fn type_name(&self) -> &'static str {
        "buffer"
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
