// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level settings read once at startup from the root of the
//! configuration tree (spec.md §4.1 "Server-wide settings"). Defaults are
//! taken from the original's `ScribeServer.cpp` constants.

use std::sync::Arc;

use scribe_core::conf::ConfNode;

const DEFAULT_PORT: u16 = 1463;
const DEFAULT_CHECK_PERIOD_SECS: u64 = 5;
const DEFAULT_MAX_MSG_PER_SECOND: u64 = 0;
const DEFAULT_MAX_QUEUE_SIZE: u64 = 5_000_000;
const DEFAULT_SERVER_THREADS: u32 = 3;
const DEFAULT_MAX_CONN: u32 = 0;
const DEFAULT_MAX_CONCURRENT_REQUEST: u32 = 0;
const DEFAULT_NEW_THREAD_PER_CATEGORY: bool = true;
const DEFAULT_TIMESTAMP_SAMPLE_RATE: f64 = 1.0;

/// Server-wide settings that apply to the whole process rather than to any
/// one store. Unset keys fall back to the same defaults the original ships.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    pub port: u16,
    pub check_period_secs: u64,
    pub max_msg_per_second: u64,
    pub max_queue_size: u64,
    pub num_thrift_server_threads: u32,
    pub max_conn: u32,
    pub max_concurrent_request: u32,
    pub new_thread_per_category: bool,
    /// Probability (`0.0..=1.0`) of stamping an outgoing entry with the
    /// current wall time (spec.md §6: "`timestamp_sample_rate` (float, 0..1)").
    pub timestamp_sample_rate: f64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            check_period_secs: DEFAULT_CHECK_PERIOD_SECS,
            max_msg_per_second: DEFAULT_MAX_MSG_PER_SECOND,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            num_thrift_server_threads: DEFAULT_SERVER_THREADS,
            max_conn: DEFAULT_MAX_CONN,
            max_concurrent_request: DEFAULT_MAX_CONCURRENT_REQUEST,
            new_thread_per_category: DEFAULT_NEW_THREAD_PER_CATEGORY,
            timestamp_sample_rate: DEFAULT_TIMESTAMP_SAMPLE_RATE,
        }
    }
}

impl GlobalConfig {
    /// Reads the server-wide keys off the root node. `category`/`categories`
    /// and store blocks themselves are ignored here; the registry builds
    /// those from `ConfNode::all_stores`/`category_list` separately.
    pub fn from_root(root: &Arc<ConfNode>) -> Self {
        let defaults = Self::default();
        Self {
            port: root
                .own_string("port")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            check_period_secs: root
                .own_string("check_interval")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.check_period_secs),
            max_msg_per_second: root
                .own_string("max_msg_per_second")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_msg_per_second),
            max_queue_size: root
                .own_string("max_queue_size")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_queue_size),
            num_thrift_server_threads: root
                .own_string("num_thrift_server_threads")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.num_thrift_server_threads),
            max_conn: root
                .own_string("max_conn")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_conn),
            max_concurrent_request: root
                .own_string("max_concurrent_request")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_concurrent_request),
            new_thread_per_category: root
                .own_string("new_thread_per_category")
                .map(|v| matches!(v, "yes" | "true" | "1"))
                .unwrap_or(defaults.new_thread_per_category),
            timestamp_sample_rate: root
                .own_string("timestamp_sample_rate")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(defaults.timestamp_sample_rate),
        }
    }
}

#[cfg(test)]
#[path = "global_tests.rs"]
mod tests;
