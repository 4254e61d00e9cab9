// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A write-only metrics sink (spec.md §6 "Metrics sink").
//!
//! The real counters/histograms backend is an external collaborator
//! referenced only by interface. This module supplements that with a
//! minimal, testable in-memory implementation plus the per-category →
//! `scribe_overall` aggregation rule §6 fixes.

use std::collections::HashMap;

use parking_lot::Mutex;

/// The fixed counter-name suffixes §6 requires to exist for every category,
/// aggregated into `scribe_overall.<metric>`.
pub const AGGREGATED_SUFFIXES: &[&str] = &[
    "in", "admit", "ignore", "deny_queue", "deny_rate", "enqueue", "dequeue", "requeue", "lost",
];

/// The companion category every per-category counter also rolls up into.
pub const OVERALL_CATEGORY: &str = "scribe_overall";

pub trait MetricsSink: Send + Sync + 'static {
    fn counter(&self, name: &str, delta: i64);
    fn stat(&self, name: &str, value: i64);
    fn histogram(&self, name: &str, value_ms: i64);

    /// Increments `<category>.<metric>` and, if `metric` is one of the
    /// aggregated suffixes, also `scribe_overall.<metric>`.
    fn category_counter(&self, category: &str, metric: &str, delta: i64) {
        self.counter(&format!("{category}.{metric}"), delta);
        if AGGREGATED_SUFFIXES.contains(&metric) {
            self.counter(&format!("{OVERALL_CATEGORY}.{metric}"), delta);
        }
    }
}

/// Discards everything. The default for unit tests that don't assert on
/// metrics.
#[derive(Debug, Default)]
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn counter(&self, _name: &str, _delta: i64) {}
    fn stat(&self, _name: &str, _value: i64) {}
    fn histogram(&self, _name: &str, _value_ms: i64) {}
}

/// Records everything in an in-process table, for tests and for a
/// dependency-free default in the daemon binary.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<HashMap<String, i64>>,
    stats: Mutex<HashMap<String, i64>>,
    histograms: Mutex<HashMap<String, Vec<i64>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter_value(&self, name: &str) -> i64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn stat_value(&self, name: &str) -> Option<i64> {
        self.stats.lock().get(name).copied()
    }

    pub fn histogram_values(&self, name: &str) -> Vec<i64> {
        self.histograms.lock().get(name).cloned().unwrap_or_default()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn counter(&self, name: &str, delta: i64) {
        *self.counters.lock().entry(name.to_string()).or_insert(0) += delta;
    }

    fn stat(&self, name: &str, value: i64) {
        self.stats.lock().insert(name.to_string(), value);
    }

    fn histogram(&self, name: &str, value_ms: i64) {
        self.histograms.lock().entry(name.to_string()).or_default().push(value_ms);
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
