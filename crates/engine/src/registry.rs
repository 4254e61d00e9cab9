// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Category registry (spec.md §4.9): maps exact category names and
//! category prefixes to worker queues, creating new queues from
//! prototypes on first-seen categories.
//!
//! Three data structures, named after spec.md's own terms:
//! - `categories` — exact name -> non-empty list of live [`WorkerQueue`]s,
//!   populated eagerly at build time for every top-level store whose
//!   `category`/`categories` key names a concrete (non-pattern,
//!   non-`default`) category, and lazily afterward the first time the
//!   dispatcher sees a concrete category matched by a pattern or `default`.
//! - `category_prefixes` — pattern name (`"web*"`) -> [`ModelQueue`]s,
//!   configured order preserved so "first prefix in configured order wins"
//!   (spec.md §4.9) is a linear scan, not a second lookup structure.
//! - `default_stores` — [`ModelQueue`]s used when no pattern matched.
//!
//! Exact-match wins; then first matching prefix; then default. Locking
//! follows spec.md §5's prescribed order: the exact-category map is read
//! under a shared lock and only upgraded to exclusive to insert a newly
//! created category's queue list.

use std::collections::HashMap;
use std::sync::Arc;

use scribe_core::category::{is_prefix_pattern, pattern_matches, DEFAULT_CATEGORY};
use scribe_core::clock::Clock;
use scribe_core::conf::ConfNode;
use scribe_core::metrics::MetricsSink;
use scribe_store::{build_store_with, StoreDeps};
use tokio::sync::RwLock;

use crate::error::EngineError;
use crate::worker_queue::{ModelQueue, WorkerQueue, WorkerQueueConfig};

/// Which model prototype(s) matched a category that needed a new queue.
enum Matched<'a> {
    Prefix { key: &'a str, models: &'a [ModelQueue] },
    Default { models: &'a [ModelQueue] },
}

pub struct CategoryRegistry {
    new_thread_per_category: bool,
    check_period: std::time::Duration,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsSink>,

    exact: RwLock<HashMap<String, Vec<Arc<WorkerQueue>>>>,
    category_prefixes: Vec<(String, Vec<ModelQueue>)>,
    default_stores: Vec<ModelQueue>,

    /// Lazily-spawned shared queues for `new_thread_per_category=no`,
    /// keyed by the pattern (or `"default"`) that produced them rather
    /// than by concrete category, since every matching category reuses
    /// the same queue set.
    shared: RwLock<HashMap<String, Vec<Arc<WorkerQueue>>>>,
}

impl CategoryRegistry {
    /// Builds the registry from the configuration root: every top-level
    /// store block (spec.md §3 "Lifecycles": "created ... from a
    /// top-level store config at init") is classified by its
    /// `category`/`categories` key into an eagerly-spawned exact-category
    /// queue, a pattern model, or a default model.
    ///
    /// Per spec.md §7's "Config error" policy, a block that is unusable
    /// (unknown `type`, missing required key, a second block claiming
    /// `default`, or no `category`/`categories` at all) is logged and
    /// skipped rather than aborting the whole server — the caller only
    /// sees [`EngineError::NoStoresConfigured`] if *nothing* ended up
    /// runnable. Returns the registry plus whether any block was skipped,
    /// so the caller can set server status to `Warning` rather than
    /// `Running` when it was.
    pub async fn build(
        root: &Arc<ConfNode>,
        new_thread_per_category: bool,
        check_period: std::time::Duration,
        max_queue_size: u64,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn MetricsSink>,
        store_deps: StoreDeps,
    ) -> Result<(Self, bool), EngineError> {
        let mut exact = HashMap::new();
        let mut category_prefixes: Vec<(String, Vec<ModelQueue>)> = Vec::new();
        let mut default_stores = Vec::new();
        let mut saw_default = false;
        let mut had_warnings = false;
        let mut configured_count = 0u32;

        for (block, store_conf) in root.all_stores() {
            let names = store_conf.category_list();
            if names.is_empty() {
                tracing::warn!(block, "store block declares no category or categories, skipping");
                had_warnings = true;
                continue;
            }
            let config = WorkerQueueConfig::from_conf(&store_conf, check_period, max_queue_size);

            for name in names {
                if name == DEFAULT_CATEGORY {
                    if saw_default {
                        tracing::warn!(block, "more than one store claims the 'default' category, skipping");
                        had_warnings = true;
                        continue;
                    }
                    let store = match build_store_with(&store_conf, &store_deps) {
                        Ok(store) => store,
                        Err(source) => {
                            tracing::warn!(block, category = %name, error = %source, "failed to configure store, skipping");
                            had_warnings = true;
                            continue;
                        }
                    };
                    saw_default = true;
                    default_stores.push(ModelQueue::new(store, config, Arc::clone(&store_conf)));
                    configured_count += 1;
                } else if is_prefix_pattern(&name) {
                    let store = match build_store_with(&store_conf, &store_deps) {
                        Ok(store) => store,
                        Err(source) => {
                            tracing::warn!(block, category = %name, error = %source, "failed to configure store, skipping");
                            had_warnings = true;
                            continue;
                        }
                    };
                    match category_prefixes.iter_mut().find(|(p, _)| p == &name) {
                        Some((_, models)) => models.push(ModelQueue::new(store, config, Arc::clone(&store_conf))),
                        None => category_prefixes.push((
                            name.clone(),
                            vec![ModelQueue::new(store, config, Arc::clone(&store_conf))],
                        )),
                    }
                    configured_count += 1;
                } else {
                    let mut store = match build_store_with(&store_conf, &store_deps) {
                        Ok(store) => store,
                        Err(source) => {
                            tracing::warn!(block, category = %name, error = %source, "failed to configure store, skipping");
                            had_warnings = true;
                            continue;
                        }
                    };
                    store = store.copy(&name);
                    let queue = WorkerQueue::spawn(
                        name.clone(),
                        false,
                        store,
                        Arc::clone(&store_conf),
                        config,
                        Arc::clone(&clock),
                        Arc::clone(&metrics),
                    );
                    exact.entry(name).or_insert_with(Vec::new).push(queue);
                    configured_count += 1;
                }
            }
        }

        if configured_count == 0 {
            return Err(EngineError::NoStoresConfigured);
        }

        Ok((
            Self {
                new_thread_per_category,
                check_period,
                clock,
                metrics,
                exact: RwLock::new(exact),
                category_prefixes,
                default_stores,
                shared: RwLock::new(HashMap::new()),
            },
            had_warnings,
        ))
    }

    fn match_pattern_or_default(&self, category: &str) -> Option<Matched<'_>> {
        for (pattern, models) in &self.category_prefixes {
            if pattern_matches(pattern, category) {
                return Some(Matched::Prefix { key: pattern, models });
            }
        }
        if !self.default_stores.is_empty() {
            return Some(Matched::Default {
                models: &self.default_stores,
            });
        }
        None
    }

    /// Resolves `category` to its worker queues, creating them from a
    /// prototype on first sight if needed. Returns `None` if no exact
    /// entry, pattern, or default matches (spec.md §4.8 step 3c: "drop
    /// with 'bad' counter").
    pub async fn resolve(&self, category: &str) -> Option<Vec<Arc<WorkerQueue>>> {
        {
            let exact = self.exact.read().await;
            if let Some(queues) = exact.get(category) {
                return Some(queues.clone());
            }
        }

        let matched = self.match_pattern_or_default(category)?;
        if self.new_thread_per_category {
            self.spawn_dedicated(category, matched).await
        } else {
            self.spawn_shared(matched).await
        }
    }

    async fn spawn_dedicated(&self, category: &str, matched: Matched<'_>) -> Option<Vec<Arc<WorkerQueue>>> {
        let mut exact = self.exact.write().await;
        // Another task may have raced us between the read-lock check in
        // `resolve` and acquiring the write lock.
        if let Some(queues) = exact.get(category) {
            return Some(queues.clone());
        }
        let models = match matched {
            Matched::Prefix { models, .. } => models,
            Matched::Default { models } => models,
        };
        let queues: Vec<Arc<WorkerQueue>> = models
            .iter()
            .map(|model| self.spawn_from_model(model, category, false))
            .collect();
        exact.insert(category.to_string(), queues.clone());
        Some(queues)
    }

    async fn spawn_shared(&self, matched: Matched<'_>) -> Option<Vec<Arc<WorkerQueue>>> {
        let key = match &matched {
            Matched::Prefix { key, .. } => key.to_string(),
            Matched::Default { .. } => DEFAULT_CATEGORY.to_string(),
        };
        {
            let shared = self.shared.read().await;
            if let Some(queues) = shared.get(&key) {
                return Some(queues.clone());
            }
        }
        let mut shared = self.shared.write().await;
        if let Some(queues) = shared.get(&key) {
            return Some(queues.clone());
        }
        let models = match matched {
            Matched::Prefix { models, .. } => models,
            Matched::Default { models } => models,
        };
        let queues: Vec<Arc<WorkerQueue>> = models
            .iter()
            .map(|model| self.spawn_from_model(model, &key, true))
            .collect();
        shared.insert(key, queues.clone());
        Some(queues)
    }

    fn spawn_from_model(&self, model: &ModelQueue, category: &str, multi_category: bool) -> Arc<WorkerQueue> {
        let store = model.clone_store(category);
        WorkerQueue::spawn(
            category,
            multi_category,
            store,
            Arc::clone(&model.conf),
            model.config,
            Arc::clone(&self.clock),
            Arc::clone(&self.metrics),
        )
    }

    /// Every currently-live worker queue, exact and lazily-spawned alike,
    /// used for admission's queue-size check and for shutdown/reinit
    /// broadcast.
    pub async fn all_queues(&self) -> Vec<Arc<WorkerQueue>> {
        let mut all = Vec::new();
        all.extend(self.exact.read().await.values().flatten().cloned());
        all.extend(self.shared.read().await.values().flatten().cloned());
        all
    }

    /// Stops and joins every live worker queue (spec.md §5 "pushes Stop to
    /// every worker queue, joins each worker thread").
    pub async fn stop_all(&self) {
        for queue in self.all_queues().await {
            queue.stop().await;
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
