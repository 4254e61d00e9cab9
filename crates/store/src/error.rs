// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Configuration-time failures (spec.md §7 "Config error"). These never
/// propagate across `handle_batch`/`open`/`close` — only `configure` can
/// fail outright, and even then the caller decides whether to keep the
/// server in a degraded state.
#[derive(Debug, Error)]
pub enum StoreConfigError {
    #[error("unknown store type '{0}'")]
    UnknownType(String),
    #[error("store is missing required key '{0}'")]
    MissingKey(&'static str),
    #[error("key '{key}' has invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("bucket store has no child stores configured")]
    NoBuckets,
    #[error("buffer store requires both <primary> and <secondary> blocks")]
    IncompleteBuffer,
}
