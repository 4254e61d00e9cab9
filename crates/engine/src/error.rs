// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors internal to the engine crate. Per spec.md §7, none of these ever
//! cross the RPC boundary — the dispatcher always answers with a
//! [`scribe_net::wire::LogCode`], never a `Result`. Per-store config
//! problems (unknown type, duplicate default, missing required key) are
//! logged and the offending store is skipped rather than returned as an
//! error here, matching spec.md §7's policy ("keeps server running in
//! WARNING if at least one store configured"); [`EngineError`] is reserved
//! for the one case that policy still treats as fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Every top-level store block failed to configure (or none were
    /// present at all) — there is nothing left to run the server with.
    #[error("no store in the configuration could be started")]
    NoStoresConfigured,
}
