// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The non-portable platform facade from spec.md §9 ("Non-portable
//! platform assumptions"): `gethostname` is the only one of that list
//! (`localtime`, `symlink`, `rand`) that doesn't already have a home in
//! [`crate::clock`] or [`crate::random`].

/// The local hostname, used by `use_hostname_sub_directory` in the file
/// store. Falls back to `"unknown"` rather than failing a store's
/// `configure`/`open` over an unresolvable hostname.
pub fn hostname() -> String {
    ::hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
