// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;

use scribe_core::conf::ConfNode;

use crate::error::ConfigError;
use crate::grammar::parse_text;

/// Reads and parses a configuration file from disk, returning the frozen
/// root of its tree.
pub fn load_file(path: impl AsRef<Path>) -> Result<Arc<ConfNode>, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_text(&text).build())
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
