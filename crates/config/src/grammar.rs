// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The line-oriented grammar from spec.md §6:
//!
//! ```text
//! store-block  := "<" name ">" body "</" name ">"
//! body         := (blank | comment | assign | store-block)*
//! assign       := key "=" value
//! comment      := "#" …EOL
//! ```
//!
//! Ported in shape (not in code) from the original's
//! `StoreConf::parseStore`: a recursive-descent reader over a queue of
//! already-split lines, comment stripping before anything else, and a
//! special case where repeated anonymous `<store>` blocks are disambiguated
//! by appending a 0-based index to the block name.
//!
//! Deliberate divergence from the original (recorded in DESIGN.md): on a
//! duplicate key or duplicate block name within one body, the original's
//! `map::operator[]` silently keeps the *last* value; spec.md §6 states
//! explicitly that keys are "first-match-wins", so that is what this loader
//! does, logging a warning either way.

use std::collections::VecDeque;

use scribe_core::conf::ConfBuilder;

/// Parses a complete configuration file's text into the root of the
/// configuration tree. The top level uses the same grammar as a nested
/// block; it simply has no closing tag.
pub fn parse_text(text: &str) -> ConfBuilder {
    let mut lines: VecDeque<&str> = text.lines().collect();
    parse_body(&mut lines)
}

fn parse_body(lines: &mut VecDeque<&str>) -> ConfBuilder {
    let mut builder = ConfBuilder::new();
    let mut anonymous_store_index: u32 = 0;

    while let Some(raw_line) = lines.pop_front() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('<') {
            if rest.starts_with('/') {
                // End of this body; the original does not validate that
                // the closing tag's name matches the opening one.
                return builder;
            }
            match rest.find('>') {
                Some(gt) => {
                    let mut name = rest[..gt].to_string();
                    let child = parse_body(lines);
                    if name == "store" {
                        name = format!("store{anonymous_store_index}");
                        anonymous_store_index += 1;
                    }
                    if builder.add_child(name.clone(), child) {
                        tracing::warn!(block = %name, "duplicate store name in config, keeping first");
                    }
                }
                None => {
                    tracing::warn!(line = %raw_line, "bad config line: '<' without matching '>'");
                }
            }
            continue;
        }

        match line.find('=') {
            Some(eq) => {
                let key = line[..eq].trim().to_string();
                let value = line[eq + 1..].trim().to_string();
                if builder.set(key.clone(), value) {
                    tracing::warn!(key = %key, "duplicate key in config block, keeping first value");
                }
            }
            None => {
                tracing::warn!(line = %raw_line, "bad config line: missing '='");
            }
        }
    }

    builder
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
#[path = "grammar_tests.rs"]
mod tests;
