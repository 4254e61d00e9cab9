// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key extraction and hashing for the Bucket store (spec.md §4.6).
//!
//! Bucket 0 is reserved for entries whose key cannot be extracted or
//! hashed; all other buckets are numbered `1..=num_buckets`.

use scribe_core::entry::LogEntry;

/// `strhash`: the djb2 string hash used by the original for `key_hash` and
/// `context_log` bucketizing.
pub fn strhash(s: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &byte in s {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
    }
    hash
}

/// `integerhash`: the identity hash used when the key is already a small
/// integer id (context-log bucketizing uses this by default; there is no
/// separate configuration key for choosing djb2 over identity here, so we
/// take the simpler of the two since re-hashing an already-dense integer
/// buys nothing).
pub fn integerhash(id: u64) -> u64 {
    id
}

const CONTEXT_LOG_DELIMITER: u8 = 0x01;

fn bucket_for_hash(hash: u64, num_buckets: u32) -> u32 {
    if num_buckets == 0 {
        return 0;
    }
    (hash % num_buckets as u64) as u32 + 1
}

/// The five bucketizer kinds from spec.md §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketizerKind {
    ContextLog,
    Random,
    KeyHash,
    KeyModulo,
    KeyRange,
}

impl BucketizerKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "context_log" => Some(Self::ContextLog),
            "random" => Some(Self::Random),
            "key_hash" => Some(Self::KeyHash),
            "key_modulo" => Some(Self::KeyModulo),
            "key_range" => Some(Self::KeyRange),
            _ => None,
        }
    }
}

/// Extracts the delimited key from `message`, up to (not including) the
/// first occurrence of `delimiter`. Returns `None` if the delimiter is
/// absent or the key is empty.
fn extract_delimited_key(message: &[u8], delimiter: u8) -> Option<&[u8]> {
    let idx = message.iter().position(|&b| b == delimiter)?;
    if idx == 0 {
        return None;
    }
    Some(&message[..idx])
}

/// Extracts the context-log key: the substring after the 3rd occurrence of
/// byte 0x01, parsed as an unsigned decimal id. Returns `None` (routes to
/// bucket 0) if there are fewer than 3 occurrences, the remainder is empty,
/// it does not parse, or it parses to 0.
fn extract_context_log_id(message: &[u8]) -> Option<u64> {
    let mut seen = 0;
    let mut after = None;
    for (i, &b) in message.iter().enumerate() {
        if b == CONTEXT_LOG_DELIMITER {
            seen += 1;
            if seen == 3 {
                after = Some(i + 1);
                break;
            }
        }
    }
    let start = after?;
    let rest = &message[start..];
    let end = rest
        .iter()
        .position(|&b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let text = std::str::from_utf8(&rest[..end]).ok()?;
    let id: u64 = text.parse().ok()?;
    if id == 0 {
        return None;
    }
    Some(id)
}

/// Computes `(atol(key) mod range) / range * num_buckets) + 1` for
/// `key_range`, per spec.md §4.6. `atol` semantics: leading integer prefix,
/// 0 if none.
fn atol(bytes: &[u8]) -> u64 {
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => return 0,
    };
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

pub struct Bucketizer {
    pub kind: BucketizerKind,
    pub num_buckets: u32,
    pub delimiter: u8,
    pub bucket_range: u64,
    pub remove_key: bool,
}

impl Bucketizer {
    /// Determines the destination bucket for `entry`, given a `rand`
    /// draw already made by the caller for the `random` kind (so callers
    /// control the entropy source uniformly).
    pub fn bucket_for(&self, entry: &LogEntry, random_draw: u64) -> u32 {
        match self.kind {
            BucketizerKind::ContextLog => match extract_context_log_id(&entry.message) {
                Some(id) => bucket_for_hash(integerhash(id), self.num_buckets),
                None => 0,
            },
            BucketizerKind::Random => {
                if self.num_buckets == 0 {
                    0
                } else {
                    (random_draw % self.num_buckets as u64) as u32 + 1
                }
            }
            BucketizerKind::KeyHash => match extract_delimited_key(&entry.message, self.delimiter)
            {
                Some(key) => bucket_for_hash(strhash(key), self.num_buckets),
                None => 0,
            },
            BucketizerKind::KeyModulo => {
                match extract_delimited_key(&entry.message, self.delimiter) {
                    Some(key) => bucket_for_hash(atol(key), self.num_buckets),
                    None => 0,
                }
            }
            BucketizerKind::KeyRange => {
                match extract_delimited_key(&entry.message, self.delimiter) {
                    Some(key) if self.bucket_range > 0 && self.num_buckets > 0 => {
                        let n = atol(key) % self.bucket_range;
                        let scaled = (n * self.num_buckets as u64) / self.bucket_range;
                        (scaled as u32) + 1
                    }
                    _ => 0,
                }
            }
        }
    }

    /// Strips the extracted key and its delimiter from `message` when
    /// `remove_key` is configured. A no-op for `context_log`/`random`,
    /// which do not consume a prefix of the payload.
    pub fn strip_key_if_configured(&self, message: &[u8]) -> Option<Vec<u8>> {
        if !self.remove_key {
            return None;
        }
        match self.kind {
            BucketizerKind::KeyHash | BucketizerKind::KeyModulo | BucketizerKind::KeyRange => {
                let idx = message.iter().position(|&b| b == self.delimiter)?;
                Some(message[idx + 1..].to_vec())
            }
            BucketizerKind::ContextLog | BucketizerKind::Random => None,
        }
    }
}

#[cfg(test)]
#[path = "bucketizer_tests.rs"]
mod tests;
