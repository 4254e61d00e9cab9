// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File store (spec.md §4.2): a rolling, size/time-rotated file writer with
//! two wire flavors (raw bytes, or 4-byte-length-prefixed "framed" records)
//! and optional chunk padding, category framing, meta chaining and a
//! `<base>_current` symlink.
//!
//! `type = thriftfile` is the same writer with a different staged-write
//! flush policy (spec.md §6): instead of `max_write_size` bytes, it flushes
//! on `msg_buffer_size` staged events, on a `flush_frequency_ms` timer
//! serviced from `periodic_check`, or on every record when `use_simple_file`
//! is set — mirroring `TFileTransport`/`TSimpleFileTransport`'s buffering
//! against the plain `FileStore`'s size-gated writes.
//!
//! `fs_type = hdfs` is recognized at configure time but not implemented —
//! `open()` fails and the status string says so, matching the "Config
//! error... surfaced as status string" policy of spec.md §7 rather than
//! panicking on an unsupported backend.

use std::collections::HashMap;
use std::fs::{File as StdFile, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use scribe_core::clock::{CalendarNow, Clock, SystemClock};
use scribe_core::conf::ConfNode;
use scribe_core::entry::{Batch, LogEntry};

use crate::error::StoreConfigError;
use crate::traits::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Raw,
    Framed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FsType {
    Std,
    Hdfs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotatePeriod {
    Hourly,
    Daily,
    Never,
    Seconds(u64),
}

impl RotatePeriod {
    fn parse(s: &str) -> Self {
        match s {
            "hourly" => RotatePeriod::Hourly,
            "daily" => RotatePeriod::Daily,
            "never" => RotatePeriod::Never,
            other => {
                let (num, unit) = other.split_at(other.len().saturating_sub(1));
                let n: u64 = num.parse().unwrap_or(0);
                let secs = match unit {
                    "s" => n,
                    "m" => n * 60,
                    "h" => n * 3600,
                    "d" => n * 86400,
                    "w" => n * 604_800,
                    _ => n,
                };
                if secs == 0 {
                    RotatePeriod::Never
                } else {
                    RotatePeriod::Seconds(secs)
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    pub file_path: PathBuf,
    pub sub_directory: Option<String>,
    pub use_hostname_sub_directory: bool,
    pub base_filename: String,
    pub base_symlink_name: Option<String>,
    pub rotate_period: RotatePeriod,
    pub rotate_hour: u32,
    pub rotate_minute: u32,
    pub max_size: u64,
    pub max_write_size: usize,
    pub chunk_size: u64,
    pub write_meta: bool,
    pub write_category: bool,
    pub create_symlink: bool,
    pub rotate_on_reopen: bool,
    pub add_newlines: bool,
    pub write_stats: bool,
    pub format: FileFormat,
    fs_type: FsType,
    /// Thriftfile-only (spec.md §6): milliseconds between forced flushes of
    /// staged records, driven from `periodic_check` rather than a write-size
    /// threshold. `0` disables the timer, matching `TFileTransport`'s
    /// `flushFrequencyMs_ == 0` meaning "no periodic flush".
    pub flush_frequency_ms: u64,
    /// Thriftfile-only: flush staged records once this many events have
    /// accumulated, in place of `max_write_size`'s byte threshold. `0`
    /// disables the count-based flush (size and timer still apply).
    pub msg_buffer_size: u64,
    /// Thriftfile-only: write (and flush) every record immediately instead
    /// of staging, matching `TSimpleFileTransport` in place of the buffered
    /// `TFileTransport`.
    pub use_simple_file: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::new(),
            sub_directory: None,
            use_hostname_sub_directory: false,
            base_filename: String::new(),
            base_symlink_name: None,
            rotate_period: RotatePeriod::Never,
            rotate_hour: 0,
            rotate_minute: 0,
            max_size: 1_000_000_000,
            max_write_size: 1_000_000,
            chunk_size: 0,
            write_meta: false,
            write_category: false,
            create_symlink: false,
            rotate_on_reopen: false,
            add_newlines: false,
            write_stats: false,
            format: FileFormat::Raw,
            fs_type: FsType::Std,
            flush_frequency_ms: 0,
            msg_buffer_size: 0,
            use_simple_file: false,
        }
    }
}

/// A single rolling-file destination. `category` names the default base
/// filename and, when `write_category` is set, is recorded per-record.
pub struct FileStore {
    pub category: String,
    pub config: FileStoreConfig,
    clock: Arc<dyn Clock>,
    current: Option<OpenFile>,
    staging: Vec<u8>,
    open: bool,
    status: String,
    is_buffer_file: bool,
    is_thrift: bool,
    /// Events staged since the last flush, tracked only for the
    /// thriftfile flavor's `msg_buffer_size` threshold.
    unflushed_events: u64,
    last_flush_ms: u64,
}

struct OpenFile {
    handle: StdFile,
    path: PathBuf,
    date_bucket: String,
    size: u64,
    opened_at_ms: u64,
    events: u64,
}

impl FileStore {
    pub fn new(category: impl Into<String>) -> Self {
        Self::with_clock(category, Arc::new(SystemClock))
    }

    pub fn with_clock(category: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            category: category.into(),
            config: FileStoreConfig::default(),
            clock,
            current: None,
            staging: Vec::new(),
            open: false,
            status: String::new(),
            is_buffer_file: false,
            is_thrift: false,
            unflushed_events: 0,
            last_flush_ms: 0,
        }
    }

    /// Forces the framed wire format and marks this instance as a Buffer
    /// secondary; spec.md §4.2 requires buffer-role files to be framed so
    /// record boundaries survive a restart.
    pub fn as_buffer_secondary(mut self) -> Self {
        self.config.format = FileFormat::Framed;
        self.is_buffer_file = true;
        self
    }

    fn directory(&self) -> PathBuf {
        let mut dir = self.config.file_path.clone();
        if let Some(sub) = &self.config.sub_directory {
            dir.push(sub);
        }
        if self.config.use_hostname_sub_directory {
            dir.push(scribe_core::platform::hostname());
        }
        dir
    }

    fn base_name(&self) -> &str {
        if self.config.base_filename.is_empty() {
            &self.category
        } else {
            &self.config.base_filename
        }
    }

    fn suffix_tag(&self) -> &'static str {
        if self.is_buffer_file {
            ".buffer"
        } else {
            ""
        }
    }

    fn date_bucket(&self, now: &CalendarNow) -> String {
        match self.config.rotate_period {
            RotatePeriod::Never => String::new(),
            _ => format!("{:04}-{:02}-{:02}", now.year, now.month, now.day),
        }
    }

    fn file_name_for(&self, date_bucket: &str, suffix: u32) -> String {
        if date_bucket.is_empty() {
            format!("{}{}-{:05}", self.base_name(), self.suffix_tag(), suffix)
        } else {
            format!(
                "{}{}-{date_bucket}_{:05}",
                self.base_name(),
                self.suffix_tag(),
                suffix
            )
        }
    }

    fn symlink_path(&self) -> Option<PathBuf> {
        if !self.config.create_symlink {
            return None;
        }
        let name = self
            .config
            .base_symlink_name
            .clone()
            .unwrap_or_else(|| format!("{}_current", self.base_name()));
        Some(self.directory().join(name))
    }

    fn should_rotate_on_boundary(&self, now: &CalendarNow, opened_at_ms: u64) -> bool {
        let elapsed_ms = self.clock.monotonic_ms().saturating_sub(opened_at_ms);
        match self.config.rotate_period {
            RotatePeriod::Never => false,
            RotatePeriod::Hourly => now.hour == self.config.rotate_hour && elapsed_ms >= 3_600_000,
            RotatePeriod::Daily => {
                now.hour == self.config.rotate_hour
                    && now.minute == self.config.rotate_minute
                    && elapsed_ms >= 3_600_000
            }
            RotatePeriod::Seconds(period) => elapsed_ms >= period * 1000,
        }
    }

    fn open_next_file(&mut self, now: &CalendarNow) -> bool {
        let dir = self.directory();
        if std::fs::create_dir_all(&dir).is_err() {
            self.status = format!("failed to create directory {}", dir.display());
            return false;
        }
        let date_bucket = self.date_bucket(now);
        let next_suffix = self.next_free_suffix(&dir, &date_bucket);
        let name = self.file_name_for(&date_bucket, next_suffix);
        let path = dir.join(&name);

        let write_meta_to = if self.config.write_meta {
            self.current.as_ref().map(|f| f.path.clone())
        } else {
            None
        };

        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(handle) => {
                let size = handle.metadata().map(|m| m.len()).unwrap_or(0);
                if let Some(meta_path) = write_meta_to {
                    let _ = append_meta_record(&meta_path, &name);
                }
                self.current = Some(OpenFile {
                    handle,
                    path: path.clone(),
                    date_bucket,
                    size,
                    opened_at_ms: self.clock.monotonic_ms(),
                    events: 0,
                });
                if let Some(link) = self.symlink_path() {
                    let _ = refresh_symlink(&link, &path);
                }
                self.last_flush_ms = self.clock.monotonic_ms();
                self.unflushed_events = 0;
                self.status.clear();
                true
            }
            Err(e) => {
                self.status = format!("open failed for {}: {e}", path.display());
                false
            }
        }
    }

    fn next_free_suffix(&self, dir: &Path, date_bucket: &str) -> u32 {
        let prefix = if date_bucket.is_empty() {
            format!("{}{}-", self.base_name(), self.suffix_tag())
        } else {
            format!("{}{}-{date_bucket}_", self.base_name(), self.suffix_tag())
        };
        let mut max_seen: Option<u32> = None;
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(file_name) = file_name.to_str() else {
                    continue;
                };
                if let Some(rest) = file_name.strip_prefix(&prefix) {
                    if let Ok(n) = rest.parse::<u32>() {
                        max_seen = Some(max_seen.map_or(n, |m| m.max(n)));
                    }
                }
            }
        }
        match max_seen {
            Some(n) => n + 1,
            None => 0,
        }
    }

    fn oldest_suffix(&self, dir: &Path, date_bucket: &str) -> Option<(u32, PathBuf)> {
        let prefix = format!("{}{}-{date_bucket}_", self.base_name(), self.suffix_tag());
        let legacy_prefix = format!("{}-{date_bucket}_", self.base_name());
        let mut best: Option<(u32, PathBuf)> = None;
        let entries = std::fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let suffix_text = file_name
                .strip_prefix(&prefix)
                .or_else(|| file_name.strip_prefix(&legacy_prefix));
            if let Some(suffix_text) = suffix_text {
                if let Ok(n) = suffix_text.parse::<u32>() {
                    if best.as_ref().map(|(m, _)| n < *m).unwrap_or(true) {
                        best = Some((n, entry.path()));
                    }
                }
            }
        }
        best
    }

    fn encode_record(&self, message: &[u8], category: &str, staged_offset: u64) -> Vec<u8> {
        let mut out = Vec::new();
        if self.config.write_category {
            append_frame(&mut out, category.as_bytes());
        }
        let mut payload = Vec::new();
        match self.config.format {
            FileFormat::Framed => append_frame(&mut payload, message),
            FileFormat::Raw => {
                payload.extend_from_slice(message);
                if self.config.add_newlines {
                    payload.push(b'\n');
                }
            }
        }
        if self.config.chunk_size > 0 {
            let absolute = staged_offset + out.len() as u64;
            let remaining_in_chunk = self.config.chunk_size - (absolute % self.config.chunk_size);
            if (payload.len() as u64) > remaining_in_chunk {
                out.extend(std::iter::repeat(0u8).take(remaining_in_chunk as usize));
            }
        }
        out.extend(payload);
        out
    }

    fn needs_rotation(&self, now: &CalendarNow, next_record_len: usize) -> bool {
        match &self.current {
            None => true,
            Some(f) => {
                let date_bucket = self.date_bucket(now);
                f.date_bucket != date_bucket
                    || f.size + self.staging.len() as u64 + next_record_len as u64
                        > self.config.max_size
                    || self.should_rotate_on_boundary(now, f.opened_at_ms)
            }
        }
    }

    fn rotate(&mut self, now: &CalendarNow) -> bool {
        let _ = self.flush_staging();
        if let Some(f) = &mut self.current {
            let _ = f.handle.flush();
            if self.config.write_stats {
                let _ = append_stats_record(&self.directory(), &f.path, f.size, f.events);
            }
        }
        self.current = None;
        self.open_next_file(now)
    }

    fn flush_staging(&mut self) -> bool {
        self.last_flush_ms = self.clock.monotonic_ms();
        if self.staging.is_empty() {
            self.unflushed_events = 0;
            return true;
        }
        let Some(f) = &mut self.current else {
            return false;
        };
        match f.handle.write_all(&self.staging) {
            Ok(()) => {
                f.size += self.staging.len() as u64;
                self.staging.clear();
                self.unflushed_events = 0;
                true
            }
            Err(e) => {
                self.status = format!("write failed: {e}");
                false
            }
        }
    }

    /// Whether `handle_batch` should flush staged records after the record
    /// just appended. Plain `file` gates on `max_write_size` bytes;
    /// thriftfile gates on `use_simple_file` (always), or on
    /// `msg_buffer_size` events (§6, `ThriftFileStore::handleMessages`'s
    /// `TFileTransport` buffering policy) — never on byte size, which the
    /// original leaves to the Thrift transport's own internal buffer.
    fn should_flush_after_append(&self) -> bool {
        if self.is_thrift {
            self.config.use_simple_file
                || (self.config.msg_buffer_size > 0 && self.unflushed_events >= self.config.msg_buffer_size)
        } else {
            self.staging.len() >= self.config.max_write_size
        }
    }
}

fn append_frame(out: &mut Vec<u8>, payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}

fn append_meta_record(path: &Path, next_file_name: &str) -> std::io::Result<()> {
    let mut f = OpenOptions::new().append(true).open(path)?;
    let mut record = Vec::new();
    append_frame(&mut record, next_file_name.as_bytes());
    f.write_all(&record)
}

/// Appends a "<filename> <bytes> <events>" line to `scribe_stats` in `dir`,
/// the store's per-rotation size/event accounting (spec.md §6 "Persisted
/// state", SPEC_FULL §B).
fn append_stats_record(dir: &Path, rotated_path: &Path, bytes: u64, events: u64) -> std::io::Result<()> {
    let name = rotated_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("scribe_stats"))?;
    writeln!(f, "{name} {bytes} {events}")
}

fn refresh_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let _ = std::fs::remove_file(link);
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }
    #[cfg(not(unix))]
    {
        std::fs::copy(target, link).map(|_| ())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn configure(&mut self, conf: &Arc<ConfNode>) -> Result<(), StoreConfigError> {
        let mut cfg = FileStoreConfig::default();
        if let Some(v) = conf.get_string("file_path") {
            cfg.file_path = PathBuf::from(v);
        } else {
            return Err(StoreConfigError::MissingKey("file_path"));
        }
        cfg.sub_directory = conf.get_string("sub_directory");
        cfg.use_hostname_sub_directory =
            conf.get_bool("use_hostname_sub_directory").unwrap_or(false);
        cfg.base_filename = conf.get_string("base_filename").unwrap_or_default();
        cfg.base_symlink_name = conf.get_string("base_symlink_name");
        cfg.rotate_period = conf
            .get_string("rotate_period")
            .map(|s| RotatePeriod::parse(&s))
            .unwrap_or(RotatePeriod::Never);
        cfg.rotate_hour = conf.get_unsigned("rotate_hour").unwrap_or(0) as u32;
        cfg.rotate_minute = conf.get_unsigned("rotate_minute").unwrap_or(0) as u32;
        cfg.max_size = conf.get_unsigned("max_size").unwrap_or(1_000_000_000);
        cfg.max_write_size = conf.get_unsigned("max_write_size").unwrap_or(1_000_000) as usize;
        cfg.chunk_size = conf.get_unsigned("chunk_size").unwrap_or(0);
        cfg.write_meta = conf.get_bool("write_meta").unwrap_or(false);
        cfg.write_category = conf.get_bool("write_category").unwrap_or(false);
        cfg.create_symlink = conf.get_bool("create_symlink").unwrap_or(false);
        cfg.rotate_on_reopen = conf.get_bool("rotate_on_reopen").unwrap_or(false);
        cfg.add_newlines = conf.get_bool("add_newlines").unwrap_or(false);
        cfg.write_stats = conf.get_bool("write_stats").unwrap_or(false);
        cfg.fs_type = match conf.get_string("fs_type").as_deref() {
            Some("hdfs") => FsType::Hdfs,
            _ => FsType::Std,
        };
        self.is_thrift = conf.store_type() == Some("thriftfile");
        if self.is_thrift {
            cfg.flush_frequency_ms = conf.get_unsigned("flush_frequency_ms").unwrap_or(0);
            cfg.msg_buffer_size = conf.get_unsigned("msg_buffer_size").unwrap_or(0);
            cfg.use_simple_file = conf.get_bool("use_simple_file").unwrap_or(false);
        }
        let force_framed = self.config.format == FileFormat::Framed;
        if self.is_thrift || force_framed {
            cfg.format = FileFormat::Framed;
        }
        self.config = cfg;
        Ok(())
    }

    async fn open(&mut self) -> bool {
        if self.config.fs_type == FsType::Hdfs {
            self.status = "hdfs backend not implemented".to_string();
            self.open = false;
            return false;
        }
        let now = self.clock.calendar();
        if self.config.rotate_on_reopen {
            self.current = None;
        }
        if self.current.is_none() && !self.open_next_file(&now) {
            self.open = false;
            return false;
        }
        self.open = true;
        true
    }

    async fn close(&mut self) {
        if let Some(mut f) = self.current.take() {
            let _ = f.handle.flush();
        }
        self.staging.clear();
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn handle_batch(&mut self, batch: &mut Batch) -> bool {
        if !self.open {
            return false;
        }
        let mut delivered = 0usize;
        for entry in batch.iter() {
            let now = self.clock.calendar();
            if self.needs_rotation(&now, entry.message.len()) && !self.rotate(&now) {
                break;
            }
            let staged_offset =
                self.current.as_ref().map(|f| f.size).unwrap_or(0) + self.staging.len() as u64;
            let record = self.encode_record(&entry.message, &entry.category, staged_offset);
            self.staging.extend(record);
            if let Some(f) = &mut self.current {
                f.events += 1;
            }
            self.unflushed_events += 1;
            delivered += 1;
            if self.should_flush_after_append() && !self.flush_staging() {
                break;
            }
        }
        let _ = self.flush_staging();
        batch.drain(0..delivered);
        batch.is_empty()
    }

    async fn flush(&mut self) {
        let _ = self.flush_staging();
        if let Some(f) = &mut self.current {
            let _ = f.handle.flush();
        }
    }

    async fn periodic_check(&mut self, _pending_bytes: u64, _max_queue_size: u64) {
        let now = self.clock.calendar();
        if let Some(opened_at) = self.current.as_ref().map(|f| f.opened_at_ms) {
            if self.should_rotate_on_boundary(&now, opened_at) {
                self.rotate(&now);
            }
        }
        // Thriftfile's periodic flush timer (spec.md §6 `flush_frequency_ms`):
        // `TFileTransport` flushes its internal buffer on this cadence
        // regardless of `msg_buffer_size`, independent of the worker
        // queue's own check period.
        if self.is_thrift && self.config.flush_frequency_ms > 0 {
            let elapsed = self.clock.monotonic_ms().saturating_sub(self.last_flush_ms);
            if elapsed >= self.config.flush_frequency_ms {
                let _ = self.flush_staging();
                if let Some(f) = &mut self.current {
                    let _ = f.handle.flush();
                }
            }
        }
    }

    fn copy(&self, category: &str) -> Box<dyn Store> {
        let mut clone = FileStore::with_clock(category.to_string(), Arc::clone(&self.clock));
        clone.config = self.config.clone();
        clone.is_buffer_file = self.is_buffer_file;
        clone.is_thrift = self.is_thrift;
        Box::new(clone)
    }

    fn status(&self) -> String {
        self.status.clone()
    }

    fn type_name(&self) -> &'static str {
        if self.is_thrift {
            "thriftfile"
        } else {
            "file"
        }
    }

    fn is_readable(&self) -> bool {
        true
    }

    async fn read_oldest(&mut self, now: &CalendarNow) -> Batch {
        let dir = self.directory();
        let date_bucket = self.date_bucket(now);
        let Some((_, path)) = self.oldest_suffix(&dir, &date_bucket) else {
            return Vec::new();
        };
        read_framed_file(&path, &self.category, self.config.write_category)
    }

    async fn replace_oldest(&mut self, batch: Batch, now: &CalendarNow) -> bool {
        let dir = self.directory();
        let date_bucket = self.date_bucket(now);
        let Some((_, path)) = self.oldest_suffix(&dir, &date_bucket) else {
            return false;
        };
        write_framed_file(&path, &batch, self.config.write_category)
    }

    async fn delete_oldest(&mut self, now: &CalendarNow) -> bool {
        let dir = self.directory();
        let date_bucket = self.date_bucket(now);
        let Some((_, path)) = self.oldest_suffix(&dir, &date_bucket) else {
            return false;
        };
        std::fs::remove_file(path).is_ok()
    }

    async fn empty(&mut self, now: &CalendarNow) -> bool {
        let dir = self.directory();
        let date_bucket = self.date_bucket(now);
        self.oldest_suffix(&dir, &date_bucket).is_none()
    }
}

fn read_u32_le(bytes: &[u8], pos: usize) -> Option<u32> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes.get(pos..pos + 4)?);
    Some(u32::from_le_bytes(buf))
}

fn read_framed_file(path: &Path, default_category: &str, write_category: bool) -> Batch {
    let Ok(mut f) = StdFile::open(path) else {
        return Vec::new();
    };
    let mut bytes = Vec::new();
    if f.read_to_end(&mut bytes).is_err() {
        return Vec::new();
    }
    let mut entries = Vec::new();
    let mut pos = 0usize;
    while let Some(len) = read_u32_le(&bytes, pos) {
        let mut maybe_category = None;
        let len = len as usize;
        pos += 4;
        if pos + len > bytes.len() {
            break;
        }
        let first = bytes[pos..pos + len].to_vec();
        pos += len;
        let message = if write_category {
            maybe_category = Some(String::from_utf8_lossy(&first).into_owned());
            let Some(msg_len) = read_u32_le(&bytes, pos) else {
                break;
            };
            let msg_len = msg_len as usize;
            pos += 4;
            if pos + msg_len > bytes.len() {
                break;
            }
            let m = bytes[pos..pos + msg_len].to_vec();
            pos += msg_len;
            m
        } else {
            first
        };
        entries.push(LogEntry {
            category: maybe_category.unwrap_or_else(|| default_category.to_string()),
            message,
            metadata: HashMap::new(),
        });
    }
    entries
}

fn write_framed_file(path: &Path, batch: &Batch, write_category: bool) -> bool {
    let Ok(mut f) = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
    else {
        return false;
    };
    let mut out = Vec::new();
    for entry in batch {
        if write_category {
            append_frame(&mut out, entry.category.as_bytes());
        }
        append_frame(&mut out, &entry.message);
    }
    f.write_all(&out).is_ok() && f.seek(SeekFrom::Start(0)).is_ok()
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
