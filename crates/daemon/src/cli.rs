// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line argument parsing (spec.md §6 "CLI").
//!
//! Grounded in the original's `getopt_long` loop in
//! `examples/original_source/src/Main.cpp`: `-p`/`--port` and
//! `-c`/`--config` each take a value, `-h`/`--help` prints usage and
//! exits, and a trailing positional argument is treated as the config
//! file path when `-c` was not given.

use std::path::PathBuf;

/// Platform-fixed default config path (spec.md §6), matching the
/// original's `DEFAULT_CONF_FILE_LOCATION`.
pub const DEFAULT_CONFIG_PATH: &str = "/usr/local/scribe/scribe.conf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub port: Option<u16>,
    pub config: PathBuf,
    pub help: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    #[error("option '{0}' requires a value")]
    MissingValue(String),
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    #[error("unrecognized argument '{0}'")]
    Unrecognized(String),
}

/// Parses `args` (not including the program name). Does not look at the
/// filesystem or environment — [`DEFAULT_CONFIG_PATH`] is substituted by
/// the caller only when neither `-c`/`--config` nor a positional argument
/// was given.
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Cli, CliError> {
    let mut port = None;
    let mut config: Option<PathBuf> = None;
    let mut positional: Option<PathBuf> = None;
    let mut help = false;

    let mut iter = args.into_iter().peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => help = true,
            "-p" | "--port" => {
                let value = iter.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                port = Some(value.parse().map_err(|_| CliError::InvalidPort(value))?);
            }
            "-c" | "--config" => {
                let value = iter.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                config = Some(PathBuf::from(value));
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(CliError::Unrecognized(other.to_string()));
            }
            other => positional = Some(PathBuf::from(other)),
        }
    }

    let config = config
        .or(positional)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    Ok(Cli { port, config, help })
}

pub const USAGE: &str = "Usage: scribed [-p port] [-c config_file]\n\n\
OPTIONS:\n    \
-p, --port <PORT>      Override the configured listen port\n    \
-c, --config <FILE>    Path to the configuration file (default: /usr/local/scribe/scribe.conf)\n    \
-h, --help             Print this help\n";
