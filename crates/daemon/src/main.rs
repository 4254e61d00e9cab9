// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `scribed`: the process entry point (spec.md §6 "CLI").
//!
//! spec.md §1 places "process entry point, signal handling, log-file
//! rotation of the server's own diagnostics" out of the core's scope;
//! this binary is the thin ambient shell those pieces still need to turn
//! [`scribe_daemon::Daemon`] into something you can actually run.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use scribe_daemon::cli::{self, USAGE};
use scribe_daemon::Daemon;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Env var naming the daemon's own diagnostic log file (spec.md §A.5).
/// Unset means "log to stdout", which is also what a container/systemd
/// deployment typically wants.
const LOG_FILE_ENV: &str = "SCRIBED_LOG_FILE";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match cli::parse(args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("scribed: {e}");
            eprint!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    if cli.help {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let _log_guard = setup_logging();

    let daemon = match Daemon::startup(&cli.config, cli.port).await {
        Ok(daemon) => Arc::new(daemon),
        Err(e) => {
            error!(error = %e, config = %cli.config.display(), "failed to start scribed");
            return ExitCode::FAILURE;
        }
    };

    if daemon.status() == scribe_core::status::ServerStatus::Warning {
        warn!("scribed starting with at least one misconfigured store; see earlier warnings");
    }
    info!(port = daemon.port(), config = %cli.config.display(), "scribed ready");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            return ExitCode::FAILURE;
        }
    };
    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGHUP handler");
            return ExitCode::FAILURE;
        }
    };

    // The accept loop runs on its own task so that, once a signal asks
    // for shutdown, we can both tell it to stop (the watch channel) and
    // wait for it to actually finish before draining worker queues —
    // matching spec.md §5's order ("pushes Stop to every worker queue,
    // joins each worker thread, then stops the RPC server") without
    // dropping the serve future mid-accept.
    let server_daemon = Arc::clone(&daemon);
    let serve_task = tokio::spawn(async move { server_daemon.serve(shutdown_rx).await });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sighup.recv() => {
                info!("received SIGHUP, reloading configuration");
                match daemon.reinit().await {
                    Ok(()) => info!("configuration reloaded"),
                    Err(e) => error!(error = %e, "SIGHUP reinit failed, continuing with the previous configuration"),
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    match serve_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "rpc server stopped with an error"),
        Err(e) => error!(error = %e, "rpc server task panicked"),
    }

    daemon.shutdown().await;
    info!("scribed stopped");
    ExitCode::SUCCESS
}

/// Maximum size of the daemon's own diagnostic log before it is rotated
/// (spec.md §A.5; distinct from the File store's own rotation, §4.2,
/// which remains core functionality).
const MAX_LOG_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Shifts `log_path` to `log_path.1` if it has grown past
/// [`MAX_LOG_SIZE_BYTES`]. Best-effort: failures are silently ignored so a
/// log-rotation problem never stops the daemon from starting.
fn rotate_log_if_needed(log_path: &Path) {
    let Ok(metadata) = std::fs::metadata(log_path) else {
        return;
    };
    if metadata.len() < MAX_LOG_SIZE_BYTES {
        return;
    }
    let rotated = format!("{}.1", log_path.display());
    let _ = std::fs::rename(log_path, rotated);
}

/// Structured logging via `tracing-subscriber`. Writes to
/// [`LOG_FILE_ENV`] (rotated by size first, same policy the teacher's
/// daemon applies to its own log) when set, otherwise to stdout.
fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match std::env::var_os(LOG_FILE_ENV).map(PathBuf::from) {
        Some(log_path) => {
            rotate_log_if_needed(&log_path);
            let dir = log_path.parent().filter(|p| !p.as_os_str().is_empty());
            if let Some(dir) = dir {
                let _ = std::fs::create_dir_all(dir);
            }
            let Some(file_name) = log_path.file_name() else {
                tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
                return None;
            };
            let appender = tracing_appender::rolling::never(dir.unwrap_or_else(|| Path::new(".")), file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_leaves_small_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("scribed.log");
        std::fs::write(&log_path, b"small").unwrap();
        rotate_log_if_needed(&log_path);
        assert!(log_path.exists());
        assert!(!dir.path().join("scribed.log.1").exists());
    }

    #[test]
    fn rotate_moves_oversized_files_aside() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("scribed.log");
        std::fs::write(&log_path, vec![0u8; MAX_LOG_SIZE_BYTES as usize + 1]).unwrap();
        rotate_log_if_needed(&log_path);
        assert!(!log_path.exists());
        assert!(dir.path().join("scribed.log.1").exists());
    }

    #[test]
    fn rotate_is_a_no_op_for_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        rotate_log_if_needed(&dir.path().join("nonexistent.log"));
    }
}
