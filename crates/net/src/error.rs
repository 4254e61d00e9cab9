// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Transport-level failures. Per spec.md §7, none of these cross the RPC
/// boundary as an exception to a *caller* of this crate's client — every
/// `RpcClient` method returns its outcome, with this error type used only
/// internally to distinguish "connect failed" from "timed out" from
/// "peer sent garbage" for logging/status purposes.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("connect to {0} failed: {1}")]
    Connect(String, std::io::Error),
    #[error("not connected")]
    NotConnected,
    #[error("send timed out after {0:?}")]
    SendTimeout(std::time::Duration),
    #[error("recv timed out after {0:?}")]
    RecvTimeout(std::time::Duration),
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Codec(#[from] bincode::Error),
}
