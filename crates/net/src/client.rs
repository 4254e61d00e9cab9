// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client side of the framed RPC (spec.md §4.3 "Network store",
//! §5 "Network sends use a fixed connect/send/recv timeout").

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::RpcError;
use crate::wire::{self, BucketMapping, LogCode, RpcRequest, RpcResponse};
use scribe_core::entry::Batch;

/// Fixed timeouts applied to every phase of a send, per spec.md §5.
#[derive(Debug, Clone, Copy)]
pub struct RpcTimeouts {
    pub connect: Duration,
    pub send: Duration,
    pub recv: Duration,
}

impl Default for RpcTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(5_000),
            send: Duration::from_millis(5_000),
            recv: Duration::from_millis(5_000),
        }
    }
}

/// A client of another instance of this server (or of a `getMapping`
/// resolver). Implementations are not required to be `Clone`; the
/// connection pool and the network store each own one behind their own
/// synchronization.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn connect(&mut self) -> Result<(), RpcError>;
    fn is_connected(&self) -> bool;
    async fn close(&mut self);
    async fn send_log(&mut self, batch: &Batch) -> Result<LogCode, RpcError>;
    async fn get_mapping(&mut self, category: &str) -> Result<Vec<BucketMapping>, RpcError>;
}

/// A real TCP-backed client, framed with a 4-byte length prefix.
pub struct TcpRpcClient {
    host: String,
    port: u16,
    timeouts: RpcTimeouts,
    conn: Option<Framed<TcpStream, LengthDelimitedCodec>>,
}

impl TcpRpcClient {
    pub fn new(host: impl Into<String>, port: u16, timeouts: RpcTimeouts) -> Self {
        Self {
            host: host.into(),
            port,
            timeouts,
            conn: None,
        }
    }

    async fn roundtrip(&mut self, req: &RpcRequest) -> Result<RpcResponse, RpcError> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(RpcError::NotConnected);
        };
        let bytes = wire::encode_request(req)?;
        timeout(self.timeouts.send, conn.send(Bytes::from(bytes)))
            .await
            .map_err(|_| RpcError::SendTimeout(self.timeouts.send))??;
        let frame = timeout(self.timeouts.recv, conn.next())
            .await
            .map_err(|_| RpcError::RecvTimeout(self.timeouts.recv))?
            .ok_or(RpcError::ConnectionClosed)??;
        Ok(wire::decode_response(&frame)?)
    }
}

#[async_trait]
impl RpcClient for TcpRpcClient {
    async fn connect(&mut self) -> Result<(), RpcError> {
        let addr = format!("{}:{}", self.host, self.port);
        let stream = timeout(self.timeouts.connect, TcpStream::connect(&addr))
            .await
            .map_err(|_| RpcError::Connect(addr.clone(), std::io::ErrorKind::TimedOut.into()))?
            .map_err(|e| RpcError::Connect(addr, e))?;
        self.conn = Some(Framed::new(stream, LengthDelimitedCodec::new()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn close(&mut self) {
        self.conn = None;
    }

    async fn send_log(&mut self, batch: &Batch) -> Result<LogCode, RpcError> {
        match self.roundtrip(&RpcRequest::Log(batch.clone())).await {
            Ok(RpcResponse::Log(code)) => Ok(code),
            Ok(_) => Err(RpcError::Codec(
                bincode::ErrorKind::Custom("unexpected response variant".into()).into(),
            )),
            Err(e) => {
                self.conn = None;
                Err(e)
            }
        }
    }

    async fn get_mapping(&mut self, category: &str) -> Result<Vec<BucketMapping>, RpcError> {
        let req = RpcRequest::GetMapping {
            category: category.to_string(),
        };
        match self.roundtrip(&req).await {
            Ok(RpcResponse::Mapping(Some(mappings))) => Ok(mappings),
            Ok(RpcResponse::Mapping(None)) => Ok(Vec::new()),
            Ok(_) => Err(RpcError::Codec(
                bincode::ErrorKind::Custom("unexpected response variant".into()).into(),
            )),
            Err(e) => {
                self.conn = None;
                Err(e)
            }
        }
    }
}

/// A scripted client for tests: returns a fixed sequence of outcomes
/// without touching a real socket.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeRpcClient {
    pub connected: bool,
    pub connect_fails: bool,
    pub script: Vec<Result<LogCode, ()>>,
    pub sent: Vec<Batch>,
    pub mappings: Vec<BucketMapping>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeRpcClient {
    pub fn new(script: Vec<Result<LogCode, ()>>) -> Self {
        Self {
            connected: false,
            connect_fails: false,
            script,
            sent: Vec::new(),
            mappings: Vec::new(),
        }
    }

    pub fn always_unreachable() -> Self {
        Self {
            connected: false,
            connect_fails: true,
            script: Vec::new(),
            sent: Vec::new(),
            mappings: Vec::new(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl RpcClient for FakeRpcClient {
    async fn connect(&mut self) -> Result<(), RpcError> {
        if self.connect_fails {
            return Err(RpcError::Connect(
                "fake".into(),
                std::io::ErrorKind::ConnectionRefused.into(),
            ));
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) {
        self.connected = false;
    }

    async fn send_log(&mut self, batch: &Batch) -> Result<LogCode, RpcError> {
        if !self.connected {
            return Err(RpcError::NotConnected);
        }
        self.sent.push(batch.clone());
        if self.script.is_empty() {
            return Ok(LogCode::Ok);
        }
        match self.script.remove(0) {
            Ok(code) => Ok(code),
            Err(()) => {
                self.connected = false;
                Err(RpcError::ConnectionClosed)
            }
        }
    }

    async fn get_mapping(&mut self, _category: &str) -> Result<Vec<BucketMapping>, RpcError> {
        Ok(self.mappings.clone())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
