// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The server side of the framed RPC (spec.md §6 "RPC surface"): one
//! method, `log(batch) -> code`, plus `getMapping` for peers whose dynamic
//! bucket resolver points at this instance.
//!
//! spec.md §1 puts "RPC/wire framing and transport" and "process entry
//! point... the filesystem layer abstraction" out of the core's scope; the
//! accept loop here is the minimal ambient surface needed to make the
//! dispatcher (spec.md §4.8) reachable over a socket at all, grounded in
//! the same length-delimited framing [`crate::client::TcpRpcClient`] uses.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use scribe_core::entry::Batch;

use crate::wire::{self, BucketMapping, LogCode, RpcRequest, RpcResponse};

/// Implemented by the dispatcher: the only operation the RPC surface
/// exposes to a caller (spec.md §4.8 "Entry point: `Log(batch) ->
/// {Ok, TryLater}`").
#[async_trait]
pub trait LogHandler: Send + Sync {
    async fn handle_log(&self, batch: Batch) -> LogCode;
}

/// Optionally implemented by a server that is also a bucket-mapping
/// authority for `getMapping` (spec.md §4.11). Not every instance needs
/// to answer this; [`RpcServer`] replies "not supported" when absent.
#[async_trait]
pub trait MappingProvider: Send + Sync {
    async fn get_mapping(&self, category: &str) -> Vec<BucketMapping>;
}

pub struct RpcServer<H: LogHandler + 'static> {
    handler: Arc<H>,
    mapping_provider: Option<Arc<dyn MappingProvider>>,
}

impl<H: LogHandler + 'static> RpcServer<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            mapping_provider: None,
        }
    }

    pub fn with_mapping_provider(mut self, provider: Arc<dyn MappingProvider>) -> Self {
        self.mapping_provider = Some(provider);
        self
    }

    /// Binds `addr` and serves connections until `shutdown` resolves.
    /// Each connection is handled on its own task (spec.md §5: "an RPC
    /// thread pool handling inbound `Log` calls concurrently").
    pub async fn serve(
        &self,
        addr: SocketAddr,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_listener(listener, shutdown).await
    }

    /// Same as [`Self::serve`] but over an already-bound listener, so a
    /// caller (or a test) can learn the assigned port before requests
    /// start arriving.
    pub async fn serve_listener(
        &self,
        listener: TcpListener,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _) = accepted?;
                    let handler = Arc::clone(&self.handler);
                    let mapping_provider = self.mapping_provider.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, handler, mapping_provider).await {
                            tracing::warn!(error = %e, "rpc connection ended with an error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn serve_connection<H: LogHandler + 'static>(
    stream: TcpStream,
    handler: Arc<H>,
    mapping_provider: Option<Arc<dyn MappingProvider>>,
) -> std::io::Result<()> {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    while let Some(frame) = framed.next().await {
        let frame = frame?;
        let response = match wire::decode_request(&frame) {
            Ok(RpcRequest::Log(batch)) => RpcResponse::Log(handler.handle_log(batch).await),
            Ok(RpcRequest::GetMapping { category }) => match &mapping_provider {
                Some(provider) => RpcResponse::Mapping(Some(provider.get_mapping(&category).await)),
                None => RpcResponse::Mapping(None),
            },
            Err(e) => {
                tracing::warn!(error = %e, "malformed rpc request frame, closing connection");
                return Ok(());
            }
        };
        let Ok(bytes) = wire::encode_response(&response) else {
            continue;
        };
        framed.send(Bytes::from(bytes)).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
