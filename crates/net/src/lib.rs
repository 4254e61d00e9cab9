// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! scribe-net: the RPC transport, connection pool, and dynamic bucket
//! resolver (spec.md §4.3, §4.10, §4.11).
//!
//! spec.md §1 puts wire framing and transport out of the core's scope,
//! "assumed: framed, length-prefixed binary RPC with a single
//! `log(batch) -> code` method". This crate supplies that assumption
//! concretely: a 4-byte-length-prefixed frame (`tokio_util::codec::
//! LengthDelimitedCodec`, the same framing the original's non-strict
//! binary-struct protocol boils down to) carrying `bincode`-encoded
//! [`wire::RpcRequest`]/[`wire::RpcResponse`] values.

pub mod bucket_resolver;
pub mod client;
pub mod error;
pub mod pool;
pub mod server;
pub mod wire;

pub use bucket_resolver::{BucketResolverCache, RemoteEndpoint};
pub use client::{RpcClient, TcpRpcClient};
pub use error::RpcError;
pub use pool::ConnectionPool;
pub use server::{LogHandler, MappingProvider, RpcServer};
pub use wire::{BucketMapping, LogCode};

#[cfg(any(test, feature = "test-support"))]
pub use client::FakeRpcClient;
