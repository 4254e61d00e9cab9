// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! scribe-engine: the message-routing and delivery pipeline (spec.md
//! §4.7–§4.9): the worker queue that owns a store and drains to it, the
//! category registry that resolves a category to worker queues (creating
//! them from prototypes on first sight), and the dispatcher that is the
//! server's one RPC-facing entry point.

pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod worker_queue;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::EngineError;
pub use registry::CategoryRegistry;
pub use worker_queue::{ModelQueue, WorkerQueue, WorkerQueueConfig};
