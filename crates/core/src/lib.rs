// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! scribe-core: shared data model for the log-message collection server.
//!
//! Everything here is deliberately free of I/O: [`entry`] and [`category`]
//! define the wire-independent message model, [`conf`] is the read-only
//! configuration tree every store is configured from, and [`clock`] /
//! [`random`] are the platform facades the rest of the workspace is built
//! against instead of calling into the standard library's ambient time and
//! randomness directly.

pub mod category;
pub mod clock;
pub mod conf;
pub mod entry;
pub mod metrics;
pub mod platform;
pub mod random;
pub mod status;

pub use category::{is_portable_filename, CategoryMatch};
pub use clock::{Clock, SystemClock};
pub use conf::{ConfError, ConfNode};
pub use entry::{Batch, LogEntry};
pub use metrics::{InMemoryMetrics, MetricsSink, NullMetrics};
pub use random::{RandomSource, SystemRandom};
pub use status::ServerStatus;

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
#[cfg(any(test, feature = "test-support"))]
pub use random::FakeRandom;
