// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Randomness behind a small facade (spec.md §9: "seed the random source
//! once at init from a high-resolution clock XOR process id").
//!
//! Used by: the bucket store's `random` bucketizer, the buffer store's
//! retry-interval jitter, and the dispatcher's timestamp sampling.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send + Sync + 'static {
    /// A uniformly distributed value in `[0, bound)`. `bound == 0` always
    /// returns 0.
    fn next_u32_below(&self, bound: u32) -> u32;

    /// A uniformly distributed value in `[0.0, 1.0)`, used for
    /// `timestamp_sample_rate` admission.
    fn next_f64(&self) -> f64;
}

/// Process-wide RNG seeded once from a high-resolution clock XOR'd with
/// the process id, per spec.md §9's platform-facade guidance.
pub struct SystemRandom {
    rng: Mutex<StdRng>,
}

impl SystemRandom {
    pub fn new() -> Self {
        let seed = seed_from_time_and_pid();
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_from_time_and_pid() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ (std::process::id() as u64)
}

impl RandomSource for SystemRandom {
    fn next_u32_below(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.rng.lock().gen_range(0..bound)
    }

    fn next_f64(&self) -> f64 {
        self.rng.lock().gen_range(0.0..1.0)
    }
}

/// A deterministic source for tests: cycles through a fixed script of
/// `u32` values and always returns a fixed `f64`.
pub struct FakeRandom {
    script: Mutex<(Vec<u32>, usize)>,
    fixed_f64: f64,
}

impl FakeRandom {
    pub fn new(script: Vec<u32>) -> Self {
        Self {
            script: Mutex::new((script, 0)),
            fixed_f64: 0.0,
        }
    }

    pub fn with_f64(mut self, value: f64) -> Self {
        self.fixed_f64 = value;
        self
    }
}

impl RandomSource for FakeRandom {
    fn next_u32_below(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        let mut guard = self.script.lock();
        let (script, idx) = &mut *guard;
        if script.is_empty() {
            return 0;
        }
        let v = script[*idx % script.len()];
        *idx += 1;
        v % bound
    }

    fn next_f64(&self) -> f64 {
        self.fixed_f64
    }
}

#[cfg(test)]
#[path = "random_tests.rs"]
mod tests;
