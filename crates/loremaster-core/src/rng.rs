//! Random number generator abstraction for determinism.
//!
//! Dice handlers roll through this trait. In production it wraps a seeded
//! `StdRng`; tests inject a scripted sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;
}

/// Production RNG backed by `rand`'s standard generator.
#[derive(Debug)]
pub struct SeededRng(StdRng);

impl SeededRng {
    /// Creates an RNG with a fixed seed, for reproducible sessions.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Creates an RNG seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }
}

impl DeterministicRng for SeededRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.0.random_range(min..=max)
    }
}
