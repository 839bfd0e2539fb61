//! Seeded random stream
//!
//! A run draws every random number (placement, inoculation, shuffling of
//! the particle list) from one [`RandomStream`], so the same seed replays
//! the same run. The stream is not `Sync`: parallel code must serialise its
//! draws through the owner.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// The single ordered random stream of a run
#[derive(Debug, Clone)]
pub struct RandomStream {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomStream {
    /// Stream seeded with `seed`
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed the stream was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in `[0, 1)`
    pub fn next_uniform(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }

    /// Draw from the standard normal distribution
    pub fn next_standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    /// Shuffle a slice in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
