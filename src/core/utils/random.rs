//! Seeded random streams for sampling.
//!
//! Every random draw in the crate goes through [`Random`], which is always
//! constructed from an explicit seed. Parallel workers derive their stream as
//! `base_seed + worker_index` so results do not depend on thread scheduling.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// A wrapper for a seeded random generator.
#[derive(Debug, Clone)]
pub struct Random {
    rng: StdRng,
    seed: u64,
}

impl Random {
    /// Constructor, with specific seed
    pub fn with_seed(seed: u64) -> Self {
        Random {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Independent stream for parallel worker `worker_index`.
    pub fn for_worker(base_seed: u64, worker_index: usize) -> Self {
        Self::with_seed(base_seed.wrapping_add(worker_index as u64))
    }

    /// Seed this stream was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform random permutation of `0..n`.
    pub fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.rng);
        order
    }

    /// Sample `k` distinct indices from `0..n`, returned in ascending order.
    /// Returns all of `0..n` when `k >= n`.
    pub fn sample(&mut self, n: usize, k: usize) -> Vec<usize> {
        if k >= n {
            return (0..n).collect();
        }
        let mut picked = rand::seq::index::sample(&mut self.rng, n, k).into_vec();
        picked.sort_unstable();
        picked
    }
}
