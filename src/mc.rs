//! Monte Carlo estimation over repeated, independently simulated trials.

use tinyrand::{Rand, Seeded, StdRand};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_ITERATIONS: u64 = 10_000;

#[inline]
pub fn random_f64(rand: &mut impl Rand) -> f64 {
    rand.next_u64() as f64 / u64::MAX as f64
}

/// Counts successful trials over a fixed number of iterations. The random
/// stream is owned by the engine and fully determined by the seed, so repeated
/// runs are reproducible and batches can be replayed with [`reset_rand`].
///
/// [`reset_rand`]: MonteCarloEngine::reset_rand
pub struct MonteCarloEngine {
    iterations: u64,
    seed: u64,
    rand: StdRand,
}
impl std::fmt::Debug for MonteCarloEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonteCarloEngine")
            .field("iterations", &self.iterations)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
impl MonteCarloEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed,
            rand: StdRand::seed(seed),
        }
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rewinds the random stream to the start, making the next batch use the
    /// same draws as the first.
    pub fn reset_rand(&mut self) {
        self.rand = StdRand::seed(self.seed);
    }

    /// Estimates the probability of `trial` succeeding as the fraction of
    /// successes over the configured number of iterations.
    pub fn estimate(&mut self, mut trial: impl FnMut(&mut StdRand) -> bool) -> f64 {
        let mut successes = 0;
        for _ in 0..self.iterations {
            if trial(&mut self.rand) {
                successes += 1;
            }
        }
        successes as f64 / self.iterations as f64
    }
}

impl Default for MonteCarloEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}
