//! Percentage-based gate deciding whether secondaries see a request.
//!
//! The random source is an explicit dependency ([`RandomSource`]) so
//! the sampler can be driven deterministically in tests. The default
//! [`SeededRandom`] is seeded once at startup and holds its lock only
//! for the duration of a single draw.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform draws in `[0, 1)`, shareable across request tasks.
pub trait RandomSource: Send + Sync {
    fn draw(&self) -> f64;
}

pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn draw(&self) -> f64 {
        // Generator state stays valid across a poisoned lock.
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen::<f64>()
    }
}

pub struct Sampler {
    percent: f64,
    source: Arc<dyn RandomSource>,
}

impl Sampler {
    #[must_use]
    pub fn new(percent: f64, source: Arc<dyn RandomSource>) -> Self {
        Self { percent, source }
    }

    #[must_use]
    pub const fn percent(&self) -> f64 {
        self.percent
    }

    /// One decision per request. At exactly 100% no draw is taken.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn should_mirror(&self) -> bool {
        if self.percent == 100.0 {
            return true;
        }
        self.source.draw() * 100.0 < self.percent
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("percent", &self.percent)
            .finish_non_exhaustive()
    }
}
