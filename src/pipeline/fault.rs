//! Probabilistic failure injection.
//!
//! A request fails when a uniform draw in [0, 1) falls below the configured
//! probability. The random source is injected so tests can force either
//! outcome.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

use crate::observability::metrics;
use crate::pipeline::types::InjectedFault;

/// Source of uniform draws in [0, 1).
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

/// Process-wide default backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Reproducible sequence from a fixed seed.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        // A poisoned lock still holds a usable RNG.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen::<f64>()
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&self) -> f64 {
        self.0
    }
}

/// Decides whether a request is failed on purpose.
#[derive(Clone)]
pub struct FaultInjector {
    source: Arc<dyn RandomSource>,
}

impl FaultInjector {
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        Self { source }
    }

    /// Seeded when a seed is given, thread RNG otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(Arc::new(SeededRandom::new(seed))),
            None => Self::default(),
        }
    }

    /// Fail with `InjectedFault` when the draw is below `probability`.
    pub fn maybe_fail(&self, probability: f64) -> Result<(), InjectedFault> {
        let draw = self.source.next_unit();
        if draw < probability {
            metrics::record_fault_injected();
            tracing::error!(draw, probability, "Random error occurred");
            return Err(InjectedFault);
        }
        Ok(())
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom))
    }
}

impl std::fmt::Debug for FaultInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultInjector").finish_non_exhaustive()
    }
}
