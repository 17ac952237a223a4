//! Loss-simulation policies applied to inbound frames.
//!
//! The receiver worker consults the socket's policy once per non-empty
//! transport read, before any acknowledgement or table mutation. The
//! policy is a replaceable strategy so tests can force deterministic
//! loss patterns; determinism is not part of the protocol contract.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

/// Decides whether an otherwise-valid inbound frame is discarded,
/// modelling an unreliable medium.
pub trait LossPolicy: Send {
    /// Returns `true` if the next inbound frame should be dropped.
    fn should_drop(&mut self) -> bool;
}

/// Drop each frame independently with probability `p`.
///
/// Uses a per-socket PRNG seeded once from the wall clock at
/// construction.
pub struct ProbabilisticLoss {
    /// Drop probability, clamped to [0.0, 1.0].
    probability: f64,
    rng: StdRng,
}

impl ProbabilisticLoss {
    pub fn new(probability: f64) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(probability, seed)
    }

    /// Construct with an explicit seed (reproducible runs).
    pub fn with_seed(probability: f64, seed: u64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns the configured drop probability.
    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl LossPolicy for ProbabilisticLoss {
    fn should_drop(&mut self) -> bool {
        self.rng.random::<f64>() < self.probability
    }
}

/// Never drops. Boundary policy for exactly-once fast-path tests.
pub struct NeverDrop;

impl LossPolicy for NeverDrop {
    fn should_drop(&mut self) -> bool {
        false
    }
}

/// Drops everything. Boundary policy for starvation tests.
pub struct AlwaysDrop;

impl LossPolicy for AlwaysDrop {
    fn should_drop(&mut self) -> bool {
        true
    }
}

/// Drops the frames at the given zero-based reception indices and
/// accepts everything else. Scenario tests use this to lose exactly the
/// first DATA frame or the first ACK.
pub struct DropList {
    drops: HashSet<usize>,
    seen: usize,
}

impl DropList {
    pub fn new<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        Self {
            drops: indices.into_iter().collect(),
            seen: 0,
        }
    }
}

impl LossPolicy for DropList {
    fn should_drop(&mut self) -> bool {
        let index = self.seen;
        self.seen += 1;
        self.drops.contains(&index)
    }
}
