use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

pub const DEFAULT_MIN_DELAY_MS: u64 = 2000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// Inclusive bounds for the wait before a cue appears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    /// Builds a range, swapping the bounds if they arrive reversed
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        }
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY_MS, DEFAULT_MAX_DELAY_MS)
    }
}

/// Draws a fresh cue delay for every round
#[derive(Debug, Clone)]
pub struct DelayGenerator {
    range: DelayRange,
    rng: StdRng,
}

impl DelayGenerator {
    pub fn new(range: DelayRange) -> Self {
        Self {
            range,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(range: DelayRange, seed: u64) -> Self {
        Self {
            range,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let ms = self.rng.gen_range(self.range.min_ms..=self.range.max_ms);
        Duration::from_millis(ms)
    }
}

impl Default for DelayGenerator {
    fn default() -> Self {
        Self::new(DelayRange::default())
    }
}
