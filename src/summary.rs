use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

/// Base the leaderboard score counts down from
pub const SCORE_CEILING: u64 = 100_000;

/// Statistics over a finished session's reaction times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub average: u64,
    pub fastest: u64,
    pub slowest: u64,
}

/// Mean rounded to the nearest millisecond plus the extremes.
/// Returns `None` for an empty series.
pub fn summarize(times: &[u64]) -> Option<Summary> {
    let (fastest, slowest) = match times.iter().copied().minmax() {
        MinMaxResult::NoElements => return None,
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };

    let sum: u64 = times.iter().sum();
    let average = (sum as f64 / times.len() as f64).round() as u64;

    Some(Summary {
        average,
        fastest,
        slowest,
    })
}

/// Lower reaction time, higher score; never below zero
pub fn score_from_reaction_time(ms: u64) -> u64 {
    SCORE_CEILING.saturating_sub(ms)
}
