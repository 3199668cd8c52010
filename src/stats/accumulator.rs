//! Running aggregate over the scores of one faction
//!
//! Scores are added one at a time in user order; only rated (non-zero) scores
//! count towards any figure.

use crate::types::Score;
use serde::{Deserialize, Serialize};

/// Count, sum and extrema of the rated scores seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreAccumulator {
    /// Number of rated samples collected
    pub sample_count: usize,
    /// Sum of all rated samples (for calculating mean)
    pub sum: u64,
    /// Lowest rated score observed, 0 when empty
    pub min: u8,
    /// Highest rated score observed, 0 when empty
    pub max: u8,
}

impl ScoreAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a score; unrated scores are ignored. Returns whether it counted.
    pub fn add_sample(&mut self, score: Score) -> bool {
        if !score.is_rated() {
            return false;
        }

        let value = score.value();
        self.min = if self.sample_count == 0 {
            value
        } else {
            self.min.min(value)
        };
        self.max = self.max.max(value);
        self.sum += u64::from(value);
        self.sample_count += 1;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Arithmetic mean of the rated samples, 0.0 when there are none
    pub fn mean(&self) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        self.sum as f64 / self.sample_count as f64
    }

    /// Mean rounded to two decimal places
    pub fn rounded_mean(&self) -> f64 {
        round_to_hundredths(self.mean())
    }
}

impl FromIterator<Score> for ScoreAccumulator {
    fn from_iter<I: IntoIterator<Item = Score>>(iter: I) -> Self {
        let mut acc = ScoreAccumulator::new();
        for score in iter {
            acc.add_sample(score);
        }
        acc
    }
}

/// Round the exact binary value to two decimals, ties to even.
///
/// Scaling by 100 first would round twice: 43/40 is stored just below
/// 1.075 and must become 1.07, not 1.08.
pub fn round_to_hundredths(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}
