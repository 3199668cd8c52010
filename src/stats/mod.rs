//! Statistics over the rating document
//!
//! This module provides the stateless StatsEngine and the aggregate types
//! it produces for the stats, faction and history views.

pub mod accumulator;
pub mod engine;

// Re-export commonly used types
pub use accumulator::{round_to_hundredths, ScoreAccumulator};
pub use engine::{
    sample_text, ChartPoint, FactionRating, FactionStats, FactionSummary, HistorySummary,
    ParticipationTotals, ScoreDistribution, StatsEngine, UserRating, DEFAULT_CHART_LIMIT,
};
