//! Read-only statistics over a rating document snapshot
//!
//! Every operation is a pure function of the document (and the catalog for
//! per-faction views). Zero scores never contribute to any figure.

use crate::catalog::FactionCatalog;
use crate::stats::accumulator::ScoreAccumulator;
use crate::types::{FactionName, RatingDocument, ScoreSet, UserId, TIMESTAMP_FORMAT};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Number of rated pairs shown in a history preview
pub const SAMPLE_SIZE: usize = 5;

/// Number of factions in the average-score chart
pub const DEFAULT_CHART_LIMIT: usize = 20;

/// Preview text for a history entry with no rated factions
pub const NO_RATINGS_TEXT: &str = "无评分";

/// Aggregate figures for one faction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionStats {
    pub faction: FactionName,
    /// Mean of rated scores, rounded to two decimals
    pub mean: f64,
    pub max: u8,
    pub min: u8,
    pub rated_count: usize,
}

/// One user's rating of a faction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRating {
    pub user_id: UserId,
    pub score: u8,
}

/// Unrounded figures for the single-faction view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionSummary {
    pub mean: f64,
    pub max: u8,
    pub min: u8,
    pub rated_count: usize,
}

/// How many users gave each score from 1 to 5
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub counts: [usize; 5],
}

impl ScoreDistribution {
    /// Users who gave exactly `score` (1..=5); 0 for anything else
    pub fn count(&self, score: u8) -> usize {
        match score {
            1..=5 => self.counts[usize::from(score) - 1],
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// One row of a user's history listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub timestamp: String,
    pub rated_count: usize,
    pub sample_text: String,
}

/// Headline participation figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationTotals {
    pub user_count: usize,
    pub total_ratings: usize,
}

/// One bar of the average-score chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub faction: FactionName,
    pub mean: f64,
}

/// One of a user's current ratings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRating {
    pub faction: FactionName,
    pub score: u8,
}

/// Derives statistics from document snapshots
#[derive(Debug, Clone)]
pub struct StatsEngine {
    catalog: Arc<FactionCatalog>,
}

impl StatsEngine {
    pub fn new(catalog: Arc<FactionCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &FactionCatalog {
        &self.catalog
    }

    fn accumulate(document: &RatingDocument, faction: &str) -> ScoreAccumulator {
        document
            .scores
            .values()
            .map(|scores| scores.score(faction))
            .collect()
    }

    /// Stats for every catalog faction, highest mean first; equal means keep
    /// catalog order
    pub fn per_faction_stats(&self, document: &RatingDocument) -> Vec<FactionStats> {
        let mut stats: Vec<FactionStats> = self
            .catalog
            .iter()
            .map(|faction| {
                let acc = Self::accumulate(document, faction);
                FactionStats {
                    faction: faction.to_string(),
                    mean: acc.rounded_mean(),
                    max: acc.max,
                    min: acc.min,
                    rated_count: acc.sample_count,
                }
            })
            .collect();

        stats.sort_by(|a, b| b.mean.partial_cmp(&a.mean).unwrap_or(Ordering::Equal));
        stats
    }

    /// Every user who rated `faction`, highest score first; equal scores keep
    /// user order
    pub fn faction_detail(&self, document: &RatingDocument, faction: &str) -> Vec<FactionRating> {
        let mut ratings: Vec<FactionRating> = document
            .scores
            .iter()
            .filter_map(|(user_id, scores)| {
                let score = scores.score(faction);
                score.is_rated().then(|| FactionRating {
                    user_id: user_id.clone(),
                    score: score.value(),
                })
            })
            .collect();

        ratings.sort_by(|a, b| b.score.cmp(&a.score));
        ratings
    }

    /// Unrounded summary for one faction, `None` if nobody rated it
    pub fn faction_summary(
        &self,
        document: &RatingDocument,
        faction: &str,
    ) -> Option<FactionSummary> {
        let acc = Self::accumulate(document, faction);
        (!acc.is_empty()).then(|| FactionSummary {
            mean: acc.mean(),
            max: acc.max,
            min: acc.min,
            rated_count: acc.sample_count,
        })
    }

    /// Count of users per score value for one faction
    pub fn score_distribution(&self, document: &RatingDocument, faction: &str) -> ScoreDistribution {
        let mut distribution = ScoreDistribution::default();
        for scores in document.scores.values() {
            let score = scores.score(faction);
            if score.is_rated() {
                distribution.counts[usize::from(score.value()) - 1] += 1;
            }
        }
        distribution
    }

    /// One row per retained history entry, oldest first
    pub fn user_history_summary(
        &self,
        document: &RatingDocument,
        user_id: &str,
    ) -> Vec<HistorySummary> {
        document
            .user_history(user_id)
            .map(|history| {
                history
                    .iter()
                    .map(|entry| HistorySummary {
                        timestamp: entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                        rated_count: entry.scores.rated_count(),
                        sample_text: sample_text(&entry.scores),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct users and the number of non-zero ratings across all of them
    pub fn participation_totals(&self, document: &RatingDocument) -> ParticipationTotals {
        ParticipationTotals {
            user_count: document.user_count(),
            total_ratings: document.scores.values().map(ScoreSet::rated_count).sum(),
        }
    }

    /// Chart series: rated factions in catalog order, at most `limit`
    pub fn rated_averages(&self, document: &RatingDocument, limit: usize) -> Vec<ChartPoint> {
        self.catalog
            .iter()
            .filter_map(|faction| {
                let acc = Self::accumulate(document, faction);
                (!acc.is_empty()).then(|| ChartPoint {
                    faction: faction.to_string(),
                    mean: acc.rounded_mean(),
                })
            })
            .take(limit)
            .collect()
    }

    /// The user's rated factions, highest score first
    pub fn user_current_ratings(&self, document: &RatingDocument, user_id: &str) -> Vec<UserRating> {
        let mut ratings: Vec<UserRating> = document
            .user_scores(user_id)
            .map(|scores| {
                scores
                    .rated()
                    .map(|(faction, score)| UserRating {
                        faction: faction.to_string(),
                        score: score.value(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        ratings.sort_by(|a, b| b.score.cmp(&a.score));
        ratings
    }
}

/// Preview of up to the first five rated pairs, e.g. `"归元:4分, 节制:2分"`,
/// with the full count appended when more were rated
pub fn sample_text(scores: &ScoreSet) -> String {
    let rated: Vec<_> = scores.rated().collect();
    if rated.is_empty() {
        return NO_RATINGS_TEXT.to_string();
    }

    let mut text = rated
        .iter()
        .take(SAMPLE_SIZE)
        .map(|(faction, score)| format!("{}:{}分", faction, score))
        .collect::<Vec<_>>()
        .join(", ");
    if rated.len() > SAMPLE_SIZE {
        text.push_str(&format!(" (等{}个)", rated.len()));
    }
    text
}
