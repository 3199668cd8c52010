//! Common types used throughout the rating service

pub mod ordered_map;

pub use ordered_map::OrderedMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Opaque token identifying one rating session
pub type UserId = String;

/// Name of a faction from the catalog
pub type FactionName = String;

/// Number of history entries kept per user unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Wall-clock format used for persisted history timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single rating in the closed range 0..=5, where 0 means "unrated"
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const UNRATED: Score = Score(0);
    pub const MAX: u8 = 5;

    /// Returns `None` if the value is outside 0..=5
    pub fn new(value: i64) -> Option<Self> {
        if (0..=Self::MAX as i64).contains(&value) {
            Some(Score(value as u8))
        } else {
            None
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Zero is treated exactly like an absent score by every aggregate
    pub fn is_rated(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<i64> for Score {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Score::new(value).ok_or_else(|| format!("score {} is outside 0-{}", value, Score::MAX))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user's ratings, keyed by faction in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreSet(OrderedMap<FactionName, Score>);

impl ScoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, faction: impl Into<FactionName>, score: Score) -> Option<Score> {
        self.0.insert(faction.into(), score)
    }

    /// Score for a faction; absent factions read as unrated
    pub fn score(&self, faction: &str) -> Score {
        self.0.get(faction).copied().unwrap_or(Score::UNRATED)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Score)> + '_ {
        self.0.iter().map(|(faction, score)| (faction.as_str(), *score))
    }

    /// Entries with a score above zero, in stored order
    pub fn rated(&self) -> impl Iterator<Item = (&str, Score)> + '_ {
        self.iter().filter(|(_, score)| score.is_rated())
    }

    pub fn rated_count(&self) -> usize {
        self.rated().count()
    }

    /// Number of stored keys, including explicit zeros
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<F: Into<FactionName>> FromIterator<(F, Score)> for ScoreSet {
    fn from_iter<I: IntoIterator<Item = (F, Score)>>(iter: I) -> Self {
        ScoreSet(
            iter.into_iter()
                .map(|(faction, score)| (faction.into(), score))
                .collect(),
        )
    }
}

/// Immutable snapshot of a ScoreSet taken on every save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub scores: ScoreSet,
}

/// The entire persisted state: current scores and bounded history per user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDocument {
    #[serde(default)]
    pub scores: OrderedMap<UserId, ScoreSet>,
    #[serde(default)]
    pub history: OrderedMap<UserId, VecDeque<HistoryEntry>>,
}

impl RatingDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the user's current scores and append a history snapshot,
    /// evicting the oldest entries beyond `history_limit`
    pub fn upsert(
        &mut self,
        user_id: &str,
        scores: ScoreSet,
        timestamp: NaiveDateTime,
        history_limit: usize,
    ) {
        let limit = history_limit.max(1);
        let history = self
            .history
            .get_or_insert_with(user_id.to_string(), VecDeque::new);
        history.push_back(HistoryEntry {
            timestamp,
            scores: scores.clone(),
        });
        while history.len() > limit {
            history.pop_front();
        }

        self.scores.insert(user_id.to_string(), scores);
    }

    pub fn user_scores(&self, user_id: &str) -> Option<&ScoreSet> {
        self.scores.get(user_id)
    }

    pub fn user_history(&self, user_id: &str) -> Option<&VecDeque<HistoryEntry>> {
        self.history.get(user_id)
    }

    /// Number of users with a current ScoreSet
    pub fn user_count(&self) -> usize {
        self.scores.len()
    }
}

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        timestamp: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
