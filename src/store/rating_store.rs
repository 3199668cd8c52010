//! Rating store: load, upsert and save of the rating document
//!
//! Every submission is a full load → modify → save cycle. Within one process
//! submissions are serialized by a write lock so concurrent sessions cannot
//! overwrite each other's saves; separate processes sharing a file are not
//! coordinated.

use crate::catalog::FactionCatalog;
use crate::error::{RatingError, Result};
use crate::store::storage::DocumentStorage;
use crate::types::{OrderedMap, RatingDocument, ScoreSet, UserId, DEFAULT_HISTORY_LIMIT};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub user_id: UserId,
    /// Factions rated above zero in this submission
    pub rated_count: usize,
    /// History entries retained for the user after this save
    pub history_length: usize,
}

/// Durable mapping of user → current scores and bounded history
pub struct RatingStore {
    storage: Arc<dyn DocumentStorage>,
    catalog: Arc<FactionCatalog>,
    history_limit: usize,
    write_lock: Mutex<()>,
}

impl RatingStore {
    pub fn new(storage: Arc<dyn DocumentStorage>, catalog: Arc<FactionCatalog>) -> Self {
        Self {
            storage,
            catalog,
            history_limit: DEFAULT_HISTORY_LIMIT,
            write_lock: Mutex::new(()),
        }
    }

    /// Override how many history entries are kept per user
    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit.max(1);
        self
    }

    pub fn catalog(&self) -> &Arc<FactionCatalog> {
        &self.catalog
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Location of the underlying storage
    pub fn describe(&self) -> String {
        self.storage.describe()
    }

    /// Read the whole persisted document
    /// False until the first submission is saved
    pub fn has_document(&self) -> bool {
        self.storage.has_document()
    }

    pub fn load(&self) -> Result<RatingDocument> {
        self.storage.load()
    }

    /// Replace the persisted document with `document`
    pub fn save(&self, document: &RatingDocument) -> Result<()> {
        self.storage.save(document)
    }

    /// Apply one user's scores to a loaded document and return it for saving
    pub fn upsert(
        &self,
        mut document: RatingDocument,
        user_id: &str,
        scores: ScoreSet,
        timestamp: NaiveDateTime,
    ) -> RatingDocument {
        document.upsert(user_id, scores, timestamp, self.history_limit);
        document
    }

    /// Check a raw submission against the catalog and the score range
    pub fn validate(&self, raw: &OrderedMap<String, i64>) -> Result<ScoreSet> {
        self.catalog.validate(raw)
    }

    /// Validate, then load → upsert → save under the write lock.
    /// Nothing is written if validation fails.
    pub fn submit(
        &self,
        user_id: &str,
        raw: &OrderedMap<String, i64>,
        timestamp: NaiveDateTime,
    ) -> Result<SubmissionReceipt> {
        if user_id.trim().is_empty() {
            return Err(RatingError::InvalidSubmission {
                reason: "user id cannot be empty".to_string(),
            }
            .into());
        }

        let scores = match self.validate(raw) {
            Ok(scores) => scores,
            Err(e) => {
                warn!("Rejected submission from '{}': {}", user_id, e);
                return Err(e);
            }
        };
        let rated_count = scores.rated_count();

        let _guard = self.write_lock.lock().map_err(|_| RatingError::InternalError {
            message: "Failed to acquire rating store write lock".to_string(),
        })?;

        let document = self.load()?;
        let document = self.upsert(document, user_id, scores, timestamp);
        let history_length = document
            .user_history(user_id)
            .map(|history| history.len())
            .unwrap_or(0);
        self.save(&document)?;

        info!(
            "Saved ratings for '{}' - rated: {}, history: {}",
            user_id, rated_count, history_length
        );

        Ok(SubmissionReceipt {
            user_id: user_id.to_string(),
            rated_count,
            history_length,
        })
    }

    /// The user's stored scores, if they have ever saved
    pub fn current_scores(&self, user_id: &str) -> Result<Option<ScoreSet>> {
        let document = self.load()?;
        debug!(
            "Looked up current scores for '{}' among {} users",
            user_id,
            document.user_count()
        );
        Ok(document.user_scores(user_id).cloned())
    }
}

impl std::fmt::Debug for RatingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingStore")
            .field("storage", &self.storage.describe())
            .field("factions", &self.catalog.len())
            .field("history_limit", &self.history_limit)
            .finish()
    }
}
