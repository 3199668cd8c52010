//! Error types for the rating service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Callers that need to branch on a specific failure
//! use `downcast_ref::<RatingError>()`.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RatingError {
    #[error("Storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: String, reason: String },

    #[error("Invalid score {score} for faction '{faction}' (expected 0-5)")]
    InvalidScore { faction: String, score: i64 },

    #[error("Unknown faction: {faction}")]
    UnknownFaction { faction: String },

    #[error("Invalid submission: {reason}")]
    InvalidSubmission { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl RatingError {
    /// Short machine-readable name used in API error bodies and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            RatingError::StorageUnavailable { .. } => "storage_unavailable",
            RatingError::InvalidScore { .. } => "invalid_score",
            RatingError::UnknownFaction { .. } => "unknown_faction",
            RatingError::InvalidSubmission { .. } => "invalid_submission",
            RatingError::ConfigurationError { .. } => "configuration_error",
            RatingError::InternalError { .. } => "internal_error",
        }
    }

    /// Build a `StorageUnavailable` error for the given location
    pub fn storage(path: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        RatingError::StorageUnavailable {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
