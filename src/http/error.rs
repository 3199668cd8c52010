//! Mapping of service errors onto HTTP responses

use crate::error::RatingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Error returned by API handlers, rendered as `{"error", "message"}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn not_found(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind,
            message: message.into(),
        }
    }
}

impl From<RatingError> for ApiError {
    fn from(err: RatingError) -> Self {
        let status = match &err {
            RatingError::InvalidScore { .. }
            | RatingError::UnknownFaction { .. }
            | RatingError::InvalidSubmission { .. } => StatusCode::BAD_REQUEST,
            RatingError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RatingError::ConfigurationError { .. } | RatingError::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<RatingError>() {
            Some(rating_error) => rating_error.clone().into(),
            None => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                kind: "internal_error",
                message: format!("{:#}", err),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed ({}): {}", self.status, self.message);
        } else {
            warn!("Request rejected ({}): {}", self.status, self.message);
        }

        (
            self.status,
            Json(json!({
                "error": self.kind,
                "message": self.message,
            })),
        )
            .into_response()
    }
}
