//! Request handlers for the rating API
//!
//! Each handler loads a fresh document snapshot; nothing is cached between
//! requests.

use crate::error::RatingError;
use crate::http::error::ApiError;
use crate::service::{AppState, HealthCheck, HealthStatus};
use crate::stats::{
    ChartPoint, FactionStats, FactionSummary, HistorySummary, ParticipationTotals, UserRating,
    DEFAULT_CHART_LIMIT,
};
use crate::store::SubmissionReceipt;
use crate::types::{OrderedMap, RatingDocument, ScoreSet, UserId};
use crate::utils::abbreviate_user_id;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Body of a score submission: faction name → score
///
/// Scores stay as raw JSON until [`SubmitScoresRequest::integer_scores`] so
/// that a float, string or oversized number is reported in the API's own
/// error format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitScoresRequest {
    pub scores: OrderedMap<String, Value>,
}

impl SubmitScoresRequest {
    /// Integer scores in submission order. Range checks happen in the store.
    pub fn integer_scores(&self) -> Result<OrderedMap<String, i64>, RatingError> {
        let mut scores = OrderedMap::with_capacity(self.scores.len());
        for (faction, value) in self.scores.iter() {
            scores.insert(faction.clone(), integer_score(faction, value)?);
        }
        Ok(scores)
    }
}

fn integer_score(faction: &str, value: &Value) -> Result<i64, RatingError> {
    if let Some(score) = value.as_i64() {
        return Ok(score);
    }

    // Whole numbers beyond i64 are out of range, anything else is malformed
    match value {
        Value::Number(n) if n.is_u64() => Err(RatingError::InvalidScore {
            faction: faction.to_string(),
            score: i64::MAX,
        }),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 => Err(RatingError::InvalidScore {
                faction: faction.to_string(),
                score: f as i64,
            }),
            _ => Err(RatingError::InvalidSubmission {
                reason: format!("score for '{}' must be an integer, got {}", faction, n),
            }),
        },
        other => Err(RatingError::InvalidSubmission {
            reason: format!("score for '{}' must be an integer, got {}", faction, other),
        }),
    }
}

/// Run storage work on the blocking pool; the store holds a sync lock
/// across file I/O.
async fn run_blocking<T, F>(state: &Arc<AppState>, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppState) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|e| ApiError::from(anyhow::anyhow!("Storage task failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn load_document(state: &Arc<AppState>) -> Result<RatingDocument, ApiError> {
    run_blocking(state, |state| state.load_document()).await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentScoresResponse {
    pub user_id: UserId,
    pub scores: ScoreSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserHistoryResponse {
    pub user_id: UserId,
    pub display_id: String,
    pub history: Vec<HistorySummary>,
    pub current_ratings: Vec<UserRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub factions: Vec<FactionStats>,
    pub participation: ParticipationTotals,
    pub chart: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionRatingRow {
    pub user_id: UserId,
    pub display_id: String,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionDetailResponse {
    pub faction: String,
    pub ratings: Vec<FactionRatingRow>,
    pub summary: Option<FactionSummary>,
    /// Users per score, index 0 is score 1
    pub distribution: [usize; 5],
}

/// Root endpoint handler - shows service information
pub async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": state.config().service.name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/factions",
            "/sessions",
            "/users/{user_id}/scores",
            "/users/{user_id}/history",
            "/stats",
            "/stats/{faction}",
            "/health",
            "/ready",
            "/alive",
            "/metrics"
        ]
    }))
}

/// Catalog in declaration order
pub async fn factions_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "factions": state.catalog().names() }))
}

/// Mint an anonymous session id for a new visitor
pub async fn create_session_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let user_id = state.mint_session();
    (StatusCode::CREATED, Json(SessionResponse { user_id }))
}

/// Stored scores for pre-filling the rating form
pub async fn get_scores_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<CurrentScoresResponse>, ApiError> {
    let document = load_document(&state).await?;
    match document.user_scores(&user_id) {
        Some(scores) => Ok(Json(CurrentScoresResponse {
            user_id,
            scores: scores.clone(),
        })),
        None => Err(ApiError::not_found(
            "user_not_found",
            format!("No ratings saved for '{}'", user_id),
        )),
    }
}

/// Replace a user's scores and append to their history
pub async fn submit_scores_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Result<Json<SubmitScoresRequest>, JsonRejection>,
) -> Result<Json<SubmissionReceipt>, ApiError> {
    let Json(request) = body.map_err(|rejection| RatingError::InvalidSubmission {
        reason: rejection.body_text(),
    })?;
    debug!(
        "Submission from '{}' with {} entries",
        user_id,
        request.scores.len()
    );

    let scores = request.integer_scores()?;
    let receipt = run_blocking(&state, move |state| state.submit(&user_id, &scores)).await?;
    info!(
        "User '{}' rated {} factions",
        receipt.user_id, receipt.rated_count
    );
    Ok(Json(receipt))
}

/// History rows and current ratings for one user
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserHistoryResponse>, ApiError> {
    let timer = state.metrics().start_timer();
    let document = load_document(&state).await?;
    let engine = state.engine();

    let response = UserHistoryResponse {
        display_id: abbreviate_user_id(&user_id),
        history: engine.user_history_summary(&document, &user_id),
        current_ratings: engine.user_current_ratings(&document, &user_id),
        user_id,
    };
    state.metrics().record_view("history", timer.stop());
    Ok(Json(response))
}

/// Per-faction stats, participation totals and the average chart series
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let timer = state.metrics().start_timer();
    let document = load_document(&state).await?;
    let engine = state.engine();

    let participation = engine.participation_totals(&document);
    state.metrics().update_participation(&participation);

    let response = StatsResponse {
        factions: engine.per_faction_stats(&document),
        participation,
        chart: engine.rated_averages(&document, DEFAULT_CHART_LIMIT),
    };
    state.metrics().record_view("stats", timer.stop());
    Ok(Json(response))
}

/// Detail listing, summary and distribution for one faction
pub async fn faction_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(faction): Path<String>,
) -> Result<Json<FactionDetailResponse>, ApiError> {
    if !state.catalog().contains(&faction) {
        return Err(ApiError::not_found(
            "unknown_faction",
            format!("Unknown faction: {}", faction),
        ));
    }

    let timer = state.metrics().start_timer();
    let document = load_document(&state).await?;
    let engine = state.engine();

    let ratings = engine
        .faction_detail(&document, &faction)
        .into_iter()
        .map(|rating| FactionRatingRow {
            display_id: abbreviate_user_id(&rating.user_id),
            user_id: rating.user_id,
            score: rating.score,
        })
        .collect();

    let response = FactionDetailResponse {
        summary: engine.faction_summary(&document, &faction),
        distribution: engine.score_distribution(&document, &faction).counts,
        ratings,
        faction,
    };
    state.metrics().record_view("faction", timer.stop());
    Ok(Json(response))
}

/// Lightweight health check endpoint handler
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Health check requested");

    let (status_code, status) = match HealthCheck::liveness_check(state.clone()).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "healthy"),
        Ok(HealthStatus::Degraded) => (StatusCode::OK, "degraded"),
        Ok(HealthStatus::Unhealthy) | Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": state.config().service.name,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint handler
pub async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Readiness check requested");

    match HealthCheck::readiness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Ready"),
        Ok(HealthStatus::Degraded) => (StatusCode::OK, "Degraded but ready"),
        Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
        }
    }
}

/// Liveness check endpoint handler
pub async fn alive_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Liveness check requested");

    match HealthCheck::liveness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Alive"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "Not alive"),
    }
}

/// Prometheus metrics endpoint handler
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    debug!("Metrics endpoint requested");

    state.metrics().update_uptime(state.uptime());
    let registry = state.metrics().registry();
    let metric_families = registry.gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            debug!("Serving {} metric families", metric_families.len());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, encoder.format_type().to_string())],
                buffer,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}
