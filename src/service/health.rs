//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the faction-poll
//! service, including readiness and liveness probes.

use crate::service::app::AppState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge value exported to Prometheus
    pub fn as_gauge(self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Users with saved ratings
    pub user_count: usize,
    /// Non-zero ratings across all users
    pub total_ratings: usize,
    /// Factions in the catalog
    pub faction_count: usize,
    /// Service uptime information
    pub uptime_info: String,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        // Check if service is running
        let service_check = Self::check_service_running(&app_state).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        // Check the rating document can be read
        let (storage_check, stats) = Self::check_storage(&app_state);
        if storage_check.status == HealthStatus::Unhealthy {
            overall_status = HealthStatus::Unhealthy;
        } else if storage_check.status == HealthStatus::Degraded
            && overall_status == HealthStatus::Healthy
        {
            overall_status = HealthStatus::Degraded;
        }
        checks.push(storage_check);

        let metrics = app_state.metrics();
        metrics.update_health_status(overall_status.as_gauge());
        metrics.update_uptime(app_state.uptime());
        for check in &checks {
            metrics.update_component_health(&check.name, check.status == HealthStatus::Healthy);
        }

        Ok(HealthCheck {
            status: overall_status,
            service: app_state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if app_state.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - verify service can handle requests
    pub async fn readiness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        // Service must be running
        if !app_state.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        Ok(Self::check_storage(&app_state).0.status)
    }

    /// Check if service is running
    async fn check_service_running(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if app_state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Check that the rating document loads, gathering stats on the way
    fn check_storage(app_state: &AppState) -> (ComponentCheck, ServiceStats) {
        let start = std::time::Instant::now();
        let mut stats = ServiceStats {
            faction_count: app_state.catalog().len(),
            uptime_info: format!("Up {}s", app_state.uptime().as_secs()),
            ..ServiceStats::default()
        };

        let (status, message) = match app_state.load_document() {
            Ok(document) => {
                let totals = app_state.engine().participation_totals(&document);
                app_state.metrics().update_participation(&totals);
                stats.user_count = totals.user_count;
                stats.total_ratings = totals.total_ratings;

                let store = app_state.store();
                if store.has_document() {
                    debug!(
                        "Storage check passed - {} users, {} ratings",
                        totals.user_count, totals.total_ratings
                    );
                    (HealthStatus::Healthy, None)
                } else {
                    // Still ready: the first submission creates the document
                    (
                        HealthStatus::Degraded,
                        Some(format!("No rating document at {} yet", store.describe())),
                    )
                }
            }
            Err(e) => {
                error!("Storage health check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Cannot read rating document: {}", e)),
                )
            }
        };

        let check = ComponentCheck {
            name: "storage".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (check, stats)
    }
}

/// Convert health check to JSON string
impl HealthCheck {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::{InMemoryDocumentStorage, JsonFileStorage, MockDocumentStorage};
    use crate::types::OrderedMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_healthy_when_running_and_readable() {
        let state = Arc::new(
            AppState::with_storage(AppConfig::default(), Arc::new(InMemoryDocumentStorage::new()))
                .unwrap(),
        );
        state.set_running(true).await;

        let health = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.stats.faction_count, 51);
        assert!(health.to_json().unwrap().contains("\"storage\""));

        assert_eq!(
            HealthCheck::readiness_check(state).await.unwrap(),
            HealthStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_unhealthy_when_storage_unreadable() {
        let storage = Arc::new(MockDocumentStorage::new());
        storage.set_fail_loads(true);
        let state = Arc::new(AppState::with_storage(AppConfig::default(), storage).unwrap());
        state.set_running(true).await;

        let health = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(
            HealthCheck::liveness_check(state.clone()).await.unwrap(),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthCheck::readiness_check(state).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_degraded_until_first_submission() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(JsonFileStorage::new(dir.path().join("scores.json")));
        let state = Arc::new(AppState::with_storage(AppConfig::default(), storage).unwrap());
        state.set_running(true).await;

        let health = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Degraded);
        let storage_check = health.checks.iter().find(|c| c.name == "storage").unwrap();
        assert!(storage_check.message.as_ref().unwrap().contains("scores.json"));
        assert_eq!(
            HealthCheck::readiness_check(state.clone()).await.unwrap(),
            HealthStatus::Degraded
        );

        let mut scores = OrderedMap::new();
        scores.insert("王后恩赐".to_string(), 4);
        state.submit("u1", &scores).unwrap();

        let health = HealthCheck::check(state).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.stats.user_count, 1);
    }

    #[tokio::test]
    async fn test_not_running() {
        let state = Arc::new(
            AppState::with_storage(AppConfig::default(), Arc::new(InMemoryDocumentStorage::new()))
                .unwrap(),
        );

        assert_eq!(
            HealthCheck::liveness_check(state).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }
}
