//! Main application state and service coordination
//!
//! This module contains the AppState that wires the faction catalog, the
//! rating store, the stats engine and metrics together for the HTTP layer.

use crate::catalog::FactionCatalog;
use crate::config::AppConfig;
use crate::error::{RatingError, Result as RatingResult};
use crate::metrics::MetricsCollector;
use crate::stats::StatsEngine;
use crate::store::{DocumentStorage, JsonFileStorage, RatingStore, SubmissionReceipt};
use crate::types::{OrderedMap, RatingDocument};
use crate::utils::{current_timestamp, generate_session_id};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Factions users can rate
    catalog: Arc<FactionCatalog>,

    /// Persistence of the rating document
    store: Arc<RatingStore>,

    /// Statistics over document snapshots
    engine: StatsEngine,

    /// Prometheus metrics
    metrics: Arc<MetricsCollector>,

    /// When the state was created
    started_at: Instant,

    /// Service status
    is_running: RwLock<bool>,
}

impl AppState {
    /// Initialize the application backed by the configured rating file
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        let storage = JsonFileStorage::new(config.storage.data_file.clone())
            .with_atomic_writes(config.storage.atomic_writes);
        Self::with_storage(config, Arc::new(storage))
    }

    /// Initialize the application with an explicit storage backend
    pub fn with_storage(
        config: AppConfig,
        storage: Arc<dyn DocumentStorage>,
    ) -> Result<Self, ServiceError> {
        info!("Initializing faction-poll rating service");

        let catalog = Arc::new(config.faction_catalog().map_err(|e| {
            ServiceError::Configuration {
                message: format!("{:#}", e),
            }
        })?);

        let store = Arc::new(
            RatingStore::new(storage, catalog.clone())
                .with_history_limit(config.storage.history_limit),
        );
        let engine = StatsEngine::new(catalog.clone());

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        info!(
            "Configuration: service={}, storage={}, factions={}, history_limit={}",
            config.service.name,
            store.describe(),
            catalog.len(),
            store.history_limit()
        );

        Ok(Self {
            config,
            catalog,
            store,
            engine,
            metrics,
            started_at: Instant::now(),
            is_running: RwLock::new(false),
        })
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &FactionCatalog {
        &self.catalog
    }

    pub fn store(&self) -> Arc<RatingStore> {
        self.store.clone()
    }

    pub fn engine(&self) -> &StatsEngine {
        &self.engine
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Time since the state was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Mark the service as accepting (or no longer accepting) requests
    pub async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
        info!("Service running state set to {}", running);
    }

    /// Hand out a fresh anonymous session id
    pub fn mint_session(&self) -> String {
        let session_id = generate_session_id();
        self.metrics.record_session_created();
        debug!("Minted session id '{}'", session_id);
        session_id
    }

    /// Load the current document, recording storage timing
    pub fn load_document(&self) -> RatingResult<RatingDocument> {
        let timer = self.metrics.start_timer();
        let result = self.store.load();
        self.metrics
            .record_storage_operation("load", result.is_ok(), timer.stop());

        if let Err(e) = &result {
            error!("Failed to load rating document: {}", e);
        }
        result
    }

    /// Record a user's submission with the current local time
    pub fn submit(
        &self,
        user_id: &str,
        raw: &OrderedMap<String, i64>,
    ) -> RatingResult<SubmissionReceipt> {
        let timer = self.metrics.start_timer();
        let result = self.store.submit(user_id, raw, current_timestamp());
        let elapsed = timer.stop();

        match &result {
            Ok(receipt) => {
                self.metrics.record_storage_operation("submit", true, elapsed);
                self.metrics.record_submission_saved(receipt.rated_count);
            }
            Err(e) => {
                let (kind, rejected) = match e.downcast_ref::<RatingError>() {
                    Some(err @ RatingError::StorageUnavailable { .. }) => (err.kind(), false),
                    Some(err @ RatingError::InternalError { .. }) => (err.kind(), false),
                    Some(err) => (err.kind(), true),
                    None => ("unknown", false),
                };
                if !rejected {
                    self.metrics.record_storage_operation("submit", false, elapsed);
                    warn!("Submission from '{}' failed: {}", user_id, e);
                }
                self.metrics.record_submission_error(kind, rejected);
            }
        }

        result
    }
}
