//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the faction-poll service using
//! Prometheus metrics.

use crate::stats::ParticipationTotals;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the rating service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Submission and participation metrics
    rating_metrics: RatingMetrics,

    /// Storage and view performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Submission and participation metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Submissions by outcome (saved / rejected / failed)
    pub submissions_total: IntCounterVec,

    /// Rejected or failed submissions by error kind
    pub submission_errors_total: IntCounterVec,

    /// Factions rated per saved submission
    pub factions_rated_per_submission: Histogram,

    /// Distinct users in the rating document
    pub registered_users: IntGauge,

    /// Non-zero ratings across all users
    pub total_ratings: IntGauge,

    /// Sessions minted
    pub sessions_created_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Document load/save durations
    pub storage_operation_duration: HistogramVec,

    /// Stats view requests by view
    pub view_requests_total: IntCounterVec,

    /// Stats view computation durations
    pub view_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let rating_metrics = RatingMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            rating_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get rating metrics
    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a saved submission
    pub fn record_submission_saved(&self, rated_count: usize) {
        self.rating_metrics
            .submissions_total
            .with_label_values(&["saved"])
            .inc();

        self.rating_metrics
            .factions_rated_per_submission
            .observe(rated_count as f64);
    }

    /// Record a submission that was rejected by validation or failed in storage
    pub fn record_submission_error(&self, kind: &str, rejected: bool) {
        let outcome = if rejected { "rejected" } else { "failed" };

        self.rating_metrics
            .submissions_total
            .with_label_values(&[outcome])
            .inc();

        self.rating_metrics
            .submission_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record a new session id being handed out
    pub fn record_session_created(&self) {
        self.rating_metrics
            .sessions_created_total
            .with_label_values(&["http"])
            .inc();
    }

    /// Update participation gauges from the latest totals
    pub fn update_participation(&self, totals: &ParticipationTotals) {
        self.rating_metrics
            .registered_users
            .set(totals.user_count as i64);
        self.rating_metrics
            .total_ratings
            .set(totals.total_ratings as i64);
    }

    /// Record a storage operation
    pub fn record_storage_operation(&self, operation: &str, success: bool, duration: Duration) {
        let status = if success { "success" } else { "error" };

        self.performance_metrics
            .storage_operation_duration
            .with_label_values(&[operation, status])
            .observe(duration.as_secs_f64());
    }

    /// Record a stats view being served
    pub fn record_view(&self, view: &str, duration: Duration) {
        self.performance_metrics
            .view_requests_total
            .with_label_values(&[view])
            .inc();

        self.performance_metrics
            .view_duration
            .with_label_values(&[view])
            .observe(duration.as_secs_f64());
    }

    /// Update uptime
    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("faction_poll_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "faction_poll_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("faction_poll_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
        })
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let submissions_total = IntCounterVec::new(
            Opts::new(
                "faction_poll_submissions_total",
                "Total rating submissions by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(submissions_total.clone()))?;

        let submission_errors_total = IntCounterVec::new(
            Opts::new(
                "faction_poll_submission_errors_total",
                "Rejected or failed submissions by error kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(submission_errors_total.clone()))?;

        let factions_rated_per_submission = Histogram::with_opts(
            HistogramOpts::new(
                "faction_poll_factions_rated_per_submission",
                "Number of factions rated above zero in a saved submission",
            )
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 40.0, 51.0]),
        )?;
        registry.register(Box::new(factions_rated_per_submission.clone()))?;

        let registered_users = IntGauge::new(
            "faction_poll_registered_users",
            "Distinct users with saved ratings",
        )?;
        registry.register(Box::new(registered_users.clone()))?;

        let total_ratings = IntGauge::new(
            "faction_poll_total_ratings",
            "Non-zero ratings across all users",
        )?;
        registry.register(Box::new(total_ratings.clone()))?;

        let sessions_created_total = IntCounterVec::new(
            Opts::new(
                "faction_poll_sessions_created_total",
                "Anonymous session ids handed out",
            ),
            &["source"],
        )?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        Ok(Self {
            submissions_total,
            submission_errors_total,
            factions_rated_per_submission,
            registered_users,
            total_ratings,
            sessions_created_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let storage_operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "faction_poll_storage_operation_duration_seconds",
                "Time spent loading or saving the rating document",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["operation", "status"],
        )?;
        registry.register(Box::new(storage_operation_duration.clone()))?;

        let view_requests_total = IntCounterVec::new(
            Opts::new(
                "faction_poll_view_requests_total",
                "Statistics views served",
            ),
            &["view"],
        )?;
        registry.register(Box::new(view_requests_total.clone()))?;

        let view_duration = HistogramVec::new(
            HistogramOpts::new(
                "faction_poll_view_duration_seconds",
                "Time spent computing a statistics view",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["view"],
        )?;
        registry.register(Box::new(view_duration.clone()))?;

        Ok(Self {
            storage_operation_duration,
            view_requests_total,
            view_duration,
        })
    }
}
