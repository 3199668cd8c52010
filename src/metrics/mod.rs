//! Metrics and monitoring for the faction-poll service
//!
//! This module provides Prometheus metrics for submissions, participation,
//! storage latency and statistics views.

pub mod collector;

pub use collector::{
    MetricsCollector, MetricsTimer, PerformanceMetrics, RatingMetrics, ServiceMetrics,
};
