//! Service layer for the faction-poll rating service
//!
//! This module contains the main application state and health reporting
//! shared by the HTTP server and the service binary.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
