//! Faction Poll - anonymous faction rating service
//!
//! This crate stores per-user 0-5 ratings of a fixed faction catalog in a
//! single JSON document, keeps a bounded submission history per user, and
//! derives aggregate statistics from document snapshots.

pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use catalog::FactionCatalog;
pub use stats::StatsEngine;
pub use store::{DocumentStorage, JsonFileStorage, RatingStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
