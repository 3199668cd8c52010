//! Configuration management for the faction-poll service
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values.

pub mod app;

// Re-export commonly used types
pub use app::{
    parse_faction_list, validate_config, AppConfig, CatalogSettings, ServiceSettings,
    StorageSettings,
};
