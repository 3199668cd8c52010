//! Test fixtures shared by the integration test crates
#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use faction_poll::catalog::FactionCatalog;
use faction_poll::config::AppConfig;
use faction_poll::service::AppState;
use faction_poll::store::{DocumentStorage, InMemoryDocumentStorage, JsonFileStorage, RatingStore};
use faction_poll::types::OrderedMap;
use std::path::Path;
use std::sync::Arc;

/// Small catalog used across tests, in declaration order
pub const TEST_FACTIONS: &[&str] = &["归元", "节制", "炮击强化", "火力强化", "勇气激发", "王后恩赐", "国王圣谕"];

pub fn test_catalog() -> Arc<FactionCatalog> {
    Arc::new(FactionCatalog::new(TEST_FACTIONS.iter().copied()).expect("valid test catalog"))
}

/// Build a raw submission from (faction, score) pairs, keeping pair order
pub fn raw(pairs: &[(&str, i64)]) -> OrderedMap<String, i64> {
    pairs.iter().map(|(f, s)| (f.to_string(), *s)).collect()
}

/// Deterministic timestamps, one minute apart
pub fn ts(minute: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .expect("valid base timestamp")
        + Duration::minutes(minute)
}

/// Rating store over a JSON file at `path`
pub fn file_store(path: &Path) -> RatingStore {
    RatingStore::new(Arc::new(JsonFileStorage::new(path)), test_catalog())
}

/// Rating store over an in-memory document
pub fn memory_store() -> (RatingStore, Arc<InMemoryDocumentStorage>) {
    let storage = Arc::new(InMemoryDocumentStorage::new());
    let store = RatingStore::new(storage.clone(), test_catalog());
    (store, storage)
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.catalog.factions = TEST_FACTIONS.iter().map(|f| f.to_string()).collect();
    config
}

/// Application state over the given storage, already marked running
pub async fn running_state(storage: Arc<dyn DocumentStorage>) -> Arc<AppState> {
    let state = Arc::new(AppState::with_storage(test_config(), storage).expect("valid app state"));
    state.set_running(true).await;
    state
}
