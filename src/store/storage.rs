//! Document storage interface and implementations
//!
//! This module defines the interface for persisting and retrieving the rating
//! document as a whole, with a JSON file implementation for production and
//! in-memory implementations for tests and dry runs.

use crate::error::{RatingError, Result};
use crate::types::RatingDocument;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Trait for whole-document storage operations
pub trait DocumentStorage: Send + Sync {
    /// Read the persisted document. A missing or empty medium yields the
    /// empty document; unreadable or malformed content is `StorageUnavailable`.
    fn load(&self) -> Result<RatingDocument>;

    /// Replace the persisted document entirely
    fn save(&self, document: &RatingDocument) -> Result<()>;

    /// Human-readable location, used in logs and error messages
    fn describe(&self) -> String;

    /// Whether a saved document exists yet. Loads succeed either way.
    fn has_document(&self) -> bool {
        true
    }
}

/// Serialize a document the way the rating file has always been written:
/// two-space indentation, non-ASCII characters kept as-is
pub fn encode_document(document: &RatingDocument) -> Result<String> {
    serde_json::to_string_pretty(document).map_err(|e| {
        RatingError::InternalError {
            message: format!("Failed to serialize rating document: {}", e),
        }
        .into()
    })
}

/// Parse a persisted document; blank input is the empty document
pub fn decode_document(raw: &str, location: &str) -> Result<RatingDocument> {
    if raw.trim().is_empty() {
        return Ok(RatingDocument::new());
    }

    serde_json::from_str(raw)
        .map_err(|e| RatingError::storage(location, format!("malformed document: {}", e)).into())
}

/// JSON file storage
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
    atomic_writes: bool,
}

impl JsonFileStorage {
    /// Create file storage writing through a temporary file and rename
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            atomic_writes: true,
        }
    }

    /// Toggle write-to-temp-then-rename. When disabled the target file is
    /// truncated and rewritten in place.
    pub fn with_atomic_writes(mut self, atomic_writes: bool) -> Self {
        self.atomic_writes = atomic_writes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    }

    fn storage_error(&self, reason: impl std::fmt::Display) -> anyhow::Error {
        RatingError::storage(self.path.display(), reason).into()
    }
}

impl DocumentStorage for JsonFileStorage {
    fn load(&self) -> Result<RatingDocument> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "No rating file at {}, starting empty",
                    self.path.display()
                );
                return Ok(RatingDocument::new());
            }
            Err(e) => return Err(self.storage_error(e)),
        };

        decode_document(&raw, &self.path.display().to_string())
    }

    fn save(&self, document: &RatingDocument) -> Result<()> {
        let encoded = encode_document(document)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.storage_error(e))?;
            }
        }

        if !self.atomic_writes {
            return Self::write_file(&self.path, &encoded).map_err(|e| self.storage_error(e));
        }

        let tmp_path = self.temp_path();
        if let Err(e) = Self::write_file(&tmp_path, &encoded) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.storage_error(e));
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            warn!(
                "Failed to move {} into place: {}",
                tmp_path.display(),
                e
            );
            let _ = fs::remove_file(&tmp_path);
            return Err(self.storage_error(e));
        }

        debug!(
            "Saved rating document ({} users) to {}",
            document.user_count(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn has_document(&self) -> bool {
        self.path.is_file()
    }
}

/// In-memory storage that keeps the serialized form, so loads and saves go
/// through the same encoding as the file backend
#[derive(Debug, Default)]
pub struct InMemoryDocumentStorage {
    contents: RwLock<Option<String>>,
}

impl InMemoryDocumentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw persisted text
    pub fn with_contents(raw: impl Into<String>) -> Self {
        Self {
            contents: RwLock::new(Some(raw.into())),
        }
    }

    /// The last saved text, if any
    pub fn contents(&self) -> Option<String> {
        self.contents.read().ok().and_then(|c| c.clone())
    }
}

impl DocumentStorage for InMemoryDocumentStorage {
    fn load(&self) -> Result<RatingDocument> {
        let contents = self.contents.read().map_err(|_| RatingError::InternalError {
            message: "Failed to acquire document read lock".to_string(),
        })?;

        match contents.as_deref() {
            Some(raw) => decode_document(raw, "memory"),
            None => Ok(RatingDocument::new()),
        }
    }

    fn save(&self, document: &RatingDocument) -> Result<()> {
        let encoded = encode_document(document)?;
        let mut contents = self.contents.write().map_err(|_| RatingError::InternalError {
            message: "Failed to acquire document write lock".to_string(),
        })?;

        *contents = Some(encoded);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Mock document storage for testing
#[derive(Debug, Default)]
pub struct MockDocumentStorage {
    document: RwLock<RatingDocument>,
    save_calls: RwLock<Vec<RatingDocument>>,
    fail_loads: RwLock<bool>,
    fail_saves: RwLock<bool>,
}

impl MockDocumentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset the stored document
    pub fn preset_document(&self, document: RatingDocument) -> Result<()> {
        let mut stored = self.document.write().map_err(|_| RatingError::InternalError {
            message: "Failed to acquire document write lock".to_string(),
        })?;

        *stored = document;
        Ok(())
    }

    /// Get all save calls made (for testing)
    pub fn get_save_calls(&self) -> Vec<RatingDocument> {
        self.save_calls
            .read()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Make subsequent loads fail with `StorageUnavailable`
    pub fn set_fail_loads(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_loads.write() {
            *flag = fail;
        }
    }

    /// Make subsequent saves fail with `StorageUnavailable`
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_saves.write() {
            *flag = fail;
        }
    }

    fn flag(flag: &RwLock<bool>) -> bool {
        flag.read().map(|f| *f).unwrap_or(false)
    }
}

impl DocumentStorage for MockDocumentStorage {
    fn load(&self) -> Result<RatingDocument> {
        if Self::flag(&self.fail_loads) {
            return Err(RatingError::storage("mock", "simulated read failure").into());
        }

        let document = self.document.read().map_err(|_| RatingError::InternalError {
            message: "Failed to acquire document read lock".to_string(),
        })?;

        Ok(document.clone())
    }

    fn save(&self, document: &RatingDocument) -> Result<()> {
        if Self::flag(&self.fail_saves) {
            return Err(RatingError::storage("mock", "simulated write failure").into());
        }

        // Record the call for testing
        if let Ok(mut calls) = self.save_calls.write() {
            calls.push(document.clone());
        }

        self.preset_document(document.clone())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Score, ScoreSet, DEFAULT_HISTORY_LIMIT};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample_document() -> RatingDocument {
        let mut document = RatingDocument::new();
        let scores: ScoreSet = vec![
            ("绵绵细雨", Score::new(4).unwrap()),
            ("狂风暴雨", Score::new(0).unwrap()),
        ]
        .into_iter()
        .collect();
        let timestamp = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        document.upsert("u1", scores, timestamp, DEFAULT_HISTORY_LIMIT);
        document
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("scores.json"));
        assert_eq!(storage.load().unwrap(), RatingDocument::new());
    }

    #[test]
    fn test_has_document_after_first_save() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("data").join("scores.json"));
        assert!(!storage.has_document());

        storage.save(&sample_document()).unwrap();
        assert!(storage.has_document());
    }

    #[test]
    fn test_empty_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(&path, "").unwrap();

        let storage = JsonFileStorage::new(&path);
        assert_eq!(storage.load().unwrap(), RatingDocument::new());
    }

    #[test]
    fn test_malformed_file_is_storage_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(&path, "{not json").unwrap();

        let err = JsonFileStorage::new(&path).load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::StorageUnavailable { .. })
        ));
        // Not repaired
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nested").join("scores.json"));
        let document = sample_document();

        storage.save(&document).unwrap();
        assert_eq!(storage.load().unwrap(), document);
        assert!(!storage.temp_path().exists());
    }

    #[test]
    fn test_file_layout_is_pretty_utf8() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("scores.json"));
        storage.save(&sample_document()).unwrap();

        let raw = fs::read_to_string(storage.path()).unwrap();
        assert!(raw.starts_with("{\n  \"scores\": {\n    \"u1\": {"));
        assert!(raw.contains("\"绵绵细雨\": 4"));
        assert!(raw.contains("\"timestamp\": \"2024-01-02 03:04:05\""));
    }

    #[test]
    fn test_save_load_round_trip_is_byte_stable() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("scores.json"));
        storage.save(&sample_document()).unwrap();
        let before = fs::read(storage.path()).unwrap();

        let loaded = storage.load().unwrap();
        storage.save(&loaded).unwrap();

        assert_eq!(fs::read(storage.path()).unwrap(), before);
    }

    #[test]
    fn test_non_atomic_writes() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("scores.json")).with_atomic_writes(false);
        storage.save(&sample_document()).unwrap();
        assert_eq!(storage.load().unwrap(), sample_document());
    }

    #[test]
    fn test_unwritable_location_is_storage_unavailable() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let storage = JsonFileStorage::new(blocker.join("scores.json"));
        let err = storage.save(&sample_document()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::StorageUnavailable { .. })
        ));
    }

    #[test]
    fn test_in_memory_storage() {
        let storage = InMemoryDocumentStorage::new();
        assert_eq!(storage.load().unwrap(), RatingDocument::new());
        assert!(storage.contents().is_none());

        storage.save(&sample_document()).unwrap();
        assert_eq!(storage.load().unwrap(), sample_document());
        assert!(storage.contents().unwrap().contains("绵绵细雨"));
    }

    #[test]
    fn test_in_memory_storage_with_bad_contents() {
        let storage = InMemoryDocumentStorage::with_contents("[1, 2]");
        assert!(storage.load().is_err());
    }

    #[test]
    fn test_mock_storage() {
        let storage = MockDocumentStorage::new();
        storage.save(&sample_document()).unwrap();

        assert_eq!(storage.load().unwrap(), sample_document());
        assert_eq!(storage.get_save_calls().len(), 1);

        storage.set_fail_saves(true);
        assert!(storage.save(&RatingDocument::new()).is_err());
        assert_eq!(storage.get_save_calls().len(), 1);
    }
}
