//! Persistence of the rating document
//!
//! This module provides the storage backends for the single rating document
//! and the RatingStore that applies submissions to it.

pub mod rating_store;
pub mod storage;

// Re-export commonly used types
pub use rating_store::{RatingStore, SubmissionReceipt};
pub use storage::{
    decode_document, encode_document, DocumentStorage, InMemoryDocumentStorage, JsonFileStorage,
    MockDocumentStorage,
};
