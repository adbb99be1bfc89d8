//! Storage traits and error types
//!
//! This module defines the trait interface for tender stores and the
//! associated error types.

use crate::model::{Tender, TenderDocument, TenderItem};
use crate::storage::{StoreStats, TenderRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Tender not found: {0}")]
    TenderNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence of tenders and the items and documents they own
///
/// Implementations are shared between workers, so every method takes `&self`
/// and writes are serialized internally: only one mutating call proceeds at a
/// time.
pub trait TenderStore: Send + Sync {
    /// Inserts a tender or replaces the stored one with the same external id
    ///
    /// # Returns
    ///
    /// The internal id of the tender. It stays the same across re-crawls.
    fn upsert(&self, tender: &Tender) -> StorageResult<i64>;

    /// Replaces every item of the tender with `items`
    fn replace_items(&self, tender_id: i64, items: &[TenderItem]) -> StorageResult<()>;

    /// Replaces every document of the tender with `documents`
    fn replace_documents(&self, tender_id: i64, documents: &[TenderDocument])
        -> StorageResult<()>;

    fn get_by_external_id(&self, external_id: &str) -> StorageResult<Option<TenderRecord>>;

    /// All stored tenders, most recently captured first
    fn list_all(&self) -> StorageResult<Vec<TenderRecord>>;

    /// Items of a tender, in extraction order
    fn items_for(&self, tender_id: i64) -> StorageResult<Vec<TenderItem>>;

    /// Documents of a tender, in extraction order
    fn documents_for(&self, tender_id: i64) -> StorageResult<Vec<TenderDocument>>;

    /// Counts of stored tenders, items and documents
    fn stats(&self) -> StorageResult<StoreStats>;
}
