//! Storage module for persisting tenders
//!
//! This module handles all database operations of the crawler:
//! - SQLite database initialization and schema management
//! - Idempotent tender upserts keyed by the external id
//! - Full replacement of a tender's items and documents
//! - Read-only queries for listings and statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteTenderStore;
pub use traits::{StorageError, StorageResult, TenderStore};

use crate::model::Tender;
use std::path::Path;

/// Opens (or creates) the tender database at `path`
pub fn open_store(path: &Path) -> StorageResult<SqliteTenderStore> {
    SqliteTenderStore::open(path)
}

/// A stored tender and its internal id
#[derive(Debug, Clone, PartialEq)]
pub struct TenderRecord {
    pub id: i64,
    pub tender: Tender,
}

/// Row counts of the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub tenders: u64,
    pub items: u64,
    pub documents: u64,
}
