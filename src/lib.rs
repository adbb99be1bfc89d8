//! Licitações crawler: a tender-listing walker and extractor
//!
//! This crate walks the search results of a public tender-listing site, follows
//! each listing to its tabbed detail view, and persists a normalized record of the
//! tender, its line items and its notice documents. Tenders are deduplicated by
//! their external identifier, so repeated crawl runs never produce duplicates.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod gateway;
pub mod model;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] gateway::GatewayError),

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOrchestrator, CrawlSummary, ResultWalker};
pub use extract::{DetailExtractor, FieldResolver, VirtualizedTableReader};
pub use gateway::{Locator, LocatorGateway};
pub use model::{ExtractedTender, Tender, TenderDocument, TenderItem};
pub use storage::{SqliteTenderStore, TenderStore};
