//! Extraction of tender data from rendered pages
//!
//! This module contains the page-reading side of the crawler:
//! - Labeled field lookup with a not-found fallback
//! - A row reader for lazily-rendered, paginated tables
//! - The detail-page extractor that drives the header, items, history and
//!   documents tabs

mod cursor;
mod detail;
mod field;
mod table;

pub use cursor::{CrawlCursor, PageCursor};
pub use detail::DetailExtractor;
pub use field::FieldResolver;
pub use table::{Advance, RowExtractor, RowRead, TableSpec, VirtualizedTableReader};

use crate::gateway::GatewayError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while extracting a detail page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Detail view of {url} did not render within {timeout:?}")]
    DetailNotRendered { url: String, timeout: Duration },

    #[error("Tab '{tab}' unavailable: {reason}")]
    TabUnavailable { tab: String, reason: String },

    #[error("No external id found on {url}")]
    MissingExternalId { url: String },

    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Returns true if re-loading the page may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Gateway(e) => e.is_transient(),
            Self::DetailNotRendered { .. } => true,
            _ => false,
        }
    }
}

/// Result type for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;
