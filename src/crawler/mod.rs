//! Crawler module: search walking, orchestration and workers
//!
//! This module contains the crawl logic, including:
//! - Walking search results up to the reference date
//! - Per-tender extraction and persistence with bounded retries
//! - A pool of independent workers sharing one store

mod orchestrator;
mod pool;
mod retry;
mod walker;

pub use orchestrator::CrawlOrchestrator;
pub use pool::{partition_terms, run_pool};
pub use retry::RetryPolicy;
pub use walker::ResultWalker;

use crate::extract::ExtractError;
use chrono::NaiveDate;
use std::fmt;

/// Step of tender processing that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenderStep {
    Load,
    Extract,
    Upsert,
    Items,
    Documents,
}

impl fmt::Display for TenderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "page load",
            Self::Extract => "extraction",
            Self::Upsert => "tender upsert",
            Self::Items => "item replacement",
            Self::Documents => "document replacement",
        };
        f.write_str(name)
    }
}

/// One tender that could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenderFailure {
    pub url: String,
    pub step: TenderStep,
    pub cause: String,
    cancelled: bool,
}

impl TenderFailure {
    pub fn new(url: &str, step: TenderStep, cause: impl fmt::Display) -> Self {
        Self {
            url: url.to_string(),
            step,
            cause: cause.to_string(),
            cancelled: false,
        }
    }

    fn from_extract(url: &str, step: TenderStep, error: ExtractError) -> Self {
        let cancelled = matches!(error, ExtractError::Cancelled);
        Self {
            cancelled,
            ..Self::new(url, step, error)
        }
    }

    fn is_cancellation(&self) -> bool {
        self.cancelled
    }
}

/// Outcome of crawling one search term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub search_term: String,
    pub reference_date: NaiveDate,
    /// Detail URLs produced by the walk
    pub candidates: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<TenderFailure>,
    /// Set when the search itself could not be walked
    pub walk_error: Option<String>,
    pub cancelled: bool,
}

impl CrawlSummary {
    pub fn new(search_term: &str, reference_date: NaiveDate) -> Self {
        Self {
            search_term: search_term.to_string(),
            reference_date,
            candidates: 0,
            processed: 0,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            walk_error: None,
            cancelled: false,
        }
    }

    /// True when the walk and every tender succeeded
    pub fn is_clean(&self) -> bool {
        self.walk_error.is_none() && self.failed == 0 && !self.cancelled
    }
}
