//! Output module for crawl reports and store inspection
//!
//! This module handles:
//! - Printing per-term crawl summaries and run totals
//! - Printing store statistics
//! - Listing stored tenders

mod listing;
pub mod stats;
mod summary;

pub use listing::{format_tender_line, print_tenders};
pub use stats::{load_statistics, print_statistics};
pub use summary::{print_summaries, RunTotals};
