//! Crawl run summaries

use crate::crawler::CrawlSummary;

/// Totals over every term of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub terms: usize,
    pub candidates: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Terms whose search could not be walked
    pub walk_errors: usize,
    pub cancelled: bool,
}

impl RunTotals {
    pub fn from_summaries(summaries: &[CrawlSummary]) -> Self {
        summaries.iter().fold(Self::default(), |mut totals, summary| {
            totals.terms += 1;
            totals.candidates += summary.candidates;
            totals.succeeded += summary.succeeded;
            totals.failed += summary.failed;
            totals.walk_errors += usize::from(summary.walk_error.is_some());
            totals.cancelled |= summary.cancelled;
            totals
        })
    }

    /// True when no term or tender failed
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.walk_errors == 0 && !self.cancelled
    }
}

/// Prints one block per search term followed by the run totals
pub fn print_summaries(summaries: &[CrawlSummary]) {
    println!("=== Crawl Summary ===\n");

    for summary in summaries {
        println!(
            "'{}' (listings of {}):",
            summary.search_term, summary.reference_date
        );
        if let Some(error) = &summary.walk_error {
            println!("  Search failed: {}", error);
        }
        println!("  Candidates: {}", summary.candidates);
        println!(
            "  Processed: {} ({} succeeded, {} failed)",
            summary.processed, summary.succeeded, summary.failed
        );
        for failure in &summary.failures {
            println!("    - {} [{}]: {}", failure.url, failure.step, failure.cause);
        }
        if summary.cancelled {
            println!("  Cancelled before completion");
        }
        println!();
    }

    let totals = RunTotals::from_summaries(summaries);
    println!(
        "Total: {} terms, {} candidates, {} stored, {} failed",
        totals.terms, totals.candidates, totals.succeeded, totals.failed
    );
    if totals.walk_errors > 0 {
        println!("Searches that failed: {}", totals.walk_errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{TenderFailure, TenderStep};
    use chrono::NaiveDate;

    fn summary(term: &str, succeeded: usize, failed: usize) -> CrawlSummary {
        let mut summary = CrawlSummary::new(term, NaiveDate::from_ymd_opt(2025, 10, 17).unwrap());
        summary.candidates = succeeded + failed;
        summary.processed = succeeded + failed;
        summary.succeeded = succeeded;
        summary.failed = failed;
        for n in 0..failed {
            summary.failures.push(TenderFailure::new(
                &format!("https://pncp.gov.br/app/editais/{}", n),
                TenderStep::Load,
                "timeout",
            ));
        }
        summary
    }

    #[test]
    fn test_run_totals() {
        let mut broken = summary("Colheitadeira", 0, 0);
        broken.walk_error = Some("Browser session failure".to_string());
        let summaries = vec![summary("Pulverizador", 3, 1), summary("Trator", 2, 0), broken];

        let totals = RunTotals::from_summaries(&summaries);
        assert_eq!(totals.terms, 3);
        assert_eq!(totals.candidates, 6);
        assert_eq!(totals.succeeded, 5);
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.walk_errors, 1);
        assert!(!totals.is_clean());
    }

    #[test]
    fn test_empty_run_is_clean() {
        assert!(RunTotals::from_summaries(&[]).is_clean());
    }
}
