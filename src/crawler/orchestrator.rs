//! Crawl orchestration for one search term
//!
//! Walks the results of a search, then extracts and stores each candidate
//! tender in turn. A failure on one tender is recorded in the summary and the
//! crawl moves on to the next one.

use crate::config::Config;
use crate::crawler::{CrawlSummary, ResultWalker, RetryPolicy, TenderFailure, TenderStep};
use crate::extract::{DetailExtractor, ExtractError};
use crate::gateway::LocatorGateway;
use crate::model::ExtractedTender;
use crate::storage::TenderStore;
use crate::ConfigError;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives one browser session through searches and detail pages
pub struct CrawlOrchestrator<G, S: ?Sized> {
    gateway: G,
    store: Arc<S>,
    walker: ResultWalker,
    extractor: DetailExtractor,
    retry: RetryPolicy,
}

impl<G, S> CrawlOrchestrator<G, S>
where
    G: LocatorGateway,
    S: TenderStore + ?Sized,
{
    pub fn new(
        gateway: G,
        store: Arc<S>,
        walker: ResultWalker,
        extractor: DetailExtractor,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            gateway,
            store,
            walker,
            extractor,
            retry,
        }
    }

    pub fn from_config(config: &Config, gateway: G, store: Arc<S>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            gateway,
            store,
            ResultWalker::from_config(config)?,
            DetailExtractor::from_config(config),
            RetryPolicy::from(&config.retry),
        ))
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Crawls the tenders listed for `term` on `reference`
    ///
    /// Never fails: walk errors and per-tender failures are reported in the
    /// returned summary.
    pub async fn run(
        &self,
        term: &str,
        reference: NaiveDate,
        cancel: &CancellationToken,
    ) -> CrawlSummary {
        let mut summary = CrawlSummary::new(term, reference);

        let urls = match self.walker.walk(&self.gateway, term, reference, cancel).await {
            Ok(urls) => urls,
            Err(ExtractError::Cancelled) => {
                summary.cancelled = true;
                return summary;
            }
            Err(e) => {
                tracing::error!("Search for '{}' failed: {}", term, e);
                summary.walk_error = Some(e.to_string());
                return summary;
            }
        };
        summary.candidates = urls.len();

        for (index, url) in urls.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            tracing::info!("Processing tender {}/{}: {}", index + 1, urls.len(), url);
            match self.process(url, cancel).await {
                Ok(extracted) => {
                    summary.processed += 1;
                    summary.succeeded += 1;
                    tracing::info!(
                        "Stored tender {} ({} items, {} documents)",
                        extracted.tender.external_id,
                        extracted.items.len(),
                        extracted.documents.len()
                    );
                }
                Err(failure) if failure.is_cancellation() => {
                    summary.cancelled = true;
                    break;
                }
                Err(failure) => {
                    summary.processed += 1;
                    summary.failed += 1;
                    tracing::error!(
                        "Failed to process {} during {}: {}",
                        failure.url,
                        failure.step,
                        failure.cause
                    );
                    summary.failures.push(failure);
                }
            }
        }

        if summary.cancelled {
            tracing::info!("Crawl for '{}' cancelled", term);
        }
        summary
    }

    async fn process(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ExtractedTender, TenderFailure> {
        self.retry
            .run(url, cancel, || self.extractor.open(&self.gateway, url))
            .await
            .map_err(|e| TenderFailure::from_extract(url, TenderStep::Load, e))?;

        let extracted = self
            .extractor
            .extract_loaded(&self.gateway, url, cancel)
            .await
            .map_err(|e| TenderFailure::from_extract(url, TenderStep::Extract, e))?;

        let tender_id = self
            .store
            .upsert(&extracted.tender)
            .map_err(|e| TenderFailure::new(url, TenderStep::Upsert, e))?;
        self.store
            .replace_items(tender_id, &extracted.items)
            .map_err(|e| TenderFailure::new(url, TenderStep::Items, e))?;
        self.store
            .replace_documents(tender_id, &extracted.documents)
            .map_err(|e| TenderFailure::new(url, TenderStep::Documents, e))?;

        Ok(extracted)
    }
}
