//! Worker pool
//!
//! Search terms are split round-robin across workers. Each worker opens its
//! own browser session and crawls its terms one after another; all workers
//! write to the same store.

use crate::config::Config;
use crate::crawler::{CrawlOrchestrator, CrawlSummary, ResultWalker, RetryPolicy};
use crate::extract::DetailExtractor;
use crate::gateway::{GatewayResult, LocatorGateway};
use crate::storage::TenderStore;
use crate::CrawlerError;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Splits `terms` round-robin into at most `workers` non-empty groups
pub fn partition_terms(terms: &[String], workers: usize) -> Vec<Vec<String>> {
    let workers = workers.clamp(1, terms.len().max(1));
    let mut groups = vec![Vec::new(); workers];
    for (index, term) in terms.iter().enumerate() {
        groups[index % workers].push(term.clone());
    }
    groups.retain(|group| !group.is_empty());
    groups
}

/// Crawls `terms` with `config.crawler.workers` independent sessions
///
/// # Arguments
///
/// * `config` - Crawler configuration
/// * `terms` - Search terms to crawl
/// * `reference` - Listing date to collect
/// * `store` - Store shared by every worker
/// * `connect` - Opens the session of the worker with the given index
/// * `cancel` - Stops every worker between rows and between tenders
///
/// # Returns
///
/// One summary per crawled term, in the order of `terms`. A worker whose
/// session cannot be opened reports a walk error for each of its terms.
pub async fn run_pool<G, S, F, Fut>(
    config: &Config,
    terms: &[String],
    reference: NaiveDate,
    store: Arc<S>,
    connect: F,
    cancel: CancellationToken,
) -> Result<Vec<CrawlSummary>, CrawlerError>
where
    G: LocatorGateway + 'static,
    S: TenderStore + ?Sized + 'static,
    F: Fn(usize) -> Fut,
    Fut: Future<Output = GatewayResult<G>> + Send + 'static,
{
    let walker = ResultWalker::from_config(config)?;
    let extractor = DetailExtractor::from_config(config);
    let retry = RetryPolicy::from(&config.retry);

    let groups = partition_terms(terms, config.crawler.workers as usize);
    tracing::info!(
        "Starting {} workers for {} search terms",
        groups.len(),
        terms.len()
    );

    let mut handles = Vec::with_capacity(groups.len());
    for (worker, group) in groups.into_iter().enumerate() {
        let session = connect(worker);
        let store = Arc::clone(&store);
        let walker = walker.clone();
        let extractor = extractor.clone();
        let cancel = cancel.clone();

        handles.push(tokio::spawn(async move {
            let gateway = match session.await {
                Ok(gateway) => gateway,
                Err(e) => {
                    tracing::error!("Worker {} could not open a browser session: {}", worker, e);
                    return group
                        .iter()
                        .map(|term| {
                            let mut summary = CrawlSummary::new(term, reference);
                            summary.walk_error = Some(e.to_string());
                            summary
                        })
                        .collect::<Vec<_>>();
                }
            };

            let orchestrator = CrawlOrchestrator::new(gateway, store, walker, extractor, retry);
            let mut summaries = Vec::with_capacity(group.len());
            for term in &group {
                if cancel.is_cancelled() {
                    tracing::info!("Worker {} cancelled before '{}'", worker, term);
                    break;
                }
                summaries.push(orchestrator.run(term, reference, &cancel).await);
            }

            if let Err(e) = orchestrator.gateway().close().await {
                tracing::warn!("Worker {} failed to close its session: {}", worker, e);
            }
            tracing::debug!("Worker {} finished {} terms", worker, summaries.len());
            summaries
        }));
    }

    let mut summaries = Vec::with_capacity(terms.len());
    for handle in handles {
        let worker_summaries = handle
            .await
            .map_err(|e| CrawlerError::Worker(e.to_string()))?;
        summaries.extend(worker_summaries);
    }

    summaries.sort_by_key(|summary| {
        terms
            .iter()
            .position(|term| *term == summary.search_term)
            .unwrap_or(usize::MAX)
    });
    Ok(summaries)
}
