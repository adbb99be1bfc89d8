//! Search result walker
//!
//! Submits a search term and walks the result list page by page, collecting the
//! detail URLs of listings published on the reference date. Results are listed
//! newest first, so the first listing with another date ends the whole walk.

use crate::config::{Config, SearchSelectors, TimeoutConfig};
use crate::extract::{
    Advance, CrawlCursor, ExtractError, RowExtractor, RowRead, TableSpec, VirtualizedTableReader,
};
use crate::gateway::{require, text_within, GatewayResult, Locator, LocatorGateway};
use crate::ConfigError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Date format of result listings
const LISTING_DATE_FORMAT: &str = "%d/%m/%Y";

/// Walks the result list of one search
#[derive(Debug, Clone)]
pub struct ResultWalker {
    entry_url: Url,
    selectors: SearchSelectors,
    search_wait: Duration,
    max_pages: Option<u32>,
    scroll_offset: i64,
}

impl ResultWalker {
    /// # Arguments
    ///
    /// * `entry_url` - Page holding the search box
    /// * `selectors` - Search box, result rows and paging controls
    /// * `timeouts` - The search wait bounds every wait of the walk
    /// * `max_pages` - Optional cap on result pages walked
    /// * `scroll_offset` - Scroll position before clicking a page control
    pub fn new(
        entry_url: Url,
        selectors: SearchSelectors,
        timeouts: &TimeoutConfig,
        max_pages: Option<u32>,
        scroll_offset: i64,
    ) -> Self {
        Self {
            entry_url,
            selectors,
            search_wait: timeouts.search_wait(),
            max_pages,
            scroll_offset,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let entry_url = Url::parse(&config.crawler.search_entry_url).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "{}: {}",
                config.crawler.search_entry_url, e
            ))
        })?;
        Ok(Self::new(
            entry_url,
            config.selectors.search.clone(),
            &config.timeouts,
            config.crawler.max_result_pages,
            config.crawler.scroll_offset,
        ))
    }

    /// Searches for `term` and returns the detail URLs listed on `reference`
    ///
    /// An empty result list is a normal, empty outcome. Navigation and session
    /// failures abort the walk.
    pub async fn walk<G: LocatorGateway>(
        &self,
        gateway: &G,
        term: &str,
        reference: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExtractError> {
        tracing::info!("Searching for '{}' (listings of {})", term, reference);

        gateway.navigate(self.entry_url.as_str()).await?;
        let input = require(gateway, &self.selectors.input, self.search_wait).await?;
        gateway.type_text(&input, term, true).await?;

        let spec = TableSpec {
            row: self.selectors.result_row.clone(),
            cell: None,
            advance: Advance::PageNumber(self.selectors.page_button.clone()),
            page_size: self.selectors.page_size,
            min_cells: 1,
            max_pages: self.max_pages,
            row_wait: self.search_wait,
            control_wait: self.search_wait,
            scroll_offset: self.scroll_offset,
        };
        let extractor = ListingRow {
            base: &self.entry_url,
            date: &self.selectors.result_date,
        };
        let mut reader = VirtualizedTableReader::new(gateway, &spec, &extractor);
        let mut cursor = CrawlCursor::new(spec.page_size);
        let mut urls = Vec::new();

        loop {
            let listing = match reader.next(cancel).await {
                RowRead::Row(listing) => listing,
                RowRead::EndOfData => break,
                RowRead::Error(e) => return Err(e),
            };
            cursor.rows = reader.cursor().clone();

            let date = match listing.date {
                Ok(date) => date,
                Err(raw) => {
                    tracing::warn!(
                        "Unreadable listing date '{}' on result page {}, skipping",
                        raw,
                        cursor.rows.page()
                    );
                    continue;
                }
            };
            cursor.last_seen = Some(date);

            if date != reference {
                if date > reference {
                    tracing::warn!(
                        "Listing dated {} is newer than {}; results may not be sorted by date",
                        date,
                        reference
                    );
                }
                tracing::info!(
                    "Reached a listing dated {} on result page {}, stopping search for '{}'",
                    date,
                    cursor.rows.page(),
                    term
                );
                break;
            }

            match listing.url {
                Some(url) => urls.push(url),
                None => tracing::warn!("Listing of {} has no usable link, skipping", date),
            }
        }

        tracing::info!("Found {} candidate tenders for '{}'", urls.len(), term);
        Ok(urls)
    }
}

/// Extracts the last whitespace-separated token of `text` as a listing date
fn parse_listing_date(text: &str) -> Option<NaiveDate> {
    let token = text.split_whitespace().last()?;
    NaiveDate::parse_from_str(token, LISTING_DATE_FORMAT).ok()
}

struct Listing {
    url: Option<String>,
    /// The raw text when the date could not be parsed
    date: Result<NaiveDate, String>,
}

struct ListingRow<'a> {
    base: &'a Url,
    date: &'a Locator,
}

#[async_trait]
impl<G: LocatorGateway> RowExtractor<G> for ListingRow<'_> {
    type Row = Listing;

    async fn extract(
        &self,
        gateway: &G,
        row: &G::Element,
        _cells: &[G::Element],
    ) -> GatewayResult<Option<Listing>> {
        let raw_date = text_within(gateway, row, self.date).await?;
        let date = parse_listing_date(&raw_date).ok_or(raw_date);

        let url = gateway
            .read_attribute(row, "href")
            .await?
            .and_then(|href| self.base.join(href.trim()).ok())
            .map(String::from);

        Ok(Some(Listing { url, date }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::gateway::{GatewayError, MemoryGateway, MemoryNode, MemoryPage, MemoryTable};

    const ENTRY: &str = "https://pncp.gov.br/app/editais?q=&status=recebendo_proposta&pagina=1";

    fn walker(max_pages: Option<u32>) -> ResultWalker {
        ResultWalker::new(
            Url::parse(ENTRY).unwrap(),
            SelectorConfig::default().search,
            &TimeoutConfig::default(),
            max_pages,
            1000,
        )
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 17).unwrap()
    }

    fn listing(id: u32, date: &str) -> MemoryNode {
        let selectors = SelectorConfig::default().search;
        MemoryNode::new()
            .attr("href", format!("/app/editais/00000000000100/2025/{}", id))
            .child(
                &selectors.result_date,
                MemoryNode::with_text(format!("Data de divulgação no PNCP: {}", date)),
            )
    }

    fn search_page(listings: Vec<MemoryNode>) -> MemoryPage {
        let selectors = SelectorConfig::default().search;
        let mut table = MemoryTable::new(selectors.result_row.clone(), selectors.page_size)
            .page_buttons(selectors.page_button.clone());
        for node in listings {
            table = table.row(node);
        }
        let mut page = MemoryPage::new();
        page.insert(&selectors.input, MemoryNode::new());
        page.add_table(table);
        page
    }

    fn detail_url(id: u32) -> String {
        format!("https://pncp.gov.br/app/editais/00000000000100/2025/{}", id)
    }

    #[test]
    fn test_parse_listing_date() {
        assert_eq!(
            parse_listing_date("Data de divulgação no PNCP: 17/10/2025"),
            Some(reference())
        );
        assert_eq!(parse_listing_date("17/10/2025"), Some(reference()));
        assert_eq!(parse_listing_date(""), None);
        assert_eq!(parse_listing_date("amanhã"), None);
    }

    #[tokio::test]
    async fn test_walk_stops_at_first_other_date() {
        let gateway = MemoryGateway::new();
        gateway.add_page(
            ENTRY,
            search_page(vec![
                listing(1, "17/10/2025"),
                listing(2, "17/10/2025"),
                listing(3, "16/10/2025"),
                listing(4, "17/10/2025"),
            ]),
        );

        let urls = walker(None)
            .walk(&gateway, "Trator", reference(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(urls, vec![detail_url(1), detail_url(2)]);
        assert_eq!(gateway.typed_text(), vec!["Trator".to_string()]);

        let fourth = SelectorConfig::default().search.result_row.fill("row", 4);
        assert!(!gateway.waited_for(&fourth));
    }

    #[tokio::test]
    async fn test_walk_crosses_result_pages() {
        let listings = (1..=13).map(|i| listing(i, "17/10/2025")).collect();
        let gateway = MemoryGateway::new();
        gateway.add_page(ENTRY, search_page(listings));

        let urls = walker(None)
            .walk(&gateway, "Pulverizador", reference(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(urls.len(), 13);
        assert_eq!(urls[10], detail_url(11));
        assert_eq!(gateway.advance_clicks(), 1);
    }

    #[tokio::test]
    async fn test_walk_respects_page_limit() {
        let listings = (1..=13).map(|i| listing(i, "17/10/2025")).collect();
        let gateway = MemoryGateway::new();
        gateway.add_page(ENTRY, search_page(listings));

        let urls = walker(Some(1))
            .walk(&gateway, "Pulverizador", reference(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(urls.len(), 10);
        assert_eq!(gateway.advance_clicks(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_date_is_skipped() {
        let selectors = SelectorConfig::default().search;
        let undated = MemoryNode::new().attr("href", "/app/editais/00000000000100/2025/9");
        let gateway = MemoryGateway::new();
        gateway.add_page(
            ENTRY,
            search_page(vec![listing(1, "17/10/2025"), undated, listing(2, "17/10/2025")]),
        );

        let urls = walker(None)
            .walk(&gateway, "Trator", reference(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(urls, vec![detail_url(1), detail_url(2)]);
        assert!(gateway.waited_for(&selectors.result_row.fill("row", 3)));
    }

    #[tokio::test]
    async fn test_no_results_is_empty() {
        let gateway = MemoryGateway::new();
        gateway.add_page(ENTRY, search_page(Vec::new()));

        let urls = walker(None)
            .walk(&gateway, "Colheitadeira", reference(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn test_navigation_failure_is_surfaced() {
        let gateway = MemoryGateway::new();
        gateway.add_page(ENTRY, search_page(Vec::new()));
        gateway.fail_navigation(ENTRY, 1);

        let err = walker(None)
            .walk(&gateway, "Trator", reference(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Gateway(GatewayError::Navigation { .. })
        ));
    }
}
