//! Detail-page extraction
//!
//! A detail page has a header of labeled fields and three tabs (items,
//! documents, history), each holding a paginated grid. Header fields fall back
//! to their not-found sentinel independently; a tab that cannot be opened
//! yields no rows without affecting the header or the other tabs.

use crate::config::{
    Config, DetailSelectors, DocumentSelectors, SelectorConfig, TableSelectors, TimeoutConfig,
};
use crate::extract::{
    Advance, ExtractError, ExtractResult, FieldResolver, RowExtractor, TableSpec,
    VirtualizedTableReader,
};
use crate::gateway::{text_within, GatewayResult, Locator, LocatorGateway};
use crate::model::{
    is_not_found, ExtractedTender, HeaderField, HistoryEvent, Tender, TenderDocument,
    TenderHeader, TenderItem,
};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const OBJECT_LABEL: &str = "Objeto:";
const TOTAL_VALUE_LABEL: &str = "Valor total estimado:";

const ITEM_CELLS: usize = 5;
const HISTORY_CELLS: usize = 2;
const DOCUMENT_CELLS: usize = 5;

/// Extracts one tender from its detail page
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    detail: DetailSelectors,
    items: TableSelectors,
    history: TableSelectors,
    documents: DocumentSelectors,
    fields: FieldResolver,
    element_wait: Duration,
    row_wait: Duration,
    scroll_offset: i64,
}

impl DetailExtractor {
    pub fn new(selectors: &SelectorConfig, timeouts: &TimeoutConfig, scroll_offset: i64) -> Self {
        Self {
            detail: selectors.detail.clone(),
            items: selectors.items.clone(),
            history: selectors.history.clone(),
            documents: selectors.documents.clone(),
            fields: FieldResolver::new(selectors.detail.field.clone(), timeouts.element_wait()),
            element_wait: timeouts.element_wait(),
            row_wait: timeouts.row_wait(),
            scroll_offset,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.selectors,
            &config.timeouts,
            config.crawler.scroll_offset,
        )
    }

    /// Navigates to `url` and waits for the detail container
    ///
    /// This is the page-load step; its failures are transport-level and may be
    /// retried by the caller.
    pub async fn open<G: LocatorGateway>(&self, gateway: &G, url: &str) -> ExtractResult<()> {
        gateway.navigate(url).await?;
        match gateway
            .wait_for(&self.detail.container, self.element_wait)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(ExtractError::DetailNotRendered {
                url: url.to_string(),
                timeout: self.element_wait,
            }),
        }
    }

    /// Opens `url` and extracts the tender shown there
    pub async fn extract<G: LocatorGateway>(
        &self,
        gateway: &G,
        url: &str,
        cancel: &CancellationToken,
    ) -> ExtractResult<ExtractedTender> {
        self.open(gateway, url).await?;
        self.extract_loaded(gateway, url, cancel).await
    }

    /// Extracts the tender from an already opened detail page
    pub async fn extract_loaded<G: LocatorGateway>(
        &self,
        gateway: &G,
        url: &str,
        cancel: &CancellationToken,
    ) -> ExtractResult<ExtractedTender> {
        let (external_id, header) = self.read_header(gateway).await?;
        if is_not_found(HeaderField::ExternalId.label(), &external_id) {
            return Err(ExtractError::MissingExternalId {
                url: url.to_string(),
            });
        }

        let object_text = self
            .fields
            .resolve_at(gateway, &self.detail.object, OBJECT_LABEL)
            .await?;
        let total_estimated_value = self
            .fields
            .resolve_at(gateway, &self.detail.total_value, TOTAL_VALUE_LABEL)
            .await?;

        let item_row = ItemRow {
            value: &self.items.value,
        };
        let items = self
            .read_tab(gateway, "Itens", &self.items, ITEM_CELLS, &item_row, cancel)
            .await?;

        let document_row = DocumentRow {
            value: &self.documents.table.value,
            link: &self.documents.link,
            category: &self.documents.notice_category,
        };
        let documents = self
            .read_tab(
                gateway,
                "Arquivos",
                &self.documents.table,
                DOCUMENT_CELLS,
                &document_row,
                cancel,
            )
            .await?;

        let history_row = HistoryRow {
            value: &self.history.value,
        };
        let history = self
            .read_tab(
                gateway,
                "Histórico",
                &self.history,
                HISTORY_CELLS,
                &history_row,
                cancel,
            )
            .await?;

        tracing::debug!(
            "Extracted {}: {} items, {} documents, {} history events",
            external_id,
            items.len(),
            documents.len(),
            history.len()
        );

        Ok(ExtractedTender {
            tender: Tender {
                external_id,
                url: url.to_string(),
                header,
                object_text,
                total_estimated_value,
                captured_at: Utc::now(),
            },
            items,
            documents,
            history,
        })
    }

    async fn read_header<G: LocatorGateway>(
        &self,
        gateway: &G,
    ) -> GatewayResult<(String, TenderHeader)> {
        let mut header = TenderHeader::default();
        let mut external_id = String::new();

        for field in HeaderField::ALL {
            let value = self.fields.resolve(gateway, field.label()).await?;
            match header.slot_mut(field) {
                Some(slot) => *slot = value,
                None => external_id = value,
            }
        }

        Ok((external_id, header))
    }

    /// Reads one tab; a tab that cannot be activated yields no rows
    ///
    /// Rows read before a paging failure are kept.
    async fn read_tab<G, E>(
        &self,
        gateway: &G,
        name: &str,
        table: &TableSelectors,
        min_cells: usize,
        extractor: &E,
        cancel: &CancellationToken,
    ) -> ExtractResult<Vec<E::Row>>
    where
        G: LocatorGateway,
        E: RowExtractor<G>,
    {
        let result = match self.activate_tab(gateway, name, table).await {
            Ok(()) => {
                let spec = self.table_spec(table, min_cells);
                VirtualizedTableReader::new(gateway, &spec, extractor)
                    .read_all(cancel)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(rows) => Ok(rows),
            Err(ExtractError::Cancelled) => Err(ExtractError::Cancelled),
            Err(e) => {
                tracing::warn!("Skipping tab '{}': {}", name, e);
                Ok(Vec::new())
            }
        }
    }

    async fn activate_tab<G: LocatorGateway>(
        &self,
        gateway: &G,
        name: &str,
        table: &TableSelectors,
    ) -> ExtractResult<()> {
        let unavailable = |reason: &str| ExtractError::TabUnavailable {
            tab: name.to_string(),
            reason: reason.to_string(),
        };

        let tab = gateway
            .wait_for(&table.tab, self.element_wait)
            .await?
            .ok_or_else(|| unavailable("tab control not found"))?;

        if !self.is_active(gateway, &tab).await? {
            gateway.click(&tab).await?;
            if !self.is_active(gateway, &tab).await? {
                return Err(unavailable("tab did not become active"));
            }
        }

        gateway
            .wait_for(&table.grid, self.element_wait)
            .await?
            .ok_or_else(|| unavailable("grid did not render"))?;
        Ok(())
    }

    async fn is_active<G: LocatorGateway>(
        &self,
        gateway: &G,
        tab: &G::Element,
    ) -> GatewayResult<bool> {
        let class = gateway.read_attribute(tab, "class").await?.unwrap_or_default();
        Ok(class
            .split_whitespace()
            .any(|name| name == self.detail.active_class))
    }

    fn table_spec(&self, table: &TableSelectors, min_cells: usize) -> TableSpec {
        TableSpec {
            row: table.row.clone(),
            cell: Some(table.cell.clone()),
            advance: Advance::NextButton(table.next_page.clone()),
            page_size: table.page_size,
            min_cells,
            max_pages: None,
            row_wait: self.row_wait,
            control_wait: self.element_wait,
            scroll_offset: self.scroll_offset,
        }
    }
}

struct ItemRow<'a> {
    value: &'a Locator,
}

#[async_trait]
impl<G: LocatorGateway> RowExtractor<G> for ItemRow<'_> {
    type Row = TenderItem;

    async fn extract(
        &self,
        gateway: &G,
        _row: &G::Element,
        cells: &[G::Element],
    ) -> GatewayResult<Option<TenderItem>> {
        let [number, description, quantity, unit_value, total_value, ..] = cells else {
            return Ok(None);
        };

        Ok(Some(TenderItem {
            number: text_within(gateway, number, self.value).await?,
            description: text_within(gateway, description, self.value).await?,
            quantity: text_within(gateway, quantity, self.value).await?,
            unit_value: text_within(gateway, unit_value, self.value).await?,
            total_value: text_within(gateway, total_value, self.value).await?,
        }))
    }
}

struct HistoryRow<'a> {
    value: &'a Locator,
}

#[async_trait]
impl<G: LocatorGateway> RowExtractor<G> for HistoryRow<'_> {
    type Row = HistoryEvent;

    async fn extract(
        &self,
        gateway: &G,
        _row: &G::Element,
        cells: &[G::Element],
    ) -> GatewayResult<Option<HistoryEvent>> {
        let [event_cell, timestamp_cell, ..] = cells else {
            return Ok(None);
        };

        let event = text_within(gateway, event_cell, self.value).await?;
        let mut timestamp = text_within(gateway, timestamp_cell, self.value).await?;
        if timestamp.is_empty() {
            // Some rows render the date directly in the cell container
            timestamp = gateway.read_text(timestamp_cell).await?.trim().to_string();
        }
        Ok(Some(HistoryEvent { event, timestamp }))
    }
}

struct DocumentRow<'a> {
    value: &'a Locator,
    link: &'a Locator,
    category: &'a str,
}

#[async_trait]
impl<G: LocatorGateway> RowExtractor<G> for DocumentRow<'_> {
    type Row = TenderDocument;

    async fn extract(
        &self,
        gateway: &G,
        _row: &G::Element,
        cells: &[G::Element],
    ) -> GatewayResult<Option<TenderDocument>> {
        let [_, _, kind_cell, link_cell, ..] = cells else {
            return Ok(None);
        };

        let kind = match gateway.find_within(kind_cell, self.value).await? {
            Some(span) => gateway.read_attribute(&span, "title").await?,
            None => None,
        };
        if kind.as_deref().map(str::trim) != Some(self.category) {
            return Ok(None);
        }

        let href = match gateway.find_within(link_cell, self.link).await? {
            Some(anchor) => gateway.read_attribute(&anchor, "href").await?,
            None => None,
        };
        Ok(href
            .filter(|href| !href.trim().is_empty())
            .map(|url| TenderDocument { url }))
    }
}
