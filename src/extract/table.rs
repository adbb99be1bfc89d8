//! Row-by-row reader over lazily-rendered, paginated tables
//!
//! The tender site renders its grids a page window at a time. Rows are
//! addressed by their 1-based slot within the window; once the last slot of a
//! window has been read, a paging control reveals the next window. A row that
//! never renders is the normal end-of-data signal when no further page can be
//! revealed.

use crate::extract::{ExtractError, PageCursor};
use crate::gateway::{GatewayResult, Locator, LocatorGateway};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a table reveals its next page window
#[derive(Debug, Clone)]
pub enum Advance {
    /// A single "next page" control, disabled on the last page
    NextButton(Locator),
    /// Numbered page controls; template with a `{page}` placeholder
    PageNumber(Locator),
}

/// Shape and paging of one table
#[derive(Debug, Clone)]
pub struct TableSpec {
    /// Row locator with a `{row}` placeholder
    pub row: Locator,
    /// Cells relative to a row; `None` treats the row itself as its only cell
    pub cell: Option<Locator>,
    pub advance: Advance,
    pub page_size: usize,
    /// Rows with fewer cells are skipped
    pub min_cells: usize,
    pub max_pages: Option<u32>,
    pub row_wait: Duration,
    pub control_wait: Duration,
    /// Scroll position applied before using the paging control
    pub scroll_offset: i64,
}

/// Turns one rendered row into a record
///
/// Returning `Ok(None)` discards the row; an error is logged by the reader and
/// the row is skipped.
#[async_trait]
pub trait RowExtractor<G: LocatorGateway>: Send + Sync {
    type Row: Send;

    async fn extract(
        &self,
        gateway: &G,
        row: &G::Element,
        cells: &[G::Element],
    ) -> GatewayResult<Option<Self::Row>>;
}

/// Outcome of one read step
#[derive(Debug)]
pub enum RowRead<T> {
    Row(T),
    EndOfData,
    Error(ExtractError),
}

/// Lazily reads the rows of one table
///
/// The sequence is finite and cannot be restarted: once `EndOfData` or an
/// error has been returned, every further call returns `EndOfData`.
pub struct VirtualizedTableReader<'a, G, E> {
    gateway: &'a G,
    spec: &'a TableSpec,
    extractor: &'a E,
    cursor: PageCursor,
    advance_due: bool,
    finished: bool,
}

impl<'a, G, E> VirtualizedTableReader<'a, G, E>
where
    G: LocatorGateway,
    E: RowExtractor<G>,
{
    pub fn new(gateway: &'a G, spec: &'a TableSpec, extractor: &'a E) -> Self {
        Self {
            gateway,
            spec,
            extractor,
            cursor: PageCursor::new(spec.page_size),
            advance_due: false,
            finished: false,
        }
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// Reads up to the next extracted row
    pub async fn next(&mut self, cancel: &CancellationToken) -> RowRead<E::Row> {
        loop {
            if self.finished {
                return RowRead::EndOfData;
            }
            if cancel.is_cancelled() {
                self.finished = true;
                return RowRead::Error(ExtractError::Cancelled);
            }

            if self.advance_due {
                self.advance_due = false;
                match self.advance().await {
                    Ok(true) => {}
                    Ok(false) => {
                        self.finished = true;
                        return RowRead::EndOfData;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to advance past page {}, ending table: {}",
                            self.cursor.page(),
                            e
                        );
                        self.finished = true;
                        return RowRead::EndOfData;
                    }
                }
            }

            let locator = self.spec.row.fill("row", self.cursor.index());
            let row = match self.gateway.wait_for(&locator, self.spec.row_wait).await {
                Ok(Some(row)) => row,
                Ok(None) => {
                    // The slot never rendered: more data only if another page exists
                    self.advance_due = true;
                    continue;
                }
                Err(e) => return self.fail(e.into()),
            };

            let record = self.read_row(&row).await;
            if self.cursor.at_page_boundary() {
                self.advance_due = true;
            } else {
                self.cursor.next_row();
            }

            if let Some(record) = record {
                return RowRead::Row(record);
            }
        }
    }

    /// Reads every remaining row, in page order
    ///
    /// A gateway failure ends the table but keeps the rows already read; only
    /// cancellation is returned as an error.
    pub async fn read_all(
        mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<E::Row>, ExtractError> {
        let mut rows = Vec::new();
        loop {
            match self.next(cancel).await {
                RowRead::Row(row) => rows.push(row),
                RowRead::EndOfData => return Ok(rows),
                RowRead::Error(ExtractError::Cancelled) => return Err(ExtractError::Cancelled),
                RowRead::Error(e) => {
                    tracing::warn!("Table read stopped after {} rows: {}", rows.len(), e);
                    return Ok(rows);
                }
            }
        }
    }

    fn fail(&mut self, error: ExtractError) -> RowRead<E::Row> {
        self.finished = true;
        RowRead::Error(error)
    }

    async fn read_row(&self, row: &G::Element) -> Option<E::Row> {
        let cells = match &self.spec.cell {
            Some(cell) => match self.gateway.find_all_within(row, cell).await {
                Ok(cells) => cells,
                Err(e) => {
                    tracing::warn!(
                        "Failed to read cells of row {} on page {}: {}",
                        self.cursor.index(),
                        self.cursor.page(),
                        e
                    );
                    return None;
                }
            },
            None => vec![row.clone()],
        };

        if cells.len() < self.spec.min_cells {
            tracing::debug!(
                "Skipping row {} on page {}: {} cells, expected at least {}",
                self.cursor.index(),
                self.cursor.page(),
                cells.len(),
                self.spec.min_cells
            );
            return None;
        }

        match self.extractor.extract(self.gateway, row, &cells).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    "Failed to extract row {} on page {}: {}",
                    self.cursor.index(),
                    self.cursor.page(),
                    e
                );
                None
            }
        }
    }

    /// Reveals the next page window; `Ok(false)` when there is none
    async fn advance(&mut self) -> GatewayResult<bool> {
        if let Some(max_pages) = self.spec.max_pages {
            if self.cursor.page() >= max_pages {
                tracing::debug!("Reached page limit of {}", max_pages);
                return Ok(false);
            }
        }

        let control = match &self.spec.advance {
            Advance::NextButton(locator) => locator.clone(),
            Advance::PageNumber(template) => template.fill("page", self.cursor.page() + 1),
        };

        self.gateway.scroll_to(self.spec.scroll_offset).await?;
        let Some(button) = self
            .gateway
            .wait_for(&control, self.spec.control_wait)
            .await?
        else {
            tracing::debug!("No paging control after page {}", self.cursor.page());
            return Ok(false);
        };

        if is_disabled(self.gateway, &button).await? {
            tracing::debug!("Paging control disabled after page {}", self.cursor.page());
            return Ok(false);
        }

        self.gateway.click(&button).await?;
        self.cursor.next_page();
        tracing::debug!("Advanced to page {}", self.cursor.page());
        Ok(true)
    }
}

async fn is_disabled<G: LocatorGateway>(gateway: &G, element: &G::Element) -> GatewayResult<bool> {
    let disabled = gateway.read_attribute(element, "disabled").await?;
    if disabled.is_some_and(|value| value != "false") {
        return Ok(true);
    }
    let aria = gateway.read_attribute(element, "aria-disabled").await?;
    Ok(aria.as_deref() == Some("true"))
}
