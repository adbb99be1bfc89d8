//! Transient positions of a walk or a table read

use chrono::NaiveDate;

/// Position inside a paginated table
///
/// `index` is the 1-based row slot within the rendered page window; it resets
/// to 1 after every page advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    index: usize,
    page: u32,
    page_size: usize,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            index: 1,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based number of the current page
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// True when the current slot is the last one of the page window
    pub fn at_page_boundary(&self) -> bool {
        self.index >= self.page_size
    }

    pub fn next_row(&mut self) {
        self.index += 1;
    }

    pub fn next_page(&mut self) {
        self.index = 1;
        self.page += 1;
    }
}

/// Position of a result-list walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlCursor {
    pub rows: PageCursor,
    /// Listing date of the last row whose date could be read
    pub last_seen: Option<NaiveDate>,
}

impl CrawlCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            rows: PageCursor::new(page_size),
            last_seen: None,
        }
    }
}
