use crate::config::selectors::SelectorConfig;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub webdriver: WebDriverConfig,
    pub output: OutputConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page holding the search box, loaded at the start of every walk
    #[serde(rename = "search-entry-url")]
    pub search_entry_url: String,

    /// Number of independent browser sessions
    #[serde(rename = "workers", default = "default_workers")]
    pub workers: u32,

    /// Maximum number of result pages walked per search term
    #[serde(rename = "max-result-pages", default)]
    pub max_result_pages: Option<u32>,

    /// Vertical scroll position used before clicking a paging control
    #[serde(rename = "scroll-offset", default = "default_scroll_offset")]
    pub scroll_offset: i64,
}

fn default_workers() -> u32 {
    1
}

fn default_scroll_offset() -> i64 {
    1000
}

/// Bounded wait durations, all in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(rename = "page-load-secs")]
    pub page_load_secs: u64,

    /// Wait for detail containers, header fields, tabs and paging controls
    #[serde(rename = "element-wait-secs")]
    pub element_wait_secs: u64,

    /// Session-wide implicit wait; 0 leaves every wait to the explicit queries
    #[serde(rename = "implicit-wait-secs")]
    pub implicit_wait_secs: u64,

    /// Wait for the search box and for each result row
    #[serde(rename = "search-wait-secs")]
    pub search_wait_secs: u64,

    /// Wait for each row of a detail-page table
    #[serde(rename = "row-wait-secs")]
    pub row_wait_secs: u64,
}

impl TimeoutConfig {
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn implicit_wait(&self) -> Duration {
        Duration::from_secs(self.implicit_wait_secs)
    }

    pub fn search_wait(&self) -> Duration {
        Duration::from_secs(self.search_wait_secs)
    }

    pub fn row_wait(&self) -> Duration {
        Duration::from_secs(self.row_wait_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            page_load_secs: 30,
            element_wait_secs: 10,
            implicit_wait_secs: 0,
            search_wait_secs: 5,
            row_wait_secs: 5,
        }
    }
}

/// Re-attempts of the page-load step of a detail page
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(rename = "attempts")]
    pub attempts: u32,

    /// Fixed delay between attempts (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 2000,
        }
    }
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebDriverConfig {
    /// URL of the WebDriver server (chromedriver, selenium)
    #[serde(rename = "server-url")]
    pub server_url: String,

    #[serde(rename = "headless", default = "default_headless")]
    pub headless: bool,

    /// Extra command-line arguments for the browser
    #[serde(rename = "browser-args", default)]
    pub browser_args: Vec<String>,
}

fn default_headless() -> bool {
    true
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Search terms submitted to the listing site
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub terms: Vec<String>,
}
