//! Page and element capability consumed by the crawler
//!
//! The crawler never talks to a browser directly. Everything it needs from a
//! rendered page goes through [`LocatorGateway`]:
//! - navigating to a URL
//! - waiting (with a bounded timeout) for an element to appear
//! - reading text and attributes
//! - clicking, typing and scrolling
//!
//! Two implementations ship with the crate: [`WebDriverGateway`] drives a real
//! browser through a WebDriver server, and [`MemoryGateway`] serves an
//! in-memory page model for tests and offline runs.

mod locator;
mod memory;
mod webdriver;

pub use locator::Locator;
pub use memory::{MemoryElement, MemoryGateway, MemoryNode, MemoryPage, MemoryTable};
pub use webdriver::WebDriverGateway;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a gateway
///
/// A wait that runs out of time is *not* an error: [`LocatorGateway::wait_for`]
/// reports it as `Ok(None)`. These variants are transport and session level
/// failures that the caller cannot treat as a normal absence.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser session failure: {0}")]
    Session(String),

    #[error("Timed out after {timeout:?} waiting for {locator}")]
    Timeout { locator: String, timeout: Duration },

    #[error("Stale element: {0}")]
    StaleElement(String),
}

impl GatewayError {
    /// Returns true for failures worth re-attempting (page loads, dropped sessions)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. } | Self::Session(_) | Self::Timeout { .. }
        )
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Capability to drive a rendered page
///
/// Implementations must bound every wait by the timeout they are given.
#[async_trait]
pub trait LocatorGateway: Send + Sync {
    /// Handle to an element on the current page
    type Element: Clone + Send + Sync + 'static;

    /// Loads `url` in the session
    async fn navigate(&self, url: &str) -> GatewayResult<()>;

    /// Waits up to `timeout` for the first element matching `locator`
    ///
    /// Returns `Ok(None)` when the deadline passes without a match.
    async fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> GatewayResult<Option<Self::Element>>;

    /// Finds the first descendant of `scope` matching `locator`, without waiting
    async fn find_within(
        &self,
        scope: &Self::Element,
        locator: &Locator,
    ) -> GatewayResult<Option<Self::Element>>;

    /// Finds all descendants of `scope` matching `locator`, in document order
    async fn find_all_within(
        &self,
        scope: &Self::Element,
        locator: &Locator,
    ) -> GatewayResult<Vec<Self::Element>>;

    /// Reads the rendered text of an element
    async fn read_text(&self, element: &Self::Element) -> GatewayResult<String>;

    /// Reads an attribute, `None` when the attribute is not present
    async fn read_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> GatewayResult<Option<String>>;

    /// Clicks an element
    async fn click(&self, element: &Self::Element) -> GatewayResult<()>;

    /// Types `text` into an element, pressing Enter afterwards when `submit` is set
    async fn type_text(&self, element: &Self::Element, text: &str, submit: bool)
        -> GatewayResult<()>;

    /// Scrolls the window to the vertical position `y`
    async fn scroll_to(&self, y: i64) -> GatewayResult<()>;

    /// Ends the session
    async fn close(&self) -> GatewayResult<()>;
}

/// Waits for an element that must be present, turning a timeout into an error
pub async fn require<G: LocatorGateway>(
    gateway: &G,
    locator: &Locator,
    timeout: Duration,
) -> GatewayResult<G::Element> {
    gateway
        .wait_for(locator, timeout)
        .await?
        .ok_or_else(|| GatewayError::Timeout {
            locator: locator.to_string(),
            timeout,
        })
}

/// Reads the trimmed text of the first descendant of `scope` matching `locator`
///
/// Returns an empty string when there is no such descendant.
pub async fn text_within<G: LocatorGateway>(
    gateway: &G,
    scope: &G::Element,
    locator: &Locator,
) -> GatewayResult<String> {
    match gateway.find_within(scope, locator).await? {
        Some(element) => Ok(gateway.read_text(&element).await?.trim().to_string()),
        None => Ok(String::new()),
    }
}
