//! WebDriver-backed gateway
//!
//! Drives a Chrome session through a WebDriver server (chromedriver, selenium)
//! using `thirtyfour`. Element waits are explicit polling queries bounded by
//! the caller's timeout.

use crate::config::{TimeoutConfig, WebDriverConfig};
use crate::gateway::{GatewayError, GatewayResult, Locator, LocatorGateway};
use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::prelude::*;

/// Interval between polls while waiting for an element
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Gateway over one WebDriver browser session
pub struct WebDriverGateway {
    driver: WebDriver,
}

impl WebDriverGateway {
    /// Opens a new browser session
    ///
    /// # Arguments
    ///
    /// * `config` - WebDriver server and browser options
    /// * `timeouts` - Page-load and implicit wait timeouts applied to the session
    pub async fn connect(
        config: &WebDriverConfig,
        timeouts: &TimeoutConfig,
    ) -> GatewayResult<Self> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in &config.browser_args {
            caps.add_arg(arg).map_err(session_error)?;
        }
        if config.headless {
            caps.set_headless().map_err(session_error)?;
        }

        let driver = WebDriver::new(config.server_url.as_str(), caps)
            .await
            .map_err(session_error)?;
        driver
            .set_page_load_timeout(timeouts.page_load())
            .await
            .map_err(session_error)?;
        // Lookups inside rows and cells look for optional elements; a nonzero
        // implicit wait makes every absent one block for the full timeout
        if timeouts.implicit_wait() > Duration::ZERO {
            tracing::warn!(
                "Implicit wait of {:?} applies to every lookup of an optional element",
                timeouts.implicit_wait()
            );
        }
        driver
            .set_implicit_wait_timeout(timeouts.implicit_wait())
            .await
            .map_err(session_error)?;

        tracing::debug!("Opened WebDriver session at {}", config.server_url);
        Ok(Self { driver })
    }
}

fn session_error(err: WebDriverError) -> GatewayError {
    GatewayError::Session(err.to_string())
}

fn by(locator: &Locator) -> By {
    match locator {
        Locator::XPath(expr) => By::XPath(expr.to_string()),
        Locator::Css(expr) => By::Css(expr.to_string()),
    }
}

#[async_trait]
impl LocatorGateway for WebDriverGateway {
    type Element = WebElement;

    async fn navigate(&self, url: &str) -> GatewayResult<()> {
        self.driver
            .goto(url)
            .await
            .map_err(|e| GatewayError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> GatewayResult<Option<WebElement>> {
        self.driver
            .query(by(locator))
            .wait(timeout, POLL_INTERVAL)
            .first_opt()
            .await
            .map_err(session_error)
    }

    async fn find_within(
        &self,
        scope: &WebElement,
        locator: &Locator,
    ) -> GatewayResult<Option<WebElement>> {
        Ok(self
            .find_all_within(scope, locator)
            .await?
            .into_iter()
            .next())
    }

    async fn find_all_within(
        &self,
        scope: &WebElement,
        locator: &Locator,
    ) -> GatewayResult<Vec<WebElement>> {
        scope.find_all(by(locator)).await.map_err(session_error)
    }

    async fn read_text(&self, element: &WebElement) -> GatewayResult<String> {
        element.text().await.map_err(session_error)
    }

    async fn read_attribute(
        &self,
        element: &WebElement,
        name: &str,
    ) -> GatewayResult<Option<String>> {
        element.attr(name).await.map_err(session_error)
    }

    async fn click(&self, element: &WebElement) -> GatewayResult<()> {
        element.click().await.map_err(session_error)
    }

    async fn type_text(&self, element: &WebElement, text: &str, submit: bool) -> GatewayResult<()> {
        element.send_keys(text).await.map_err(session_error)?;
        if submit {
            element.send_keys(Key::Enter).await.map_err(session_error)?;
        }
        Ok(())
    }

    async fn scroll_to(&self, y: i64) -> GatewayResult<()> {
        self.driver
            .execute(format!("window.scrollTo(0, {});", y), Vec::new())
            .await
            .map_err(session_error)?;
        Ok(())
    }

    async fn close(&self) -> GatewayResult<()> {
        self.driver.clone().quit().await.map_err(session_error)
    }
}

