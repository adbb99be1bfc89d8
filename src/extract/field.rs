//! Label to value lookup on the loaded page

use crate::gateway::{GatewayResult, Locator, LocatorGateway};
use crate::model::not_found_sentinel;
use std::time::Duration;

/// Resolves labeled fields on the currently loaded page
///
/// A field that does not appear within the wait is not an error: its value
/// becomes the not-found sentinel built from the label. Gateway failures are
/// passed through.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    template: Locator,
    timeout: Duration,
}

impl FieldResolver {
    /// # Arguments
    ///
    /// * `template` - Locator of a field's value, with a `{label}` placeholder
    /// * `timeout` - How long to wait for each field
    pub fn new(template: Locator, timeout: Duration) -> Self {
        Self { template, timeout }
    }

    /// Resolves the value displayed next to `label`
    pub async fn resolve<G: LocatorGateway>(
        &self,
        gateway: &G,
        label: &str,
    ) -> GatewayResult<String> {
        let locator = self.template.fill("label", label);
        self.resolve_at(gateway, &locator, label).await
    }

    /// Resolves a field through a dedicated locator, with the same fallback
    pub async fn resolve_at<G: LocatorGateway>(
        &self,
        gateway: &G,
        locator: &Locator,
        label: &str,
    ) -> GatewayResult<String> {
        match gateway.wait_for(locator, self.timeout).await? {
            Some(element) => Ok(gateway.read_text(&element).await?.trim().to_string()),
            None => {
                tracing::debug!("Field '{}' not found", label);
                Ok(not_found_sentinel(label))
            }
        }
    }
}
