//! Element locators and locator templates

use crate::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How to find an element on a page
///
/// Locators are written in configuration as strings. An explicit `xpath:` or
/// `css:` prefix selects the strategy; without one, strings starting with `/`,
/// `(` or `.` are XPath and everything else is a CSS selector.
///
/// A locator may be a template with `{name}` placeholders (for example
/// `{row}` or `{label}`) that are filled in with [`Locator::fill`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Locator {
    XPath(String),
    Css(String),
}

impl Locator {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// The raw expression without the strategy prefix
    pub fn expr(&self) -> &str {
        match self {
            Self::XPath(expr) | Self::Css(expr) => expr,
        }
    }

    /// Returns true if the expression contains the `{name}` placeholder
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.expr().contains(&format!("{{{}}}", name))
    }

    /// Replaces every `{name}` placeholder with `value`
    pub fn fill(&self, name: &str, value: impl fmt::Display) -> Self {
        let placeholder = format!("{{{}}}", name);
        let expr = self.expr().replace(&placeholder, &value.to_string());
        match self {
            Self::XPath(_) => Self::XPath(expr),
            Self::Css(_) => Self::Css(expr),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XPath(expr) => write!(f, "xpath:{}", expr),
            Self::Css(expr) => write!(f, "css:{}", expr),
        }
    }
}

impl FromStr for Locator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let locator = if let Some(expr) = s.strip_prefix("xpath:") {
            Self::XPath(expr.trim().to_string())
        } else if let Some(expr) = s.strip_prefix("css:") {
            Self::Css(expr.trim().to_string())
        } else if s.starts_with('/') || s.starts_with('(') || s.starts_with('.') {
            Self::XPath(s.to_string())
        } else {
            Self::Css(s.to_string())
        };

        if locator.expr().is_empty() {
            return Err(ConfigError::InvalidLocator(format!(
                "empty locator expression in '{}'",
                s
            )));
        }

        Ok(locator)
    }
}

impl TryFrom<String> for Locator {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
