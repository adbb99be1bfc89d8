use crate::config::selectors::{SelectorConfig, TableSelectors};
use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, RetryConfig, SearchConfig, TimeoutConfig,
    WebDriverConfig,
};
use crate::gateway::Locator;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_timeouts(&config.timeouts)?;
    validate_retry(&config.retry)?;
    validate_webdriver(&config.webdriver)?;
    validate_output_config(&config.output)?;
    validate_search_terms(&config.search)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    Url::parse(&config.search_entry_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search-entry-url: {}", e)))?;

    if config.workers < 1 || config.workers > 16 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 16, got {}",
            config.workers
        )));
    }

    if config.max_result_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-result-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_timeouts(config: &TimeoutConfig) -> Result<(), ConfigError> {
    let timeouts = [
        ("page-load-secs", config.page_load_secs),
        ("element-wait-secs", config.element_wait_secs),
        ("search-wait-secs", config.search_wait_secs),
        ("row-wait-secs", config.row_wait_secs),
    ];

    for (name, secs) in timeouts {
        if secs == 0 {
            return Err(ConfigError::Validation(format!("{} must be >= 1", name)));
        }
    }

    Ok(())
}

fn validate_retry(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry attempts must be >= 1, got {}",
            config.attempts
        )));
    }
    Ok(())
}

fn validate_webdriver(config: &WebDriverConfig) -> Result<(), ConfigError> {
    Url::parse(&config.server_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver server-url: {}", e)))?;
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_search_terms(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.terms.is_empty() {
        return Err(ConfigError::Validation(
            "at least one search term is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for term in &config.terms {
        let term = term.trim();
        if term.is_empty() {
            return Err(ConfigError::Validation(
                "search terms cannot be blank".to_string(),
            ));
        }
        if !seen.insert(term.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate search term '{}'",
                term
            )));
        }
    }

    Ok(())
}

fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    require_placeholder("search.result-row", &config.search.result_row, "row")?;
    require_placeholder("search.page-button", &config.search.page_button, "page")?;
    require_placeholder("detail.field", &config.detail.field, "label")?;

    if config.search.page_size < 1 {
        return Err(ConfigError::Validation(
            "search.page-size must be >= 1".to_string(),
        ));
    }

    validate_table("items", &config.items)?;
    validate_table("history", &config.history)?;
    validate_table("documents.table", &config.documents.table)?;

    if config.documents.notice_category.trim().is_empty() {
        return Err(ConfigError::Validation(
            "documents.notice-category cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_table(name: &str, table: &TableSelectors) -> Result<(), ConfigError> {
    require_placeholder(&format!("{}.row", name), &table.row, "row")?;
    if table.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "{}.page-size must be >= 1",
            name
        )));
    }
    Ok(())
}

fn require_placeholder(name: &str, locator: &Locator, placeholder: &str) -> Result<(), ConfigError> {
    if !locator.has_placeholder(placeholder) {
        return Err(ConfigError::InvalidLocator(format!(
            "{} must contain the {{{}}} placeholder, got '{}'",
            name, placeholder, locator
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const BASE: &str = r#"
[crawler]
search-entry-url = "https://pncp.gov.br/app/editais"

[webdriver]
server-url = "http://localhost:9515"

[output]
database-path = "licitacoes.db"

[search]
terms = ["Trator"]
"#;

    #[test]
    fn test_base_config_is_valid() {
        assert!(parse_config(BASE).is_ok());
    }

    #[test]
    fn test_validate_workers_range() {
        let config = BASE.replace("[crawler]", "[crawler]\nworkers = 17");
        assert!(matches!(
            parse_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_entry_url() {
        let config = BASE.replace("https://pncp.gov.br/app/editais", "not a url");
        assert!(matches!(
            parse_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_validate_search_terms() {
        let empty = BASE.replace("terms = [\"Trator\"]", "terms = []");
        assert!(parse_config(&empty).is_err());

        let blank = BASE.replace("terms = [\"Trator\"]", "terms = [\"  \"]");
        assert!(parse_config(&blank).is_err());

        let duplicate = BASE.replace("terms = [\"Trator\"]", "terms = [\"Trator\", \"trator\"]");
        assert!(parse_config(&duplicate).is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = format!(
            "{}\n[timeouts]\npage-load-secs = 0\nelement-wait-secs = 10\nimplicit-wait-secs = 5\nsearch-wait-secs = 5\nrow-wait-secs = 5\n",
            BASE
        );
        assert!(matches!(
            parse_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_implicit_wait_is_allowed() {
        let config = format!("{}\n[timeouts]\nimplicit-wait-secs = 0\n", BASE);
        let config = parse_config(&config).unwrap();
        assert_eq!(config.timeouts.implicit_wait_secs, 0);

        let config = format!("{}\n[timeouts]\nrow-wait-secs = 0\n", BASE);
        assert!(matches!(
            parse_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_zero_attempts() {
        let config = format!("{}\n[retry]\nattempts = 0\ndelay-ms = 10\n", BASE);
        assert!(parse_config(&config).is_err());
    }

    #[test]
    fn test_validate_row_template_placeholder() {
        let config = format!(
            "{}\n[selectors.search]\nresult-row = \"//div/a\"\n",
            BASE
        );
        assert!(matches!(
            parse_config(&config),
            Err(ConfigError::InvalidLocator(_))
        ));
    }
}
