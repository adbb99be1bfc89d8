//! Configuration module for the tender crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use licitacoes_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.workers);
//! ```

mod parser;
mod selectors;
mod types;
mod validation;

// Re-export types
pub use selectors::{
    DetailSelectors, DocumentSelectors, SearchSelectors, SelectorConfig, TableSelectors,
};
pub use types::{
    Config, CrawlerConfig, OutputConfig, RetryConfig, SearchConfig, TimeoutConfig,
    WebDriverConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_config, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
