//! licitacoes-crawler main entry point
//!
//! This is the command-line interface for the tender crawler.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use licitacoes_crawler::config::{load_config_with_hash, validate, Config};
use licitacoes_crawler::crawler::{partition_terms, run_pool};
use licitacoes_crawler::gateway::WebDriverGateway;
use licitacoes_crawler::output::{
    load_statistics, print_statistics, print_summaries, print_tenders, RunTotals,
};
use licitacoes_crawler::storage::{open_store, TenderStore};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// licitacoes-crawler: collects the tenders published on a reference date
///
/// Searches the tender portal for each configured term, follows every result
/// listed on the reference date to its detail page, and stores the tender
/// with its items and notice documents.
#[derive(Parser, Debug)]
#[command(name = "licitacoes-crawler")]
#[command(version = "1.0.0")]
#[command(about = "Public tender crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show how terms would be assigned without crawling
    #[arg(long, conflicts_with_all = ["stats", "list"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list"])]
    stats: bool,

    /// List stored tenders and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    list: bool,

    /// Search term to crawl instead of the configured ones (repeatable)
    #[arg(long = "term", value_name = "TERM")]
    terms: Vec<String>,

    /// Listing date to collect (YYYY-MM-DD), defaults to today
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Number of browser sessions, overrides the configured value
    #[arg(long, value_name = "N")]
    workers: Option<u32>,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;
    let reference = cli.date.unwrap_or_else(|| Local::now().date_naive());

    if cli.dry_run {
        handle_dry_run(&config, reference);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.list {
        handle_list(&config)?;
    } else {
        handle_crawl(&config, reference).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("licitacoes_crawler=info,warn"),
            1 => EnvFilter::new("licitacoes_crawler=debug,info"),
            2 => EnvFilter::new("licitacoes_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and validates the result again
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if !cli.terms.is_empty() {
        config.search.terms = cli.terms.clone();
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    validate(config).context("Invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: shows the validated config and term assignment
fn handle_dry_run(config: &Config, reference: NaiveDate) {
    println!("=== licitacoes-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Search entry: {}", config.crawler.search_entry_url);
    println!("  Reference date: {}", reference);
    match config.crawler.max_result_pages {
        Some(pages) => println!("  Max result pages: {}", pages),
        None => println!("  Max result pages: unlimited"),
    }
    println!(
        "  Retries: {} attempts, {}ms apart",
        config.retry.attempts, config.retry.delay_ms
    );

    println!("\nWebDriver:");
    println!("  Server: {}", config.webdriver.server_url);
    println!("  Headless: {}", config.webdriver.headless);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let groups = partition_terms(&config.search.terms, config.crawler.workers as usize);
    println!("\nWorkers ({}):", groups.len());
    for (worker, terms) in groups.iter().enumerate() {
        println!("  - worker {}: {}", worker, terms.join(", "));
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would search {} terms for listings of {}",
        config.search.terms.len(),
        reference
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --list mode: prints stored tenders
fn handle_list(config: &Config) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.output.database_path))?;
    print_tenders(&store.list_all()?);
    Ok(())
}

/// Cancels the crawl once `signal` fires; a failed listener leaves it running
async fn cancel_on_signal<F>(signal: F, cancel: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Received shutdown signal, stopping after the current row");
            cancel.cancel();
        }
        Err(e) => tracing::warn!("Could not listen for Ctrl-C, crawl cannot be interrupted: {}", e),
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, reference: NaiveDate) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} search terms for listings of {}",
        config.search.terms.len(),
        reference
    );

    let store = Arc::new(
        open_store(Path::new(&config.output.database_path))
            .context("Failed to open the tender database")?,
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), cancel.clone()));

    let summaries = run_pool(
        config,
        &config.search.terms,
        reference,
        store,
        |_| {
            let webdriver = config.webdriver.clone();
            let timeouts = config.timeouts.clone();
            async move { WebDriverGateway::connect(&webdriver, &timeouts).await }
        },
        cancel,
    )
    .await?;

    print_summaries(&summaries);

    let totals = RunTotals::from_summaries(&summaries);
    if totals.is_clean() {
        tracing::info!("Crawl completed successfully");
    } else {
        tracing::warn!(
            "Crawl finished with {} failed tenders and {} failed searches",
            totals.failed,
            totals.walk_errors
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_cancels_crawl() {
        let cancel = CancellationToken::new();
        cancel_on_signal(async { Ok(()) }, cancel.clone()).await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_signal_listener_keeps_crawl_running() {
        let cancel = CancellationToken::new();
        let failed = async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no handler")) };
        cancel_on_signal(failed, cancel.clone()).await;
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-10-17"),
            Ok(NaiveDate::from_ymd_opt(2025, 10, 17).unwrap())
        );
        assert!(parse_date("17/10/2025").is_err());
    }
}
