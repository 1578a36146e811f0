//! Leaf-Ledger main entry point
//!
//! This is the command-line interface for the Leaf-Ledger price harvester.

use anyhow::Context;
use clap::Parser;
use leaf_ledger::config::{load_config_with_hash, Config};
use leaf_ledger::net::HttpContextFactory;
use leaf_ledger::output::{generate_markdown_summary, print_session, write_json};
use leaf_ledger::sink::open_sink;
use leaf_ledger::{Orchestrator, RunOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Leaf-Ledger: a polite retail price harvester
///
/// Leaf-Ledger discovers a site's locations in one region, scrapes each
/// configured product category at every location and writes normalized
/// price observations to SQLite, one table per category.
#[derive(Parser, Debug)]
#[command(name = "leaf-ledger")]
#[command(version = "1.0.0")]
#[command(about = "A polite retail price harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Run only this category (repeatable); defaults to every configured category
    #[arg(long = "category", value_name = "NAME")]
    categories: Vec<String>,

    /// Scrape at most this many locations per category
    #[arg(long, value_name = "N")]
    max_locations: Option<usize>,

    /// Scrape without writing to the database
    #[arg(long)]
    no_persist: bool,

    /// Request a visible browser window
    #[arg(long)]
    headed: bool,

    /// Validate config and show what would be scraped without scraping
    #[arg(long)]
    dry_run: bool,

    /// Also write the full session as JSON to this path
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let options = RunOptions {
        categories: (!cli.categories.is_empty()).then(|| cli.categories.clone()),
        max_locations: cli.max_locations,
        persist: !cli.no_persist,
        headless: !cli.headed,
    };

    if cli.dry_run {
        return handle_dry_run(&config, &options);
    }

    handle_run(config, config_hash, &options, cli.json.as_deref()).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("leaf_ledger=info,warn"),
            1 => EnvFilter::new("leaf_ledger=debug,info"),
            2 => EnvFilter::new("leaf_ledger=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be scraped
fn handle_dry_run(config: &Config, options: &RunOptions) -> anyhow::Result<()> {
    let factory = Arc::new(HttpContextFactory::new(config.scraper.clone()));
    let orchestrator = Orchestrator::new(config.clone(), factory);
    let categories = orchestrator.select_categories(options.categories.as_deref())?;

    println!("=== Leaf-Ledger Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Locations index: {}", config.site.locations_path);
    println!("  Region: {}", config.site.region);

    println!("\nScraper:");
    println!(
        "  Delay between requests: {}-{}ms",
        config.scraper.min_delay_ms, config.scraper.max_delay_ms
    );
    println!("  Page timeout: {}ms", config.scraper.page_timeout_ms);
    println!(
        "  Retries: {} (base backoff {}ms)",
        config.scraper.max_retries, config.scraper.retry_base_delay_ms
    );
    println!("  Location budget: {}s", config.scraper.location_timeout_secs);
    println!(
        "  Concurrency: {} categories x {} locations",
        config.orchestrator.max_concurrent_categories,
        config.orchestrator.max_concurrent_locations
    );
    if let Some(cap) = options.max_locations {
        println!("  Location cap: {}", cap);
    }

    println!("\nCategories ({}):", categories.len());
    for category in &categories {
        println!("  - {} ({}) -> {}", category.label, category.path, category.table);
    }

    println!("\nOutput:");
    if options.persist {
        println!("  Database: {}", config.output.database_path);
    } else {
        println!("  Database: (disabled)");
    }
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main scraping run
async fn handle_run(
    config: Config,
    config_hash: String,
    options: &RunOptions,
    json_path: Option<&Path>,
) -> anyhow::Result<()> {
    if !options.headless {
        tracing::info!("Headed mode requested; the HTTP transport has no window to show");
    }

    let summary_path = PathBuf::from(&config.output.summary_path);
    let factory = Arc::new(HttpContextFactory::new(config.scraper.clone()));

    let mut orchestrator = Orchestrator::new(config, factory).with_config_hash(config_hash);
    if options.persist {
        let database_path = PathBuf::from(&orchestrator.config().output.database_path);
        let sink = open_sink(&database_path)
            .with_context(|| format!("failed to open {}", database_path.display()))?;
        orchestrator = orchestrator.with_sink(Arc::new(sink));
    }

    let session = orchestrator.run(options).await?;

    print_session(&session);

    generate_markdown_summary(&session, &summary_path)?;
    println!("\n✓ Summary written to: {}", summary_path.display());

    if let Some(path) = json_path {
        write_json(&session, path)?;
        println!("✓ Session exported to: {}", path.display());
    }

    if !session.success {
        anyhow::bail!("session {} finished with failures", session.session_id);
    }

    Ok(())
}
