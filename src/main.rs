//! Docmirror main entry point
//!
//! This is the command-line interface for the Docmirror incremental
//! documentation mirror.

use anyhow::Context;
use clap::Parser;
use docmirror::config::{load_config_with_hash, Config, SessionPolicy};
use docmirror::crawler::crawl_until;
use docmirror::output::{generate_markdown_summary, load_report_metadata, print_statistics};
use docmirror::storage::pages_by_framework;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Docmirror: an incremental documentation mirror
///
/// Docmirror crawls a documentation tree breadth-first, saves every page as
/// normalized text, and on later runs only rewrites pages whose content
/// changed. Interrupted runs resume from their last checkpoint.
#[derive(Parser, Debug)]
#[command(name = "docmirror")]
#[command(version)]
#[command(about = "An incremental documentation mirror", long_about = None)]
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

    /// Start a fresh crawl, discarding any saved session
    #[arg(long)]
    fresh: bool,

    /// Save every page even when its content did not change
    #[arg(long)]
    force: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics of the last run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Write a markdown summary of the mirror to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats"])]
    export_summary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).context(format!("loading {}", cli.config.display()));
        }
    };
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.fresh {
        config.crawl.session_policy = SessionPolicy::Fresh;
    }
    if cli.force {
        config.crawl.force_recrawl = true;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = &cli.export_summary {
        handle_export_summary(&config, path)?;
    } else {
        handle_crawl(config).await?;
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
            0 => EnvFilter::new("docmirror=info,warn"),
            1 => EnvFilter::new("docmirror=debug,info"),
            2 => EnvFilter::new("docmirror=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Docmirror Dry Run ===\n");

    println!("Crawl:");
    println!("  Start URL: {}", config.crawl.start_url);
    println!("  Max depth: {}", config.crawl.max_depth);
    println!("  Max pages: {}", config.crawl.max_pages);
    println!("  Change detection: {}", config.crawl.change_detection);
    println!("  Force recrawl: {}", config.crawl.force_recrawl);
    println!("  Expand unchanged: {}", config.crawl.expand_unchanged);
    if config.crawl.allowed_prefixes.is_empty() {
        println!("  Allowed prefixes: start URL only");
    } else {
        println!("  Allowed prefixes:");
        for prefix in &config.crawl.allowed_prefixes {
            println!("    * {}", prefix);
        }
    }

    println!("\nRuntime:");
    println!("  Workers: {}", config.runtime.concurrency);
    println!("  Politeness delay: {}ms", config.runtime.politeness_delay_ms);
    println!(
        "  Checkpoint interval: {}s",
        config.runtime.checkpoint_interval_secs
    );
    println!("  Request timeout: {}s", config.runtime.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    if let Some(contact) = &config.user_agent.contact_url {
        println!("  Contact URL: {}", contact);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.crawl.output_directory.display());
    println!("  Metadata: {}", config.metadata_path().display());
    println!("  Session: {}", config.session_path().display());
    if config.session_path().is_file() {
        println!("  A saved session exists and would be resumed");
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the metadata file
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = config.metadata_path();
    println!("Metadata: {}\n", path.display());

    let metadata = load_report_metadata(&path)?;
    print_statistics(&metadata.stats);

    println!("\nPages in mirror: {}", metadata.pages.len());
    for (framework, count) in pages_by_framework(&metadata) {
        println!("  {}: {}", framework, count);
    }

    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary
fn handle_export_summary(config: &Config, output: &std::path::Path) -> anyhow::Result<()> {
    let path = config.metadata_path();

    println!("=== Exporting Mirror Summary ===\n");
    println!("Metadata: {}", path.display());
    println!("Output: {}", output.display());
    println!();

    let metadata = load_report_metadata(&path)?;
    generate_markdown_summary(&metadata, output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("✓ Summary exported to: {}", output.display());

    Ok(())
}

/// Handles the main crawl operation
///
/// Ctrl-C stops the crawl gracefully: in-flight pages are requeued and the
/// session is checkpointed for the next run.
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Mirroring {} into {}",
        config.crawl.start_url,
        config.crawl.output_directory.display()
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing in-flight work");
            let _ = stop_tx.send(true);
        }
    });

    match crawl_until(config, stop_rx).await {
        Ok(stats) => {
            if stats.end_time.is_some() {
                tracing::info!("Crawl completed successfully");
            } else {
                tracing::info!("Crawl interrupted; run again to resume");
            }
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
