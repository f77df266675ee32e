//! Rift-Harvest main entry point
//!
//! This is the command-line interface for the Rift-Harvest match crawler.

use clap::Parser;
use std::path::{Path, PathBuf};
use rift_harvest::config::load_config_with_hash;
use rift_harvest::crawler::run_harvest;
use tracing_subscriber::EnvFilter;

/// Rift-Harvest: a ranked match harvester
///
/// Rift-Harvest continuously collects ranked match records from the Riot
/// API across independent regions, filters them down to one target patch,
/// and persists them deduplicated to a local database.
#[derive(Parser, Debug)]
#[command(name = "rift-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A ranked match harvester", long_about = None)]
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

    /// Validate config and show what would be harvested without calling the API
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Run a single scrape round per region, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(config, cli.once).await?;
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
            0 => EnvFilter::new("rift_harvest=info,warn"),
            1 => EnvFilter::new("rift_harvest=debug,info"),
            2 => EnvFilter::new("rift_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &rift_harvest::Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Rift-Harvest Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Tier: {}", config.crawl.tier);
    println!("  Divisions: {}", config.crawl.divisions.join(", "));
    println!("  Target patch: {}", config.crawl.target_version);
    println!(
        "  Queues: {}",
        config
            .crawl
            .queue_ids
            .iter()
            .map(|q| q.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Minimum duration: {}s", config.crawl.min_duration_secs);
    println!("  Ids per page: {}", config.crawl.ids_page_size);

    println!("\nRate Limits:");
    println!(
        "  Burst: {} requests / {}s",
        config.api.rate_limit.burst_limit, config.api.rate_limit.burst_window_secs
    );
    println!(
        "  Sustained: {} requests / {}s",
        config.api.rate_limit.sustained_limit, config.api.rate_limit.sustained_window_secs
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nRegions ({}):", config.regions.len());
    for region in &config.regions {
        println!(
            "  - {} ({} via {})",
            region.name, region.platform, region.cluster
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would harvest {} region(s) with one worker each",
        config.regions.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &rift_harvest::Config) -> Result<(), Box<dyn std::error::Error>> {
    use rift_harvest::storage::{open_storage, Storage};

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;

    let total = storage.count_matches(None)?;
    println!("Matches stored: {}", total);

    println!("\nPer-region totals:");
    let totals = storage.list_region_totals()?;
    if totals.is_empty() {
        println!("  (none recorded yet)");
    }
    for record in &totals {
        println!(
            "  {}: {} (updated {})",
            record.platform, record.total_matches, record.updated_at
        );
    }

    println!("\nRoster sizes:");
    for region in &config.regions {
        let players = storage.list_players(&region.platform)?;
        println!("  {}: {} players", region.platform, players.len());
    }

    Ok(())
}

/// Handles the harvest operation, continuous or single-round
async fn handle_harvest(
    config: rift_harvest::Config,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use rift_harvest::storage::open_storage;

    tracing::info!(
        "Harvesting {} {:?} across {} region(s), patch {}",
        config.crawl.tier,
        config.crawl.divisions,
        config.regions.len(),
        config.crawl.target_version
    );

    let storage = open_storage(Path::new(&config.output.database_path))?;

    if once {
        return run_single_round(config, storage).await;
    }

    match run_harvest(config, storage).await {
        Ok(()) => {
            tracing::info!("Harvest finished");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

/// Runs one scrape round for each region in sequence (--once mode)
async fn run_single_round(
    config: rift_harvest::Config,
    storage: rift_harvest::storage::SqliteStorage,
) -> Result<(), Box<dyn std::error::Error>> {
    use rift_harvest::crawler::RegionWorker;
    use rift_harvest::credential::CredentialHealth;
    use rift_harvest::ApiClient;
    use std::sync::{Arc, Mutex};
    use tokio::sync::watch;

    let config = Arc::new(config);
    let storage = Arc::new(Mutex::new(storage));
    let credential = Arc::new(CredentialHealth::new());
    let (_stop_tx, stop_rx) = watch::channel(false);

    for region in &config.regions {
        let client = ApiClient::new(&config, region.clone(), credential.clone(), stop_rx.clone())?;
        let mut worker = RegionWorker::new(
            config.clone(),
            region.clone(),
            client,
            storage.clone(),
            credential.clone(),
            stop_rx.clone(),
        );
        if let Err(e) = worker.run_once().await {
            tracing::error!("Round failed for {}: {}", region.platform, e);
        }
    }

    Ok(())
}
