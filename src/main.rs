use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use gator::config::parse_interval;
use gator::{Aggregator, Config, Database, FeedRepository, PostRepository, RssFetcher};

/// RSS feed aggregator.
#[derive(Debug, Parser)]
#[command(name = "gator", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Time between fetches, e.g. "1m", "30s" or "1h30m" (overrides the config file)
    interval: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    if !cli.config.exists() {
        eprintln!(
            "{} not found, using default configuration.",
            cli.config.display()
        );
    }
    let mut config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };
    if let Some(interval) = cli.interval {
        config.aggregator.interval = interval;
    }

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        gator::logging::init_console_only(&config.logging.level);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> gator::Result<()> {
    let interval = parse_interval(&config.aggregator.interval)?;
    config.validate()?;

    info!("gator - RSS feed aggregator");

    let db = Database::connect(&config.database.url).await?;
    info!("Database ready (schema version {})", db.schema_version().await?);

    let fetcher = RssFetcher::new(&config.aggregator)?;
    let aggregator = Aggregator::new(
        FeedRepository::new(db.pool()),
        PostRepository::new(db.pool()),
        fetcher,
    );
    let handle = aggregator.spawn(interval)?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    handle.shutdown().await?;
    db.close().await;
    Ok(())
}
