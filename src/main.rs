//! Games-Harvest main entry point
//!
//! This is the command-line interface for the Games-Harvest year fetcher.

use anyhow::Context;
use clap::Parser;
use games_harvest::config::{
    load_config_with_hash, require_api_key, validate, Config, OutputFormat,
};
use games_harvest::output::{output_path, print_statistics, sink_for};
use games_harvest::{Harvester, Verbosity};
use std::path::PathBuf;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "games-harvest.toml";

/// Games-Harvest: fetch game metadata for a range of release years
///
/// Years are fetched concurrently, each walked page by page. The combined
/// records are written to games_parallel_<start>_<end>.<csv|json>.
#[derive(Parser, Debug)]
#[command(name = "games-harvest")]
#[command(version)]
#[command(about = "Fetch game metadata for a range of release years", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// First year to fetch
    #[arg(long)]
    start_year: Option<i32>,

    /// Last year to fetch (inclusive)
    #[arg(long)]
    end_year: Option<i32>,

    /// API key (overrides the config file and RAWG_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Output format: csv or json
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Directory for the result file
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Log debug events
    #[arg(short, long)]
    verbose: bool,

    /// Log errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show what would be fetched without making any request
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let harvester = Harvester::new(config, Verbosity::from_flags(cli.verbose, cli.quiet))
        .context("failed to set up harvest")?;

    eprintln!("Logging to {}", harvester.config().logging.file);

    let run = harvester.run().await.context("harvest failed")?;

    print_statistics(&run.statistics);
    println!("\nSaved to: {}", run.output_path.display());

    Ok(())
}

/// Loads the config file (if any), applies command-line overrides, then validates
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    let mut config = match &path {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path).with_context(|| {
                format!("failed to load configuration from {}", path.display())
            })?;
            eprintln!("Configuration {} (hash: {})", path.display(), hash);
            config
        }
        None => Config::from_env_only(),
    };

    if let Some(start) = cli.start_year {
        config.years.start = start;
    }
    if let Some(end) = cli.end_year {
        config.years.end = end;
    }
    if let Some(key) = &cli.api_key {
        config.api.api_key = Some(key.clone());
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }

    validate(&config).context("invalid configuration")?;

    Ok(config)
}

/// Handles the --dry-run mode: prints the resolved plan
fn handle_dry_run(config: &Config) {
    println!("=== Games-Harvest Dry Run ===\n");

    println!("Upstream:");
    println!("  Endpoint: {}", config.api.base_url);
    println!(
        "  API key: {}",
        if require_api_key(config).is_ok() {
            "configured"
        } else {
            "MISSING"
        }
    );
    println!("  Page size: {}", config.api.page_size);
    println!("  Request timeout: {}s", config.api.request_timeout_secs);

    println!("\nFetch:");
    println!(
        "  Years: {}-{} ({} years)",
        config.years.start,
        config.years.end,
        config.years.len()
    );
    println!("  Concurrent years: {}", config.fetch.concurrency);
    println!("  Page ceiling per year: {}", config.fetch.max_pages);
    println!("  Politeness delay: {}ms", config.fetch.politeness_delay_ms);
    match config.fetch.retry_limit() {
        Some(limit) => println!(
            "  502 retries: up to {} per page, starting at {}ms",
            limit, config.fetch.retry_delay_ms
        ),
        None => println!(
            "  502 retries: unbounded, starting at {}ms",
            config.fetch.retry_delay_ms
        ),
    }

    let sink = sink_for(&config.output);
    println!("\nOutput:");
    println!(
        "  File: {}",
        output_path(&config.output, sink.as_ref(), config.years.start, config.years.end).display()
    );
    println!("  Log: {}", config.logging.file);
}
