//! Games-Harvest: a polite multi-year game catalogue fetcher
//!
//! This crate walks a paginated game-metadata API one calendar year at a time,
//! runs several years concurrently, tolerates transient upstream overload, and
//! writes the consolidated records to a tabular file.

pub mod config;
pub mod harvest;
pub mod logging;
pub mod output;

use thiserror::Error;

/// Main error type for Games-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Year {year} task failed: {message}")]
    Task { year: i32, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("No API key configured (set [api] api-key, RAWG_API_KEY or --api-key)")]
    MissingApiKey,
}

/// Page fetch failures
///
/// A `FetchError` ends the walk of the year it happened in. Transient 502
/// responses only surface here once the retry budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response body: {0}")]
    Decode(String),

    #[error("Upstream still overloaded after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Year {0} cannot be expressed as a date range")]
    InvalidYear(i32),
}

impl FetchError {
    /// Classifies a reqwest error, dropping the request URL (it carries the API key)
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Decode(err.without_url().to_string())
        } else {
            FetchError::Network(err.without_url().to_string())
        }
    }
}

/// Result type alias for Games-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for page fetches
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// One upstream record, kept as the field mapping the API returned
pub type Record = serde_json::Map<String, serde_json::Value>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{HarvestReport, HarvestRun, Harvester, YearOutcome};
pub use logging::Verbosity;

/// Harvests `start_year..=end_year` with default settings and writes the result file
///
/// The API key comes from `RAWG_API_KEY`. Per-year failures never make this
/// return an error; they are visible in the returned report and in the log.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> games_harvest::Result<()> {
/// let run = games_harvest::run_years(2017, 2019, true, false).await?;
/// println!("{} games in {}", run.report.records.len(), run.output_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn run_years(
    start_year: i32,
    end_year: i32,
    verbose: bool,
    quiet: bool,
) -> Result<HarvestRun> {
    let mut config = Config::from_env_only();
    config.years.start = start_year;
    config.years.end = end_year;

    let harvester = Harvester::new(config, Verbosity::from_flags(verbose, quiet))?;
    harvester.run().await
}
