use serde::Deserialize;
use std::time::Duration;

/// Environment variable that supplies the API key
pub const API_KEY_ENV: &str = "RAWG_API_KEY";

/// Environment variable that replaces `[api] base-url`
pub const BASE_URL_ENV: &str = "RAWG_BASE_URL";

/// Main configuration structure for Games-Harvest
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub fetch: FetchConfig,
    pub years: YearRange,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Upstream API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Endpoint that lists games
    pub base_url: String,

    /// API key sent as the `key` query parameter
    pub api_key: Option<String>,

    /// Records requested per page
    pub page_size: u32,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// TCP connect timeout (seconds)
    pub connect_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.rawg.io/api/games".to_string(),
            api_key: None,
            page_size: 40,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("games-harvest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Page walking, retry and concurrency settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Number of years fetched at the same time
    pub concurrency: u32,

    /// Hard ceiling of pages walked per year
    pub max_pages: u32,

    /// Pause between two successful page fetches (milliseconds)
    pub politeness_delay_ms: u64,

    /// First wait after an HTTP 502 (milliseconds)
    pub retry_delay_ms: u64,

    /// Retries of a single page after HTTP 502
    pub max_retries: u32,

    /// Ignore `max_retries` and retry 502s until the upstream recovers
    pub unbounded_retries: bool,

    /// Growth factor applied to the retry delay after each 502
    pub backoff_multiplier: f64,

    /// Upper bound of a single retry wait (milliseconds)
    pub max_retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            max_pages: 25,
            politeness_delay_ms: 800,
            retry_delay_ms: 3000,
            max_retries: 10,
            unbounded_retries: false,
            backoff_multiplier: 1.0,
            max_retry_delay_ms: 30_000,
        }
    }
}

impl FetchConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    /// Retry budget for one page, `None` when unbounded
    pub fn retry_limit(&self) -> Option<u32> {
        if self.unbounded_retries {
            None
        } else {
            Some(self.max_retries)
        }
    }
}

/// Inclusive range of calendar years to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 2017,
            end: 2019,
        }
    }
}

impl YearRange {
    /// Number of years in the range (0 when reversed)
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<i32> {
        self.start..=self.end
    }
}

/// Serialization format of the result file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected csv or json)", other)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory the result file is written into
    pub directory: String,

    pub format: OutputFormat,

    /// Prefix CSV output with a UTF-8 byte order mark (spreadsheet friendly)
    pub utf8_bom: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            format: OutputFormat::Csv,
            utf8_bom: true,
        }
    }
}

/// Log sink configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Log file, truncated at the start of every run
    pub file: String,

    /// Mirror log events to stderr
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "api_client.log".to_string(),
            console: false,
        }
    }
}
