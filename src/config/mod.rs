//! Configuration module for Games-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and layering the API key and endpoint from the environment on top of them.
//!
//! # Example
//!
//! ```no_run
//! use games_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("games-harvest.toml")).unwrap();
//! println!("Fetching {}..={}", config.years.start, config.years.end);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, FetchConfig, LoggingConfig, OutputConfig, OutputFormat, YearRange,
    API_KEY_ENV, BASE_URL_ENV,
};

// Re-export parser functions
pub use parser::{apply_env_overrides, load_config, load_config_with_hash, parse_config};
pub use validation::{require_api_key, validate};
