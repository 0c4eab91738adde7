use crate::config::types::{Config, API_KEY_ENV, BASE_URL_ENV};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// The `RAWG_API_KEY` environment variable, when set, replaces any key found in
/// the file.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let (config, _) = load_config_with_hash(path)?;
    validate(&config)?;
    Ok(config)
}

/// Loads a configuration file with environment overrides, plus the SHA-256
/// hash of its content
///
/// The result is not validated, so callers can layer their own overrides on
/// top and call [`validate`] once at the end.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config);
    Ok((config, content_hash(&content)))
}

/// Parses configuration text without touching the environment or validating
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies environment overrides to a configuration
///
/// Blank values are ignored.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(key) = env_value(API_KEY_ENV) {
        config.api.api_key = Some(key);
    }
    if let Some(url) = env_value(BASE_URL_ENV) {
        config.api.base_url = url;
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    /// Default configuration with environment overrides applied
    pub fn from_env_only() -> Self {
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        config
    }
}

/// SHA-256 of the configuration text, logged so runs with different settings
/// can be told apart
fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
