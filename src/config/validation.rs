use crate::config::types::{ApiConfig, Config, FetchConfig, LoggingConfig, OutputConfig, YearRange};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Largest page size the upstream API accepts
const MAX_PAGE_SIZE: u32 = 40;

/// Validates the entire configuration
///
/// The API key is checked separately by [`require_api_key`], so a plan can be
/// shown before a credential is available.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_fetch_config(&config.fetch)?;
    validate_years(&config.years)?;
    validate_output_config(&config.output)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Returns the configured API key or `MissingApiKey`
pub fn require_api_key(config: &Config) -> ConfigResult<&str> {
    match config.api.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(ConfigError::MissingApiKey),
    }
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.page_size < 1 || config.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 32, got {}",
            config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-multiplier must be >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if config.max_retry_delay_ms < config.retry_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-retry-delay-ms ({}) must be >= retry-delay-ms ({})",
            config.max_retry_delay_ms, config.retry_delay_ms
        )));
    }

    Ok(())
}

fn validate_years(years: &YearRange) -> Result<(), ConfigError> {
    for year in [years.start, years.end] {
        if !(1..=9999).contains(&year) {
            return Err(ConfigError::Validation(format!(
                "year {} is outside 1..=9999",
                year
            )));
        }
    }

    if years.start > years.end {
        return Err(ConfigError::Validation(format!(
            "start year {} is after end year {}",
            years.start, years.end
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<(), ConfigError> {
    if config.file.trim().is_empty() {
        return Err(ConfigError::Validation(
            "log file cannot be empty".to_string(),
        ));
    }

    Ok(())
}
