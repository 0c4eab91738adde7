//! Page fetcher
//!
//! This module issues the HTTP requests for a single page of one year:
//! - Building the HTTP client with timeouts and user agent
//! - Encoding the year as a `dates` range query
//! - Retrying HTTP 502 responses on the same page with backoff
//! - Classifying every other outcome into a `Page` or a `FetchError`

use crate::config::{require_api_key, ApiConfig, Config, FetchConfig};
use crate::{FetchError, FetchResult, HarvestError, Record};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// One page of records returned by the upstream API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Records in the order the API returned them
    pub records: Vec<Record>,

    /// Whether the API advertised a following page
    pub has_more: bool,
}

/// Reads a page response body
///
/// Only `results` and `next` are consulted. A `results` that is missing or
/// not an array counts as an empty page, and `next` means "more pages" only
/// when it holds a truthy value.
fn page_from_body(body: Value, year: i32, page: u32) -> FetchResult<Page> {
    let mut body = match body {
        Value::Object(body) => body,
        other => {
            return Err(FetchError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    if let Some(count) = body.get("count").and_then(Value::as_u64) {
        tracing::trace!("Year {} page {}: upstream reports {} total", year, page, count);
    }

    let has_next = body.get("next").is_some_and(is_truthy);

    let results = match body.remove("results") {
        Some(Value::Array(results)) => results,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            tracing::debug!(
                "Year {} page {}: ignoring non-array results ({})",
                year,
                page,
                json_kind(&other)
            );
            Vec::new()
        }
    };

    let mut records = Vec::with_capacity(results.len());
    for item in results {
        match item {
            Value::Object(record) => records.push(record),
            other => tracing::debug!(
                "Year {} page {}: skipping non-object result {}",
                year,
                page,
                other
            ),
        }
    }

    // An empty page ends the walk even if the API still links a next one
    let has_more = has_next && !records.is_empty();
    Ok(Page { records, has_more })
}

/// JSON truthiness: null, false, zero and empty strings/collections are false
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Backoff schedule for HTTP 502 responses
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Wait before the first retry
    pub base_delay: Duration,

    /// Factor applied to the wait after each further retry
    pub multiplier: f64,

    /// Cap on a single wait
    pub max_delay: Duration,

    /// Retries allowed per page, `None` for no limit
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.retry_delay_ms),
            multiplier: config.backoff_multiplier,
            max_delay: Duration::from_millis(config.max_retry_delay_ms),
            max_retries: config.retry_limit(),
        }
    }

    /// Wait before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(64) as i32;
        let scaled = self.base_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_nanos() as f64);
        Duration::from_nanos(capped.round() as u64)
    }

    /// Whether retry number `retry` (1-based) may still be attempted
    pub fn allows(&self, retry: u32) -> bool {
        self.max_retries.map_or(true, |max| retry <= max)
    }
}

/// Builds an HTTP client with the configured timeouts
///
/// # Arguments
///
/// * `config` - The API configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .build()
}

/// The `dates` query value covering one calendar year
pub fn date_range(year: i32) -> FetchResult<String> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(FetchError::InvalidYear(year))?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(FetchError::InvalidYear(year))?;
    Ok(format!(
        "{},{}",
        first.format("%Y-%m-%d"),
        last.format("%Y-%m-%d")
    ))
}

/// Client for the paginated games endpoint
///
/// Holds no per-request state; one instance is shared by every year task.
#[derive(Debug, Clone)]
pub struct GameApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    page_size: u32,
    retry: RetryPolicy,
}

impl GameApiClient {
    /// Creates a client from a validated configuration
    ///
    /// Fails with `ConfigError::MissingApiKey` when no key is configured.
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let api_key = require_api_key(config)?.to_string();
        let client = build_http_client(&config.api)?;

        Ok(Self {
            client,
            base_url: config.api.base_url.clone(),
            api_key,
            page_size: config.api.page_size,
            retry: RetryPolicy::from_config(&config.fetch),
        })
    }

    /// Fetches one page of `year`
    ///
    /// # Response Handling
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 502 | Wait, retry the same page (bounded by the retry policy) |
    /// | Other non-2xx | `FetchError::Status` |
    /// | Timeout / network | `FetchError::Timeout` / `FetchError::Network` |
    /// | Body not a JSON object | `FetchError::Decode` |
    /// | Empty, null or missing `results` | `Page` with no records, `has_more = false` |
    /// | Records, no `next` | `Page` with records, `has_more = false` |
    /// | Records and a truthy `next` | `Page` with records, `has_more = true` |
    pub async fn fetch_page(&self, year: i32, page: u32) -> FetchResult<Page> {
        let dates = date_range(year)?;
        let mut retries = 0u32;

        loop {
            tracing::debug!("Requesting year {} page {}", year, page);

            let response = self
                .client
                .get(&self.base_url)
                .query(&[("key", self.api_key.as_str()), ("dates", dates.as_str())])
                .query(&[("page", page), ("page_size", self.page_size)])
                .send()
                .await
                .map_err(FetchError::from_reqwest)?;

            let status = response.status();

            if status == StatusCode::BAD_GATEWAY {
                retries += 1;
                if !self.retry.allows(retries) {
                    return Err(FetchError::RetriesExhausted { attempts: retries });
                }

                let delay = self.retry.delay_for(retries);
                tracing::warn!(
                    year,
                    page,
                    retry = retries,
                    ?delay,
                    "Upstream returned 502, waiting before retrying the same page"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                });
            }

            let body: Value = response.json().await.map_err(FetchError::from_reqwest)?;
            return page_from_body(body, year, page);
        }
    }
}
