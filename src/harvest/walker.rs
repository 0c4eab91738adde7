//! Year walker
//!
//! Drives the page fetcher for one calendar year, page after page, until the
//! upstream runs out of data, the page ceiling is reached, or a page fails.

use crate::config::FetchConfig;
use crate::harvest::fetcher::GameApiClient;
use crate::{FetchError, Record};

/// Why a year's walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The upstream returned an empty page or no next-page marker
    Exhausted,

    /// The page ceiling was reached while more pages were advertised
    PageLimit,

    /// A page failed; records gathered before it are kept
    Failed { page: u32, error: FetchError },
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::Failed { .. })
    }
}

/// Everything gathered for one year
#[derive(Debug, Clone)]
pub struct YearReport {
    pub year: i32,

    /// Records of every successful page, in page order
    pub records: Vec<Record>,

    /// Pages answered successfully, including a final empty page
    pub pages_fetched: u32,

    pub stop: StopReason,
}

/// Walks all pages of `year`, starting at page 1
///
/// Page `p + 1` is only requested after page `p` succeeded with a next-page
/// marker, and never beyond `config.max_pages`. A failing page ends the walk
/// without an error: the report carries the records gathered so far and the
/// failure in `stop`.
pub async fn walk_year(client: &GameApiClient, year: i32, config: &FetchConfig) -> YearReport {
    let mut records = Vec::new();
    let mut pages_fetched = 0u32;
    let mut page = 1u32;

    let stop = loop {
        match client.fetch_page(year, page).await {
            Ok(fetched) => {
                pages_fetched += 1;
                let count = fetched.records.len();
                records.extend(fetched.records);
                tracing::debug!("Year {} page {}: {} records", year, page, count);

                if !fetched.has_more {
                    break StopReason::Exhausted;
                }

                if page >= config.max_pages {
                    tracing::info!(
                        "Year {} reached the {} page ceiling, remaining pages skipped",
                        year,
                        config.max_pages
                    );
                    break StopReason::PageLimit;
                }

                page += 1;
                tokio::time::sleep(config.politeness_delay()).await;
            }
            Err(error) => {
                tracing::error!("Error for year {}, page {}: {}", year, page, error);
                break StopReason::Failed { page, error };
            }
        }
    };

    YearReport {
        year,
        records,
        pages_fetched,
        stop,
    }
}
