//! Fan-out coordinator
//!
//! Runs one year walk per year of the requested range with a bounded number
//! of walks in flight, and merges the results in the order the years finish.

use crate::config::{FetchConfig, YearRange};
use crate::harvest::fetcher::GameApiClient;
use crate::harvest::walker::{walk_year, StopReason, YearReport};
use crate::{HarvestError, Record};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::instrument::WithSubscriber;

/// What a finished year contributed to the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearSummary {
    pub year: i32,
    pub record_count: usize,
    pub pages_fetched: u32,
    pub stop: StopReason,
}

/// Terminal state of one year job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearOutcome {
    /// The walk returned; its records are part of the aggregate. A walk that
    /// stopped on a failing page is still `Succeeded` and reports the failure
    /// in `stop`.
    Succeeded(YearSummary),

    /// The job itself broke (panic, cancelled); nothing was merged
    Failed { year: i32, reason: String },
}

impl YearOutcome {
    pub fn year(&self) -> i32 {
        match self {
            YearOutcome::Succeeded(summary) => summary.year,
            YearOutcome::Failed { year, .. } => *year,
        }
    }

    /// True for a returned walk that ended on a failing page
    pub fn is_partial(&self) -> bool {
        matches!(self, YearOutcome::Succeeded(summary) if summary.stop.is_failure())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, YearOutcome::Failed { .. })
    }
}

/// Aggregate result of a harvest
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub start_year: i32,
    pub end_year: i32,

    /// Records of every returned year, years in completion order
    pub records: Vec<Record>,

    /// One outcome per submitted year, in completion order
    pub years: Vec<YearOutcome>,

    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl HarvestReport {
    /// Years whose walk returned without a page failure
    pub fn succeeded(&self) -> usize {
        self.years
            .iter()
            .filter(|o| !o.is_failed() && !o.is_partial())
            .count()
    }

    /// Years whose walk stopped on a failing page
    pub fn partial(&self) -> usize {
        self.years.iter().filter(|o| o.is_partial()).count()
    }

    /// Years whose job broke before returning
    pub fn failed(&self) -> usize {
        self.years.iter().filter(|o| o.is_failed()).count()
    }

    pub fn outcome_for(&self, year: i32) -> Option<&YearOutcome> {
        self.years.iter().find(|o| o.year() == year)
    }

    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.records.len() as f64 / secs
    }
}

/// Fans year walks out over a bounded set of concurrent tasks
pub struct Coordinator {
    client: Arc<GameApiClient>,
    config: Arc<FetchConfig>,
}

impl Coordinator {
    pub fn new(client: GameApiClient, config: FetchConfig) -> Self {
        Self {
            client: Arc::new(client),
            config: Arc::new(config),
        }
    }

    /// Harvests every year of `years`
    ///
    /// Never fails: broken years are logged and reported as
    /// [`YearOutcome::Failed`], the others are merged as they complete.
    pub async fn run(&self, years: YearRange) -> HarvestReport {
        let client = Arc::clone(&self.client);
        let config = Arc::clone(&self.config);

        run_year_jobs(years, self.config.concurrency as usize, move |year| {
            let client = Arc::clone(&client);
            let config = Arc::clone(&config);
            async move { walk_year(&client, year, &config).await }
        })
        .await
    }
}

/// Runs `job` once per year with at most `concurrency` jobs in flight
///
/// Each job runs on its own task under the caller's subscriber. Completions
/// are consumed in completion order by this function alone, so the aggregate
/// has a single writer.
pub(crate) async fn run_year_jobs<F, Fut>(
    years: YearRange,
    concurrency: usize,
    job: F,
) -> HarvestReport
where
    F: Fn(i32) -> Fut,
    Fut: Future<Output = YearReport> + Send + 'static,
{
    let started_at = Utc::now();
    let start_time = Instant::now();
    let total = years.len();

    tracing::info!(
        "Starting download for years {}-{}",
        years.start,
        years.end
    );
    tracing::info!("Years to fetch: {}", total);

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut task_years = HashMap::with_capacity(total);

    for year in years.iter() {
        let semaphore = Arc::clone(&semaphore);
        let walk = job(year);
        let handle = tasks.spawn(
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| HarvestError::Task {
                        year,
                        message: e.to_string(),
                    })?;
                Ok::<_, HarvestError>(walk.await)
            }
            .with_current_subscriber(),
        );
        task_years.insert(handle.id(), year);
    }

    let mut records = Vec::new();
    let mut outcomes = Vec::with_capacity(total);
    let mut completed = 0usize;

    while let Some(joined) = tasks.join_next_with_id().await {
        completed += 1;

        let (year, result) = match joined {
            Ok((id, result)) => (task_years.remove(&id), result.map_err(|e| e.to_string())),
            Err(join_error) => (
                task_years.remove(&join_error.id()),
                Err(join_error.to_string()),
            ),
        };

        let Some(year) = year else {
            tracing::error!("Untracked year task finished | Progress: {}/{}", completed, total);
            continue;
        };

        match result {
            Ok(report) => {
                let summary = YearSummary {
                    year: report.year,
                    record_count: report.records.len(),
                    pages_fetched: report.pages_fetched,
                    stop: report.stop,
                };

                match &summary.stop {
                    StopReason::Failed { page, error } => tracing::warn!(
                        "Partial result for year {}: {} games, stopped at page {} ({}) | Progress: {}/{}",
                        year,
                        summary.record_count,
                        page,
                        error,
                        completed,
                        total
                    ),
                    _ => tracing::info!(
                        "Year {} done: {} games | Progress: {}/{}",
                        year,
                        summary.record_count,
                        completed,
                        total
                    ),
                }

                records.extend(report.records);
                outcomes.push(YearOutcome::Succeeded(summary));
            }
            Err(reason) => {
                tracing::error!(
                    "Error for year {}: {} | Progress: {}/{}",
                    year,
                    reason,
                    completed,
                    total
                );
                outcomes.push(YearOutcome::Failed { year, reason });
            }
        }
    }

    let report = HarvestReport {
        start_year: years.start,
        end_year: years.end,
        records,
        years: outcomes,
        started_at,
        elapsed: start_time.elapsed(),
    };

    tracing::info!(
        "Harvest finished: {} games from {} years ({} partial, {} failed) in {:.1}s",
        report.records.len(),
        report.years.len(),
        report.partial(),
        report.failed(),
        report.elapsed.as_secs_f64()
    );

    report
}
