//! Harvest module: fetching game records year by year
//!
//! This module contains the core harvesting logic, including:
//! - HTTP page fetching with 502 backoff
//! - Walking the pages of a single year
//! - Fanning years out over a bounded number of concurrent tasks
//! - Wiring configuration, logging and the result sink together

mod coordinator;
mod fetcher;
mod walker;

pub use coordinator::{Coordinator, HarvestReport, YearOutcome, YearSummary};
pub use fetcher::{build_http_client, date_range, GameApiClient, Page, RetryPolicy};
pub use walker::{walk_year, StopReason, YearReport};

use crate::config::{require_api_key, validate, Config};
use crate::logging::{LogContext, Verbosity};
use crate::output::{self, log_statistics, RecordSink, RunStatistics};
use crate::HarvestError;
use std::path::PathBuf;
use tracing::instrument::WithSubscriber;

/// Result of a complete run: the aggregate plus where it was written
#[derive(Debug, Clone)]
pub struct HarvestRun {
    pub report: HarvestReport,
    pub statistics: RunStatistics,
    pub output_path: PathBuf,
}

/// A configured harvest: API client, coordinator, log context and sink
///
/// Every event of a run goes to this harvester's own log context; nothing is
/// installed as the global subscriber.
pub struct Harvester {
    config: Config,
    coordinator: Coordinator,
    log: LogContext,
    sink: Box<dyn RecordSink>,
}

impl Harvester {
    /// Creates a harvester, opening (and truncating) its log file
    ///
    /// The configuration and API key are checked first; the previous log is
    /// left alone when either is unusable.
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration, missing API key, or the
    ///   log file could not be created
    pub fn new(config: Config, verbosity: Verbosity) -> Result<Self, HarvestError> {
        validate(&config)?;
        require_api_key(&config)?;
        let log = LogContext::new(&config.logging, verbosity)?;
        Self::assemble(config, log)
    }

    /// Creates a harvester that logs through an existing context
    pub fn with_log_context(config: Config, log: LogContext) -> Result<Self, HarvestError> {
        validate(&config)?;
        Self::assemble(config, log)
    }

    fn assemble(config: Config, log: LogContext) -> Result<Self, HarvestError> {
        let client = GameApiClient::new(&config)?;
        let coordinator = Coordinator::new(client, config.fetch.clone());
        let sink = output::sink_for(&config.output);

        Ok(Self {
            config,
            coordinator,
            log,
            sink,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Where this harvester writes its result file
    pub fn output_path(&self) -> PathBuf {
        output::output_path(
            &self.config.output,
            self.sink.as_ref(),
            self.config.years.start,
            self.config.years.end,
        )
    }

    /// Fetches all configured years without writing anything
    pub async fn harvest(&self) -> HarvestReport {
        self.coordinator
            .run(self.config.years)
            .with_subscriber(self.log.dispatch().clone())
            .await
    }

    /// Fetches all configured years and writes the result file
    ///
    /// Year failures do not fail the run; only writing the output can.
    pub async fn run(&self) -> Result<HarvestRun, HarvestError> {
        async {
            tracing::info!("Starting data download");
            let report = self.coordinator.run(self.config.years).await;

            let statistics = RunStatistics::from_report(&report);
            log_statistics(&statistics);

            let output_path = self.output_path();
            if let Err(e) = self.sink.write(&report.records, &output_path) {
                tracing::error!("Failed to write {}: {}", output_path.display(), e);
                return Err(HarvestError::from(e));
            }
            tracing::info!("Data saved to file: {}", output_path.display());

            Ok::<_, HarvestError>(HarvestRun {
                report,
                statistics,
                output_path,
            })
        }
        .with_subscriber(self.log.dispatch().clone())
        .await
    }
}
