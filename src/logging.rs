//! Logging context
//!
//! Builds a `tracing` dispatcher that writes to the configured log file (and
//! optionally stderr). The dispatcher is handed to whoever runs a harvest
//! instead of being installed process-wide, so several harvesters can log to
//! their own files side by side.

use crate::config::LoggingConfig;
use crate::HarvestError;
use std::fs::File;
use std::path::Path;
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// How much a run logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    #[default]
    Normal,
    /// Debug events, including every page request
    Verbose,
}

impl Verbosity {
    /// Maps the `verbose`/`quiet` flag pair; `verbose` wins when both are set
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else if quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    /// Default filter directive for this verbosity
    pub fn directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "games_harvest=info,warn",
            Verbosity::Verbose => "games_harvest=debug,info",
        }
    }
}

/// A configured log sink, passed explicitly to a harvest run
///
/// Dropping the context flushes the file writer.
pub struct LogContext {
    dispatch: Dispatch,
    _guard: Option<WorkerGuard>,
}

impl std::fmt::Debug for LogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogContext")
            .field("file_backed", &self._guard.is_some())
            .finish()
    }
}

impl LogContext {
    /// Creates the log file (truncating a previous run's log) and the dispatcher
    ///
    /// `RUST_LOG` takes precedence over `verbosity` when set.
    pub fn new(config: &LoggingConfig, verbosity: Verbosity) -> Result<Self, HarvestError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

        let path = Path::new(&config.file);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true);

        let console_layer = config.console.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
        });

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            _guard: Some(guard),
        })
    }

    /// A context that discards every event
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
            _guard: None,
        }
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}
