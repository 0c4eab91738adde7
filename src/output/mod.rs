//! Output module for persisting harvested records
//!
//! This module handles:
//! - Naming the result file of a run
//! - Writing records as CSV (schema union of all keys) or JSON
//! - Summarizing run statistics

mod csv;
mod json;
pub mod stats;
mod traits;

pub use self::csv::{columns, CsvSink};
pub use json::JsonSink;
pub use stats::{log_statistics, print_statistics, RunStatistics};
pub use traits::{OutputError, OutputResult, RecordSink};

use crate::config::{OutputConfig, OutputFormat};
use std::path::PathBuf;

/// File name of a run's result: `games_parallel_<start>_<end>.<ext>`
pub fn output_file_name(start_year: i32, end_year: i32, extension: &str) -> String {
    format!("games_parallel_{}_{}.{}", start_year, end_year, extension)
}

/// Builds the sink selected by the output configuration
pub fn sink_for(config: &OutputConfig) -> Box<dyn RecordSink> {
    match config.format {
        OutputFormat::Csv => Box::new(CsvSink::new(config.utf8_bom)),
        OutputFormat::Json => Box::new(JsonSink),
    }
}

/// Full path of a run's result file
pub fn output_path(
    config: &OutputConfig,
    sink: &dyn RecordSink,
    start_year: i32,
    end_year: i32,
) -> PathBuf {
    PathBuf::from(&config.directory).join(output_file_name(
        start_year,
        end_year,
        sink.extension(),
    ))
}
