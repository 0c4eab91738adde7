//! Run statistics
//!
//! Summarizes a finished harvest for the log and for the command line.

use crate::harvest::HarvestReport;

/// Headline numbers of one harvest
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub start_year: i32,
    pub end_year: i32,

    /// Records in the aggregate
    pub total_records: usize,

    /// Years submitted
    pub years_total: usize,

    /// Years that returned without a page failure
    pub years_succeeded: usize,

    /// Years that stopped on a failing page but kept earlier pages
    pub years_partial: usize,

    /// Years whose job broke and contributed nothing
    pub years_failed: usize,

    pub elapsed_seconds: f64,
    pub records_per_second: f64,
}

impl RunStatistics {
    pub fn from_report(report: &HarvestReport) -> Self {
        Self {
            start_year: report.start_year,
            end_year: report.end_year,
            total_records: report.records.len(),
            years_total: report.years.len(),
            years_succeeded: report.succeeded(),
            years_partial: report.partial(),
            years_failed: report.failed(),
            elapsed_seconds: report.elapsed.as_secs_f64(),
            records_per_second: report.records_per_second(),
        }
    }
}

/// Emits the statistics as info events
pub fn log_statistics(stats: &RunStatistics) {
    tracing::info!("Download finished");
    tracing::info!("Collected {} games", stats.total_records);
    tracing::info!("Time spent: {:.1} seconds", stats.elapsed_seconds);
    tracing::info!("Speed: {:.1} games/second", stats.records_per_second);
    if stats.years_partial > 0 || stats.years_failed > 0 {
        tracing::warn!(
            "{} of {} years incomplete ({} partial, {} failed)",
            stats.years_partial + stats.years_failed,
            stats.years_total,
            stats.years_partial,
            stats.years_failed
        );
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Harvest {}-{} ===\n", stats.start_year, stats.end_year);

    println!("Years:");
    println!("  Submitted: {}", stats.years_total);
    println!("  Complete: {}", stats.years_succeeded);
    println!("  Partial: {}", stats.years_partial);
    println!("  Failed: {}", stats.years_failed);
    println!();

    println!("Games collected: {}", stats.total_records);
    println!(
        "Time spent: {:.1}s ({:.1} games/second)",
        stats.elapsed_seconds, stats.records_per_second
    );
}
