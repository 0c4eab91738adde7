//! Sink trait and output errors

use crate::Record;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while persisting records
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Persists the aggregate of a harvest
///
/// Implementations must be usable from any task, and must create or
/// overwrite the file at `path`.
pub trait RecordSink: Send + Sync {
    /// File extension (without the dot) of the files this sink writes
    fn extension(&self) -> &'static str;

    /// Writes all records to `path`
    ///
    /// # Arguments
    ///
    /// * `records` - The records to persist, in aggregate order
    /// * `path` - Destination file; parent directories are created
    fn write(&self, records: &[Record], path: &Path) -> OutputResult<()>;
}

/// Creates the parent directory of `path` when it is missing
pub(crate) fn ensure_parent(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
