//! JSON sink

use crate::output::traits::{ensure_parent, OutputResult, RecordSink};
use crate::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes records as one pretty-printed JSON array
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl RecordSink for JsonSink {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, records: &[Record], path: &Path) -> OutputResult<()> {
        ensure_parent(path)?;
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
