//! CSV sink
//!
//! Records have no fixed schema, so the header is the union of every key seen,
//! in first-seen order, and a record lacking a column gets an empty cell.

use crate::output::traits::{ensure_parent, OutputResult, RecordSink};
use crate::Record;
use serde_json::Value;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes records as comma-separated values
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSink {
    /// Prefix the file with a UTF-8 byte order mark
    pub utf8_bom: bool,
}

impl CsvSink {
    pub fn new(utf8_bom: bool) -> Self {
        Self { utf8_bom }
    }

    /// Renders records to any writer
    ///
    /// Nothing is written for an empty record list.
    pub fn render<W: Write>(&self, records: &[Record], mut w: W) -> io::Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        if self.utf8_bom {
            w.write_all(UTF8_BOM)?;
        }

        let header = columns(records);
        write_row(&mut w, &header)?;

        let mut row = Vec::with_capacity(header.len());
        for record in records {
            row.clear();
            row.extend(header.iter().map(|column| cell(record.get(column))));
            write_row(&mut w, &row)?;
        }

        w.flush()
    }
}

impl RecordSink for CsvSink {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, records: &[Record], path: &Path) -> OutputResult<()> {
        ensure_parent(path)?;
        let file = File::create(path)?;
        self.render(records, BufWriter::new(file))?;
        Ok(())
    }
}

/// Union of all record keys, in the order they first appear
pub fn columns(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }

    columns
}

/// Text of one cell: strings verbatim, scalars via display, nested values as JSON
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(w: &mut W, row: &[String]) -> io::Result<()> {
    for (i, field) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(field) {
            write!(w, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            w.write_all(field.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}
