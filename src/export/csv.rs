//! CSV export of selected record columns

use super::create_writer;
use crate::error::PipelineResult;
use crate::record::Record;
use serde_json::Value;
use std::io::Write;
use std::path::Path;

/// Render one value as a CSV cell. Objects and arrays are written as JSON.
pub fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Write a header row followed by one row per record.
///
/// Columns are exactly `headers`, in order. Missing fields become empty
/// cells; fields outside `headers` are omitted.
pub fn export_csv<H: AsRef<str>>(writer: impl Write, records: &[Record], headers: &[H]) -> PipelineResult<()> {
    let mut csv = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::CRLF)
        .from_writer(writer);

    csv.write_record(headers.iter().map(|h| h.as_ref()))?;
    for record in records {
        csv.write_record(headers.iter().map(|h| render_cell(record.get_opt(h.as_ref()))))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_csv<H: AsRef<str>>(path: &Path, records: &[Record], headers: &[H]) -> PipelineResult<()> {
    let writer = create_writer(path)?;
    export_csv(writer, records, headers)?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote csv");
    Ok(())
}
