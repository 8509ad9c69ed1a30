//! JSON import/export of record collections with history

use super::{create_writer, open_reader};
use crate::error::{PipelineError, PipelineResult};
use crate::record::{Provenance, Record};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;

/// Import a JSON array of serialized records.
///
/// Fields not backed by a history entry are attributed to `user`.
pub fn import_json(reader: impl Read, user: &str) -> PipelineResult<Vec<Record>> {
    let items: Vec<Value> = serde_json::from_reader(reader)?;
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(object) => Record::from_json_object(object, Provenance::here(user)),
            other => Err(PipelineError::InvalidRecord(format!(
                "element {} is not an object: {}",
                i,
                type_name(&other)
            ))),
        })
        .collect()
}

/// Export records as a JSON array, each with its full history
pub fn export_json(writer: impl Write, records: &[Record], pretty: bool) -> PipelineResult<()> {
    if pretty {
        serde_json::to_writer_pretty(writer, records)?;
    } else {
        serde_json::to_writer(writer, records)?;
    }
    Ok(())
}

pub fn read_records(path: &Path, user: &str) -> PipelineResult<Vec<Record>> {
    let records = import_json(open_reader(path)?, user)?;
    tracing::info!(path = %path.display(), records = records.len(), "loaded records");
    Ok(records)
}

pub fn write_records(path: &Path, records: &[Record]) -> PipelineResult<()> {
    let mut writer = create_writer(path)?;
    export_json(&mut writer, records, true)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), records = records.len(), "wrote records");
    Ok(())
}

/// Read any JSON document
pub fn read_json<T: DeserializeOwned>(path: &Path) -> PipelineResult<T> {
    Ok(serde_json::from_reader(open_reader(path)?)?)
}

/// Write any value as pretty JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PipelineResult<()> {
    let mut writer = create_writer(path)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<Record> {
        let mut a = Record::new();
        a.set("avf_phone_id", "p1", Provenance::here("alice")).unwrap();
        a.set("age", 30, Provenance::here("alice")).unwrap();
        a.set("note", Value::Null, Provenance::here("bob")).unwrap();
        a.set("age", 31, Provenance::here("bob")).unwrap();

        let mut b = Record::new();
        b.set("survey", json!({"q1": "yes", "q2": [1, 2]}), Provenance::here("alice")).unwrap();
        vec![a, b]
    }

    #[test]
    fn export_then_import_preserves_current_values() {
        let records = sample();
        let mut buf = Vec::new();
        export_json(&mut buf, &records, true).unwrap();

        let back = import_json(buf.as_slice(), "carol").unwrap();

        assert_eq!(back, records);
        for (orig, restored) in records.iter().zip(&back) {
            assert_eq!(orig.keys(), restored.keys());
            assert_eq!(orig.history_len(), restored.history_len());
        }
        assert_eq!(back[0].get("note").unwrap(), &Value::Null);
    }

    #[test]
    fn raw_export_is_attributed_to_importing_user() {
        let text = json!([{"avf_phone_id": "p1"}]).to_string();
        let records = import_json(text.as_bytes(), "carol").unwrap();
        assert_eq!(records[0].history()[0].provenance.actor, "carol");
    }

    #[test]
    fn non_object_elements_are_rejected() {
        let err = import_json("[1]".as_bytes(), "carol").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRecord(msg) if msg.contains("number")));
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/records.json");

        write_records(&path, &sample()).unwrap();
        let back = read_records(&path, "carol").unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn reading_missing_file_names_the_path() {
        let err = read_records(Path::new("/nonexistent/records.json"), "carol").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/records.json"));
    }
}
