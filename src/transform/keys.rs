//! Key-level transforms: filtering, renaming, tagging and deriving fields

use super::fold::is_truthy;
use crate::error::PipelineResult;
use crate::record::{Provenance, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Drop records flagged as test runs
pub fn drop_test_runs(records: Vec<Record>, test_run_key: &str) -> Vec<Record> {
    let before = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| !r.get_opt(test_run_key).map(is_truthy).unwrap_or(false))
        .collect();
    tracing::debug!(dropped = before - kept.len(), "dropped test runs");
    kept
}

/// Keep only records that carry `key`
pub fn retain_with_key(records: Vec<Record>, key: &str) -> Vec<Record> {
    records.into_iter().filter(|r| r.contains_key(key)).collect()
}

/// Drop records whose `key` holds exactly `value`
pub fn exclude_matching(records: Vec<Record>, key: &str, value: &Value) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| r.get_opt(key) != Some(value))
        .collect()
}

/// Set the same field on every record
pub fn set_field(records: &mut [Record], key: &str, value: &Value, actor: &str) -> PipelineResult<()> {
    for record in records {
        record.set(key, value.clone(), Provenance::here(actor))?;
    }
    Ok(())
}

/// For every key containing `from`, append a copy of its value under the key
/// with `from` replaced by `to`. Original keys are kept.
pub fn normalise_keys(records: &mut [Record], from: &str, to: &str, actor: &str) -> PipelineResult<()> {
    if from.is_empty() {
        return Ok(());
    }
    for record in records {
        let renamed: Map<String, Value> = record
            .values()
            .iter()
            .filter(|(k, _)| k.contains(from))
            .map(|(k, v)| (k.replace(from, to), v.clone()))
            .collect();
        record.append_data(renamed, Provenance::here(actor))?;
    }
    Ok(())
}

/// How one analysis field is derived from an upstream field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedKey {
    /// Field to write
    pub key: String,
    /// Field to read
    pub source: String,
    /// Read the `CodeID` of a label stored in `source` instead of the raw value
    #[serde(default)]
    pub label_code: bool,
}

impl DerivedKey {
    pub fn copy(key: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source: source.into(),
            label_code: false,
        }
    }

    pub fn label_code(key: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source: source.into(),
            label_code: true,
        }
    }

    fn resolve(&self, record: &Record) -> Option<Value> {
        let value = record.get_opt(&self.source)?;
        if self.label_code {
            value.get("CodeID").cloned()
        } else {
            Some(value.clone())
        }
    }
}

/// Append every derivable key as one event per record. Keys whose source is
/// absent stay absent.
pub fn derive_keys(records: &mut [Record], keys: &[DerivedKey], actor: &str) -> PipelineResult<()> {
    for record in records {
        let derived: Map<String, Value> = keys
            .iter()
            .filter_map(|k| k.resolve(record).map(|v| (k.key.clone(), v)))
            .collect();
        record.append_data(derived, Provenance::here(actor))?;
    }
    Ok(())
}
