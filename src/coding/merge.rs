//! Content-hash label merger
//!
//! Externally produced labels are keyed by [`message_id`] of the coded text.
//! The merger hashes each record's text, looks the id up in a
//! [`LabelDataset`], and attaches the newest label per scheme, falling back to
//! the scheme's not-reviewed code.

use super::label::{Label, MessageLabels};
use super::message_id::message_id;
use super::scheme::CodeScheme;
use crate::error::{PipelineError, PipelineResult};
use crate::record::{Provenance, Record};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// Labels from a coding file, indexed by message id
#[derive(Debug, Clone, Default)]
pub struct LabelDataset {
    labels: HashMap<String, Vec<Label>>,
}

impl LabelDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = MessageLabels>) -> Self {
        let mut labels: HashMap<String, Vec<Label>> = HashMap::new();
        for entry in entries {
            labels.entry(entry.message_id).or_default().extend(entry.labels);
        }
        Self { labels }
    }

    /// Every label for a message, in file order
    pub fn labels(&self, message_id: &str) -> &[Label] {
        self.labels.get(message_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Newest label for a message under one scheme. Ties go to the label
    /// listed first, as coding files list labels newest first.
    pub fn latest(&self, message_id: &str, scheme_id: &str) -> Option<&Label> {
        self.labels(message_id)
            .iter()
            .filter(|l| l.scheme_id == scheme_id)
            .fold(None, |best: Option<&Label>, label| match best {
                Some(b) if b.date_time_utc >= label.date_time_utc => Some(b),
                _ => Some(label),
            })
    }

    pub fn message_count(&self) -> usize {
        self.labels.len()
    }
}

/// Where one scheme's label is stored on a record
#[derive(Debug, Clone)]
pub struct SchemeTarget {
    pub destination: String,
    pub scheme: CodeScheme,
}

impl SchemeTarget {
    pub fn new(destination: impl Into<String>, scheme: CodeScheme) -> Self {
        Self {
            destination: destination.into(),
            scheme,
        }
    }
}

/// Counts of what a merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Labels attached from the dataset
    pub labelled: usize,
    /// Not-reviewed placeholders attached
    pub placeholders: usize,
    /// Records without the text field
    pub skipped: usize,
}

/// Attaches labels from a [`LabelDataset`] onto records
#[derive(Debug, Clone)]
pub struct LabelMerger<'a> {
    dataset: &'a LabelDataset,
    actor: String,
}

impl<'a> LabelMerger<'a> {
    pub fn new(dataset: &'a LabelDataset, actor: impl Into<String>) -> Self {
        Self {
            dataset,
            actor: actor.into(),
        }
    }

    /// Label every record carrying `text_key`.
    ///
    /// Each such record gets `message_id_key` set to the hash of its text and,
    /// for every target, the newest dataset label for that scheme. An existing
    /// label is only replaced by a strictly newer one, or when it is the
    /// not-reviewed placeholder. Records without a label get the placeholder.
    /// Running the merge again with the same dataset changes nothing.
    pub fn apply(
        &self,
        records: &mut [Record],
        text_key: &str,
        message_id_key: &str,
        targets: &[SchemeTarget],
    ) -> PipelineResult<MergeStats> {
        let not_reviewed = targets
            .iter()
            .map(|t| t.scheme.not_reviewed_code().map(|c| c.code_id.clone()))
            .collect::<PipelineResult<Vec<_>>>()?;

        let ids = records
            .iter()
            .map(|r| match r.get_opt(text_key) {
                None => Ok(None),
                Some(Value::String(text)) => Ok(Some(message_id(text))),
                Some(_) => Err(PipelineError::TypeMismatch {
                    key: text_key.to_string(),
                    expected: "string",
                }),
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let mut stats = MergeStats::default();
        for (record, id) in records.iter_mut().zip(ids) {
            let Some(id) = id else {
                stats.skipped += 1;
                continue;
            };

            if record.get_opt(message_id_key).and_then(Value::as_str) != Some(id.as_str()) {
                record.set(message_id_key, id.clone(), Provenance::here(self.actor.clone()))?;
            }

            for (target, nr_code) in targets.iter().zip(&not_reviewed) {
                let existing = existing_label(record, &target.destination);
                match self.dataset.latest(&id, &target.scheme.scheme_id) {
                    Some(label) => {
                        let replace = match &existing {
                            None => true,
                            Some(current) if current == label => false,
                            Some(current) => {
                                current.code_id == *nr_code || label.date_time_utc > current.date_time_utc
                            }
                        };
                        if replace {
                            let mut provenance = Provenance::here(label.origin.origin_id.clone());
                            provenance.timestamp = label.date_time_utc;
                            record.set(target.destination.clone(), serde_json::to_value(label)?, provenance)?;
                            stats.labelled += 1;
                        }
                    }
                    None if !record.contains_key(&target.destination) => {
                        let placeholder = Label::not_reviewed(
                            target.scheme.scheme_id.clone(),
                            nr_code.clone(),
                            self.actor.clone(),
                            Utc::now(),
                        );
                        record.set(
                            target.destination.clone(),
                            serde_json::to_value(&placeholder)?,
                            Provenance::here(self.actor.clone()),
                        )?;
                        stats.placeholders += 1;
                    }
                    None => {}
                }
            }
        }

        tracing::info!(
            text_key,
            labelled = stats.labelled,
            placeholders = stats.placeholders,
            skipped = stats.skipped,
            "merged labels"
        );
        Ok(stats)
    }
}

/// The label currently stored at `destination`, if it parses as one
fn existing_label(record: &Record, destination: &str) -> Option<Label> {
    record
        .get_opt(destination)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Timestamp of the newest label in a dataset, if any
pub fn newest_label_time(dataset: &LabelDataset) -> Option<DateTime<Utc>> {
    dataset
        .labels
        .values()
        .flatten()
        .map(|l| l.date_time_utc)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scheme() -> CodeScheme {
        serde_json::from_value(json!({
            "SchemeID": "Scheme-gender",
            "Codes": [
                {"CodeID": "code-male", "DisplayText": "male", "NumericValue": 1},
                {"CodeID": "code-female", "DisplayText": "female", "NumericValue": 2},
                {"CodeID": "code-NR", "DisplayText": "NR", "NumericValue": -10, "ControlCode": "NR"}
            ]
        }))
        .unwrap()
    }

    fn label(code: &str, at: &str) -> Value {
        json!({
            "SchemeID": "Scheme-gender",
            "CodeID": code,
            "Checked": true,
            "DateTimeUTC": at,
            "Origin": {"OriginID": "coder-1", "Name": "Coder", "OriginType": "Manual"}
        })
    }

    fn dataset(entries: Value) -> LabelDataset {
        LabelDataset::from_entries(serde_json::from_value::<Vec<MessageLabels>>(entries).unwrap())
    }

    fn record(value: Value) -> Record {
        Record::from_json_object(value.as_object().unwrap().clone(), Provenance::here("test")).unwrap()
    }

    fn targets() -> Vec<SchemeTarget> {
        vec![SchemeTarget::new("gender_coded", scheme())]
    }

    #[test]
    fn newest_label_per_scheme_wins() {
        let ds = dataset(json!([{
            "MessageID": message_id("f"),
            "Labels": [label("code-female", "2018-11-02T10:00:00Z"), label("code-male", "2018-11-01T10:00:00Z")]
        }]));
        let mut records = vec![record(json!({"gender_raw": "f"}))];

        let stats = LabelMerger::new(&ds, "alice")
            .apply(&mut records, "gender_raw", "gender_raw MessageID", &targets())
            .unwrap();

        assert_eq!(stats.labelled, 1);
        let r = &records[0];
        assert_eq!(r.get_str("gender_raw MessageID").unwrap(), message_id("f"));
        assert_eq!(r.get("gender_coded").unwrap()["CodeID"], json!("code-female"));
        let last = r.history().last().copied().unwrap();
        assert_eq!(last.provenance.actor, "coder-1");
    }

    #[test]
    fn unlabelled_text_gets_not_reviewed_placeholder() {
        let ds = LabelDataset::new();
        let mut records = vec![record(json!({"gender_raw": "?"}))];

        let stats = LabelMerger::new(&ds, "alice")
            .apply(&mut records, "gender_raw", "gender_raw MessageID", &targets())
            .unwrap();

        assert_eq!(stats.placeholders, 1);
        let coded = records[0].get("gender_coded").unwrap();
        assert_eq!(coded["CodeID"], json!("code-NR"));
        assert_eq!(coded["SchemeID"], json!("Scheme-gender"));
    }

    #[test]
    fn rerun_without_new_labels_is_idempotent() {
        let ds = dataset(json!([{
            "MessageID": message_id("f"),
            "Labels": [label("code-female", "2018-11-02T10:00:00Z")]
        }]));
        let mut records = vec![record(json!({"gender_raw": "f"})), record(json!({"gender_raw": "?"}))];
        let merger = LabelMerger::new(&ds, "alice");

        merger.apply(&mut records, "gender_raw", "gender_raw MessageID", &targets()).unwrap();
        let before: Vec<Record> = records.clone();
        let history_before: Vec<usize> = records.iter().map(Record::history_len).collect();

        let stats = merger
            .apply(&mut records, "gender_raw", "gender_raw MessageID", &targets())
            .unwrap();

        assert_eq!(stats.labelled, 0);
        assert_eq!(stats.placeholders, 0);
        assert_eq!(records, before);
        let history_after: Vec<usize> = records.iter().map(Record::history_len).collect();
        assert_eq!(history_before, history_after);
    }

    #[test]
    fn placeholder_is_replaced_once_label_arrives() {
        let mut records = vec![record(json!({"gender_raw": "f"}))];
        LabelMerger::new(&LabelDataset::new(), "alice")
            .apply(&mut records, "gender_raw", "gender_raw MessageID", &targets())
            .unwrap();

        // Coded before the placeholder was written, but still authoritative.
        let ds = dataset(json!([{
            "MessageID": message_id("f"),
            "Labels": [label("code-female", "2001-01-01T00:00:00Z")]
        }]));
        LabelMerger::new(&ds, "alice")
            .apply(&mut records, "gender_raw", "gender_raw MessageID", &targets())
            .unwrap();

        assert_eq!(records[0].get("gender_coded").unwrap()["CodeID"], json!("code-female"));
    }

    #[test]
    fn older_label_does_not_replace_newer_one() {
        let newer = dataset(json!([{
            "MessageID": message_id("f"),
            "Labels": [label("code-female", "2018-11-02T10:00:00Z")]
        }]));
        let older = dataset(json!([{
            "MessageID": message_id("f"),
            "Labels": [label("code-male", "2018-11-01T10:00:00Z")]
        }]));
        let mut records = vec![record(json!({"gender_raw": "f"}))];

        LabelMerger::new(&newer, "alice")
            .apply(&mut records, "gender_raw", "gender_raw MessageID", &targets())
            .unwrap();
        LabelMerger::new(&older, "alice")
            .apply(&mut records, "gender_raw", "gender_raw MessageID", &targets())
            .unwrap();

        assert_eq!(records[0].get("gender_coded").unwrap()["CodeID"], json!("code-female"));
    }

    #[test]
    fn records_without_text_are_kept_untouched() {
        let mut records = vec![record(json!({"other": 1}))];
        let stats = LabelMerger::new(&LabelDataset::new(), "alice")
            .apply(&mut records, "gender_raw", "gender_raw MessageID", &targets())
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(records.len(), 1);
        assert!(!records[0].contains_key("gender_coded"));
    }

    #[test]
    fn scheme_without_not_reviewed_code_fails_before_mutation() {
        let bad: CodeScheme = serde_json::from_value(json!({
            "SchemeID": "Scheme-age",
            "Codes": [{"CodeID": "code-20", "DisplayText": "20", "NumericValue": 20}]
        }))
        .unwrap();
        let mut records = vec![record(json!({"age_raw": "20"}))];

        let err = LabelMerger::new(&LabelDataset::new(), "alice")
            .apply(&mut records, "age_raw", "age_raw MessageID", &[SchemeTarget::new("age_coded", bad)])
            .unwrap_err();

        assert!(matches!(err, PipelineError::SchemeMissingControlCode { .. }));
        assert!(!records[0].contains_key("age_raw MessageID"));
    }

    #[test]
    fn newest_label_time_spans_all_messages() {
        let ds = dataset(json!([
            {"MessageID": "a", "Labels": [label("code-male", "2018-11-01T10:00:00Z")]},
            {"MessageID": "b", "Labels": [label("code-male", "2018-11-03T10:00:00Z")]}
        ]));
        assert_eq!(
            newest_label_time(&ds).unwrap().to_rfc3339(),
            "2018-11-03T10:00:00+00:00"
        );
    }
}
