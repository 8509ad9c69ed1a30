//! Building coding files for manual labelling

use super::label::{Label, MessageLabels};
use super::merge::LabelDataset;
use super::message_id::message_id;
use crate::error::PipelineResult;
use crate::record::Record;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Which record fields feed a coding file
#[derive(Debug, Clone, Copy)]
pub struct CodingColumns<'a> {
    /// Text to be coded
    pub text_key: &'a str,
    /// Field holding the text's message id, if already computed
    pub message_id_key: &'a str,
    /// RFC 3339 timestamp of the message, if any
    pub created_key: Option<&'a str>,
    /// Array of labels already attached to the record, if any
    pub labels_key: Option<&'a str>,
}

/// One coding entry per distinct message id, in record order.
///
/// Records without the text field are skipped. Labels already given to a
/// message in `previous` are carried over so coders keep their work. Messages
/// with no previous labels take the labels stored under `labels_key`.
pub fn messages_for_coding(
    records: &[Record],
    columns: CodingColumns<'_>,
    previous: &LabelDataset,
) -> PipelineResult<Vec<MessageLabels>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for record in records {
        if !record.contains_key(columns.text_key) {
            continue;
        }
        let text = record.get_str(columns.text_key)?;
        let id = match record.get_opt(columns.message_id_key).and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => message_id(text),
        };
        if !seen.insert(id.clone()) {
            continue;
        }

        let created = match columns.created_key.and_then(|k| record.get_opt(k)).and_then(|v| v.as_str()) {
            Some(s) => Some(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc)),
            None => None,
        };

        let carried = previous.labels(&id);
        let labels = match columns.labels_key.and_then(|k| record.get_opt(k)) {
            Some(attached) if carried.is_empty() => serde_json::from_value::<Vec<Label>>(attached.clone())?,
            _ => carried.to_vec(),
        };

        entries.push(MessageLabels {
            labels,
            message_id: id,
            text: Some(text.to_string()),
            creation_date_time_utc: created,
        });
    }

    tracing::debug!(text_key = columns.text_key, messages = entries.len(), "built coding entries");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::OriginType;
    use crate::record::Provenance;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        Record::from_json_object(value.as_object().unwrap().clone(), Provenance::here("test")).unwrap()
    }

    fn columns() -> CodingColumns<'static> {
        CodingColumns {
            text_key: "text",
            message_id_key: "text MessageID",
            created_key: Some("time"),
            labels_key: Some("text Labels"),
        }
    }

    fn label(code_id: &str, origin_type: &str) -> Value {
        json!({
            "SchemeID": "s", "CodeID": code_id, "Checked": false,
            "DateTimeUTC": "2018-11-01T00:00:00Z",
            "Origin": {"OriginID": "o", "Name": "n", "OriginType": origin_type}
        })
    }

    #[test]
    fn duplicate_texts_collapse_to_one_entry() {
        let records = vec![
            record(json!({"text": "yes", "time": "2018-10-20T10:00:00Z"})),
            record(json!({"text": "no"})),
            record(json!({"text": "yes"})),
            record(json!({"other": "x"})),
        ];

        let entries = messages_for_coding(&records, columns(), &LabelDataset::new()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message_id, message_id("yes"));
        assert_eq!(entries[0].text.as_deref(), Some("yes"));
        assert!(entries[0].creation_date_time_utc.is_some());
        assert!(entries[1].creation_date_time_utc.is_none());
    }

    #[test]
    fn previous_labels_are_carried_over() {
        let previous = LabelDataset::from_entries(
            serde_json::from_value::<Vec<MessageLabels>>(
                json!([{
                    "MessageID": message_id("yes"),
                    "Labels": [{
                        "SchemeID": "s", "CodeID": "c", "Checked": true,
                        "DateTimeUTC": "2018-11-01T00:00:00Z",
                        "Origin": {"OriginID": "o", "Name": "n", "OriginType": "Manual"}
                    }]
                }]),
            )
            .unwrap(),
        );
        let records = vec![record(json!({"text": "yes"}))];

        let entries = messages_for_coding(&records, columns(), &previous).unwrap();
        assert_eq!(entries[0].labels.len(), 1);
        assert_eq!(entries[0].labels[0].code_id, "c");
    }

    #[test]
    fn attached_labels_fill_messages_without_previous_labels() {
        let records = vec![
            record(json!({"text": "female", "text Labels": [label("code-female", "Automatic")]})),
            record(json!({"text": "no"})),
        ];

        let entries = messages_for_coding(&records, columns(), &LabelDataset::new()).unwrap();
        assert_eq!(entries[0].labels.len(), 1);
        assert_eq!(entries[0].labels[0].origin.origin_type, OriginType::Automatic);
        assert!(entries[1].labels.is_empty());
    }

    #[test]
    fn previous_labels_take_precedence_over_attached() {
        let previous = LabelDataset::from_entries([MessageLabels {
            message_id: message_id("female"),
            text: None,
            creation_date_time_utc: None,
            labels: vec![serde_json::from_value(label("code-male", "Manual")).unwrap()],
        }]);
        let records = vec![record(json!({"text": "female", "text Labels": [label("code-female", "Automatic")]}))];

        let entries = messages_for_coding(&records, columns(), &previous).unwrap();
        assert_eq!(entries[0].labels.len(), 1);
        assert_eq!(entries[0].labels[0].code_id, "code-male");
        assert_eq!(entries[0].labels[0].origin.origin_type, OriginType::Manual);
    }

    #[test]
    fn malformed_attached_labels_are_an_error() {
        let records = vec![record(json!({"text": "yes", "text Labels": "code-yes"}))];
        assert!(messages_for_coding(&records, columns(), &LabelDataset::new()).is_err());
    }

    #[test]
    fn unparseable_timestamp_is_an_error() {
        let records = vec![record(json!({"text": "yes", "time": "yesterday"}))];
        assert!(messages_for_coding(&records, columns(), &LabelDataset::new()).is_err());
    }
}
