//! Labels assigned to message text by coders or classifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether a label came from a person or a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginType {
    Manual,
    Automatic,
}

/// Producer of a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(rename = "OriginID")]
    pub origin_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "OriginType")]
    pub origin_type: OriginType,
    #[serde(rename = "Metadata", default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// A classification of one piece of text under one coding scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "SchemeID")]
    pub scheme_id: String,
    #[serde(rename = "CodeID")]
    pub code_id: String,
    #[serde(rename = "Checked", default)]
    pub checked: bool,
    #[serde(rename = "Confidence", default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(rename = "DateTimeUTC")]
    pub date_time_utc: DateTime<Utc>,
    #[serde(rename = "Origin")]
    pub origin: Origin,
}

impl Label {
    /// Placeholder label for text nobody has coded yet
    pub fn not_reviewed(
        scheme_id: impl Into<String>,
        code_id: impl Into<String>,
        actor: impl Into<String>,
        date_time_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            scheme_id: scheme_id.into(),
            code_id: code_id.into(),
            checked: false,
            confidence: None,
            date_time_utc,
            origin: Origin {
                origin_id: actor.into(),
                name: env!("CARGO_PKG_NAME").to_string(),
                origin_type: OriginType::Automatic,
                metadata: Map::new(),
            },
        }
    }
}

/// One entry of a coding file: a message and every label it has received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLabels {
    #[serde(rename = "MessageID")]
    pub message_id: String,
    #[serde(rename = "Text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "CreationDateTimeUTC", default, skip_serializing_if = "Option::is_none")]
    pub creation_date_time_utc: Option<DateTime<Utc>>,
    #[serde(rename = "Labels", default)]
    pub labels: Vec<Label>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_uses_coding_tool_field_names() {
        let value = json!({
            "SchemeID": "Scheme-gender",
            "CodeID": "code-female",
            "Checked": true,
            "Confidence": 1.0,
            "DateTimeUTC": "2018-11-02T10:00:00Z",
            "Origin": {
                "OriginID": "coder@example.org",
                "Name": "Coder",
                "OriginType": "Manual"
            }
        });

        let label: Label = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(label.code_id, "code-female");
        assert_eq!(label.origin.origin_type, OriginType::Manual);
        assert_eq!(serde_json::to_value(&label).unwrap(), value);
    }

    #[test]
    fn coding_entry_tolerates_missing_optional_fields() {
        let entry: MessageLabels = serde_json::from_value(json!({"MessageID": "abc"})).unwrap();
        assert!(entry.labels.is_empty());
        assert!(entry.text.is_none());
    }
}
