//! Coding schemes: the valid codes for one survey field

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Control code marking text that has not been reviewed yet
pub const NOT_REVIEWED: &str = "NR";

/// CodeID prefix used for not-reviewed codes by schemes without control codes
const NOT_REVIEWED_PREFIX: &str = "code-NR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    #[serde(rename = "CodeID")]
    pub code_id: String,
    #[serde(rename = "DisplayText")]
    pub display_text: String,
    #[serde(rename = "NumericValue")]
    pub numeric_value: i64,
    #[serde(rename = "ControlCode", default, skip_serializing_if = "Option::is_none")]
    pub control_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeScheme {
    #[serde(rename = "SchemeID")]
    pub scheme_id: String,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Codes")]
    pub codes: Vec<Code>,
}

impl CodeScheme {
    /// Parse a scheme document: a JSON array holding one scheme, or a bare scheme object.
    pub fn from_value(value: Value) -> PipelineResult<Self> {
        let scheme = match value {
            Value::Array(mut items) if items.len() == 1 => items.remove(0),
            Value::Array(items) => {
                return Err(PipelineError::InvalidArgument(format!(
                    "scheme file must hold exactly one scheme, found {}",
                    items.len()
                )))
            }
            other => other,
        };
        Ok(serde_json::from_value(scheme)?)
    }

    pub fn code(&self, code_id: &str) -> Option<&Code> {
        self.codes.iter().find(|c| c.code_id == code_id)
    }

    pub fn control_code(&self, control: &str) -> Option<&Code> {
        self.codes
            .iter()
            .find(|c| c.control_code.as_deref() == Some(control))
    }

    /// The code used for text nobody has reviewed
    pub fn not_reviewed_code(&self) -> PipelineResult<&Code> {
        self.control_code(NOT_REVIEWED)
            .or_else(|| {
                self.codes
                    .iter()
                    .find(|c| c.code_id.starts_with(NOT_REVIEWED_PREFIX))
            })
            .ok_or_else(|| PipelineError::SchemeMissingControlCode {
                scheme_id: self.scheme_id.clone(),
                control_code: NOT_REVIEWED.to_string(),
            })
    }
}
