//! Automatic coding of short survey answers from a lookup table

use super::label::{Label, Origin, OriginType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::collections::BTreeMap;

/// OriginID on labels assigned by an [`AnswerCleaner`]
pub const AUTO_CODE_ORIGIN: &str = "survey-pipeline.auto-code";

/// Maps normalised answer text to a code of one scheme.
///
/// Table entries are matched first. If none matches and `numeric` is set, the
/// first whole number in the answer is coded when it falls in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCleaner {
    pub scheme_id: String,
    /// Normalised answer text to CodeID
    #[serde(default)]
    pub codes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericCodes>,
}

/// Codes whole numbers in `min..=max` as `code-{n}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericCodes {
    pub min: u32,
    pub max: u32,
}

impl AnswerCleaner {
    pub fn new(scheme_id: impl Into<String>) -> Self {
        Self {
            scheme_id: scheme_id.into(),
            codes: BTreeMap::new(),
            numeric: None,
        }
    }

    pub fn with_codes<'a>(mut self, code_id: &str, answers: impl IntoIterator<Item = &'a str>) -> Self {
        for answer in answers {
            self.codes.insert(normalise(answer), code_id.to_string());
        }
        self
    }

    pub fn with_numeric(mut self, min: u32, max: u32) -> Self {
        self.numeric = Some(NumericCodes { min, max });
        self
    }

    /// CodeID for an answer, if the cleaner recognises it
    pub fn clean(&self, answer: &str) -> Option<String> {
        let key = normalise(answer);
        if let Some(code) = self.codes.get(&key) {
            return Some(code.clone());
        }
        let range = self.numeric?;
        let n: u32 = first_number(&key)?.parse().ok()?;
        (range.min..=range.max).contains(&n).then(|| format!("code-{}", n))
    }

    /// Automatic label for an answer, dated `at`
    pub fn label(&self, answer: &str, at: DateTime<Utc>) -> Option<Label> {
        let code_id = self.clean(answer)?;
        Some(Label {
            scheme_id: self.scheme_id.clone(),
            code_id,
            checked: false,
            confidence: None,
            date_time_utc: at,
            origin: Origin {
                origin_id: AUTO_CODE_ORIGIN.to_string(),
                name: "Answer cleaner".to_string(),
                origin_type: OriginType::Automatic,
                metadata: Map::new(),
            },
        })
    }
}

/// Lowercase, trim, and collapse runs of whitespace and punctuation to one space
fn normalise(answer: &str) -> String {
    answer
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '-'))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_number(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    Some(&rest[..end])
}
