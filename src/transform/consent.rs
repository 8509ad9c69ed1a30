//! Consent withdrawal: detection and masking of withdrawn respondents

use super::fold::is_truthy;
use crate::error::PipelineResult;
use crate::record::{Provenance, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where consent withdrawal is read from and written to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentRules {
    /// Field set to true/false by [`determine_consent_withdrawn`]
    pub withdrawn_key: String,
    /// Code that marks a coded answer as "stop"
    pub stop_code: String,
    /// Field set by the messaging platform when a contact opts out
    pub platform_key: String,
    /// Value of `platform_key` that means the contact opted out
    pub platform_value: String,
}

impl Default for ConsentRules {
    fn default() -> Self {
        Self {
            withdrawn_key: "withdrawn_consent".into(),
            stop_code: "stop".into(),
            platform_key: "mobilisation_consent_complete".into(),
            platform_value: "yes".into(),
        }
    }
}

/// Set `withdrawn_key` on every record: true if any of `keys` holds the stop
/// code or the platform flagged the contact, false otherwise.
pub fn determine_consent_withdrawn(
    records: &mut [Record],
    keys: &[String],
    rules: &ConsentRules,
    actor: &str,
) -> PipelineResult<usize> {
    let stop = Value::String(rules.stop_code.clone());
    let platform = Value::String(rules.platform_value.clone());
    let mut withdrawn = 0;

    for record in records.iter_mut() {
        let stopped = keys
            .iter()
            .filter(|k| **k != rules.withdrawn_key)
            .any(|k| record.get_opt(k) == Some(&stop))
            || record.get_opt(&rules.platform_key) == Some(&platform);
        if stopped {
            withdrawn += 1;
        }
        record.set(rules.withdrawn_key.clone(), stopped, Provenance::here(actor))?;
    }

    tracing::info!(withdrawn, total = records.len(), "determined consent");
    Ok(withdrawn)
}

/// Overwrite every key in `keys` (other than the withdrawn flag) with the stop
/// code on records whose withdrawn flag is truthy.
pub fn set_stopped(records: &mut [Record], keys: &[String], rules: &ConsentRules, actor: &str) -> PipelineResult<()> {
    for record in records {
        let withdrawn = record.get_opt(&rules.withdrawn_key).map(is_truthy).unwrap_or(false);
        if !withdrawn {
            continue;
        }
        let masked: Map<String, Value> = keys
            .iter()
            .filter(|k| **k != rules.withdrawn_key)
            .map(|k| (k.clone(), Value::String(rules.stop_code.clone())))
            .collect();
        record.append_data(masked, Provenance::here(actor))?;
    }
    Ok(())
}
