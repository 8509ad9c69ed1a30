use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::export::{read_records, write_csv, write_records};
use crate::record::Record;
use crate::transform::keys::derive_keys;
use crate::transform::{determine_consent_withdrawn, set_stopped, Folder};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AnalysisArgs {
    pub user: String,
    pub json_input: PathBuf,
    pub json_output: PathBuf,
    /// One row per message
    pub csv_by_message: PathBuf,
    /// One row per respondent
    pub csv_by_individual: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub messages: usize,
    pub individuals: usize,
    /// Messages from respondents who withdrew consent
    pub withdrawn: usize,
}

/// Build the per-message and per-respondent analysis datasets
pub fn run_analysis(args: &AnalysisArgs, config: &PipelineConfig) -> PipelineResult<AnalysisSummary> {
    let cfg = &config.analysis;
    let mut messages = read_records(&args.json_input, &args.user)?;

    derive_keys(&mut messages, &cfg.derived_keys, &args.user)?;
    let withdrawn = determine_consent_withdrawn(&mut messages, &cfg.export_keys, &cfg.consent, &args.user)?;

    let folder = Folder::new(cfg.fold_plan(), args.user.clone());
    let mut individuals = folder.fold(&messages, |r| fold_id(r, &cfg.id_key))?;

    set_stopped(&mut messages, &cfg.export_keys, &cfg.consent, &args.user)?;
    set_stopped(&mut individuals, &cfg.export_keys, &cfg.consent, &args.user)?;

    write_csv(&args.csv_by_message, &messages, &cfg.export_keys)?;
    write_csv(&args.csv_by_individual, &individuals, &cfg.export_keys)?;
    write_records(&args.json_output, &individuals)?;

    tracing::info!(
        messages = messages.len(),
        individuals = individuals.len(),
        withdrawn,
        "built analysis datasets"
    );
    Ok(AnalysisSummary {
        messages: messages.len(),
        individuals: individuals.len(),
        withdrawn,
    })
}

/// Respondent id as text. Non-string ids fold on their JSON text.
fn fold_id(record: &Record, id_key: &str) -> PipelineResult<String> {
    Ok(match record.get(id_key)? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
