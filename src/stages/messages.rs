use super::load_previous_labels;
use crate::coding::{message_id, messages_for_coding, CodingColumns};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::export::{read_records, write_csv, write_json, write_records};
use crate::record::{Provenance, Record};
use crate::transform::keys::{drop_test_runs, retain_with_key};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct MessagesArgs {
    pub user: String,
    pub json_input: PathBuf,
    pub prev_coding: PathBuf,
    pub flow_name: String,
    pub variable_name: String,
    pub json_output: PathBuf,
    pub coding_output: PathBuf,
    pub icr_output: PathBuf,
    pub csv_output: PathBuf,
}

impl MessagesArgs {
    fn key(&self, kind: &str) -> String {
        format!("{} ({}) - {}", self.variable_name, kind, self.flow_name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessagesSummary {
    /// Responses to this variable, after dropping test runs
    pub responses: usize,
    /// Responses sent outside the project window
    pub outside_window: usize,
    /// Distinct messages written to the coding file
    pub coded_messages: usize,
    pub icr_messages: usize,
}

/// Clean one show's messages and write the coding, ICR, CSV and JSON outputs
pub fn run_messages(args: &MessagesArgs, config: &PipelineConfig) -> PipelineResult<MessagesSummary> {
    let cfg = &config.messages;
    let local = cfg.local_offset()?;
    let text_key = args.key("Text");
    let time_key = args.key("Time");
    let local_time_key = args.key(&cfg.local_time_label);
    let window_start = cfg.window_start.with_timezone(&Utc);
    let window_end = cfg.window_end.with_timezone(&Utc);
    let run_id_key = args.key("Run ID");
    let message_id_key = format!("{} MessageID", text_key);

    let records = read_records(&args.json_input, &args.user)?;
    let records = drop_test_runs(records, &cfg.test_run_key);
    let records = retain_with_key(records, &text_key);
    let responses = records.len();

    let mut messages = Vec::with_capacity(records.len());
    for mut record in records {
        let sent = parse_time(&record, &time_key)?;
        let local_time = sent.with_timezone(&local).to_rfc3339_opts(SecondsFormat::AutoSi, false);
        record.set(local_time_key.clone(), local_time, Provenance::here(args.user.clone()))?;

        if sent < window_start || sent > window_end {
            tracing::info!(time = %sent, "dropping message sent outside project window");
            continue;
        }
        messages.push(record);
    }
    let outside_window = responses - messages.len();
    tracing::info!(dropped = outside_window, total = responses, "dropped messages outside time window");

    for record in &mut messages {
        let id = message_id(record.get_str(&text_key)?);
        record.set(message_id_key.clone(), id, Provenance::here(args.user.clone()))?;
    }

    let previous = load_previous_labels(&args.prev_coding)?;
    let coding = messages_for_coding(
        &messages,
        CodingColumns {
            text_key: &text_key,
            message_id_key: &message_id_key,
            created_key: Some(&time_key),
            labels_key: None,
        },
        &previous,
    )?;

    let mut icr = messages.clone();
    icr.shuffle(&mut StdRng::seed_from_u64(cfg.icr_seed));
    icr.truncate(cfg.icr_count);

    let csv_headers = [cfg.phone_key.as_str(), run_id_key.as_str(), text_key.as_str()];
    write_csv(&args.csv_output, &messages, &csv_headers)?;
    write_json(&args.coding_output, &coding)?;
    write_csv(&args.icr_output, &icr, &[run_id_key.as_str(), text_key.as_str()])?;
    write_records(&args.json_output, &messages)?;

    Ok(MessagesSummary {
        responses,
        outside_window,
        coded_messages: coding.len(),
        icr_messages: icr.len(),
    })
}

fn parse_time(record: &Record, key: &str) -> PipelineResult<DateTime<Utc>> {
    let text = record.get_str(key).map_err(|e| match e {
        PipelineError::KeyNotFound(_) => PipelineError::InvalidRecord(format!("message has no '{}'", key)),
        other => other,
    })?;
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_keys_follow_platform_naming() {
        let args = MessagesArgs {
            user: "test".into(),
            json_input: PathBuf::new(),
            prev_coding: PathBuf::new(),
            flow_name: "mcf_s01e01_activation".into(),
            variable_name: "S01E01".into(),
            json_output: PathBuf::new(),
            coding_output: PathBuf::new(),
            icr_output: PathBuf::new(),
            csv_output: PathBuf::new(),
        };
        assert_eq!(args.key("Text"), "S01E01 (Text) - mcf_s01e01_activation");
        assert_eq!(args.key("Time EAT"), "S01E01 (Time EAT) - mcf_s01e01_activation");
    }

    #[test]
    fn times_are_read_as_rfc3339() {
        let mut record = Record::new();
        record.set("t", "2018-10-20T12:00:00Z", Provenance::here("test")).unwrap();
        assert_eq!(parse_time(&record, "t").unwrap().to_rfc3339(), "2018-10-20T12:00:00+00:00");
        assert!(matches!(parse_time(&record, "missing"), Err(PipelineError::InvalidRecord(_))));
    }
}
