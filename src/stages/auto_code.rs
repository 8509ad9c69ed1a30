use super::load_previous_labels;
use crate::coding::{message_id, messages_for_coding, CodingColumns, MessageLabels};
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::export::{read_records, write_json, write_records};
use crate::record::Provenance;
use crate::transform::keys::drop_test_runs;
use chrono::Utc;
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AutoCodeArgs {
    pub user: String,
    pub json_input: PathBuf,
    /// Directory holding `{name}_coded.json` files from a previous round
    pub prev_coded_dir: PathBuf,
    pub json_output: PathBuf,
    /// Directory the `{name}.json` coding files are written to
    pub coding_output_dir: PathBuf,
}

/// Assign message ids to survey answers, code the answers each plan's cleaner
/// recognises, and write one coding file per coding plan.
///
/// Automatic labels are stored under the plan's labels key and go into the
/// coding file. Messages that already have labels in the previous coded file
/// keep those instead. Returns the number of distinct messages per plan, in
/// plan order.
pub fn run_auto_code(args: &AutoCodeArgs, config: &PipelineConfig) -> PipelineResult<Vec<(String, usize)>> {
    let records = read_records(&args.json_input, &args.user)?;
    let mut records = drop_test_runs(records, &config.coding.test_run_key);
    let now = Utc::now();

    let mut coding_files: Vec<(PathBuf, Vec<MessageLabels>)> = Vec::new();
    for plan in &config.coding.plans {
        let id_key = plan.message_id_key();
        let labels_key = plan.labels_key();
        let previous = load_previous_labels(&args.prev_coded_dir.join(format!("{}_coded.json", plan.name)))?;

        let mut auto_coded = 0;
        for record in records.iter_mut().filter(|r| r.contains_key(&plan.raw_field)) {
            let text = record.get_str(&plan.raw_field)?;
            let id = message_id(text);
            let label = match &plan.cleaner {
                Some(cleaner) if previous.labels(&id).is_empty() => cleaner.label(text, now),
                _ => None,
            };

            let mut data = Map::new();
            data.insert(id_key.clone(), Value::String(id));
            if let Some(label) = label {
                data.insert(labels_key.clone(), Value::Array(vec![serde_json::to_value(label)?]));
                auto_coded += 1;
            }
            record.append_data(data, Provenance::here(args.user.clone()))?;
        }

        let entries = messages_for_coding(
            &records,
            CodingColumns {
                text_key: &plan.raw_field,
                message_id_key: &id_key,
                created_key: None,
                labels_key: Some(&labels_key),
            },
            &previous,
        )?;
        tracing::info!(plan = %plan.name, messages = entries.len(), auto_coded, "prepared coding file");
        coding_files.push((args.coding_output_dir.join(format!("{}.json", plan.name)), entries));
    }

    write_records(&args.json_output, &records)?;
    let mut counts = Vec::with_capacity(coding_files.len());
    for ((path, entries), plan) in coding_files.iter().zip(&config.coding.plans) {
        write_json(path, entries)?;
        counts.push((plan.name.clone(), entries.len()));
    }
    Ok(counts)
}
