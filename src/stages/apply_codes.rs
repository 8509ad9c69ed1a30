use crate::coding::{newest_label_time, CodeScheme, LabelDataset, LabelMerger, MergeStats, MessageLabels, SchemeTarget};
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::export::{read_json, read_records, write_records};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ApplyCodesArgs {
    pub user: String,
    pub json_input: PathBuf,
    /// Directory holding `{name}_coded.json` files
    pub coded_dir: PathBuf,
    pub json_output: PathBuf,
    /// Directory holding `{name}.json` code schemes
    pub scheme_dir: PathBuf,
}

/// Merge manually coded labels onto the records, one coding plan at a time.
///
/// Plans without a coded file are skipped with a warning and their coded
/// field is left absent. Returns the merge counts of the plans that ran.
pub fn run_apply_codes(args: &ApplyCodesArgs, config: &PipelineConfig) -> PipelineResult<Vec<(String, MergeStats)>> {
    let mut records = read_records(&args.json_input, &args.user)?;

    let mut stats = Vec::new();
    for plan in &config.coding.plans {
        let coded_path = args.coded_dir.join(format!("{}_coded.json", plan.name));
        if !coded_path.exists() {
            tracing::warn!(plan = %plan.name, path = %coded_path.display(), "no coded file found");
            continue;
        }

        let dataset = LabelDataset::from_entries(read_json::<Vec<MessageLabels>>(&coded_path)?);
        let scheme = CodeScheme::from_value(read_json(&args.scheme_dir.join(format!("{}.json", plan.name)))?)?;
        tracing::info!(
            plan = %plan.name,
            scheme = %scheme.scheme_id,
            messages = dataset.message_count(),
            newest = ?newest_label_time(&dataset),
            "loaded coded labels"
        );

        let merged = LabelMerger::new(&dataset, args.user.clone()).apply(
            &mut records,
            &plan.raw_field,
            &plan.message_id_key(),
            &[SchemeTarget::new(plan.coded_field.clone(), scheme)],
        )?;
        stats.push((plan.name.clone(), merged));
    }

    write_records(&args.json_output, &records)?;
    Ok(stats)
}
