//! Pipeline stages
//!
//! Each stage loads its inputs, transforms them in memory and only then writes
//! its outputs, so a failing stage leaves no partial files behind. The first
//! argument of every stage is the user recorded as the provenance actor.

mod analysis;
mod apply_codes;
mod auto_code;
mod concat;
mod messages;
mod surveys;

pub use analysis::{run_analysis, AnalysisArgs, AnalysisSummary};
pub use apply_codes::{run_apply_codes, ApplyCodesArgs};
pub use auto_code::{run_auto_code, AutoCodeArgs};
pub use concat::{run_concat_flows, ConcatFlowsArgs, NamedPath};
pub use messages::{run_messages, MessagesArgs, MessagesSummary};
pub use surveys::{run_join_surveys, JoinSurveysArgs};

use crate::coding::{LabelDataset, MessageLabels};
use crate::error::PipelineResult;
use crate::export::read_json;
use std::path::Path;

/// Labels from a previous coding file, or none if the file does not exist
fn load_previous_labels(path: &Path) -> PipelineResult<LabelDataset> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no previous coding file");
        return Ok(LabelDataset::new());
    }
    let dataset = LabelDataset::from_entries(read_json::<Vec<MessageLabels>>(path)?);
    tracing::info!(path = %path.display(), messages = dataset.message_count(), "loaded previous labels");
    Ok(dataset)
}
