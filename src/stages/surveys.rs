use super::NamedPath;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::export::{read_records, write_records};
use crate::transform::Joiner;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct JoinSurveysArgs {
    pub user: String,
    pub messages_input: PathBuf,
    pub json_output: PathBuf,
    /// Surveys as `destination=path`, joined in order
    pub surveys: Vec<NamedPath>,
}

/// Join every survey onto the messages by respondent id. Returns the number of
/// matches made per survey, in input order.
///
/// Feedback messages are not joined here: merge them into the messages input
/// beforehand with `concat-flows`. Join events are attributed to
/// [`crate::transform::JOINER_ACTOR`], not to the running user.
pub fn run_join_surveys(args: &JoinSurveysArgs, config: &PipelineConfig) -> PipelineResult<Vec<usize>> {
    if args.surveys.is_empty() {
        return Err(PipelineError::InvalidArgument("join-surveys needs at least one survey".into()));
    }

    let mut messages = read_records(&args.messages_input, &args.user)?;
    let mut matched = Vec::with_capacity(args.surveys.len());
    for survey in &args.surveys {
        let responses = read_records(&survey.path, &args.user)?;
        let joiner = Joiner::new(config.join.key.clone(), survey.name.clone())
            .with_cardinality(config.join.cardinality);
        matched.push(joiner.join(&mut messages, &responses)?);
    }

    write_records(&args.json_output, &messages)?;
    Ok(matched)
}
