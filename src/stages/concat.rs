use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::export::{read_records, write_records};
use crate::transform::keys::{exclude_matching, normalise_keys, set_field};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A `name=path` command-line input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPath {
    pub name: String,
    pub path: PathBuf,
}

impl FromStr for NamedPath {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok(Self {
                name: name.to_string(),
                path: PathBuf::from(path),
            }),
            _ => Err(PipelineError::InvalidArgument(format!(
                "expected NAME=PATH, got '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for NamedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.path.display())
    }
}

#[derive(Debug, Clone)]
pub struct ConcatFlowsArgs {
    pub user: String,
    pub json_output: PathBuf,
    pub inputs: Vec<NamedPath>,
}

/// Tag each flow with its name, normalise its keys and concatenate them in
/// input order. Returns the number of records written.
pub fn run_concat_flows(args: &ConcatFlowsArgs, config: &PipelineConfig) -> PipelineResult<usize> {
    if args.inputs.is_empty() {
        return Err(PipelineError::InvalidArgument("concat-flows needs at least one input".into()));
    }
    let cfg = &config.concat;

    let mut combined = Vec::new();
    for input in &args.inputs {
        let mut records = read_records(&input.path, &args.user)?;
        set_field(
            &mut records,
            &cfg.source_flow_key,
            &Value::String(input.name.clone()),
            &args.user,
        )?;

        if let Some(rule) = cfg.flows.get(&input.name) {
            if let Some(exclusion) = &rule.exclude {
                let before = records.len();
                records = exclude_matching(records, &exclusion.key, &exclusion.value);
                tracing::info!(flow = %input.name, excluded = before - records.len(), "applied exclusion");
            }
            normalise_keys(&mut records, &rule.rename_from, &rule.rename_to, &args.user)?;
        }

        tracing::info!(flow = %input.name, records = records.len(), "added flow");
        combined.extend(records);
    }

    write_records(&args.json_output, &combined)?;
    Ok(combined.len())
}
