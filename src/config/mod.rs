//! Pipeline configuration: project constants, coding plans and analysis keys

mod load;
mod schema;

pub use load::{config_path, from_yaml_str, load, load_file, to_yaml};
pub use schema::{
    AnalysisConfig, CodingConfig, CodingPlan, ConcatConfig, Exclusion, FlowRule, JoinConfig, MessagesConfig,
    PipelineConfig,
};
