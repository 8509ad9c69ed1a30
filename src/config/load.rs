use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

use super::PipelineConfig;

/// Per-user config file, if the platform has a config directory
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("survey-pipeline").join("config.yaml"))
}

/// Resolve the effective configuration.
///
/// An explicit path must exist. Otherwise the per-user file is used when
/// present, falling back to built-in defaults.
pub fn load(explicit: Option<&Path>) -> PipelineResult<PipelineConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => config_path().filter(|p| p.exists()),
    };

    let config = match path {
        Some(path) => {
            let config = load_file(&path)?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => {
            tracing::debug!("no config file, using defaults");
            PipelineConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

pub fn load_file(path: &Path) -> PipelineResult<PipelineConfig> {
    let contents = fs::read_to_string(path).map_err(|e| PipelineError::file(path, e))?;
    let config: PipelineConfig = serde_yaml::from_str(&contents)
        .map_err(|e| PipelineError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(config)
}

pub fn from_yaml_str(contents: &str) -> PipelineResult<PipelineConfig> {
    let config: PipelineConfig = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

pub fn to_yaml(config: &PipelineConfig) -> PipelineResult<String> {
    Ok(serde_yaml::to_string(config)?)
}
