//! Error types for pipeline operations

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, transforming, or exporting records
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Inconsistent values for '{key}' in fold group '{fold_id}': {first} != {other}")]
    InconsistentFoldValue {
        fold_id: String,
        key: String,
        first: Value,
        other: Value,
    },

    #[error("Join key '{key}' missing from {collection} record {index}")]
    MissingJoinKey {
        key: String,
        collection: &'static str,
        index: usize,
    },

    #[error("Scheme '{scheme_id}' has no '{control_code}' control code")]
    SchemeMissingControlCode {
        scheme_id: String,
        control_code: String,
    },

    #[error("Key '{0}' is reserved for record history")]
    ReservedKey(String),

    #[error("Expected '{key}' to be a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),
}

impl PipelineError {
    /// Wrap an IO error with the path it concerns
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
