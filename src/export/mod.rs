//! Reading and writing record collections
//!
//! JSON carries full provenance and re-imports losslessly. CSV is a flattened,
//! column-selected view for analysts and carries no history.

mod csv;
mod json;

pub use self::csv::{export_csv, render_cell, write_csv};
pub use self::json::{export_json, import_json, read_json, read_records, write_json, write_records};

use crate::error::{PipelineError, PipelineResult};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Open a file for buffered reading
pub fn open_reader(path: &Path) -> PipelineResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| PipelineError::file(path, e))
}

/// Create (or truncate) a file for buffered writing, creating parent
/// directories as needed
pub fn create_writer(path: &Path) -> PipelineResult<BufWriter<File>> {
    ensure_parent_dir(path)?;
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| PipelineError::file(path, e))
}

pub fn ensure_parent_dir(path: &Path) -> PipelineResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| PipelineError::file(dir, e))
        }
        _ => Ok(()),
    }
}
