//! Common test utilities for pipeline stage tests
//!
//! Builders for platform exports, coding files and code schemes, plus a
//! temporary workspace to run stages in.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const USER: &str = "test-user";

/// A temporary directory holding a stage's inputs and outputs
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write_json(&self, relative: &str, value: &Value) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, serde_json::to_string_pretty(value).expect("serialize")).expect("write fixture");
        path
    }

    pub fn read_json(&self, relative: &str) -> Value {
        read_json(&self.path(relative))
    }

    pub fn read_string(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("read output")
    }

    /// Rows of a CSV output, header row first
    pub fn read_csv(&self, relative: &str) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(self.path(relative))
            .expect("open csv");
        reader
            .records()
            .map(|r| r.expect("csv row").iter().map(String::from).collect())
            .collect()
    }
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read json")).expect("parse json")
}

/// One run of a show's activation flow, as exported by the messaging platform
pub fn show_message(phone: &str, text: &str, sent: &str) -> Value {
    json!({
        "avf_phone_id": phone,
        "S01E01 (Run ID) - mcf_s01e01": format!("run-{}", phone),
        "S01E01 (Text) - mcf_s01e01": text,
        "S01E01 (Time) - mcf_s01e01": sent,
    })
}

/// A coded label as written by the coding tool
pub fn label(scheme_id: &str, code_id: &str, at: &str, coder: &str) -> Value {
    json!({
        "SchemeID": scheme_id,
        "CodeID": code_id,
        "Checked": true,
        "DateTimeUTC": at,
        "Origin": {"OriginID": coder, "Name": coder, "OriginType": "Manual"}
    })
}

/// A code scheme with the given codes plus a not-reviewed control code
pub fn scheme(scheme_id: &str, codes: &[&str]) -> Value {
    let mut all: Vec<Value> = codes
        .iter()
        .enumerate()
        .map(|(i, code)| json!({"CodeID": code, "DisplayText": code, "NumericValue": i + 1}))
        .collect();
    all.push(json!({
        "CodeID": format!("{}-NR", scheme_id),
        "DisplayText": "NR",
        "NumericValue": -10,
        "ControlCode": "NR"
    }));
    json!([{"SchemeID": scheme_id, "Name": scheme_id, "Codes": all}])
}
