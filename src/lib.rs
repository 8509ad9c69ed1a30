//! Survey pipeline: provenance-tracked records for SMS survey data
//!
//! Messages and survey responses flow through a chain of stages that filter,
//! rename, join, label and fold them. Every field change is recorded with the
//! user, call site and time that made it, so any exported dataset can be
//! traced back to the raw platform export.
//!
//! # Core Concepts
//!
//! - **Records**: key/value data plus an append-only history of mutation events
//! - **Joiner**: attaches survey responses to messages sharing a respondent id
//! - **Folder**: collapses many records per respondent into one, per-field policies
//! - **Label Merger**: attaches manual codes keyed by a hash of the coded text
//!
//! # Example
//!
//! ```
//! use survey_pipeline::{Provenance, Record};
//!
//! let mut record = Record::new();
//! record.set("age", 30, Provenance::here("alice")).unwrap();
//! record.set("age", 31, Provenance::here("bob")).unwrap();
//! assert_eq!(record.get("age").unwrap(), 31);
//! assert_eq!(record.history_len(), 2);
//! ```

pub mod coding;
pub mod config;
mod error;
pub mod export;
mod record;
pub mod stages;
pub mod transform;

pub use coding::{message_id, CodeScheme, Label, LabelDataset, LabelMerger};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use record::{Event, Provenance, Record, HISTORY_KEY, IMPORT_ACTOR};
pub use transform::{FoldPlan, FoldPolicy, Folder, JoinCardinality, Joiner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
