//! Coding: labels, coding schemes, and merging manual codes onto records

mod cleaner;
pub mod export;
mod label;
mod merge;
mod message_id;
mod scheme;

pub use cleaner::{AnswerCleaner, NumericCodes, AUTO_CODE_ORIGIN};
pub use export::{messages_for_coding, CodingColumns};
pub use label::{Label, MessageLabels, Origin, OriginType};
pub use merge::{newest_label_time, LabelDataset, LabelMerger, MergeStats, SchemeTarget};
pub use message_id::message_id;
pub use scheme::{Code, CodeScheme, NOT_REVIEWED};
