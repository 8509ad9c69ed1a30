//! Identifier-based joiner: attaches secondary records onto primary records
//! that share a join key.

use crate::error::{PipelineError, PipelineResult};
use crate::record::{Provenance, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Actor recorded on join events
pub const JOINER_ACTOR: &str = "joiner";

/// How many secondary matches are attached to a primary record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinCardinality {
    /// The last matching secondary record, as an object (default)
    #[default]
    Latest,
    /// Every matching secondary record, as an array in secondary order
    All,
}

/// Joins a secondary collection onto a primary collection by a shared key.
///
/// Matches are attached under `destination` as the current-value view of the
/// secondary record(s). Primary records with no match are left without
/// `destination` rather than having it set to null.
#[derive(Debug, Clone)]
pub struct Joiner {
    key: String,
    destination: String,
    cardinality: JoinCardinality,
}

impl Joiner {
    pub fn new(key: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            destination: destination.into(),
            cardinality: JoinCardinality::default(),
        }
    }

    pub fn with_cardinality(mut self, cardinality: JoinCardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Join `secondary` onto `primary` in place, returning the number of
    /// primary records that received a match.
    ///
    /// Every record in both collections must carry the join key; this is
    /// checked before any primary record is modified.
    pub fn join(&self, primary: &mut [Record], secondary: &[Record]) -> PipelineResult<usize> {
        let mut matches: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, record) in secondary.iter().enumerate() {
            let id = join_id(record, &self.key, "secondary", i)?;
            matches.entry(id).or_default().push(i);
        }

        let primary_ids = primary
            .iter()
            .enumerate()
            .map(|(i, record)| join_id(record, &self.key, "primary", i))
            .collect::<PipelineResult<Vec<_>>>()?;

        let mut matched = 0;
        for (record, id) in primary.iter_mut().zip(primary_ids) {
            let Some(indices) = matches.get(&id) else {
                continue;
            };
            let Some(&last) = indices.last() else {
                continue;
            };
            let value = match self.cardinality {
                JoinCardinality::Latest => Value::Object(secondary[last].values().clone()),
                JoinCardinality::All => Value::Array(
                    indices
                        .iter()
                        .map(|&i| Value::Object(secondary[i].values().clone()))
                        .collect(),
                ),
            };
            record.set(self.destination.clone(), value, Provenance::here(JOINER_ACTOR))?;
            matched += 1;
        }

        tracing::info!(
            key = %self.key,
            destination = %self.destination,
            matched,
            total = primary.len(),
            "joined secondary records"
        );
        Ok(matched)
    }
}

/// Canonical text of a record's join key. JSON text keeps `"123"` and `123`
/// distinct.
fn join_id(record: &Record, key: &str, collection: &'static str, index: usize) -> PipelineResult<String> {
    record
        .get_opt(key)
        .map(Value::to_string)
        .ok_or_else(|| PipelineError::MissingJoinKey {
            key: key.to_string(),
            collection,
            index,
        })
}
