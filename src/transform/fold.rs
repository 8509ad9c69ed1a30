//! Folder: many-to-one reduction of records sharing an identifier
//!
//! Records are grouped by a caller-supplied fold id, and each group is reduced
//! into exactly one output record. Only fields named in the [`FoldPlan`] are
//! carried over, each according to its [`FoldPolicy`].

use crate::error::{PipelineError, PipelineResult};
use crate::record::{Provenance, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Separator used by [`FoldPolicy::Concat`]
pub const CONCAT_SEPARATOR: &str = ",";

/// How the values of one field are reduced across a fold group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FoldPolicy {
    /// All present values must be identical
    Equal,
    /// Non-empty values joined with [`CONCAT_SEPARATOR`], in collection order
    Concat,
    /// True if any present value is truthy
    BoolOr,
    /// Union of sparse values; later values win where both are present
    MatrixUnion,
}

/// Ordered mapping of field name to reduction policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldPlan {
    fields: Vec<(String, FoldPolicy)>,
}

impl FoldPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce `key` with `policy`. Re-adding a key replaces its policy.
    pub fn with_field(mut self, key: impl Into<String>, policy: FoldPolicy) -> Self {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = policy,
            None => self.fields.push((key, policy)),
        }
        self
    }

    pub fn with_fields<I, S>(self, keys: I, policy: FoldPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        keys.into_iter().fold(self, |plan, key| plan.with_field(key, policy))
    }

    pub fn fields(&self) -> &[(String, FoldPolicy)] {
        &self.fields
    }

    pub fn policy(&self, key: &str) -> Option<FoldPolicy> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, p)| *p)
    }
}

/// Reduces a record collection to one record per fold id
#[derive(Debug, Clone)]
pub struct Folder {
    plan: FoldPlan,
    actor: String,
}

impl Folder {
    pub fn new(plan: FoldPlan, actor: impl Into<String>) -> Self {
        Self {
            plan,
            actor: actor.into(),
        }
    }

    /// Fold `records`, producing one record per distinct `fold_id` in order of
    /// first appearance. Inputs are not modified.
    pub fn fold<F>(&self, records: &[Record], fold_id: F) -> PipelineResult<Vec<Record>>
    where
        F: Fn(&Record) -> PipelineResult<String>,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<&Record>)> = Vec::new();

        for record in records {
            let id = fold_id(record)?;
            match index.get(&id) {
                Some(&i) => groups[i].1.push(record),
                None => {
                    index.insert(id.clone(), groups.len());
                    groups.push((id, vec![record]));
                }
            }
        }

        let mut folded = Vec::with_capacity(groups.len());
        for (id, members) in &groups {
            let data = self.reduce_group(id, members)?;
            folded.push(Record::from_data(data, Provenance::here(self.actor.clone()))?);
        }

        tracing::info!(input = records.len(), output = folded.len(), "folded records");
        Ok(folded)
    }

    fn reduce_group(&self, fold_id: &str, members: &[&Record]) -> PipelineResult<Map<String, Value>> {
        let mut out = Map::new();

        for (key, policy) in &self.plan.fields {
            let values: Vec<&Value> = members.iter().filter_map(|r| r.get_opt(key)).collect();
            if values.is_empty() {
                continue;
            }

            let reduced = match policy {
                FoldPolicy::Equal => {
                    let first = values[0];
                    if let Some(other) = values.iter().find(|v| **v != first) {
                        return Err(PipelineError::InconsistentFoldValue {
                            fold_id: fold_id.to_string(),
                            key: key.clone(),
                            first: first.clone(),
                            other: (*other).clone(),
                        });
                    }
                    first.clone()
                }
                FoldPolicy::Concat => {
                    let parts: Vec<String> = values.iter().filter_map(|v| concat_part(v)).collect();
                    Value::String(parts.join(CONCAT_SEPARATOR))
                }
                FoldPolicy::BoolOr => Value::Bool(values.iter().any(|v| is_truthy(v))),
                FoldPolicy::MatrixUnion => matrix_union(&values),
            };
            out.insert(key.clone(), reduced);
        }

        Ok(out)
    }
}

fn concat_part(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matrix_union(values: &[&Value]) -> Value {
    let mut acc: Option<Value> = None;
    for value in values {
        acc = match (acc, value) {
            (Some(Value::Object(mut merged)), Value::Object(next)) => {
                for (k, v) in next {
                    merged.insert(k.clone(), v.clone());
                }
                Some(Value::Object(merged))
            }
            _ => Some((*value).clone()),
        };
    }
    acc.unwrap_or(Value::Null)
}

/// Truthiness used by bool-or folds and consent flags: `true`, non-zero
/// numbers, and the strings "true", "yes" and "1" in any case.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") || s == "1"
        }
        _ => false,
    }
}
