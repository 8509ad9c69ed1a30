//! Record: an append-only key/value store with per-mutation provenance

use super::provenance::{Event, Provenance};
use crate::error::{PipelineError, PipelineResult};
use chrono::Utc;
use serde::de::{Deserialize, Deserializer, Error as _};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key under which a serialized record carries its mutation history
pub const HISTORY_KEY: &str = "history";

/// Actor recorded for fields restated during deserialization
pub const IMPORT_ACTOR: &str = "import";

/// A link in the persistent history list. Nodes are immutable once built,
/// so copies of a record share every event appended before the copy.
#[derive(Debug)]
struct HistoryNode {
    event: Event,
    prev: Option<Arc<HistoryNode>>,
}

/// A respondent or message, as a provenance-tracked key/value record.
///
/// The current-value view is derived from the history: a key's value is the
/// one set by the most recent event that mentions it. Keys that were never set
/// are absent, which is distinct from a key explicitly set to `null`.
///
/// Cloning is cheap with respect to history: both copies point at the same
/// event list and diverge from the copy point onwards.
#[derive(Clone, Default)]
pub struct Record {
    head: Option<Arc<HistoryNode>>,
    event_count: usize,
    current: Map<String, Value>,
}

impl Record {
    /// Create an empty record with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record whose first event sets `data`
    pub fn from_data(data: Map<String, Value>, provenance: Provenance) -> PipelineResult<Self> {
        let mut record = Self::new();
        record.append_data(data, provenance)?;
        Ok(record)
    }

    /// Rebuild a record from its serialized object form.
    ///
    /// A `history` array is replayed first. Top-level fields that disagree
    /// with the replayed view (or all fields, when there is no history) are
    /// then recorded as one event attributed to `provenance`.
    pub fn from_json_object(
        mut object: Map<String, Value>,
        provenance: Provenance,
    ) -> PipelineResult<Self> {
        let mut record = Self::new();

        if let Some(history) = object.remove(HISTORY_KEY) {
            let events: Vec<Event> = serde_json::from_value(history)
                .map_err(|e| PipelineError::InvalidRecord(format!("malformed history: {}", e)))?;
            for event in events {
                record.append_data(event.data, event.provenance)?;
            }
        }

        let restated: Map<String, Value> = object
            .into_iter()
            .filter(|(k, v)| record.current.get(k) != Some(v))
            .collect();
        record.append_data(restated, provenance)?;

        Ok(record)
    }

    /// Append one mutation event setting every key in `data`.
    ///
    /// Earlier events are never modified. An empty `data` records nothing.
    pub fn append_data(&mut self, data: Map<String, Value>, provenance: Provenance) -> PipelineResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        if data.contains_key(HISTORY_KEY) {
            return Err(PipelineError::ReservedKey(HISTORY_KEY.to_string()));
        }

        for (k, v) in &data {
            self.current.insert(k.clone(), v.clone());
        }
        self.head = Some(Arc::new(HistoryNode {
            event: Event::new(data, provenance),
            prev: self.head.take(),
        }));
        self.event_count += 1;
        Ok(())
    }

    /// Set a single key
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        provenance: Provenance,
    ) -> PipelineResult<()> {
        let mut data = Map::new();
        data.insert(key.into(), value.into());
        self.append_data(data, provenance)
    }

    /// Copy this record. The copy shares history up to this point.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Current value of `key`, or `KeyNotFound` if it was never set
    pub fn get(&self, key: &str) -> PipelineResult<&Value> {
        self.current
            .get(key)
            .ok_or_else(|| PipelineError::KeyNotFound(key.to_string()))
    }

    /// Current value of `key`, or `default` if it was never set
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.current.get(key).unwrap_or(default)
    }

    pub fn get_opt(&self, key: &str) -> Option<&Value> {
        self.current.get(key)
    }

    /// Current value of `key` as text
    pub fn get_str(&self, key: &str) -> PipelineResult<&str> {
        self.get(key)?.as_str().ok_or_else(|| PipelineError::TypeMismatch {
            key: key.to_string(),
            expected: "string",
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.current.contains_key(key)
    }

    /// Snapshot of every key ever set, in first-insertion order
    pub fn keys(&self) -> Vec<String> {
        self.current.keys().cloned().collect()
    }

    /// The current-value view
    pub fn values(&self) -> &Map<String, Value> {
        &self.current
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// All mutation events, oldest first
    pub fn history(&self) -> Vec<&Event> {
        let mut events = Vec::with_capacity(self.event_count);
        let mut node = self.head.as_deref();
        while let Some(n) = node {
            events.push(&n.event);
            node = n.prev.as_deref();
        }
        events.reverse();
        events
    }

    pub fn history_len(&self) -> usize {
        self.event_count
    }
}

impl Drop for Record {
    // Unlink uniquely-owned nodes iteratively so long histories don't
    // recurse once per event.
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.prev.take(),
                Err(_) => break,
            }
        }
    }
}

/// Records compare by their current-value view; history may differ.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("values", &self.current)
            .field("history_len", &self.event_count)
            .finish()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.current.len() + 1))?;
        for (k, v) in &self.current {
            map.serialize_entry(k, v)?;
        }
        map.serialize_entry(HISTORY_KEY, &self.history())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        let provenance = Provenance::new(IMPORT_ACTOR, "deserialize", Utc::now());
        Record::from_json_object(object, provenance).map_err(D::Error::custom)
    }
}
