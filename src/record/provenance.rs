//! Provenance attached to every record mutation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::panic::Location;

/// Who changed a record, from where, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// User or process responsible for the change
    pub actor: String,
    /// Source location that made the change (e.g. "src/stages/messages.rs:88")
    pub origin: String,
    /// When the change was made
    pub timestamp: DateTime<Utc>,
}

impl Provenance {
    pub fn new(actor: impl Into<String>, origin: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            origin: origin.into(),
            timestamp,
        }
    }

    /// Provenance for a change made now, attributed to the calling source line.
    #[track_caller]
    pub fn here(actor: impl Into<String>) -> Self {
        let caller = Location::caller();
        Self::new(
            actor,
            format!("{}:{}", caller.file(), caller.line()),
            Utc::now(),
        )
    }
}

/// One append-only mutation of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub provenance: Provenance,
    /// Keys and values set by this mutation
    pub data: Map<String, Value>,
}

impl Event {
    pub fn new(data: Map<String, Value>, provenance: Provenance) -> Self {
        Self { provenance, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn here_records_calling_file() {
        let prov = Provenance::here("alice");
        assert_eq!(prov.actor, "alice");
        assert!(prov.origin.contains("provenance.rs:"), "origin was {}", prov.origin);
    }

    #[test]
    fn event_flattens_provenance() {
        let mut data = Map::new();
        data.insert("age".into(), Value::from(30));
        let event = Event::new(data, Provenance::here("alice"));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["actor"], "alice");
        assert!(json.get("provenance").is_none());
        assert_eq!(json["data"]["age"], 30);

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
