//! Provenance-tracked records

mod provenance;
mod traced;


pub use provenance::{Event, Provenance};
pub use traced::{Record, HISTORY_KEY, IMPORT_ACTOR};
