//! Flattened event rows derived from the engine's event log.
//!
//! The engine emits typed [`DaoEvent`]s; the indexer stores one row per
//! record with the common columns pulled out for querying and the full
//! event kept as a JSON payload.

use dao_engine::{DaoEvent, EventRecord};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// A decoded engine event, ready to be stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedEvent {
    pub sequence: i64,
    pub event_type: String,
    pub proposal_id: Option<i64>,
    pub actor: String,
    /// Decimal string; amounts exceed SQLite's integer range.
    pub amount: Option<String>,
    pub payload: String,
}

impl IndexedEvent {
    pub fn from_record(record: &EventRecord) -> Result<Self> {
        let event: &DaoEvent = &record.event;
        Ok(Self {
            sequence: record.sequence as i64,
            event_type: event.kind().as_str().to_string(),
            proposal_id: event.proposal_id().map(|id| id as i64),
            actor: event.actor().to_string(),
            amount: event.amount().map(|a| a.to_string()),
            payload: serde_json::to_string(event)?,
        })
    }
}

/// A raw event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredEvent {
    pub id: i64,
    pub sequence: i64,
    pub event_type: String,
    pub proposal_id: Option<i64>,
    pub actor: String,
    pub amount: Option<String>,
    pub payload: String,
    pub indexed_at: i64,
}
