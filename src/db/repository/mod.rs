//! Repository layer: record-scoped database operations and the
//! persistence seam used by the interview service.

mod interview;
mod turn;

pub use interview::*;
pub use turn::*;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use uuid::Uuid;

use super::DatabaseError;
use crate::models::{InterviewRecord, Turn};

/// Persistence collaborator for interview records and their conversation log.
///
/// `load` returns the participant's active (not yet closed) record, if any.
/// `save` writes the record under its id, replacing an earlier version.
/// Turns are append-only and belong to one record.
pub trait RecordStore: Send + Sync {
    fn load(&self, participant_id: &str) -> Result<Option<InterviewRecord>, DatabaseError>;
    fn save(&self, participant_id: &str, record: &InterviewRecord) -> Result<(), DatabaseError>;
    fn append_turns(&self, participant_id: &str, record_id: &Uuid, turns: &[Turn]) -> Result<(), DatabaseError>;
    /// Last `limit` turns of the record, oldest first.
    fn recent_turns(&self, record_id: &Uuid, limit: usize) -> Result<Vec<Turn>, DatabaseError>;
    /// Drop the record's conversation log.
    fn clear_turns(&self, record_id: &Uuid) -> Result<(), DatabaseError>;
}

// ═══════════════════════════════════════════
// SQLite store
// ═══════════════════════════════════════════

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(super::open_database(path)?),
        })
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(super::open_memory_database()?),
        })
    }

    /// Every record for the participant, closed ones included.
    pub fn history(&self, participant_id: &str) -> Result<Vec<InterviewRecord>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        list_interview_records(&conn, participant_id)
    }
}

impl RecordStore for SqliteRecordStore {
    fn load(&self, participant_id: &str) -> Result<Option<InterviewRecord>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        get_active_interview_record(&conn, participant_id)
    }

    fn save(&self, participant_id: &str, record: &InterviewRecord) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        upsert_interview_record(&conn, participant_id, record)
    }

    fn append_turns(&self, participant_id: &str, record_id: &Uuid, turns: &[Turn]) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        insert_turns(&conn, participant_id, record_id, turns)
    }

    fn recent_turns(&self, record_id: &Uuid, limit: usize) -> Result<Vec<Turn>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        get_recent_turns(&conn, record_id, limit)
    }

    fn clear_turns(&self, record_id: &Uuid) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        delete_turns(&conn, record_id)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════
// In-memory store
// ═══════════════════════════════════════════

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, Vec<InterviewRecord>>>,
    turns: Mutex<HashMap<Uuid, Vec<Turn>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self, participant_id: &str) -> Result<Vec<InterviewRecord>, DatabaseError> {
        let records = self.records.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(records.get(participant_id).cloned().unwrap_or_default())
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self, participant_id: &str) -> Result<Option<InterviewRecord>, DatabaseError> {
        let records = self.records.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(records
            .get(participant_id)
            .and_then(|list| list.iter().filter(|r| !r.is_ended()).max_by_key(|r| r.updated_at))
            .cloned())
    }

    fn save(&self, participant_id: &str, record: &InterviewRecord) -> Result<(), DatabaseError> {
        let mut records = self.records.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let list = records.entry(participant_id.to_string()).or_default();
        match list.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => list.push(record.clone()),
        }
        Ok(())
    }

    fn append_turns(&self, _participant_id: &str, record_id: &Uuid, turns: &[Turn]) -> Result<(), DatabaseError> {
        let mut log = self.turns.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        log.entry(*record_id).or_default().extend_from_slice(turns);
        Ok(())
    }

    fn recent_turns(&self, record_id: &Uuid, limit: usize) -> Result<Vec<Turn>, DatabaseError> {
        let log = self.turns.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let turns = log.get(record_id).map(Vec::as_slice).unwrap_or_default();
        Ok(turns[turns.len().saturating_sub(limit)..].to_vec())
    }

    fn clear_turns(&self, record_id: &Uuid) -> Result<(), DatabaseError> {
        let mut log = self.turns.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        log.remove(record_id);
        Ok(())
    }
}
