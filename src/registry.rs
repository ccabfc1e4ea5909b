//! Session registry.
//!
//! Maps a participant id to its single live dialogue engine. The map lock is
//! held only for lookups and inserts; each engine has its own async mutex
//! that the service holds for a whole turn, which serializes turns from the
//! same participant.
//!
//! An engine is "in use" while anything besides the registry holds its
//! `Arc`. Idle eviction and capacity eviction only drop engines not in use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::intake::{DialogueEngine, IntakeError};

pub type SharedEngine = Arc<tokio::sync::Mutex<DialogueEngine>>;

struct Entry {
    engine: SharedEngine,
    last_seen: Instant,
}

impl Entry {
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.engine) > 1
    }
}

// ═══════════════════════════════════════════════════════════
// SessionRegistry
// ═══════════════════════════════════════════════════════════

pub struct SessionRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Live engine for the participant, marking it as seen.
    pub fn get(&self, participant_id: &str) -> Result<Option<SharedEngine>, IntakeError> {
        let mut entries = self.entries.lock().map_err(|_| IntakeError::LockPoisoned)?;
        Ok(entries.get_mut(participant_id).map(|entry| {
            entry.last_seen = Instant::now();
            Arc::clone(&entry.engine)
        }))
    }

    /// Existing engine, or a new one built by `create`. The flag is true
    /// when the engine was created by this call.
    pub fn get_or_insert_with(
        &self,
        participant_id: &str,
        create: impl FnOnce() -> DialogueEngine,
    ) -> Result<(SharedEngine, bool), IntakeError> {
        let mut entries = self.entries.lock().map_err(|_| IntakeError::LockPoisoned)?;

        if let Some(entry) = entries.get_mut(participant_id) {
            entry.last_seen = Instant::now();
            return Ok((Arc::clone(&entry.engine), false));
        }

        if entries.len() >= self.capacity {
            make_room(&mut entries);
        }

        let engine = Arc::new(tokio::sync::Mutex::new(create()));
        entries.insert(
            participant_id.to_string(),
            Entry {
                engine: Arc::clone(&engine),
                last_seen: Instant::now(),
            },
        );
        Ok((engine, true))
    }

    /// Remove the participant's entry only if it still holds `engine`.
    pub fn discard_if_same(&self, participant_id: &str, engine: &SharedEngine) -> Result<bool, IntakeError> {
        let mut entries = self.entries.lock().map_err(|_| IntakeError::LockPoisoned)?;
        let same = entries
            .get(participant_id)
            .is_some_and(|entry| Arc::ptr_eq(&entry.engine, engine));
        if same {
            entries.remove(participant_id);
        }
        Ok(same)
    }

    /// Drop engines not seen for longer than `idle` and not in use.
    pub fn evict_idle(&self, idle: Duration) -> Result<usize, IntakeError> {
        let mut entries = self.entries.lock().map_err(|_| IntakeError::LockPoisoned)?;
        let before = entries.len();
        entries.retain(|_, entry| entry.in_use() || entry.last_seen.elapsed() <= idle);
        Ok(before - entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evict the least recently seen engine that is not in use.
fn make_room(entries: &mut HashMap<String, Entry>) {
    let oldest = entries
        .iter()
        .filter(|(_, entry)| !entry.in_use())
        .min_by_key(|(_, entry)| entry.last_seen)
        .map(|(id, _)| id.clone());

    match oldest {
        Some(id) => {
            entries.remove(&id);
            tracing::info!(participant = %id, "Session evicted to make room");
        }
        None => tracing::warn!(
            sessions = entries.len(),
            "Session registry full and every engine is busy"
        ),
    }
}
