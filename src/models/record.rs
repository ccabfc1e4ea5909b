use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::IdentityRole;
use super::symptom::{SlotIndex, SymptomEntry};
use super::vital_sign::VitalSigns;

/// Canonical structured record for one interview.
///
/// Symptom slots are keyed by a monotonic index that is never reused within
/// the record. Once `is_complete` is set it stays set; a new interview gets a
/// new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub id: Uuid,
    pub vitals: VitalSigns,
    pub symptoms: BTreeMap<SlotIndex, SymptomEntry>,
    pub role: Option<IdentityRole>,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl InterviewRecord {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            vitals: VitalSigns::default(),
            symptoms: BTreeMap::new(),
            role: None,
            is_complete: false,
            created_at: now,
            updated_at: now,
            ended_at: None,
        }
    }

    /// Slot holding a symptom with exactly this name.
    pub fn find_symptom(&self, name: &str) -> Option<SlotIndex> {
        self.symptoms
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(slot, _)| *slot)
    }

    pub fn has_symptom(&self, name: &str) -> bool {
        self.find_symptom(name).is_some()
    }

    /// Next unused slot: one past the highest existing index, starting at 1.
    pub fn next_slot(&self) -> SlotIndex {
        self.symptoms.keys().next_back().map_or(1, |last| last + 1)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Mark the record closed. A closed record is never resumed.
    pub fn close(&mut self) {
        if self.ended_at.is_none() {
            let now = Utc::now();
            self.ended_at = Some(now);
            self.updated_at = now;
        }
    }
}

impl Default for InterviewRecord {
    fn default() -> Self {
        Self::new()
    }
}
