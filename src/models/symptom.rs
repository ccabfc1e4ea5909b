use serde::{Deserialize, Serialize};

use super::enums::{Severity, SymptomStatus};

/// Stable slot number of a symptom within one interview. Starts at 1.
pub type SlotIndex = u32;

/// Detail fields asked about for every present symptom, in asking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomDetail {
    Severity,
    Duration,
    Description,
}

impl SymptomDetail {
    pub const ALL: [SymptomDetail; 3] = [
        SymptomDetail::Severity,
        SymptomDetail::Duration,
        SymptomDetail::Description,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub name: String,
    pub status: SymptomStatus,
    pub severity: Option<Severity>,
    pub duration: Option<String>,
    pub description: Option<String>,
}

impl SymptomEntry {
    /// A confirmed symptom with no details yet (vital-sign hypotheses).
    pub fn present(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: SymptomStatus::Present,
            severity: None,
            duration: None,
            description: None,
        }
    }

    pub fn missing_detail(&self) -> Option<SymptomDetail> {
        SymptomDetail::ALL.into_iter().find(|d| match d {
            SymptomDetail::Severity => self.severity.is_none(),
            SymptomDetail::Duration => self.duration.is_none(),
            SymptomDetail::Description => self.description.is_none(),
        })
    }

    /// Present with severity, duration and description all known.
    pub fn is_fully_detailed(&self) -> bool {
        self.status == SymptomStatus::Present && self.missing_detail().is_none()
    }
}
