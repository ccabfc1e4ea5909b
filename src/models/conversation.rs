use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::TurnRole;

/// One message in the rolling turn window handed to the oracle as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn participant(content: &str) -> Self {
        Self {
            role: TurnRole::Participant,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }
}
