//! Shared types for the API layer.

use std::sync::Arc;

use serde::Deserialize;

use crate::api::error::ApiError;
use crate::service::InterviewService;

/// Longest participant message accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Longest participant id accepted, in characters.
pub const MAX_PARTICIPANT_ID_CHARS: usize = 128;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ApiContext {
    pub service: Arc<InterviewService>,
}

impl ApiContext {
    pub fn new(service: Arc<InterviewService>) -> Self {
        Self { service }
    }
}

// ═══════════════════════════════════════════════════════════
// Request bodies
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub participant_id: String,
    pub message: String,
}

impl TurnRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_participant_id(&self.participant_id)?;
        if self.message.trim().is_empty() {
            return Err(ApiError::BadRequest("message must not be empty".into()));
        }
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiError::BadRequest(format!(
                "message exceeds {MAX_MESSAGE_CHARS} characters"
            )));
        }
        Ok(())
    }
}

pub fn validate_participant_id(participant_id: &str) -> Result<(), ApiError> {
    if participant_id.trim().is_empty() {
        return Err(ApiError::BadRequest("participant_id must not be empty".into()));
    }
    if participant_id.chars().count() > MAX_PARTICIPANT_ID_CHARS {
        return Err(ApiError::BadRequest(format!(
            "participant_id exceeds {MAX_PARTICIPANT_ID_CHARS} characters"
        )));
    }
    Ok(())
}
