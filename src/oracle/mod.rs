//! Language understanding oracle: the external service that turns a free
//! text reply into structured data for the current phase.
//!
//! The interview core only sees the [`Oracle`] trait. [`LlmOracle`] drives
//! a local Ollama model; [`ScriptedOracle`] replays canned replies.

pub mod ollama;
pub mod parser;
pub mod prompt;
pub mod scripted;

pub use ollama::{LlmClient, MockLlmClient, OllamaClient};
pub use scripted::ScriptedOracle;

use serde::Serialize;
use thiserror::Error;

use crate::intake::phase::Phase;
use crate::intake::RecordFragment;
use crate::models::enums::IdentityRole;
use crate::models::{InterviewRecord, SlotIndex, SymptomDetail, Turn, VitalField};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("Oracle returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

// ═══════════════════════════════════════════════════════════
// Request
// ═══════════════════════════════════════════════════════════

/// The detail the interview is currently asking about, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingDetail {
    pub slot: SlotIndex,
    pub symptom: String,
    pub detail: SymptomDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseContext {
    pub phase: Phase,
    pub role: Option<IdentityRole>,
    pub pending_vital: Option<VitalField>,
    pub pending_detail: Option<PendingDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleRequest {
    pub context: PhaseContext,
    /// Snapshot of the record before this turn.
    pub record: InterviewRecord,
    /// Prior turns, newest first. Does not include `message`.
    pub recent_turns: Vec<Turn>,
    pub message: String,
}

// ═══════════════════════════════════════════════════════════
// Reply
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentDecision {
    Agree,
    Disagree,
    Unclear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationDecision {
    Confirmed,
    /// Blank these fields and collect them again.
    Modify(Vec<VitalField>),
    Unclear,
}

/// Structured interpretation of one participant message. Each variant
/// belongs to exactly one phase.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    Consent(ConsentDecision),
    Identity {
        role: Option<IdentityRole>,
        is_valid: bool,
    },
    Vitals(RecordFragment),
    Confirmation(ConfirmationDecision),
    Symptoms(RecordFragment),
}

impl OracleReply {
    /// Phase this reply answers.
    pub fn phase(&self) -> Phase {
        match self {
            OracleReply::Consent(_) => Phase::AwaitingConsent,
            OracleReply::Identity { .. } => Phase::AwaitingIdentity,
            OracleReply::Vitals(_) => Phase::CollectingVitals,
            OracleReply::Confirmation(_) => Phase::ConfirmingVitals,
            OracleReply::Symptoms(_) => Phase::CollectingSymptoms,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Oracle seam
// ═══════════════════════════════════════════════════════════

/// Interprets a participant message for the phase described in the request.
/// Implementations may block; callers run them off the async runtime.
pub trait Oracle: Send + Sync {
    fn interpret(&self, request: &OracleRequest) -> Result<OracleReply, OracleError>;

    /// Whether the backend can currently answer. Used by health checks.
    fn is_available(&self) -> Result<bool, OracleError> {
        Ok(true)
    }
}

/// Oracle backed by a generative model behind [`LlmClient`].
pub struct LlmOracle<C: LlmClient> {
    client: C,
    model: String,
}

impl<C: LlmClient> LlmOracle<C> {
    pub fn new(client: C, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

impl<C: LlmClient + Send + Sync> Oracle for LlmOracle<C> {
    fn interpret(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        let phase = request.context.phase;
        let system = prompt::system_prompt(phase);
        let user = prompt::build_user_prompt(request);

        let raw = self.client.generate(&self.model, &user, system)?;
        tracing::debug!(phase = phase.as_str(), response_len = raw.len(), "Oracle responded");

        parser::parse_reply(phase, &raw)
    }

    fn is_available(&self) -> Result<bool, OracleError> {
        self.client.is_model_available(&self.model)
    }
}
