//! Interview core: merge/validate engine, completion evaluator, phase
//! state machine and the per-participant dialogue engine.

pub mod completion;
pub mod engine;
pub mod history;
pub mod hypotheses;
pub mod merge;
pub mod phase;
pub mod prompts;

pub use engine::{DialogueEngine, TurnOutcome, TurnPlan};
pub use merge::{apply_fragment, MergeReport, RecordFragment, SymptomProposal, VitalsFragment};
pub use phase::{DialogueState, Phase, TerminationReason, TransitionPolicy};

use thiserror::Error;

use crate::db::DatabaseError;
use crate::oracle::OracleError;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Phase invariant violated: {0}")]
    PhaseInvariant(String),

    #[error("No interview record for participant {0}")]
    RecordNotFound(String),

    #[error("Session lock poisoned")]
    LockPoisoned,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}
