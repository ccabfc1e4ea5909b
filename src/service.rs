//! Interview service: the transport-facing entry point.
//!
//! Wires the session registry, the oracle and the record store together.
//! One call to [`InterviewService::handle_turn`] is one participant turn:
//! resolve the engine, hold its lock for the whole turn, consult the oracle
//! off the runtime under a timeout, persist, reply.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::config::IntakeConfig;
use crate::db::{DatabaseError, RecordStore};
use crate::intake::{DialogueEngine, IntakeError, Phase, TransitionPolicy, TurnPlan};
use crate::models::{InterviewRecord, Turn};
use crate::oracle::{Oracle, OracleError, OracleReply, OracleRequest};
use crate::registry::{SessionRegistry, SharedEngine};

/// Upper bound on the oracle reachability check behind the health endpoint.
const ORACLE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReply {
    pub reply: String,
    pub phase: Phase,
}

pub struct InterviewService {
    registry: SessionRegistry,
    oracle: Arc<dyn Oracle>,
    store: Arc<dyn RecordStore>,
    config: IntakeConfig,
}

impl InterviewService {
    pub fn new(oracle: Arc<dyn Oracle>, store: Arc<dyn RecordStore>, config: IntakeConfig) -> Self {
        Self {
            registry: SessionRegistry::new(config.max_sessions),
            oracle,
            store,
            config,
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    fn policy(&self) -> TransitionPolicy {
        TransitionPolicy {
            min_detailed_symptoms: self.config.min_detailed_symptoms,
        }
    }

    /// Run one participant turn and return the reply text with the phase it leaves.
    pub async fn handle_turn(&self, participant_id: &str, message: &str) -> Result<TurnReply, IntakeError> {
        let (engine, mut guard) = self
            .resolve(participant_id, true)
            .await?
            .ok_or_else(|| IntakeError::RecordNotFound(participant_id.to_string()))?;
        tracing::info!(
            participant = %participant_id,
            phase = %guard.phase(),
            message_len = message.len(),
            "Turn received"
        );

        let mut retired = None;
        let mut ended = false;
        let reply = match guard.begin_turn(message) {
            TurnPlan::Reply(text) => text,
            TurnPlan::End(text) => {
                ended = true;
                text
            }
            TurnPlan::Consult(request) => {
                let outcome = self.consult(request).await;
                let result = guard.complete_turn(outcome, &self.policy());
                if result.report.changed() {
                    tracing::debug!(
                        participant = %participant_id,
                        record_id = %guard.record().id,
                        vitals_updated = result.report.vitals_updated.len(),
                        vitals_rejected = result.report.vitals_rejected.len(),
                        symptoms_inserted = result.report.symptoms_inserted.len(),
                        symptoms_updated = result.report.symptoms_updated.len(),
                        proposals_rejected = result.report.proposals_rejected,
                        "Record updated"
                    );
                }
                retired = result.retired;
                result.reply
            }
        };

        let mut to_save: Vec<InterviewRecord> = retired.into_iter().collect();
        if guard.needs_persist() {
            to_save.push(guard.record().clone());
        }
        let current_id = guard.record().id;
        let saves_current = to_save.iter().any(|r| r.id == current_id);
        let batches = to_save
            .into_iter()
            .map(|record| {
                let turns = guard.take_unsaved_turns(&record.id);
                (record, turns)
            })
            .collect();
        self.persist(participant_id, batches).await;
        if saves_current {
            guard.mark_stored();
            if guard.is_declined() {
                self.forget_turns(participant_id, current_id).await;
            }
        }

        let phase = guard.phase();
        drop(guard);
        if ended {
            self.registry.discard_if_same(participant_id, &engine)?;
            tracing::info!(participant = %participant_id, "Interview ended by participant");
        } else if phase == Phase::Terminated {
            tracing::info!(participant = %participant_id, "Interview terminated");
        }

        Ok(TurnReply { reply, phase })
    }

    /// Close the participant's interview and drop the engine. Returns false
    /// when there was nothing to end.
    ///
    /// The engine is ended under its own lock, so a turn already in flight
    /// finishes first and a later turn finds a terminated engine and starts a
    /// new interview instead of resuming this one.
    pub async fn end_interview(&self, participant_id: &str) -> Result<bool, IntakeError> {
        let Some((engine, mut guard)) = self.resolve(participant_id, false).await? else {
            return Ok(false);
        };

        guard.end();
        if guard.needs_persist() {
            let record = guard.record().clone();
            let turns = guard.take_unsaved_turns(&record.id);
            self.persist(participant_id, vec![(record, turns)]).await;
        }
        drop(guard);

        self.registry.discard_if_same(participant_id, &engine)?;
        tracing::info!(participant = %participant_id, "Interview ended");
        Ok(true)
    }

    /// Current record for the participant: the live engine's, else the stored active one.
    pub async fn snapshot(&self, participant_id: &str) -> Result<InterviewRecord, IntakeError> {
        if let Some(engine) = self.registry.get(participant_id)? {
            let guard = engine.lock().await;
            return Ok(guard.record().clone());
        }
        self.load(participant_id)
            .await?
            .map(|(record, _)| record)
            .ok_or_else(|| IntakeError::RecordNotFound(participant_id.to_string()))
    }

    /// Whether the oracle backend can answer right now.
    pub async fn oracle_available(&self) -> bool {
        let oracle = Arc::clone(&self.oracle);
        let task = tokio::task::spawn_blocking(move || oracle.is_available());

        match tokio::time::timeout(ORACLE_CHECK_TIMEOUT, task).await {
            Ok(Ok(Ok(available))) => available,
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "Oracle availability check failed");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Oracle availability task failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = ORACLE_CHECK_TIMEOUT.as_secs(),
                    "Oracle availability check timed out"
                );
                false
            }
        }
    }

    /// Drop engines idle longer than the configured timeout.
    pub fn evict_idle(&self) -> Result<usize, IntakeError> {
        let evicted = self.registry.evict_idle(self.config.session_idle_timeout)?;
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.registry.len(), "Idle sessions evicted");
        }
        Ok(evicted)
    }

    /// Locked live engine for the participant. A terminated engine is
    /// discarded and replaced. When no engine is live, one is built from the
    /// stored active record; without a stored record a blank interview is
    /// started only if `start_new` is set.
    async fn resolve(
        &self,
        participant_id: &str,
        start_new: bool,
    ) -> Result<Option<(SharedEngine, OwnedMutexGuard<DialogueEngine>)>, IntakeError> {
        loop {
            let engine = match self.registry.get(participant_id)? {
                Some(engine) => engine,
                None => {
                    let stored = self.load(participant_id).await?;
                    if stored.is_none() && !start_new {
                        return Ok(None);
                    }
                    let window = self.config.history_window;
                    let (engine, created) =
                        self.registry.get_or_insert_with(participant_id, || match stored {
                            Some((record, turns)) => {
                                DialogueEngine::resume(participant_id, record, turns, window)
                            }
                            None => DialogueEngine::new(participant_id, InterviewRecord::new(), window),
                        })?;
                    if created {
                        tracing::debug!(participant = %participant_id, "Dialogue engine created");
                    }
                    engine
                }
            };

            let guard = Arc::clone(&engine).lock_owned().await;
            if !guard.is_terminated() {
                return Ok(Some((engine, guard)));
            }
            drop(guard);
            self.registry.discard_if_same(participant_id, &engine)?;
        }
    }

    async fn consult(&self, request: OracleRequest) -> Result<OracleReply, OracleError> {
        let oracle = Arc::clone(&self.oracle);
        let timeout = self.config.oracle_timeout;
        let task = tokio::task::spawn_blocking(move || oracle.interpret(&request));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(OracleError::Unavailable(format!("oracle task failed: {e}"))),
            Err(_) => Err(OracleError::Timeout(timeout.as_secs())),
        }
    }

    /// Stored active record with its latest turns.
    async fn load(&self, participant_id: &str) -> Result<Option<(InterviewRecord, Vec<Turn>)>, IntakeError> {
        let store = Arc::clone(&self.store);
        let id = participant_id.to_string();
        let window = self.config.history_window;
        tokio::task::spawn_blocking(move || -> Result<_, DatabaseError> {
            let Some(record) = store.load(&id)? else {
                return Ok(None);
            };
            let turns = store.recent_turns(&record.id, window)?;
            Ok(Some((record, turns)))
        })
        .await
        .map_err(|e| IntakeError::TaskFailed(e.to_string()))?
        .map_err(IntakeError::from)
    }

    /// Save records in order, each followed by its new turns. Failures are
    /// logged; the turn's reply stands.
    async fn persist(&self, participant_id: &str, batches: Vec<(InterviewRecord, Vec<Turn>)>) {
        if batches.is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        let id = participant_id.to_string();
        let result = tokio::task::spawn_blocking(move || -> Result<(), DatabaseError> {
            for (record, turns) in &batches {
                store.save(&id, record)?;
                if !turns.is_empty() {
                    store.append_turns(&id, &record.id, turns)?;
                }
            }
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(participant = %participant_id, error = %e, "Failed to persist interview record");
            }
            Err(e) => {
                tracing::error!(participant = %participant_id, error = %e, "Persist task failed");
            }
        }
    }

    /// Delete a declined record's stored conversation.
    async fn forget_turns(&self, participant_id: &str, record_id: Uuid) {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || store.clear_turns(&record_id)).await;

        match result {
            Ok(Ok(())) => {
                tracing::info!(participant = %participant_id, record_id = %record_id, "Declined interview log deleted");
            }
            Ok(Err(e)) => {
                tracing::error!(participant = %participant_id, error = %e, "Failed to delete interview log");
            }
            Err(e) => {
                tracing::error!(participant = %participant_id, error = %e, "Log deletion task failed");
            }
        }
    }
}
