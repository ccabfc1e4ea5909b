//! Per-participant dialogue engine.
//!
//! A turn runs in two steps so the oracle can be called without holding
//! anything but the engine itself: [`DialogueEngine::begin_turn`] decides
//! whether the oracle is needed and builds its request, and
//! [`DialogueEngine::complete_turn`] applies the outcome.
//!
//! The engine also buffers every turn it logs until the caller persists the
//! record the turn belongs to. Turns of a record that is never stored (an
//! interview declined before consent) are never written. A declined record
//! drops its buffered turns too.

use uuid::Uuid;

use crate::models::{InterviewRecord, Turn};
use crate::oracle::{OracleError, OracleReply, OracleRequest, PendingDetail, PhaseContext};

use super::completion::{first_missing_detail, next_missing_vital};
use super::history::TurnHistory;
use super::phase::{reprompt, transition, DialogueState, Phase, TerminationReason, TransitionPolicy};
use super::prompts;
use super::{IntakeError, MergeReport};

/// Failures in a row after which the participant gets the generic retry message.
pub const GENERIC_RETRY_AFTER: u32 = 2;

/// What the caller must do to finish a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPlan {
    /// Answer directly, no oracle needed.
    Reply(String),
    /// Interpret the message with the oracle, then call `complete_turn`.
    Consult(OracleRequest),
    /// The participant ended the interview.
    End(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub report: MergeReport,
    /// A stored record replaced during this turn, already closed. Persist it too.
    pub retired: Option<InterviewRecord>,
}

pub struct DialogueEngine {
    participant_id: String,
    state: DialogueState,
    record: InterviewRecord,
    history: TurnHistory,
    /// Turns not yet written, tagged with the record they belong to.
    unsaved_turns: Vec<(Uuid, Turn)>,
    /// The current record has a row in the store.
    stored: bool,
    greeted: bool,
    consecutive_failures: u32,
}

impl DialogueEngine {
    /// Fresh engine at consent with a record that has never been stored.
    pub fn new(participant_id: &str, record: InterviewRecord, history_window: usize) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            state: DialogueState::AwaitingConsent,
            record,
            history: TurnHistory::new(history_window),
            unsaved_turns: Vec::new(),
            stored: false,
            greeted: false,
            consecutive_failures: 0,
        }
    }

    /// Engine at consent for an active record loaded from the store.
    /// `turns` are the record's latest logged turns, oldest first.
    pub fn resume(
        participant_id: &str,
        record: InterviewRecord,
        turns: Vec<Turn>,
        history_window: usize,
    ) -> Self {
        let mut engine = Self::new(participant_id, record, history_window);
        for turn in turns {
            engine.history.push(turn);
        }
        engine.stored = true;
        engine
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn record(&self) -> &InterviewRecord {
        &self.record
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    /// The participant refused consent; nothing of this interview may be kept.
    pub fn is_declined(&self) -> bool {
        matches!(
            self.state,
            DialogueState::Terminated {
                reason: TerminationReason::Declined
            }
        )
    }

    pub fn mark_stored(&mut self) {
        self.stored = true;
    }

    /// Whether the current record must be written after this turn: it is
    /// already stored, or the participant consented and the interview is live.
    pub fn needs_persist(&self) -> bool {
        self.stored || (self.state.consent_confirmed() && !self.state.is_terminated())
    }

    /// Drain the buffered turns of one record, in the order they were said.
    pub fn take_unsaved_turns(&mut self, record_id: &Uuid) -> Vec<Turn> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.unsaved_turns)
            .into_iter()
            .partition(|(id, _)| id == record_id);
        self.unsaved_turns = kept;
        taken.into_iter().map(|(_, turn)| turn).collect()
    }

    /// Terminate the interview and close its record.
    pub fn end(&mut self) {
        self.state = DialogueState::Terminated {
            reason: TerminationReason::Ended,
        };
        self.record.close();
    }

    /// Record the inbound message and decide how to answer it.
    pub fn begin_turn(&mut self, message: &str) -> TurnPlan {
        let request = self.build_request(message);
        self.log(Turn::participant(message));

        if message.trim().eq_ignore_ascii_case("exit") {
            self.end();
            return TurnPlan::End(self.say(prompts::FAREWELL));
        }

        if !self.greeted {
            self.greeted = true;
            return TurnPlan::Reply(self.say(prompts::GREETING));
        }

        if self.is_terminated() {
            return TurnPlan::Reply(self.say(prompts::FAREWELL));
        }

        TurnPlan::Consult(request)
    }

    /// Apply the oracle's outcome and produce the reply text.
    ///
    /// Oracle failures never touch the record. A broken invariant restarts the
    /// interview at consent with a fresh record.
    pub fn complete_turn(
        &mut self,
        outcome: Result<OracleReply, OracleError>,
        policy: &TransitionPolicy,
    ) -> TurnOutcome {
        let result = outcome
            .map_err(IntakeError::from)
            .and_then(|reply| transition(&self.state, &self.record, &reply, policy));

        match result {
            Ok(t) => {
                self.consecutive_failures = 0;
                self.state = t.next;
                self.record = t.record;
                let reply = self.say(&t.prompt);
                if self.is_declined() {
                    let id = self.record.id;
                    self.unsaved_turns.retain(|(turn_record, _)| *turn_record != id);
                }
                TurnOutcome {
                    reply,
                    report: t.report,
                    retired: None,
                }
            }
            Err(IntakeError::PhaseInvariant(reason)) => {
                tracing::error!(
                    participant = %self.participant_id,
                    phase = %self.phase(),
                    reason = %reason,
                    "Phase invariant violated, restarting interview"
                );
                let mut retired = std::mem::take(&mut self.record);
                retired.close();
                self.state = DialogueState::AwaitingConsent;
                self.consecutive_failures = 0;
                let was_stored = std::mem::replace(&mut self.stored, false);
                if !was_stored {
                    self.unsaved_turns.retain(|(id, _)| *id != retired.id);
                }
                TurnOutcome {
                    reply: self.say(prompts::RESTART),
                    report: MergeReport::default(),
                    retired: was_stored.then_some(retired),
                }
            }
            Err(e) => {
                self.consecutive_failures += 1;
                tracing::warn!(
                    participant = %self.participant_id,
                    phase = %self.phase(),
                    failures = self.consecutive_failures,
                    error = %e,
                    "Turn could not be interpreted"
                );
                let text = if self.consecutive_failures >= GENERIC_RETRY_AFTER {
                    prompts::TRY_AGAIN.to_string()
                } else {
                    reprompt(&self.state, &self.record)
                };
                TurnOutcome {
                    reply: self.say(&text),
                    report: MergeReport::default(),
                    retired: None,
                }
            }
        }
    }

    fn build_request(&self, message: &str) -> OracleRequest {
        let pending_vital = match self.state {
            DialogueState::CollectingVitals { .. } => next_missing_vital(&self.record),
            _ => None,
        };
        let pending_detail = match self.state {
            DialogueState::CollectingSymptoms { .. } => {
                first_missing_detail(&self.record).and_then(|(slot, detail)| {
                    self.record.symptoms.get(&slot).map(|entry| PendingDetail {
                        slot,
                        symptom: entry.name.clone(),
                        detail,
                    })
                })
            }
            _ => None,
        };

        OracleRequest {
            context: PhaseContext {
                phase: self.phase(),
                role: self.state.role(),
                pending_vital,
                pending_detail,
            },
            record: self.record.clone(),
            recent_turns: self.history.most_recent_first(usize::MAX),
            message: message.to_string(),
        }
    }

    fn say(&mut self, text: &str) -> String {
        self.log(Turn::assistant(text));
        text.to_string()
    }

    fn log(&mut self, turn: Turn) {
        self.unsaved_turns.push((self.record.id, turn.clone()));
        self.history.push(turn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::merge::{RecordFragment, VitalsFragment};
    use crate::models::enums::IdentityRole;
    use crate::oracle::{ConfirmationDecision, ConsentDecision};

    fn policy() -> TransitionPolicy {
        TransitionPolicy::default()
    }

    fn greeted_engine() -> DialogueEngine {
        let mut engine = DialogueEngine::new("p1", InterviewRecord::new(), 10);
        assert_eq!(engine.begin_turn("hi"), TurnPlan::Reply(prompts::GREETING.to_string()));
        engine
    }

    fn consult(engine: &mut DialogueEngine, message: &str) -> OracleRequest {
        match engine.begin_turn(message) {
            TurnPlan::Consult(request) => request,
            other => panic!("expected oracle consult, got {other:?}"),
        }
    }

    fn engine_in_vitals() -> DialogueEngine {
        let mut engine = greeted_engine();
        consult(&mut engine, "yes");
        engine.complete_turn(Ok(OracleReply::Consent(ConsentDecision::Agree)), &policy());
        consult(&mut engine, "it's me");
        engine.complete_turn(
            Ok(OracleReply::Identity {
                role: Some(IdentityRole::Patient),
                is_valid: true,
            }),
            &policy(),
        );
        assert_eq!(engine.phase(), Phase::CollectingVitals);
        engine
    }

    fn engine_confirming_vitals() -> DialogueEngine {
        let mut engine = engine_in_vitals();
        consult(&mut engine, "45, female, 38.5, 150 over 95");
        engine.complete_turn(
            Ok(OracleReply::Vitals(RecordFragment {
                vitals: VitalsFragment {
                    age: Some(45),
                    gender: Some("female".into()),
                    temperature: Some(38.5),
                    systolic_bp: Some(150),
                    diastolic_bp: Some(95),
                },
                symptoms: vec![],
            })),
            &policy(),
        );
        assert_eq!(engine.phase(), Phase::ConfirmingVitals);
        engine
    }

    fn engine_in_symptoms() -> DialogueEngine {
        let mut engine = engine_confirming_vitals();
        consult(&mut engine, "yes, correct");
        engine.complete_turn(
            Ok(OracleReply::Confirmation(ConfirmationDecision::Confirmed)),
            &policy(),
        );
        assert_eq!(engine.phase(), Phase::CollectingSymptoms);
        engine
    }

    #[test]
    fn first_contact_gets_greeting_without_oracle() {
        let engine = greeted_engine();
        assert_eq!(engine.phase(), Phase::AwaitingConsent);
        assert_eq!(engine.history.len(), 2);
    }

    #[test]
    fn request_carries_phase_context_and_prior_turns() {
        let mut engine = engine_in_vitals();
        let request = consult(&mut engine, "I'm 45");
        assert_eq!(request.context.phase, Phase::CollectingVitals);
        assert_eq!(request.context.role, Some(IdentityRole::Patient));
        assert_eq!(request.context.pending_vital, Some(crate::models::VitalField::Age));
        assert_eq!(request.message, "I'm 45");
        assert_eq!(request.recent_turns[0].content, "What is your age?");
        assert!(request.recent_turns.iter().all(|t| t.content != "I'm 45"));
    }

    #[test]
    fn oracle_failure_leaves_record_identical() {
        let mut engine = engine_in_vitals();
        let before = engine.record().clone();
        consult(&mut engine, "45");
        let outcome = engine.complete_turn(
            Err(OracleError::Unavailable("connection refused".into())),
            &policy(),
        );
        assert_eq!(engine.record(), &before);
        assert_eq!(engine.phase(), Phase::CollectingVitals);
        assert_eq!(outcome.reply, "Sorry, I didn't catch that. What is your age?");
    }

    #[test]
    fn oracle_failure_while_confirming_leaves_record_identical() {
        let mut engine = engine_confirming_vitals();
        let before = engine.record().clone();
        consult(&mut engine, "yes");
        engine.complete_turn(Err(OracleError::MalformedResponse("not json".into())), &policy());
        assert_eq!(engine.record(), &before);
        assert_eq!(engine.phase(), Phase::ConfirmingVitals);
        assert_eq!(engine.consecutive_failures, 1);
    }

    #[test]
    fn oracle_failures_while_collecting_symptoms_leave_record_identical() {
        let mut engine = engine_in_symptoms();
        let before = engine.record().clone();
        assert!(before.has_symptom("fever"));
        assert!(before.has_symptom("hypertension"));

        consult(&mut engine, "it started on monday");
        engine.complete_turn(Err(OracleError::Timeout(60)), &policy());
        assert_eq!(engine.consecutive_failures, 1);

        consult(&mut engine, "it started on monday");
        let outcome = engine.complete_turn(
            Err(OracleError::Unavailable("connection refused".into())),
            &policy(),
        );
        assert_eq!(engine.record(), &before);
        assert_eq!(engine.phase(), Phase::CollectingSymptoms);
        assert_eq!(engine.consecutive_failures, 2);
        assert_eq!(outcome.reply, prompts::TRY_AGAIN);
        assert!(!outcome.report.changed());
    }

    #[test]
    fn second_consecutive_failure_is_generic() {
        let mut engine = engine_in_vitals();
        for _ in 0..2 {
            consult(&mut engine, "45");
            engine.complete_turn(Err(OracleError::Timeout(60)), &policy());
        }
        assert_eq!(engine.consecutive_failures, 2);
        assert_eq!(
            engine.history.most_recent_first(1)[0].content,
            prompts::TRY_AGAIN
        );

        consult(&mut engine, "45");
        engine.complete_turn(
            Ok(OracleReply::Vitals(RecordFragment {
                vitals: VitalsFragment {
                    age: Some(45),
                    ..VitalsFragment::default()
                },
                symptoms: vec![],
            })),
            &policy(),
        );
        assert_eq!(engine.consecutive_failures, 0);
        assert_eq!(engine.record().vitals.age, Some(45));
    }

    #[test]
    fn wrong_phase_reply_counts_as_failure() {
        let mut engine = engine_in_vitals();
        consult(&mut engine, "yes");
        let outcome = engine.complete_turn(
            Ok(OracleReply::Consent(ConsentDecision::Agree)),
            &policy(),
        );
        assert_eq!(engine.phase(), Phase::CollectingVitals);
        assert_eq!(engine.consecutive_failures, 1);
        assert!(outcome.retired.is_none());
    }

    #[test]
    fn exit_ends_from_any_phase() {
        let mut engine = engine_in_vitals();
        assert_eq!(
            engine.begin_turn("  EXIT "),
            TurnPlan::End(prompts::FAREWELL.to_string())
        );
        assert!(engine.is_terminated());
        assert!(engine.record().is_ended());
    }

    #[test]
    fn invariant_violation_restarts_with_fresh_record() {
        let mut engine = engine_in_vitals();
        engine.mark_stored();
        let old_id = engine.record().id;
        // Break the role invariant behind the engine's back.
        engine.record.role = None;

        consult(&mut engine, "45");
        let outcome = engine.complete_turn(
            Ok(OracleReply::Vitals(RecordFragment::default())),
            &policy(),
        );
        assert_eq!(outcome.reply, prompts::RESTART);
        assert_eq!(engine.phase(), Phase::AwaitingConsent);
        assert_ne!(engine.record().id, old_id);
        let retired = outcome.retired.unwrap();
        assert_eq!(retired.id, old_id);
        assert!(retired.is_ended());
        assert!(!engine.stored);

        // The failing message is logged against the retired record, the
        // restart notice against the fresh one.
        let old_turns = engine.take_unsaved_turns(&old_id);
        assert_eq!(old_turns.last().map(|t| t.content.as_str()), Some("45"));
        let new_id = engine.record().id;
        let new_turns = engine.take_unsaved_turns(&new_id);
        assert_eq!(new_turns.len(), 1);
        assert_eq!(new_turns[0].content, prompts::RESTART);
    }

    #[test]
    fn invariant_violation_before_storage_retires_nothing() {
        let mut engine = engine_in_vitals();
        let old_id = engine.record().id;
        engine.record.role = None;

        consult(&mut engine, "45");
        let outcome = engine.complete_turn(
            Ok(OracleReply::Vitals(RecordFragment::default())),
            &policy(),
        );
        assert!(outcome.retired.is_none());
        assert!(engine.take_unsaved_turns(&old_id).is_empty());
    }

    #[test]
    fn persistence_starts_at_consent() {
        let mut engine = greeted_engine();
        assert!(!engine.needs_persist());

        consult(&mut engine, "no");
        engine.complete_turn(Ok(OracleReply::Consent(ConsentDecision::Disagree)), &policy());
        assert!(engine.is_terminated());
        assert!(!engine.needs_persist());

        let mut engine = greeted_engine();
        consult(&mut engine, "yes");
        engine.complete_turn(Ok(OracleReply::Consent(ConsentDecision::Agree)), &policy());
        assert!(engine.needs_persist());
    }

    #[test]
    fn exit_before_consent_needs_no_persistence() {
        let mut engine = greeted_engine();
        engine.begin_turn("exit");
        assert!(engine.is_terminated());
        assert!(!engine.needs_persist());
    }

    #[test]
    fn unsaved_turns_drain_in_order() {
        let mut engine = greeted_engine();
        consult(&mut engine, "yes");
        engine.complete_turn(Ok(OracleReply::Consent(ConsentDecision::Agree)), &policy());

        let id = engine.record().id;
        let contents: Vec<String> = engine
            .take_unsaved_turns(&id)
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(
            contents,
            vec!["hi", prompts::GREETING, "yes", prompts::IDENTITY_QUESTION]
        );
        assert!(engine.take_unsaved_turns(&id).is_empty());
    }

    #[test]
    fn resumed_engine_is_stored_and_keeps_context() {
        let record = InterviewRecord::new();
        let turns = vec![Turn::participant("I'm 33"), Turn::assistant("What is your gender?")];
        let mut engine = DialogueEngine::resume("p1", record, turns, 10);
        assert!(engine.stored);
        assert!(engine.needs_persist());
        assert_eq!(engine.history.len(), 2);

        engine.begin_turn("hello");
        consult(&mut engine, "yes");
        let request = consult(&mut engine, "yes again");
        assert!(request.recent_turns.iter().any(|t| t.content == "I'm 33"));
    }

    #[test]
    fn declining_a_resumed_interview_drops_buffered_turns() {
        let mut engine = DialogueEngine::resume("p1", InterviewRecord::new(), vec![], 10);
        let id = engine.record().id;
        engine.begin_turn("hello");
        consult(&mut engine, "no, stop");
        engine.complete_turn(Ok(OracleReply::Consent(ConsentDecision::Disagree)), &policy());

        assert!(engine.is_declined());
        assert!(engine.needs_persist());
        assert!(engine.take_unsaved_turns(&id).is_empty());
        assert!(engine.record().is_ended());
    }

    #[test]
    fn history_is_bounded() {
        let mut engine = DialogueEngine::new("p1", InterviewRecord::new(), 4);
        engine.begin_turn("hi");
        for _ in 0..5 {
            consult(&mut engine, "hmm");
            engine.complete_turn(Ok(OracleReply::Consent(ConsentDecision::Unclear)), &policy());
        }
        assert_eq!(engine.history.len(), 4);
    }
}
