//! Phase state machine.
//!
//! The interview moves strictly forward through consent, identity, vitals,
//! confirmation and symptoms. The only backward edge is a correction from
//! confirmation to vitals collection. [`transition`] is pure: it takes the
//! current state and record plus the oracle's reply and returns the next
//! state, the next record and the prompt to send.

use serde::Serialize;

use crate::models::enums::IdentityRole;
use crate::models::{InterviewRecord, VitalField};
use crate::oracle::{ConfirmationDecision, ConsentDecision, OracleError, OracleReply};

use super::completion::{first_missing_detail, is_symptoms_complete, is_vitals_complete, next_missing_vital};
use super::hypotheses::{apply_vital_hypotheses, related_suggestions};
use super::merge::{apply_fragment, MergeReport};
use super::prompts;
use super::IntakeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingConsent,
    AwaitingIdentity,
    CollectingVitals,
    ConfirmingVitals,
    CollectingSymptoms,
    Terminated,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::AwaitingConsent => "awaiting_consent",
            Phase::AwaitingIdentity => "awaiting_identity",
            Phase::CollectingVitals => "collecting_vitals",
            Phase::ConfirmingVitals => "confirming_vitals",
            Phase::CollectingSymptoms => "collecting_symptoms",
            Phase::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Participant refused consent.
    Declined,
    /// Enough detailed symptoms were collected.
    Completed,
    /// Participant ended the interview.
    Ended,
}

/// Interview state. Phases after identity carry the confirmed role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    AwaitingConsent,
    AwaitingIdentity,
    CollectingVitals { role: IdentityRole },
    ConfirmingVitals { role: IdentityRole },
    CollectingSymptoms { role: IdentityRole },
    Terminated { reason: TerminationReason },
}

impl DialogueState {
    pub fn phase(&self) -> Phase {
        match self {
            DialogueState::AwaitingConsent => Phase::AwaitingConsent,
            DialogueState::AwaitingIdentity => Phase::AwaitingIdentity,
            DialogueState::CollectingVitals { .. } => Phase::CollectingVitals,
            DialogueState::ConfirmingVitals { .. } => Phase::ConfirmingVitals,
            DialogueState::CollectingSymptoms { .. } => Phase::CollectingSymptoms,
            DialogueState::Terminated { .. } => Phase::Terminated,
        }
    }

    pub fn role(&self) -> Option<IdentityRole> {
        match self {
            DialogueState::CollectingVitals { role }
            | DialogueState::ConfirmingVitals { role }
            | DialogueState::CollectingSymptoms { role } => Some(*role),
            _ => None,
        }
    }

    pub fn consent_confirmed(&self) -> bool {
        !matches!(
            self,
            DialogueState::AwaitingConsent
                | DialogueState::Terminated {
                    reason: TerminationReason::Declined
                }
        )
    }

    pub fn identity_confirmed(&self) -> bool {
        self.role().is_some()
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, DialogueState::Terminated { .. })
    }
}

/// Knobs the transition function needs from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPolicy {
    pub min_detailed_symptoms: usize,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            min_detailed_symptoms: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: DialogueState,
    pub record: InterviewRecord,
    pub prompt: String,
    pub report: MergeReport,
}

impl Transition {
    fn new(next: DialogueState, record: InterviewRecord, prompt: String) -> Self {
        Self {
            next,
            record,
            prompt,
            report: MergeReport::default(),
        }
    }
}

/// Compute the next state for an oracle reply.
///
/// A reply for a different phase is a malformed oracle response. A state
/// the record contradicts is a [`IntakeError::PhaseInvariant`].
pub fn transition(
    state: &DialogueState,
    record: &InterviewRecord,
    reply: &OracleReply,
    policy: &TransitionPolicy,
) -> Result<Transition, IntakeError> {
    if let DialogueState::Terminated { .. } = state {
        return Err(IntakeError::PhaseInvariant(
            "reply received after termination".to_string(),
        ));
    }
    if reply.phase() != state.phase() {
        return Err(OracleError::MalformedResponse(format!(
            "{} reply during {}",
            reply.phase(),
            state.phase()
        ))
        .into());
    }
    if let Some(role) = state.role() {
        if record.role != Some(role) {
            return Err(IntakeError::PhaseInvariant(format!(
                "record role {:?} does not match phase role {role}",
                record.role
            )));
        }
    }
    if record.is_complete {
        return Err(IntakeError::PhaseInvariant(
            "completed record in an active interview".to_string(),
        ));
    }

    let mut next_record = record.clone();

    let transition = match (state, reply) {
        (DialogueState::AwaitingConsent, OracleReply::Consent(decision)) => match decision {
            ConsentDecision::Agree => Transition::new(
                DialogueState::AwaitingIdentity,
                next_record,
                prompts::IDENTITY_QUESTION.to_string(),
            ),
            ConsentDecision::Disagree => Transition::new(
                DialogueState::Terminated {
                    reason: TerminationReason::Declined,
                },
                discard_contents(record),
                prompts::DECLINED.to_string(),
            ),
            ConsentDecision::Unclear => Transition::new(
                *state,
                next_record,
                prompts::CONSENT_REPROMPT.to_string(),
            ),
        },

        (DialogueState::AwaitingIdentity, OracleReply::Identity { role, is_valid }) => {
            match (role, is_valid) {
                (Some(role), true) => {
                    if next_record.role != Some(*role) {
                        next_record.role = Some(*role);
                        next_record.touch();
                    }
                    after_vitals_update(*role, next_record, MergeReport::default())
                }
                _ => Transition::new(
                    *state,
                    next_record,
                    prompts::IDENTITY_REPROMPT.to_string(),
                ),
            }
        }

        (DialogueState::CollectingVitals { role }, OracleReply::Vitals(fragment)) => {
            let report = apply_fragment(&mut next_record, &fragment.vitals_only());
            after_vitals_update(*role, next_record, report)
        }

        (DialogueState::ConfirmingVitals { role }, OracleReply::Confirmation(decision)) => {
            if !is_vitals_complete(&next_record) {
                return Err(IntakeError::PhaseInvariant(
                    "confirming incomplete vital signs".to_string(),
                ));
            }
            match decision {
                ConfirmationDecision::Confirmed => {
                    let report = apply_vital_hypotheses(&mut next_record);
                    let noted: Vec<&str> = report
                        .symptoms_inserted
                        .iter()
                        .filter_map(|slot| next_record.symptoms.get(slot))
                        .map(|entry| entry.name.as_str())
                        .collect();
                    let intro = prompts::symptoms_intro(*role, &noted);
                    let mut t = symptom_step(*role, next_record, policy);
                    t.prompt = format!("{intro} {}", t.prompt);
                    t.report = report;
                    t
                }
                ConfirmationDecision::Modify(fields) if !fields.is_empty() => {
                    for field in fields {
                        next_record.vitals.clear(*field);
                    }
                    next_record.touch();
                    let first = next_missing_vital(&next_record).unwrap_or(fields[0]);
                    Transition::new(
                        DialogueState::CollectingVitals { role: *role },
                        next_record,
                        prompts::correction_intro(*role, first),
                    )
                }
                _ => {
                    let prompt = prompts::confirmation_reprompt(*role, &next_record.vitals);
                    Transition::new(*state, next_record, prompt)
                }
            }
        }

        (DialogueState::CollectingSymptoms { role }, OracleReply::Symptoms(fragment)) => {
            let report = apply_fragment(&mut next_record, &fragment.symptoms_only());
            let mut t = symptom_step(*role, next_record, policy);
            t.report = report;
            t
        }

        _ => {
            return Err(OracleError::MalformedResponse(format!(
                "{} reply during {}",
                reply.phase(),
                state.phase()
            ))
            .into())
        }
    };

    Ok(transition)
}

/// Prompt that re-asks the current phase's requirement after a failed turn.
pub fn reprompt(state: &DialogueState, record: &InterviewRecord) -> String {
    match state {
        DialogueState::AwaitingConsent => prompts::CONSENT_REPROMPT.to_string(),
        DialogueState::AwaitingIdentity => prompts::IDENTITY_REPROMPT.to_string(),
        DialogueState::CollectingVitals { role } => {
            let field = next_missing_vital(record).unwrap_or(VitalField::Age);
            format!("Sorry, I didn't catch that. {}", prompts::vital_question(*role, field))
        }
        DialogueState::ConfirmingVitals { role } => {
            prompts::confirmation_reprompt(*role, &record.vitals)
        }
        DialogueState::CollectingSymptoms { role } => {
            format!("Sorry, I didn't catch that. {}", next_symptom_question(*role, record))
        }
        DialogueState::Terminated { .. } => prompts::FAREWELL.to_string(),
    }
}

/// Stay in vitals collection until every field is known, then ask for confirmation.
fn after_vitals_update(role: IdentityRole, record: InterviewRecord, report: MergeReport) -> Transition {
    let notice = prompts::out_of_range_notice(&report.vitals_rejected);
    let (next, question) = match next_missing_vital(&record) {
        Some(field) => (
            DialogueState::CollectingVitals { role },
            prompts::vital_question(role, field),
        ),
        None => (
            DialogueState::ConfirmingVitals { role },
            prompts::vitals_summary(role, &record.vitals),
        ),
    };
    let prompt = match notice {
        Some(notice) => format!("{notice} {question}"),
        None => question,
    };
    Transition {
        next,
        record,
        prompt,
        report,
    }
}

fn symptom_step(role: IdentityRole, mut record: InterviewRecord, policy: &TransitionPolicy) -> Transition {
    if is_symptoms_complete(&record, policy.min_detailed_symptoms) {
        record.is_complete = true;
        record.close();
        return Transition::new(
            DialogueState::Terminated {
                reason: TerminationReason::Completed,
            },
            record,
            prompts::closing(role),
        );
    }
    let prompt = next_symptom_question(role, &record);
    Transition::new(DialogueState::CollectingSymptoms { role }, record, prompt)
}

/// Ask for the first missing detail of a present symptom, otherwise for more symptoms.
fn next_symptom_question(role: IdentityRole, record: &InterviewRecord) -> String {
    match first_missing_detail(record) {
        Some((slot, detail)) => {
            let name = record
                .symptoms
                .get(&slot)
                .map(|entry| entry.name.as_str())
                .unwrap_or("symptom");
            prompts::detail_question(role, name, detail)
        }
        None => prompts::other_symptoms_question(role, &related_suggestions(record)),
    }
}

/// Same record identity with every collected value dropped, closed.
fn discard_contents(record: &InterviewRecord) -> InterviewRecord {
    let mut cleared = InterviewRecord {
        id: record.id,
        created_at: record.created_at,
        ..InterviewRecord::new()
    };
    cleared.close();
    cleared
}
