//! Per-phase prompts for the LLM oracle.

use std::fmt::Write;

use crate::intake::phase::Phase;
use crate::models::enums::TurnRole;
use crate::models::{SymptomDetail, SymptomEntry};

use super::OracleRequest;

const CONSENT_SYSTEM: &str = r#"You classify whether a person agrees to take part in a medical intake interview.
Respond ONLY with JSON of the form:
{"response_type": "explicit_agree" | "explicit_disagree" | "unclear"}
Use "explicit_agree" only for a clear yes and "explicit_disagree" only for a clear no."#;

const IDENTITY_SYSTEM: &str = r#"You identify who a medical intake interview is for.
"self" means the speaker is the patient, "family" means a relative of the patient is answering,
"caregiver" means a professional or informal carer is answering. Use "unknown" if unsure.
Respond ONLY with JSON of the form:
{"identity": "self" | "family" | "caregiver" | "unknown", "is_valid": true | false}
Set "is_valid" to true only when the identity is clear."#;

const VITALS_SYSTEM: &str = r#"You extract vital signs from a reply in a medical intake interview.
Respond ONLY with JSON of the form:
{"vital_status": {"age": integer or null, "gender": "male" | "female" | "other" | null,
 "temperature": number in degrees Celsius or null, "systolic_bp": integer mmHg or null,
 "diastolic_bp": integer mmHg or null}}
Only fill values the person actually stated. Use null for anything not mentioned.
A blood pressure such as "130 over 85" gives systolic 130 and diastolic 85.
Convert Fahrenheit temperatures to Celsius. Never guess."#;

const CONFIRMATION_SYSTEM: &str = r#"The person was shown a summary of vital signs and asked whether it is correct.
Respond ONLY with JSON of the form:
{"is_confirmed": true | false | null,
 "field_to_modify": "age" | "gender" | "temperature" | "systolic_bp" | "diastolic_bp" | "blood_pressure" | null}
"is_confirmed" is true when they accept the summary, false when they want a change and null when unclear.
When false, name the value they want to change in "field_to_modify"."#;

const SYMPTOMS_SYSTEM: &str = r#"You extract symptoms from a reply in a medical intake interview.
Respond ONLY with JSON of the form:
{"symptoms": {"symptom_1": {"symptom_name": "lowercase name", "symptom_status": "yes" | "no" | null,
 "severity": "mild" | "moderate" | "severe" | null, "duration": text or null, "description": text or null}}}
Number the entries symptom_1, symptom_2 and so on. Reuse the exact name of a symptom already in the record
when the reply adds details to it. "symptom_status" is "yes" when the symptom is present, "no" when the person
says they do not have it, and null when unclear. Use null for any detail not stated. Return {"symptoms": {}}
when the reply mentions no symptom."#;

const TERMINATED_SYSTEM: &str = r#"The interview has ended. Respond ONLY with {}."#;

pub fn system_prompt(phase: Phase) -> &'static str {
    match phase {
        Phase::AwaitingConsent => CONSENT_SYSTEM,
        Phase::AwaitingIdentity => IDENTITY_SYSTEM,
        Phase::CollectingVitals => VITALS_SYSTEM,
        Phase::ConfirmingVitals => CONFIRMATION_SYSTEM,
        Phase::CollectingSymptoms => SYMPTOMS_SYSTEM,
        Phase::Terminated => TERMINATED_SYSTEM,
    }
}

/// Context block plus the participant's message.
pub fn build_user_prompt(request: &OracleRequest) -> String {
    let mut out = String::new();
    let ctx = &request.context;

    let _ = writeln!(out, "Interview phase: {}", ctx.phase);
    if let Some(role) = ctx.role {
        let _ = writeln!(out, "Speaker role: {role}");
    }
    if let Some(field) = ctx.pending_vital {
        let _ = writeln!(out, "The last question asked for: {field}");
    }
    if let Some(pending) = &ctx.pending_detail {
        let detail = match pending.detail {
            SymptomDetail::Severity => "severity",
            SymptomDetail::Duration => "duration",
            SymptomDetail::Description => "description",
        };
        let _ = writeln!(
            out,
            "The last question asked for the {detail} of \"{}\"",
            pending.symptom
        );
    }

    match ctx.phase {
        Phase::CollectingVitals | Phase::ConfirmingVitals => {
            let vitals = serde_json::to_string(&request.record.vitals).unwrap_or_default();
            let _ = writeln!(out, "Vital signs so far: {vitals}");
        }
        Phase::CollectingSymptoms => {
            let _ = writeln!(out, "Symptoms so far:");
            if request.record.symptoms.is_empty() {
                let _ = writeln!(out, "- none");
            }
            for entry in request.record.symptoms.values() {
                let _ = writeln!(out, "- {}", describe_symptom(entry));
            }
        }
        _ => {}
    }

    if !request.recent_turns.is_empty() {
        let _ = writeln!(out, "\nRecent conversation:");
        for turn in request.recent_turns.iter().rev() {
            let speaker = match turn.role {
                TurnRole::Participant => "Participant",
                TurnRole::Assistant => "Assistant",
            };
            let _ = writeln!(out, "{speaker}: {}", turn.content);
        }
    }

    let _ = write!(out, "\nParticipant reply: {}", request.message);
    out
}

fn describe_symptom(entry: &SymptomEntry) -> String {
    let unknown = "unknown";
    format!(
        "{} (status: {}, severity: {}, duration: {}, description: {})",
        entry.name,
        entry.status,
        entry.severity.map(|s| s.as_str()).unwrap_or(unknown),
        entry.duration.as_deref().unwrap_or(unknown),
        entry.description.as_deref().unwrap_or(unknown),
    )
}
