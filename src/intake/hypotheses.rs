//! Symptom hypotheses: findings implied by the confirmed vital signs and
//! symptoms that commonly accompany ones already reported.

use crate::models::enums::SymptomStatus;
use crate::models::{InterviewRecord, VitalSigns};

use super::merge::{apply_fragment, MergeReport, RecordFragment, SymptomProposal};

pub const FEVER_AT: f64 = 38.0;
pub const HYPOTHERMIA_AT: f64 = 35.5;
pub const HYPERTENSION_SYSTOLIC_AT: u16 = 140;
pub const HYPERTENSION_DIASTOLIC_AT: u16 = 90;
pub const HYPOTENSION_SYSTOLIC_AT: u16 = 90;
pub const HYPOTENSION_DIASTOLIC_AT: u16 = 60;

/// Most suggestions offered in a single "other symptoms" question.
pub const MAX_SUGGESTIONS: usize = 2;

const RELATED_SYMPTOMS: &[(&str, &[&str])] = &[
    ("fever", &["chills", "body aches"]),
    ("hypothermia", &["shivering", "confusion"]),
    ("hypertension", &["headache", "dizziness"]),
    ("hypotension", &["dizziness", "fatigue"]),
    ("cough", &["sore throat", "shortness of breath"]),
    ("sore throat", &["cough", "runny nose"]),
    ("runny nose", &["sneezing", "sore throat"]),
    ("headache", &["nausea", "sensitivity to light"]),
    ("nausea", &["vomiting", "abdominal pain"]),
    ("vomiting", &["nausea", "diarrhea"]),
    ("diarrhea", &["abdominal pain", "vomiting"]),
    ("abdominal pain", &["nausea", "diarrhea"]),
    ("chest pain", &["shortness of breath", "palpitations"]),
    ("shortness of breath", &["chest pain", "cough"]),
    ("dizziness", &["fatigue", "nausea"]),
    ("fatigue", &["muscle aches", "loss of appetite"]),
    ("rash", &["itching", "fever"]),
];

/// Findings implied by the vital signs, in a stable order.
pub fn vital_hypotheses(vitals: &VitalSigns) -> Vec<&'static str> {
    let mut found = Vec::new();

    if let Some(temp) = vitals.temperature {
        if temp >= FEVER_AT {
            found.push("fever");
        } else if temp <= HYPOTHERMIA_AT {
            found.push("hypothermia");
        }
    }

    let systolic = vitals.systolic_bp;
    let diastolic = vitals.diastolic_bp;
    if systolic.is_some_and(|s| s >= HYPERTENSION_SYSTOLIC_AT)
        || diastolic.is_some_and(|d| d >= HYPERTENSION_DIASTOLIC_AT)
    {
        found.push("hypertension");
    }
    if systolic.is_some_and(|s| s <= HYPOTENSION_SYSTOLIC_AT)
        || diastolic.is_some_and(|d| d <= HYPOTENSION_DIASTOLIC_AT)
    {
        found.push("hypotension");
    }

    found
}

/// Insert the vital-sign hypotheses as present symptoms with no details.
/// Goes through the merge engine so an existing entry is never duplicated.
pub fn apply_vital_hypotheses(record: &mut InterviewRecord) -> MergeReport {
    let symptoms = vital_hypotheses(&record.vitals)
        .into_iter()
        .filter(|name| !record.has_symptom(name))
        .map(SymptomProposal::present)
        .collect();

    apply_fragment(
        record,
        &RecordFragment {
            symptoms,
            ..RecordFragment::default()
        },
    )
}

/// Symptoms that commonly accompany the present ones and are not yet in
/// the record, at most `MAX_SUGGESTIONS`.
pub fn related_suggestions(record: &InterviewRecord) -> Vec<&'static str> {
    let mut suggestions: Vec<&'static str> = Vec::new();

    for entry in record.symptoms.values() {
        if entry.status != SymptomStatus::Present {
            continue;
        }
        let Some((_, related)) = RELATED_SYMPTOMS.iter().find(|(name, _)| *name == entry.name) else {
            continue;
        };
        for &candidate in related.iter() {
            if suggestions.len() == MAX_SUGGESTIONS {
                return suggestions;
            }
            if !record.has_symptom(candidate) && !suggestions.contains(&candidate) {
                suggestions.push(candidate);
            }
        }
    }

    suggestions
}
