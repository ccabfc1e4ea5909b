//! Merge/validate engine.
//!
//! Applies an oracle fragment to an interview record. Vital signs are range
//! checked field by field and an invalid value never replaces a valid one.
//! Symptom proposals are keyed by name: a known name merges into its slot,
//! an unknown name gets the next slot. Re-applying a fragment is a no-op.

use serde::{Deserialize, Serialize};

use crate::models::enums::{Gender, Severity, SymptomStatus};
use crate::models::{
    valid_age, valid_diastolic, valid_systolic, valid_temperature, InterviewRecord, SlotIndex,
    SymptomEntry, VitalField,
};

/// Raw vital-sign values as the oracle reported them, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsFragment {
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub temperature: Option<f64>,
    pub systolic_bp: Option<i64>,
    pub diastolic_bp: Option<i64>,
}

/// A proposed symptom update. `provisional_slot` is the oracle's own
/// numbering and carries no meaning for slot allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomProposal {
    pub provisional_slot: Option<u32>,
    pub name: String,
    pub status: String,
    pub severity: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
}

impl SymptomProposal {
    /// Confirmed symptom with nothing else known.
    pub fn present(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: SymptomStatus::Present.as_str().to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFragment {
    pub vitals: VitalsFragment,
    pub symptoms: Vec<SymptomProposal>,
}

impl RecordFragment {
    pub fn vitals_only(&self) -> Self {
        Self {
            vitals: self.vitals.clone(),
            symptoms: Vec::new(),
        }
    }

    pub fn symptoms_only(&self) -> Self {
        Self {
            vitals: VitalsFragment::default(),
            symptoms: self.symptoms.clone(),
        }
    }
}

/// What a merge did, for logging and follow-up prompts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub vitals_updated: Vec<VitalField>,
    /// Vital fields whose proposed value failed validation.
    pub vitals_rejected: Vec<VitalField>,
    pub symptoms_inserted: Vec<SlotIndex>,
    pub symptoms_updated: Vec<SlotIndex>,
    /// Proposals dropped for an empty name or unknown status.
    pub proposals_rejected: usize,
    /// Symptom detail values dropped by validation (unknown severity words).
    pub values_dropped: usize,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        !self.vitals_updated.is_empty()
            || !self.symptoms_inserted.is_empty()
            || !self.symptoms_updated.is_empty()
    }
}

/// Values the oracle uses to mean "not known".
pub fn is_unknown_sentinel(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("unknown") || v.eq_ignore_ascii_case("null")
}

fn known_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !is_unknown_sentinel(v))
        .map(|v| v.trim().to_string())
}

/// Apply `fragment` to `record` in place.
///
/// `updated_at` only moves when the record content actually changes.
pub fn apply_fragment(record: &mut InterviewRecord, fragment: &RecordFragment) -> MergeReport {
    let mut report = MergeReport::default();
    let before_vitals = record.vitals.clone();
    let before_symptoms = record.symptoms.clone();

    merge_vitals(record, &fragment.vitals, &mut report);
    for proposal in &fragment.symptoms {
        merge_symptom(record, proposal, &mut report);
    }

    if record.vitals != before_vitals || record.symptoms != before_symptoms {
        record.touch();
    }
    report
}

fn merge_vitals(record: &mut InterviewRecord, fragment: &VitalsFragment, report: &mut MergeReport) {
    let vitals = &mut record.vitals;

    if let Some(raw) = fragment.age {
        match valid_age(raw) {
            Some(v) => set_field(&mut vitals.age, v, VitalField::Age, report),
            None => report.vitals_rejected.push(VitalField::Age),
        }
    }
    if let Some(raw) = fragment.gender.as_deref().filter(|g| !is_unknown_sentinel(g)) {
        match Gender::parse_loose(raw) {
            Some(v) => set_field(&mut vitals.gender, v, VitalField::Gender, report),
            None => report.vitals_rejected.push(VitalField::Gender),
        }
    }
    if let Some(raw) = fragment.temperature {
        match valid_temperature(raw) {
            Some(v) => set_field(&mut vitals.temperature, v, VitalField::Temperature, report),
            None => report.vitals_rejected.push(VitalField::Temperature),
        }
    }
    if let Some(raw) = fragment.systolic_bp {
        match valid_systolic(raw) {
            Some(v) => set_field(&mut vitals.systolic_bp, v, VitalField::SystolicBp, report),
            None => report.vitals_rejected.push(VitalField::SystolicBp),
        }
    }
    if let Some(raw) = fragment.diastolic_bp {
        match valid_diastolic(raw) {
            Some(v) => set_field(&mut vitals.diastolic_bp, v, VitalField::DiastolicBp, report),
            None => report.vitals_rejected.push(VitalField::DiastolicBp),
        }
    }
}

fn set_field<T: PartialEq>(slot: &mut Option<T>, value: T, field: VitalField, report: &mut MergeReport) {
    if slot.as_ref() != Some(&value) {
        *slot = Some(value);
        report.vitals_updated.push(field);
    }
}

fn merge_symptom(record: &mut InterviewRecord, proposal: &SymptomProposal, report: &mut MergeReport) {
    let name = proposal.name.trim();
    let status = SymptomStatus::parse_loose(&proposal.status);
    if is_unknown_sentinel(name) || status == SymptomStatus::Unknown {
        report.proposals_rejected += 1;
        return;
    }

    let severity = match known_text(&proposal.severity) {
        Some(raw) => match Severity::parse_loose(&raw) {
            Some(s) => Some(s),
            None => {
                report.values_dropped += 1;
                None
            }
        },
        None => None,
    };
    let duration = known_text(&proposal.duration);
    let description = known_text(&proposal.description);

    match record.find_symptom(name) {
        Some(slot) => {
            let Some(entry) = record.symptoms.get_mut(&slot) else {
                return;
            };
            let before = entry.clone();
            entry.status = status;
            if severity.is_some() {
                entry.severity = severity;
            }
            if duration.is_some() {
                entry.duration = duration;
            }
            if description.is_some() {
                entry.description = description;
            }
            if *entry != before {
                report.symptoms_updated.push(slot);
            }
        }
        None => {
            let slot = record.next_slot();
            record.symptoms.insert(
                slot,
                SymptomEntry {
                    name: name.to_string(),
                    status,
                    severity,
                    duration,
                    description,
                },
            );
            report.symptoms_inserted.push(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(name: &str, status: &str) -> SymptomProposal {
        SymptomProposal {
            name: name.into(),
            status: status.into(),
            ..SymptomProposal::default()
        }
    }

    #[test]
    fn valid_vitals_are_stored() {
        let mut record = InterviewRecord::new();
        let fragment = RecordFragment {
            vitals: VitalsFragment {
                age: Some(45),
                gender: Some("Female".into()),
                temperature: Some(38.5),
                systolic_bp: Some(150),
                diastolic_bp: Some(95),
            },
            symptoms: vec![],
        };
        let report = apply_fragment(&mut record, &fragment);
        assert_eq!(report.vitals_updated.len(), 5);
        assert_eq!(record.vitals.age, Some(45));
        assert_eq!(record.vitals.gender, Some(Gender::Female));
        assert_eq!(record.vitals.temperature, Some(38.5));
        assert_eq!(record.vitals.systolic_bp, Some(150));
        assert_eq!(record.vitals.diastolic_bp, Some(95));
    }

    #[test]
    fn out_of_range_vitals_never_stored() {
        let mut record = InterviewRecord::new();
        record.vitals.temperature = Some(37.0);
        let fragment = RecordFragment {
            vitals: VitalsFragment {
                age: Some(150),
                temperature: Some(50.0),
                systolic_bp: Some(20),
                ..VitalsFragment::default()
            },
            symptoms: vec![],
        };
        let report = apply_fragment(&mut record, &fragment);
        assert_eq!(record.vitals.age, None);
        assert_eq!(record.vitals.temperature, Some(37.0));
        assert_eq!(record.vitals.systolic_bp, None);
        assert_eq!(
            report.vitals_rejected,
            vec![VitalField::Age, VitalField::Temperature, VitalField::SystolicBp]
        );
        assert!(!report.changed());
    }

    #[test]
    fn unknown_gender_sentinel_is_ignored() {
        let mut record = InterviewRecord::new();
        record.vitals.gender = Some(Gender::Male);
        let fragment = RecordFragment {
            vitals: VitalsFragment {
                gender: Some("unknown".into()),
                ..VitalsFragment::default()
            },
            symptoms: vec![],
        };
        let report = apply_fragment(&mut record, &fragment);
        assert_eq!(record.vitals.gender, Some(Gender::Male));
        assert!(report.vitals_rejected.is_empty());
    }

    #[test]
    fn slots_are_allocated_sequentially() {
        let mut record = InterviewRecord::new();
        let fragment = RecordFragment {
            vitals: VitalsFragment::default(),
            symptoms: vec![
                proposal("fever", "yes"),
                proposal("cough", "yes"),
                proposal("headache", "no"),
            ],
        };
        let report = apply_fragment(&mut record, &fragment);
        assert_eq!(report.symptoms_inserted, vec![1, 2, 3]);
        assert_eq!(record.symptoms[&1].name, "fever");
        assert_eq!(record.symptoms[&2].name, "cough");
        assert_eq!(record.symptoms[&3].name, "headache");
        assert_eq!(record.symptoms[&3].status, SymptomStatus::Absent);
    }

    #[test]
    fn no_duplicate_names_after_repeated_mentions() {
        let mut record = InterviewRecord::new();
        for _ in 0..3 {
            apply_fragment(
                &mut record,
                &RecordFragment {
                    vitals: VitalsFragment::default(),
                    symptoms: vec![proposal("cough", "present"), proposal("cough", "present")],
                },
            );
        }
        assert_eq!(record.symptoms.len(), 1);
        assert_eq!(record.next_slot(), 2);
    }

    #[test]
    fn merge_keeps_prior_details_when_proposal_is_unknown() {
        let mut record = InterviewRecord::new();
        apply_fragment(
            &mut record,
            &RecordFragment {
                vitals: VitalsFragment::default(),
                symptoms: vec![SymptomProposal {
                    severity: Some("moderate".into()),
                    duration: Some("3 days".into()),
                    ..proposal("cough", "yes")
                }],
            },
        );
        let report = apply_fragment(
            &mut record,
            &RecordFragment {
                vitals: VitalsFragment::default(),
                symptoms: vec![SymptomProposal {
                    severity: Some("unknown".into()),
                    duration: Some("".into()),
                    description: Some("dry and tickly".into()),
                    ..proposal("cough", "yes")
                }],
            },
        );
        let entry = &record.symptoms[&1];
        assert_eq!(entry.severity, Some(Severity::Moderate));
        assert_eq!(entry.duration.as_deref(), Some("3 days"));
        assert_eq!(entry.description.as_deref(), Some("dry and tickly"));
        assert_eq!(report.symptoms_updated, vec![1]);
    }

    #[test]
    fn speculative_proposals_are_rejected() {
        let mut record = InterviewRecord::new();
        let report = apply_fragment(
            &mut record,
            &RecordFragment {
                vitals: VitalsFragment::default(),
                symptoms: vec![
                    proposal("", "yes"),
                    proposal("unknown", "yes"),
                    proposal("nausea", "null"),
                    proposal("nausea", ""),
                ],
            },
        );
        assert!(record.symptoms.is_empty());
        assert_eq!(report.proposals_rejected, 4);
    }

    #[test]
    fn rejected_proposal_does_not_touch_existing_entry() {
        let mut record = InterviewRecord::new();
        apply_fragment(
            &mut record,
            &RecordFragment {
                vitals: VitalsFragment::default(),
                symptoms: vec![proposal("nausea", "yes")],
            },
        );
        apply_fragment(
            &mut record,
            &RecordFragment {
                vitals: VitalsFragment::default(),
                symptoms: vec![proposal("nausea", "unknown")],
            },
        );
        assert_eq!(record.symptoms[&1].status, SymptomStatus::Present);
    }

    #[test]
    fn invalid_severity_is_dropped() {
        let mut record = InterviewRecord::new();
        let report = apply_fragment(
            &mut record,
            &RecordFragment {
                vitals: VitalsFragment::default(),
                symptoms: vec![SymptomProposal {
                    severity: Some("excruciating".into()),
                    ..proposal("back pain", "yes")
                }],
            },
        );
        assert_eq!(record.symptoms[&1].severity, None);
        assert_eq!(report.values_dropped, 1);
    }

    #[test]
    fn later_valid_update_wins() {
        let mut record = InterviewRecord::new();
        for temp in [38.0, 37.2] {
            apply_fragment(
                &mut record,
                &RecordFragment {
                    vitals: VitalsFragment {
                        temperature: Some(temp),
                        ..VitalsFragment::default()
                    },
                    symptoms: vec![],
                },
            );
        }
        assert_eq!(record.vitals.temperature, Some(37.2));
    }

    #[test]
    fn reapplying_a_fragment_is_a_no_op() {
        let mut record = InterviewRecord::new();
        let fragment = RecordFragment {
            vitals: VitalsFragment {
                age: Some(30),
                temperature: Some(39.1),
                ..VitalsFragment::default()
            },
            symptoms: vec![
                SymptomProposal {
                    severity: Some("mild".into()),
                    ..proposal("sore throat", "yes")
                },
                SymptomProposal {
                    duration: Some("2 days".into()),
                    ..proposal("sore throat", "yes")
                },
                proposal("rash", "no"),
            ],
        };
        apply_fragment(&mut record, &fragment);
        let once = record.clone();
        let report = apply_fragment(&mut record, &fragment);
        assert_eq!(record, once);
        assert!(!report.changed());
        assert_eq!(record.updated_at, once.updated_at);
    }
}
