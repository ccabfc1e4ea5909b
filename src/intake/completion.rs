//! Completion evaluator. Pure functions over the record.

use crate::models::{InterviewRecord, SlotIndex, SymptomDetail, VitalField};

/// All five vital fields are known.
pub fn is_vitals_complete(record: &InterviewRecord) -> bool {
    next_missing_vital(record).is_none()
}

/// At least `minimum` entries are present with every detail known.
pub fn is_symptoms_complete(record: &InterviewRecord, minimum: usize) -> bool {
    detailed_symptom_count(record) >= minimum
}

pub fn detailed_symptom_count(record: &InterviewRecord) -> usize {
    record
        .symptoms
        .values()
        .filter(|entry| entry.is_fully_detailed())
        .count()
}

/// First unknown vital in collection order.
pub fn next_missing_vital(record: &InterviewRecord) -> Option<VitalField> {
    VitalField::ALL
        .into_iter()
        .find(|field| !record.vitals.is_known(*field))
}

/// Lowest-slot present symptom still missing a detail, with the detail to ask for.
pub fn first_missing_detail(record: &InterviewRecord) -> Option<(SlotIndex, SymptomDetail)> {
    record
        .symptoms
        .iter()
        .filter(|(_, entry)| entry.status == crate::models::enums::SymptomStatus::Present)
        .find_map(|(slot, entry)| entry.missing_detail().map(|detail| (*slot, detail)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{Gender, Severity, SymptomStatus};
    use crate::models::SymptomEntry;

    fn detailed(name: &str) -> SymptomEntry {
        SymptomEntry {
            name: name.into(),
            status: SymptomStatus::Present,
            severity: Some(Severity::Moderate),
            duration: Some("2 days".into()),
            description: Some("constant".into()),
        }
    }

    #[test]
    fn vitals_complete_flips_on_last_field() {
        let mut record = InterviewRecord::new();
        record.vitals.age = Some(60);
        record.vitals.gender = Some(Gender::Male);
        record.vitals.temperature = Some(36.8);
        record.vitals.systolic_bp = Some(130);
        assert!(!is_vitals_complete(&record));
        assert_eq!(next_missing_vital(&record), Some(VitalField::DiastolicBp));

        record.vitals.diastolic_bp = Some(85);
        assert!(is_vitals_complete(&record));
        assert_eq!(next_missing_vital(&record), None);
    }

    #[test]
    fn missing_vitals_are_asked_in_fixed_order() {
        let mut record = InterviewRecord::new();
        record.vitals.temperature = Some(37.0);
        assert_eq!(next_missing_vital(&record), Some(VitalField::Age));
        record.vitals.age = Some(20);
        assert_eq!(next_missing_vital(&record), Some(VitalField::Gender));
    }

    #[test]
    fn symptoms_complete_counts_only_fully_detailed_present_entries() {
        let mut record = InterviewRecord::new();
        record.symptoms.insert(1, detailed("fever"));
        record.symptoms.insert(2, detailed("cough"));
        record.symptoms.insert(3, SymptomEntry::present("headache"));
        record.symptoms.insert(
            4,
            SymptomEntry {
                status: SymptomStatus::Absent,
                ..detailed("rash")
            },
        );
        assert_eq!(detailed_symptom_count(&record), 2);
        assert!(is_symptoms_complete(&record, 2));
        assert!(!is_symptoms_complete(&record, 3));
    }

    #[test]
    fn first_missing_detail_skips_absent_and_complete_entries() {
        let mut record = InterviewRecord::new();
        record.symptoms.insert(1, detailed("fever"));
        record.symptoms.insert(
            2,
            SymptomEntry {
                status: SymptomStatus::Absent,
                ..SymptomEntry::present("rash")
            },
        );
        let mut cough = SymptomEntry::present("cough");
        cough.severity = Some(Severity::Mild);
        record.symptoms.insert(3, cough);
        assert_eq!(first_missing_detail(&record), Some((3, SymptomDetail::Duration)));
    }
}
