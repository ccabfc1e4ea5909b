//! Participant-facing text. Everything here is phrased for the confirmed
//! identity role: "your age" for the patient, "the patient's age" for family.

use crate::models::enums::IdentityRole;
use crate::models::{SymptomDetail, VitalField, VitalSigns};

pub const GREETING: &str = "Hello, I'm the intake assistant. Before your visit I'd like to ask a few \
questions about vital signs and symptoms. Your answers are stored only to prepare the consultation \
and you can type \"exit\" at any time to stop. Do you agree to continue?";

pub const CONSENT_REPROMPT: &str =
    "Sorry, I didn't catch that. Do you agree to answer a few intake questions? Please reply yes or no.";

pub const DECLINED: &str =
    "Understood. No information has been kept. Take care, and feel free to come back any time.";

pub const IDENTITY_QUESTION: &str = "Thank you. Who is this interview for? Are you the patient, \
a family member of the patient, or a caregiver?";

pub const IDENTITY_REPROMPT: &str = "Sorry, I couldn't tell who the interview is for. \
Please say whether you are the patient, a family member, or a caregiver.";

pub const FAREWELL: &str = "The interview has been ended. Thank you for your time.";

pub const TRY_AGAIN: &str = "Something went wrong on my side. Please try again.";

pub const RESTART: &str = "Sorry, I lost track of our conversation and need to start over. \
Do you agree to answer a few intake questions?";

pub fn possessive(role: IdentityRole) -> &'static str {
    match role {
        IdentityRole::Patient => "your",
        IdentityRole::Family => "the patient's",
        IdentityRole::Caregiver => "the care recipient's",
    }
}

fn subject(role: IdentityRole) -> &'static str {
    match role {
        IdentityRole::Patient => "you",
        IdentityRole::Family => "the patient",
        IdentityRole::Caregiver => "the person you care for",
    }
}

/// "Do you" / "Does the patient".
fn do_subject(role: IdentityRole) -> String {
    match role {
        IdentityRole::Patient => "Do you".to_string(),
        other => format!("Does {}", subject(other)),
    }
}

fn vital_label(field: VitalField) -> &'static str {
    match field {
        VitalField::Age => "age",
        VitalField::Gender => "gender",
        VitalField::Temperature => "body temperature",
        VitalField::SystolicBp => "systolic (upper) blood pressure",
        VitalField::DiastolicBp => "diastolic (lower) blood pressure",
    }
}

pub fn vital_question(role: IdentityRole, field: VitalField) -> String {
    let owner = possessive(role);
    match field {
        VitalField::Age => format!("What is {owner} age?"),
        VitalField::Gender => format!("What is {owner} gender (male, female or other)?"),
        VitalField::Temperature => format!("What is {owner} current body temperature in °C?"),
        VitalField::SystolicBp => {
            format!("What is {owner} blood pressure? Please give the upper (systolic) value in mmHg, or both values like 120/80.")
        }
        VitalField::DiastolicBp => {
            format!("And what is {owner} lower (diastolic) blood pressure value in mmHg?")
        }
    }
}

/// Notice prepended when the participant gave a value outside the plausible range.
pub fn out_of_range_notice(fields: &[VitalField]) -> Option<String> {
    let first = fields.first()?;
    Some(format!(
        "The {} you gave seems outside the expected range, so I didn't record it.",
        vital_label(*first)
    ))
}

pub fn vitals_summary(role: IdentityRole, vitals: &VitalSigns) -> String {
    let show = |field: VitalField| {
        vitals
            .display_value(field)
            .unwrap_or_else(|| "unknown".to_string())
    };
    format!(
        "Here is what I recorded for {owner} vital signs:\n\
         - Age: {} years\n\
         - Gender: {}\n\
         - Temperature: {} °C\n\
         - Blood pressure: {}/{} mmHg\n\
         Is this correct? If something is wrong, tell me which value to change.",
        show(VitalField::Age),
        show(VitalField::Gender),
        show(VitalField::Temperature),
        show(VitalField::SystolicBp),
        show(VitalField::DiastolicBp),
        owner = possessive(role),
    )
}

pub fn confirmation_reprompt(role: IdentityRole, vitals: &VitalSigns) -> String {
    format!("Sorry, I didn't understand. {}", vitals_summary(role, vitals))
}

pub fn correction_intro(role: IdentityRole, field: VitalField) -> String {
    format!("No problem, let's correct that. {}", vital_question(role, field))
}

pub fn symptoms_intro(role: IdentityRole, hypotheses: &[&str]) -> String {
    if hypotheses.is_empty() {
        format!("Thank you. Now let's talk about {} symptoms.", possessive(role))
    } else {
        format!(
            "Thank you. Based on the vital signs, I noted: {}.",
            hypotheses.join(", ")
        )
    }
}

pub fn detail_question(role: IdentityRole, symptom: &str, detail: SymptomDetail) -> String {
    match detail {
        SymptomDetail::Severity => format!(
            "How severe is {} {symptom}: mild, moderate or severe?",
            possessive(role)
        ),
        SymptomDetail::Duration => match role {
            IdentityRole::Patient => format!("How long have you had the {symptom}?"),
            other => format!("How long has {} had the {symptom}?", subject(other)),
        },
        SymptomDetail::Description => {
            format!("Can you describe the {symptom} in a few words? For example when it happens or what it feels like.")
        }
    }
}

pub fn other_symptoms_question(role: IdentityRole, suggestions: &[&str]) -> String {
    let lead = do_subject(role);
    match suggestions {
        [] => format!("{lead} have any other symptoms?"),
        [one] => format!("{lead} have any other symptoms, for example {one}?"),
        [first, rest @ ..] => format!(
            "{lead} have any other symptoms, for example {first} or {}?",
            rest.join(" or ")
        ),
    }
}

pub fn closing(role: IdentityRole) -> String {
    let owner = match role {
        IdentityRole::Patient => "your",
        _ => "the",
    };
    format!(
        "Thank you, I have everything I need. {} intake summary is ready for the clinician. Take care.",
        capitalize(owner)
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vital_question_follows_role() {
        assert_eq!(vital_question(IdentityRole::Patient, VitalField::Age), "What is your age?");
        assert_eq!(
            vital_question(IdentityRole::Family, VitalField::Age),
            "What is the patient's age?"
        );
        assert!(vital_question(IdentityRole::Caregiver, VitalField::Temperature)
            .contains("the care recipient's"));
    }

    #[test]
    fn duration_question_grammar() {
        assert_eq!(
            detail_question(IdentityRole::Patient, "cough", SymptomDetail::Duration),
            "How long have you had the cough?"
        );
        assert_eq!(
            detail_question(IdentityRole::Family, "cough", SymptomDetail::Duration),
            "How long has the patient had the cough?"
        );
    }

    #[test]
    fn other_symptoms_lists_suggestions() {
        assert_eq!(
            other_symptoms_question(IdentityRole::Patient, &[]),
            "Do you have any other symptoms?"
        );
        assert_eq!(
            other_symptoms_question(IdentityRole::Family, &["chills", "body aches"]),
            "Does the patient have any other symptoms, for example chills or body aches?"
        );
    }

    #[test]
    fn summary_shows_all_fields() {
        let vitals = VitalSigns {
            age: Some(45),
            gender: None,
            temperature: Some(38.0),
            systolic_bp: Some(120),
            diastolic_bp: Some(80),
        };
        let text = vitals_summary(IdentityRole::Patient, &vitals);
        assert!(text.contains("Age: 45 years"));
        assert!(text.contains("Gender: unknown"));
        assert!(text.contains("Temperature: 38.0 °C"));
        assert!(text.contains("120/80 mmHg"));
    }

    #[test]
    fn closing_is_capitalized() {
        assert!(closing(IdentityRole::Patient).contains("Your intake summary"));
        assert!(closing(IdentityRole::Caregiver).contains("The intake summary"));
    }
}
