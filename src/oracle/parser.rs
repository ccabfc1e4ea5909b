//! Strict parsing of oracle JSON into phase replies.
//!
//! Anything that does not match the phase schema is a
//! [`OracleError::MalformedResponse`]: missing keys, wrong JSON types,
//! numbers sent as strings. Range validation happens later in the merge
//! engine; this layer only checks shape.

use serde_json::{Map, Value};

use crate::intake::phase::Phase;
use crate::intake::{RecordFragment, SymptomProposal, VitalsFragment};
use crate::models::enums::IdentityRole;
use crate::models::VitalField;

use super::{ConfirmationDecision, ConsentDecision, OracleError, OracleReply};

/// Extract a JSON block from LLM response text.
/// Handles responses that include text before/after the JSON.
pub fn extract_json_block(response: &str) -> Result<&str, OracleError> {
    let trimmed = response.trim();

    // Strip markdown code fences if present
    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return Ok(after_fence[..end].trim());
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            let block = after_fence[..end].trim();
            if block.starts_with('{') {
                return Ok(block);
            }
        }
    }

    // Find the first { and last }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return Ok(&trimmed[start..=end]);
        }
    }

    Err(malformed("no JSON object in response"))
}

/// Parse a raw model response for `phase`.
pub fn parse_reply(phase: Phase, raw: &str) -> Result<OracleReply, OracleError> {
    let block = extract_json_block(raw)?;
    let value: Value =
        serde_json::from_str(block).map_err(|e| malformed(&format!("invalid JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| malformed("top-level value is not an object"))?;

    match phase {
        Phase::AwaitingConsent => parse_consent(obj),
        Phase::AwaitingIdentity => parse_identity(obj),
        Phase::CollectingVitals => parse_vitals(obj),
        Phase::ConfirmingVitals => parse_confirmation(obj),
        Phase::CollectingSymptoms => parse_symptoms(obj),
        Phase::Terminated => Err(malformed("no oracle reply expected after termination")),
    }
}

fn malformed(reason: &str) -> OracleError {
    OracleError::MalformedResponse(reason.to_string())
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a Value, OracleError> {
    obj.get(key)
        .ok_or_else(|| malformed(&format!("missing field '{key}'")))
}

fn parse_consent(obj: &Map<String, Value>) -> Result<OracleReply, OracleError> {
    let raw = required(obj, "response_type")?
        .as_str()
        .ok_or_else(|| malformed("'response_type' is not a string"))?;
    let decision = match raw.trim().to_ascii_lowercase().as_str() {
        "explicit_agree" | "agree" => ConsentDecision::Agree,
        "explicit_disagree" | "disagree" => ConsentDecision::Disagree,
        "unclear" => ConsentDecision::Unclear,
        other => return Err(malformed(&format!("unknown response_type '{other}'"))),
    };
    Ok(OracleReply::Consent(decision))
}

fn parse_identity(obj: &Map<String, Value>) -> Result<OracleReply, OracleError> {
    let raw = required(obj, "identity")?
        .as_str()
        .ok_or_else(|| malformed("'identity' is not a string"))?;
    let is_valid = required(obj, "is_valid")?
        .as_bool()
        .ok_or_else(|| malformed("'is_valid' is not a boolean"))?;

    let role = match raw.trim().to_ascii_lowercase().as_str() {
        "unknown" | "" => None,
        other => Some(
            other
                .parse::<IdentityRole>()
                .map_err(|_| malformed(&format!("unknown identity '{other}'")))?,
        ),
    };
    Ok(OracleReply::Identity {
        role,
        is_valid: is_valid && role.is_some(),
    })
}

fn parse_vitals(obj: &Map<String, Value>) -> Result<OracleReply, OracleError> {
    let status = required(obj, "vital_status")?
        .as_object()
        .ok_or_else(|| malformed("'vital_status' is not an object"))?;

    let vitals = VitalsFragment {
        age: optional_integer(status, "age")?,
        gender: optional_string(status, "gender")?,
        temperature: optional_number(status, "temperature")?,
        systolic_bp: optional_integer(status, "systolic_bp")?,
        diastolic_bp: optional_integer(status, "diastolic_bp")?,
    };
    Ok(OracleReply::Vitals(RecordFragment {
        vitals,
        symptoms: Vec::new(),
    }))
}

fn parse_confirmation(obj: &Map<String, Value>) -> Result<OracleReply, OracleError> {
    let confirmed = match required(obj, "is_confirmed")? {
        Value::Bool(b) => Some(*b),
        Value::Null => None,
        _ => return Err(malformed("'is_confirmed' is not a boolean")),
    };

    let decision = match confirmed {
        Some(true) => ConfirmationDecision::Confirmed,
        None => ConfirmationDecision::Unclear,
        Some(false) => match optional_string(obj, "field_to_modify")? {
            Some(name) => {
                let fields = VitalField::from_name(&name);
                if fields.is_empty() {
                    ConfirmationDecision::Unclear
                } else {
                    ConfirmationDecision::Modify(fields)
                }
            }
            None => ConfirmationDecision::Unclear,
        },
    };
    Ok(OracleReply::Confirmation(decision))
}

fn parse_symptoms(obj: &Map<String, Value>) -> Result<OracleReply, OracleError> {
    let entries: Vec<(&String, &Value)> = match obj.get("symptoms") {
        Some(Value::Object(map)) => map.iter().collect(),
        Some(_) => return Err(malformed("'symptoms' is not an object")),
        None => {
            let flat: Vec<_> = obj
                .iter()
                .filter(|(key, _)| key.starts_with("symptom_"))
                .collect();
            if flat.is_empty() {
                return Err(malformed("missing field 'symptoms'"));
            }
            flat
        }
    };

    let mut symptoms = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let entry = value
            .as_object()
            .ok_or_else(|| malformed(&format!("'{key}' is not an object")))?;
        symptoms.push(SymptomProposal {
            provisional_slot: key
                .strip_prefix("symptom_")
                .and_then(|n| n.parse::<u32>().ok()),
            name: optional_string(entry, "symptom_name")?.unwrap_or_default(),
            status: symptom_status(entry)?,
            severity: optional_string(entry, "severity")?,
            duration: optional_string(entry, "duration")?,
            description: optional_string(entry, "description")?,
        });
    }
    symptoms.sort_by_key(|p| p.provisional_slot.unwrap_or(u32::MAX));

    Ok(OracleReply::Symptoms(RecordFragment {
        vitals: VitalsFragment::default(),
        symptoms,
    }))
}

/// `symptom_status` as text; booleans map to yes/no, null to empty.
fn symptom_status(entry: &Map<String, Value>) -> Result<String, OracleError> {
    match entry.get("symptom_status") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::Bool(true)) => Ok("yes".to_string()),
        Some(Value::Bool(false)) => Ok("no".to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(malformed("'symptom_status' has the wrong type")),
    }
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, OracleError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(malformed(&format!("'{key}' is not a string"))),
    }
}

fn optional_number(obj: &Map<String, Value>, key: &str) -> Result<Option<f64>, OracleError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| malformed(&format!("'{key}' is not representable"))),
        Some(_) => Err(malformed(&format!("'{key}' is not a number"))),
    }
}

/// Integer field. A float with no fractional part (`45.0`) is accepted.
fn optional_integer(obj: &Map<String, Value>, key: &str) -> Result<Option<i64>, OracleError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(Some(f as i64)),
                _ => Err(malformed(&format!("'{key}' is not an integer"))),
            }
        }
        Some(_) => Err(malformed(&format!("'{key}' is not a number"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_malformed(result: Result<OracleReply, OracleError>) -> bool {
        matches!(result, Err(OracleError::MalformedResponse(_)))
    }

    #[test]
    fn extract_json_block_from_fenced() {
        let text = "Here is the result:\n```json\n{\"key\": \"value\"}\n```\nDone.";
        assert_eq!(extract_json_block(text).unwrap(), "{\"key\": \"value\"}");
    }

    #[test]
    fn extract_json_block_from_bare() {
        let text = "Result: {\"key\": \"value\"}";
        assert_eq!(extract_json_block(text).unwrap(), "{\"key\": \"value\"}");
    }

    #[test]
    fn extract_json_block_no_json() {
        assert!(extract_json_block("No JSON here at all.").is_err());
    }

    #[test]
    fn consent_values() {
        assert_eq!(
            parse_reply(Phase::AwaitingConsent, r#"{"response_type":"explicit_disagree"}"#).unwrap(),
            OracleReply::Consent(ConsentDecision::Disagree)
        );
        assert_eq!(
            parse_reply(Phase::AwaitingConsent, r#"{"response_type":"unclear"}"#).unwrap(),
            OracleReply::Consent(ConsentDecision::Unclear)
        );
        assert!(is_malformed(parse_reply(Phase::AwaitingConsent, r#"{"answer":"yes"}"#)));
        assert!(is_malformed(parse_reply(Phase::AwaitingConsent, r#"{"response_type":"maybe"}"#)));
    }

    #[test]
    fn identity_requires_both_fields() {
        assert_eq!(
            parse_reply(Phase::AwaitingIdentity, r#"{"identity":"self","is_valid":true}"#).unwrap(),
            OracleReply::Identity {
                role: Some(IdentityRole::Patient),
                is_valid: true
            }
        );
        assert_eq!(
            parse_reply(Phase::AwaitingIdentity, r#"{"identity":"unknown","is_valid":true}"#).unwrap(),
            OracleReply::Identity {
                role: None,
                is_valid: false
            }
        );
        assert!(is_malformed(parse_reply(Phase::AwaitingIdentity, r#"{"identity":"self"}"#)));
        assert!(is_malformed(parse_reply(
            Phase::AwaitingIdentity,
            r#"{"identity":"self","is_valid":"yes"}"#
        )));
    }

    #[test]
    fn vitals_accept_numbers_and_null() {
        let raw = r#"```json
        {"vital_status": {"age": 45, "gender": "female", "temperature": 38, "systolic_bp": 150.0, "diastolic_bp": null}}
        ```"#;
        let OracleReply::Vitals(fragment) = parse_reply(Phase::CollectingVitals, raw).unwrap() else {
            panic!("expected vitals reply");
        };
        assert_eq!(fragment.vitals.age, Some(45));
        assert_eq!(fragment.vitals.gender.as_deref(), Some("female"));
        assert_eq!(fragment.vitals.temperature, Some(38.0));
        assert_eq!(fragment.vitals.systolic_bp, Some(150));
        assert_eq!(fragment.vitals.diastolic_bp, None);
    }

    #[test]
    fn vitals_reject_wrong_types() {
        assert!(is_malformed(parse_reply(
            Phase::CollectingVitals,
            r#"{"vital_status": {"age": "45"}}"#
        )));
        assert!(is_malformed(parse_reply(
            Phase::CollectingVitals,
            r#"{"vital_status": {"systolic_bp": 120.5}}"#
        )));
        assert!(is_malformed(parse_reply(Phase::CollectingVitals, r#"{"age": 45}"#)));
    }

    #[test]
    fn confirmation_variants() {
        assert_eq!(
            parse_reply(Phase::ConfirmingVitals, r#"{"is_confirmed": true}"#).unwrap(),
            OracleReply::Confirmation(ConfirmationDecision::Confirmed)
        );
        assert_eq!(
            parse_reply(
                Phase::ConfirmingVitals,
                r#"{"is_confirmed": false, "field_to_modify": "blood_pressure"}"#
            )
            .unwrap(),
            OracleReply::Confirmation(ConfirmationDecision::Modify(vec![
                VitalField::SystolicBp,
                VitalField::DiastolicBp
            ]))
        );
        assert_eq!(
            parse_reply(
                Phase::ConfirmingVitals,
                r#"{"is_confirmed": false, "field_to_modify": "weight"}"#
            )
            .unwrap(),
            OracleReply::Confirmation(ConfirmationDecision::Unclear)
        );
        assert_eq!(
            parse_reply(Phase::ConfirmingVitals, r#"{"is_confirmed": null}"#).unwrap(),
            OracleReply::Confirmation(ConfirmationDecision::Unclear)
        );
        assert!(is_malformed(parse_reply(Phase::ConfirmingVitals, r#"{"field_to_modify": "age"}"#)));
    }

    #[test]
    fn symptoms_nested_and_flat() {
        let nested = r#"{"symptoms": {
            "symptom_2": {"symptom_name": "cough", "symptom_status": "yes", "severity": "mild", "duration": null, "description": null},
            "symptom_1": {"symptom_name": "fever", "symptom_status": true}
        }}"#;
        let OracleReply::Symptoms(fragment) = parse_reply(Phase::CollectingSymptoms, nested).unwrap() else {
            panic!("expected symptoms reply");
        };
        assert_eq!(fragment.symptoms.len(), 2);
        assert_eq!(fragment.symptoms[0].name, "fever");
        assert_eq!(fragment.symptoms[0].status, "yes");
        assert_eq!(fragment.symptoms[1].provisional_slot, Some(2));
        assert_eq!(fragment.symptoms[1].severity.as_deref(), Some("mild"));

        let flat = r#"{"symptom_1": {"symptom_name": "nausea", "symptom_status": null}}"#;
        let OracleReply::Symptoms(fragment) = parse_reply(Phase::CollectingSymptoms, flat).unwrap() else {
            panic!("expected symptoms reply");
        };
        assert_eq!(fragment.symptoms[0].status, "");

        assert_eq!(
            parse_reply(Phase::CollectingSymptoms, r#"{"symptoms": {}}"#).unwrap(),
            OracleReply::Symptoms(RecordFragment::default())
        );
    }

    #[test]
    fn symptoms_reject_wrong_shapes() {
        assert!(is_malformed(parse_reply(Phase::CollectingSymptoms, r#"{}"#)));
        assert!(is_malformed(parse_reply(
            Phase::CollectingSymptoms,
            r#"{"symptoms": ["cough"]}"#
        )));
        assert!(is_malformed(parse_reply(
            Phase::CollectingSymptoms,
            r#"{"symptoms": {"symptom_1": {"symptom_name": "cough", "duration": 3}}}"#
        )));
    }
}
