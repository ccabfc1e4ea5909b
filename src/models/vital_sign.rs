use serde::{Deserialize, Serialize};

use super::enums::Gender;

/// Accepted age range in years.
pub const AGE_RANGE: (i64, i64) = (0, 120);
/// Accepted body temperature range in °C.
pub const TEMPERATURE_RANGE: (f64, f64) = (35.0, 42.0);
/// Accepted systolic pressure range in mmHg.
pub const SYSTOLIC_RANGE: (i64, i64) = (60, 200);
/// Accepted diastolic pressure range in mmHg.
pub const DIASTOLIC_RANGE: (i64, i64) = (40, 120);

/// One of the five vital-sign fields collected by the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    Age,
    Gender,
    Temperature,
    SystolicBp,
    DiastolicBp,
}

impl VitalField {
    /// Collection order. Prompts always ask for the first missing field in this order.
    pub const ALL: [VitalField; 5] = [
        VitalField::Age,
        VitalField::Gender,
        VitalField::Temperature,
        VitalField::SystolicBp,
        VitalField::DiastolicBp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VitalField::Age => "age",
            VitalField::Gender => "gender",
            VitalField::Temperature => "temperature",
            VitalField::SystolicBp => "systolic_bp",
            VitalField::DiastolicBp => "diastolic_bp",
        }
    }

    /// Resolve a field name as the oracle reports it. `blood_pressure`
    /// names both pressure fields.
    pub fn from_name(name: &str) -> Vec<VitalField> {
        match name.trim().to_ascii_lowercase().as_str() {
            "age" => vec![VitalField::Age],
            "gender" | "sex" => vec![VitalField::Gender],
            "temperature" | "temp" => vec![VitalField::Temperature],
            "systolic_bp" | "systolic" => vec![VitalField::SystolicBp],
            "diastolic_bp" | "diastolic" => vec![VitalField::DiastolicBp],
            "blood_pressure" | "bp" => vec![VitalField::SystolicBp, VitalField::DiastolicBp],
            _ => Vec::new(),
        }
    }

    /// Default unit for this field, empty when unitless.
    pub fn unit(self) -> &'static str {
        match self {
            VitalField::Age => "years",
            VitalField::Gender => "",
            VitalField::Temperature => "°C",
            VitalField::SystolicBp | VitalField::DiastolicBp => "mmHg",
        }
    }
}

impl std::fmt::Display for VitalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vital signs of the interviewed patient. `None` means "unknown", which is
/// distinct from an explicit zero. A stored value always lies inside its range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub temperature: Option<f64>,
    pub systolic_bp: Option<u16>,
    pub diastolic_bp: Option<u16>,
}

impl VitalSigns {
    pub fn is_known(&self, field: VitalField) -> bool {
        match field {
            VitalField::Age => self.age.is_some(),
            VitalField::Gender => self.gender.is_some(),
            VitalField::Temperature => self.temperature.is_some(),
            VitalField::SystolicBp => self.systolic_bp.is_some(),
            VitalField::DiastolicBp => self.diastolic_bp.is_some(),
        }
    }

    /// Reset a field back to unknown.
    pub fn clear(&mut self, field: VitalField) {
        match field {
            VitalField::Age => self.age = None,
            VitalField::Gender => self.gender = None,
            VitalField::Temperature => self.temperature = None,
            VitalField::SystolicBp => self.systolic_bp = None,
            VitalField::DiastolicBp => self.diastolic_bp = None,
        }
    }

    /// Human-readable value of a field, `None` when unknown.
    pub fn display_value(&self, field: VitalField) -> Option<String> {
        match field {
            VitalField::Age => self.age.map(|v| v.to_string()),
            VitalField::Gender => self.gender.map(|g| g.as_str().to_string()),
            VitalField::Temperature => self.temperature.map(|t| format!("{t:.1}")),
            VitalField::SystolicBp => self.systolic_bp.map(|v| v.to_string()),
            VitalField::DiastolicBp => self.diastolic_bp.map(|v| v.to_string()),
        }
    }
}

/// Range check for age. Returns the value in storage width when valid.
pub fn valid_age(value: i64) -> Option<u8> {
    in_range(value, AGE_RANGE).and_then(|v| u8::try_from(v).ok())
}

pub fn valid_temperature(value: f64) -> Option<f64> {
    if value.is_finite() && value >= TEMPERATURE_RANGE.0 && value <= TEMPERATURE_RANGE.1 {
        Some(value)
    } else {
        None
    }
}

pub fn valid_systolic(value: i64) -> Option<u16> {
    in_range(value, SYSTOLIC_RANGE).and_then(|v| u16::try_from(v).ok())
}

pub fn valid_diastolic(value: i64) -> Option<u16> {
    in_range(value, DIASTOLIC_RANGE).and_then(|v| u16::try_from(v).ok())
}

fn in_range(value: i64, (low, high): (i64, i64)) -> Option<i64> {
    (low..=high).contains(&value).then_some(value)
}
