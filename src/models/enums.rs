use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

str_enum!(SymptomStatus {
    Unknown => "unknown",
    Present => "present",
    Absent => "absent",
});

str_enum!(Severity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
});

str_enum!(IdentityRole {
    Patient => "self",
    Family => "family",
    Caregiver => "caregiver",
});

str_enum!(TurnRole {
    Participant => "participant",
    Assistant => "assistant",
});

impl Gender {
    /// Lenient parse for oracle output: accepts the canonical forms plus
    /// single-letter and capitalised variants.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" | "m" | "man" => Some(Self::Male),
            "female" | "f" | "woman" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl SymptomStatus {
    /// Parse oracle status values. Accepts the yes/no spelling used by
    /// extraction prompts alongside the canonical names.
    pub fn parse_loose(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "present" | "yes" | "true" => Self::Present,
            "absent" | "no" | "false" => Self::Absent,
            _ => Self::Unknown,
        }
    }
}

impl Severity {
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mild" | "light" | "slight" => Some(Self::Mild),
            "moderate" | "medium" => Some(Self::Moderate),
            "severe" | "serious" | "strong" => Some(Self::Severe),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn gender_round_trip() {
        for (variant, s) in [
            (Gender::Male, "male"),
            (Gender::Female, "female"),
            (Gender::Other, "other"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Gender::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn identity_role_uses_self_literal() {
        assert_eq!(IdentityRole::Patient.as_str(), "self");
        assert_eq!(IdentityRole::from_str("self").unwrap(), IdentityRole::Patient);
        let json = serde_json::to_string(&IdentityRole::Patient).unwrap();
        assert_eq!(json, "\"self\"");
    }

    #[test]
    fn symptom_status_accepts_yes_no() {
        assert_eq!(SymptomStatus::parse_loose("yes"), SymptomStatus::Present);
        assert_eq!(SymptomStatus::parse_loose("No"), SymptomStatus::Absent);
        assert_eq!(SymptomStatus::parse_loose("null"), SymptomStatus::Unknown);
        assert_eq!(SymptomStatus::parse_loose(""), SymptomStatus::Unknown);
    }

    #[test]
    fn severity_loose_parse() {
        assert_eq!(Severity::parse_loose(" Severe "), Some(Severity::Severe));
        assert_eq!(Severity::parse_loose("medium"), Some(Severity::Moderate));
        assert_eq!(Severity::parse_loose("unbearable"), None);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Gender::from_str("invalid").is_err());
        assert!(Severity::from_str("unknown").is_err());
        assert!(IdentityRole::from_str("").is_err());
    }
}
