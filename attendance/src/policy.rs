use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a record reaches the `Marked` state before validation.
///
/// Exactly one policy is active per workflow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// The student must mark attendance first; validating without a pending
    /// mark is `NotFound`.
    #[default]
    RequireMark,
    /// The lecturer records attendance directly; the record is created
    /// validated with `marked_at = validated_at`.
    LecturerInitiated,
}

impl ValidationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationPolicy::RequireMark => "require_mark",
            ValidationPolicy::LecturerInitiated => "lecturer_initiated",
        }
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "require_mark" => Ok(ValidationPolicy::RequireMark),
            "lecturer_initiated" => Ok(ValidationPolicy::LecturerInitiated),
            other => Err(format!(
                "unknown validation policy '{other}' (expected require_mark or lecturer_initiated)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!(
            "lecturer-initiated".parse::<ValidationPolicy>().unwrap(),
            ValidationPolicy::LecturerInitiated
        );
        assert_eq!(
            "REQUIRE_MARK".parse::<ValidationPolicy>().unwrap(),
            ValidationPolicy::RequireMark
        );
        assert!("whatever".parse::<ValidationPolicy>().is_err());
    }

    #[test]
    fn default_requires_mark() {
        assert_eq!(ValidationPolicy::default(), ValidationPolicy::RequireMark);
    }
}
