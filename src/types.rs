use crate::judgment::JudgmentDecision;
use serde::{Deserialize, Serialize};

/// Values the upstream extraction writes when it found nothing.
const MISSING_MARKERS: &[&str] = &["n/f", "not found"];

/// Text written in place of a missing value in exports and prompts.
pub const MISSING_DISPLAY: &str = "N/F";

/// An extracted value. Every upstream spelling of "nothing found" (absent
/// cell, blank, `N/F`, `Not Found`) becomes `Missing` at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum FieldValue {
    Missing,
    Present(String),
}

impl FieldValue {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None => FieldValue::Missing,
            Some(s) if s.is_empty() => FieldValue::Missing,
            Some(s) if MISSING_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) => {
                FieldValue::Missing
            }
            Some(s) => FieldValue::Present(s.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Missing => None,
            FieldValue::Present(s) => Some(s.as_str()),
        }
    }

    /// The value, or the `N/F` marker.
    pub fn display(&self) -> &str {
        self.as_str().unwrap_or(MISSING_DISPLAY)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(raw: Option<String>) -> Self {
        FieldValue::parse(raw.as_deref())
    }
}

impl From<FieldValue> for Option<String> {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Missing => None,
            FieldValue::Present(s) => Some(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(raw: &str) -> Self {
        FieldValue::parse(Some(raw))
    }
}

/// One row of the upstream extraction table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub field_name: String,
    pub value: FieldValue,
    /// Always within [0, 1]
    pub confidence: f64,
    pub source_page: Option<u32>,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Found,
    Missing,
    PossibleTypo,
    Unidentifiable,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Found => "found",
            ValidationStatus::Missing => "missing",
            ValidationStatus::PossibleTypo => "possible_typo",
            ValidationStatus::Unidentifiable => "unidentifiable",
        }
    }

    /// Typos and unidentifiable values need a reviewer's eye.
    pub fn has_issue(&self) -> bool {
        matches!(
            self,
            ValidationStatus::PossibleTypo | ValidationStatus::Unidentifiable
        )
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidationResult {
    pub field_name: String,
    pub status: ValidationStatus,
    pub value: FieldValue,
    pub confidence: f64,
    pub suggestions: Vec<String>,
    pub warnings: Vec<String>,
    /// Advisory decision from the external judgment service, if one ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judgment: Option<JudgmentDecision>,
}

impl FieldValidationResult {
    pub fn with_judgment(self, judgment: JudgmentDecision) -> Self {
        Self {
            judgment: Some(judgment),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_markers_normalize() {
        for raw in [None, Some(""), Some("   "), Some("N/F"), Some("n/f"), Some(" Not Found ")] {
            assert_eq!(FieldValue::parse(raw), FieldValue::Missing, "{:?}", raw);
        }
        assert_eq!(
            FieldValue::parse(Some("  COBRA applies ")),
            FieldValue::Present("COBRA applies".to_string())
        );
    }

    #[test]
    fn test_field_value_serializes_as_option() {
        assert_eq!(serde_json::to_string(&FieldValue::Missing).unwrap(), "null");
        let value: FieldValue = serde_json::from_str("\"Not Found\"").unwrap();
        assert!(value.is_missing());
        let value: FieldValue = serde_json::from_str("\"18 months\"").unwrap();
        assert_eq!(value.display(), "18 months");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ValidationStatus::PossibleTypo).unwrap(),
            "\"possible_typo\""
        );
        assert!(ValidationStatus::Unidentifiable.has_issue());
        assert!(!ValidationStatus::Missing.has_issue());
    }
}
