//! Checklist Aggregator
//!
//! Runs the field validator over every checklist item of an extraction,
//! tallies the outcomes and derives the overall checklist status.

use crate::catalog::FieldCatalog;
use crate::learning_store::MappingSource;
use crate::types::{FieldValidationResult, FieldValue, ValidationStatus};
use crate::validator;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Descriptive header labels. They identify the plan rather than describe
/// its provisions, so found/missing semantics do not apply to them.
pub const HEADER_FIELDS: &[&str] = &[
    "Group Name",
    "Group Eff Date",
    "Group Effective Date",
    "TPA",
    "Benefit Plan Name",
    "Plan Name",
];

/// More missing fields than this makes a checklist incomplete.
pub const INCOMPLETE_MISSING_LIMIT: usize = 5;
/// More typo/unidentifiable fields than this needs a reviewer.
pub const NEEDS_REVIEW_ISSUE_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Complete,
    NeedsReview,
    Incomplete,
}

impl OverallStatus {
    /// Thresholds are checked in order; the first that applies wins.
    pub fn derive(missing: usize, with_issues: usize) -> Self {
        if missing > INCOMPLETE_MISSING_LIMIT {
            OverallStatus::Incomplete
        } else if with_issues > NEEDS_REVIEW_ISSUE_LIMIT {
            OverallStatus::NeedsReview
        } else {
            OverallStatus::Complete
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Complete => "complete",
            OverallStatus::NeedsReview => "needs_review",
            OverallStatus::Incomplete => "incomplete",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one validation run. Derived entirely from the per-field
/// results; recompute it rather than editing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistValidationReport {
    pub generated_at: String,
    pub overall_status: OverallStatus,
    pub fields_validated: usize,
    pub fields_found: usize,
    pub fields_missing: usize,
    pub fields_with_issues: usize,
    /// Keyed by canonical catalog name
    pub field_results: BTreeMap<String, FieldValidationResult>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ChecklistValidationReport {
    /// Results whose status is anything other than `found`.
    pub fn needs_attention(&self) -> Vec<&FieldValidationResult> {
        self.field_results
            .values()
            .filter(|r| r.status != ValidationStatus::Found)
            .collect()
    }

    /// Per-field results ordered as the catalog lists them.
    pub fn results_in_catalog_order<'a>(
        &'a self,
        catalog: &'a FieldCatalog,
    ) -> impl Iterator<Item = &'a FieldValidationResult> + 'a {
        catalog
            .fields()
            .filter_map(move |f| self.field_results.get(&f.canonical_name))
    }
}

enum Slot<'a> {
    Field(usize),
    Unrecognized(&'a str),
}

fn is_header(label: &str) -> bool {
    HEADER_FIELDS.iter().any(|h| h.eq_ignore_ascii_case(label.trim()))
}

/// Validate every non-header field of an extraction.
///
/// Labels are resolved to canonical catalog names first. When two labels
/// resolve to the same field the later value wins but keeps the earlier
/// position. Labels the catalog cannot resolve are not validated; they get a
/// warning at their place in the input.
pub fn validate_all(
    fields: &[(String, FieldValue)],
    catalog: &FieldCatalog,
    mappings: &dyn MappingSource,
) -> ChecklistValidationReport {
    // Input order, with each canonical field at its first position
    let mut slots: Vec<Slot> = Vec::new();
    let mut ordered: Vec<(String, FieldValue)> = Vec::new();

    for (label, value) in fields {
        if is_header(label) {
            continue;
        }
        let Some(canonical) = catalog.resolve(label) else {
            debug!("Skipping unrecognized field label '{}'", label);
            slots.push(Slot::Unrecognized(label));
            continue;
        };
        if is_header(canonical) {
            continue;
        }
        match ordered.iter_mut().find(|(name, _)| name.as_str() == canonical) {
            Some(slot) => slot.1 = value.clone(),
            None => {
                slots.push(Slot::Field(ordered.len()));
                ordered.push((canonical.to_string(), value.clone()));
            }
        }
    }

    let mut field_results = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();
    let (mut found, mut missing, mut with_issues) = (0, 0, 0);

    for slot in slots {
        let (name, value) = match slot {
            Slot::Unrecognized(label) => {
                warnings.push(format!("Unrecognized field '{}' skipped", label));
                continue;
            }
            Slot::Field(index) => &ordered[index],
        };
        let result = validator::validate(name, value, catalog, mappings);
        match result.status {
            ValidationStatus::Found => found += 1,
            ValidationStatus::Missing => missing += 1,
            ValidationStatus::PossibleTypo | ValidationStatus::Unidentifiable => with_issues += 1,
        }
        warnings.extend(result.warnings.iter().cloned());
        suggestions.extend(result.suggestions.iter().cloned());
        field_results.insert(name.clone(), result);
    }

    let overall_status = OverallStatus::derive(missing, with_issues);
    info!(
        "Validated {} fields: {} found, {} missing, {} with issues -> {}",
        ordered.len(),
        found,
        missing,
        with_issues,
        overall_status
    );

    ChecklistValidationReport {
        generated_at: Utc::now().to_rfc3339(),
        overall_status,
        fields_validated: ordered.len(),
        fields_found: found,
        fields_missing: missing,
        fields_with_issues: with_issues,
        field_results,
        warnings,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning_store::LearningStore;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, FieldValue)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_derive_thresholds() {
        assert_eq!(OverallStatus::derive(6, 0), OverallStatus::Incomplete);
        assert_eq!(OverallStatus::derive(6, 10), OverallStatus::Incomplete);
        assert_eq!(OverallStatus::derive(5, 4), OverallStatus::NeedsReview);
        assert_eq!(OverallStatus::derive(5, 3), OverallStatus::Complete);
        assert_eq!(OverallStatus::derive(0, 0), OverallStatus::Complete);
    }

    #[test]
    fn test_header_fields_are_skipped() {
        let report = validate_all(
            &fields(&[
                ("Group Name", "N/F"),
                ("Group Eff Date", "N/F"),
                ("TPA", "N/F"),
                ("Benefit Plan Name", "N/F"),
                ("COBRA", "18 months"),
            ]),
            &FieldCatalog::standard(),
            &LearningStore::in_memory(),
        );
        assert_eq!(report.fields_validated, 1);
        assert_eq!(report.fields_found, 1);
        assert!(report.warnings.is_empty());
        assert_eq!(report.overall_status, OverallStatus::Complete);
    }

    #[test]
    fn test_labels_resolve_to_catalog_names() {
        let report = validate_all(
            &fields(&[
                ("COB", "Coordinates when covered by more than one Plan"),
                ("Min Hour Requirement", "30 hours"),
                ("Vision Rider", "Covered"),
            ]),
            &FieldCatalog::standard(),
            &LearningStore::in_memory(),
        );
        let catalog = FieldCatalog::standard();
        assert!(report.field_results.keys().all(|k| catalog.contains(k)));
        assert!(report.field_results.contains_key("Coordination of Benefits"));
        assert!(report.field_results.contains_key("Min. Hour Requirement"));
        assert_eq!(report.fields_validated, 2);
        assert_eq!(report.warnings, vec!["Unrecognized field 'Vision Rider' skipped"]);
    }

    #[test]
    fn test_duplicate_labels_keep_last_value() {
        let report = validate_all(
            &fields(&[("COB", "N/F"), ("Coordination of Benefits", "COB applies")]),
            &FieldCatalog::standard(),
            &LearningStore::in_memory(),
        );
        assert_eq!(report.fields_validated, 1);
        assert_eq!(report.fields_missing, 0);
        assert_eq!(report.fields_found, 1);
    }

    #[test]
    fn test_warnings_follow_input_order() {
        let report = validate_all(
            &fields(&[("Subrogation", "N/F"), ("Retirees", "Not eligible"), ("COBRA", "N/F")]),
            &FieldCatalog::standard(),
            &LearningStore::in_memory(),
        );
        assert_eq!(
            report.warnings,
            vec![
                "No information found for Subrogation",
                "Could not identify 'Not eligible' for Retirees",
                "No information found for COBRA",
            ]
        );
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(report.needs_attention().len(), 3);
    }

    #[test]
    fn test_unrecognized_warning_keeps_its_position() {
        let report = validate_all(
            &fields(&[("Subrogation", "N/F"), ("Vision Rider", "Covered"), ("COBRA", "N/F")]),
            &FieldCatalog::standard(),
            &LearningStore::in_memory(),
        );
        assert_eq!(
            report.warnings,
            vec![
                "No information found for Subrogation",
                "Unrecognized field 'Vision Rider' skipped",
                "No information found for COBRA",
            ]
        );
        assert_eq!(report.fields_validated, 2);
    }
}
