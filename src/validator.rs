//! Field Validator
//!
//! Decides, for one extracted (field, value) pair, whether the value is
//! missing, confidently matched, a likely typo of a known identifier, or
//! unidentifiable.
//!
//! Matching is greedy: candidates are tried in catalog order followed by
//! learned synonyms, and the first one that matches (by substring, then by
//! similarity ratio) decides the outcome. A later candidate that would score
//! higher is never consulted. Do not turn this into a best-match search;
//! results on ambiguous values depend on the ordering.

use crate::catalog::FieldCatalog;
use crate::learning_store::MappingSource;
use crate::similarity::sequence_ratio_ci;
use crate::types::{FieldValidationResult, FieldValue, ValidationStatus};
use itertools::Itertools;

pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;
pub const TYPO_CONFIDENCE: f64 = 0.7;
pub const UNIDENTIFIED_CONFIDENCE: f64 = 0.3;
pub const MISSING_CONFIDENCE: f64 = 0.0;

/// Minimum similarity ratio for a near-miss to count as a typo.
pub const TYPO_THRESHOLD: f64 = 0.85;

/// How many expected identifiers an unidentifiable result lists.
const EXPECTED_SHOWN: usize = 3;

/// Catalog identifiers for `field_name` in catalog order, followed by the
/// synonyms learned for each identifier. Learned synonyms are keyed by
/// identifier, not by field name.
pub fn candidate_identifiers(
    field_name: &str,
    catalog: &FieldCatalog,
    mappings: &dyn MappingSource,
) -> Vec<String> {
    let identifiers = catalog.identifiers_for(field_name);
    let mut candidates: Vec<String> = identifiers.to_vec();

    for identifier in identifiers {
        for synonym in mappings.synonyms_for(identifier) {
            if !candidates.contains(synonym) {
                candidates.push(synonym.clone());
            }
        }
    }

    candidates
}

pub fn validate(
    field_name: &str,
    value: &FieldValue,
    catalog: &FieldCatalog,
    mappings: &dyn MappingSource,
) -> FieldValidationResult {
    let text = match value {
        FieldValue::Missing => {
            return FieldValidationResult {
                field_name: field_name.to_string(),
                status: ValidationStatus::Missing,
                value: FieldValue::Missing,
                confidence: MISSING_CONFIDENCE,
                suggestions: Vec::new(),
                warnings: vec![format!("No information found for {}", field_name)],
                judgment: None,
            };
        }
        FieldValue::Present(text) => text.as_str(),
    };

    let candidates = candidate_identifiers(field_name, catalog, mappings);
    let lowered = text.to_lowercase();

    let mut suggestions = Vec::new();
    let mut warnings = Vec::new();
    let mut outcome = None;

    for identifier in &candidates {
        if lowered.contains(&identifier.to_lowercase()) {
            outcome = Some((ValidationStatus::Found, EXACT_MATCH_CONFIDENCE));
            break;
        }

        if sequence_ratio_ci(identifier, text) >= TYPO_THRESHOLD {
            suggestions.push(format!("Did you mean '{}'?", identifier));
            warnings.push(format!("Possible typo detected in {}", field_name));
            outcome = Some((ValidationStatus::PossibleTypo, TYPO_CONFIDENCE));
            break;
        }
    }

    let (status, confidence) = outcome.unwrap_or_else(|| {
        warnings.push(format!("Could not identify '{}' for {}", text, field_name));
        if candidates.is_empty() {
            suggestions.push(format!("No identifiers are defined for {}", field_name));
        } else {
            suggestions.push(format!(
                "Expected one of: {}",
                candidates.iter().take(EXPECTED_SHOWN).join(", ")
            ));
        }
        (ValidationStatus::Unidentifiable, UNIDENTIFIED_CONFIDENCE)
    });

    // Corrections are informational; they never change the status.
    if let Some(correction) = mappings.correction_for(text) {
        suggestions.push(format!("Previously corrected to: {}", correction));
    }

    FieldValidationResult {
        field_name: field_name.to_string(),
        status,
        value: value.clone(),
        confidence,
        suggestions,
        warnings,
        judgment: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning_store::LearningStore;

    fn check(field: &str, value: &str, store: &LearningStore) -> FieldValidationResult {
        validate(field, &FieldValue::from(value), &FieldCatalog::standard(), store)
    }

    #[test]
    fn test_missing_short_circuits() {
        let mut store = LearningStore::in_memory();
        store.teach_correction("N/F", "COBRA", "u").unwrap();

        for raw in ["N/F", "Not Found", ""] {
            let result = check("COBRA", raw, &store);
            assert_eq!(result.status, ValidationStatus::Missing);
            assert_eq!(result.confidence, 0.0);
            assert_eq!(result.warnings, vec!["No information found for COBRA"]);
            assert!(result.suggestions.is_empty());
        }
    }

    #[test]
    fn test_substring_match_is_found() {
        let store = LearningStore::in_memory();
        let result = check("COBRA", "18 MONTHS post-employment", &store);
        assert_eq!(result.status, ValidationStatus::Found);
        assert_eq!(result.confidence, 1.0);
        assert!(result.warnings.is_empty());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_typo_of_first_identifier() {
        let store = LearningStore::in_memory();
        let result = check("TPA", "Claims Adminstrator Inc", &store);
        assert_eq!(result.status, ValidationStatus::PossibleTypo);
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.suggestions, vec!["Did you mean 'Claims Administrator'?"]);
        assert_eq!(result.warnings, vec!["Possible typo detected in TPA"]);
    }

    #[test]
    fn test_unidentifiable_lists_first_three_identifiers() {
        let store = LearningStore::in_memory();
        let result = check("Retirees", "Not eligible", &store);
        assert_eq!(result.status, ValidationStatus::Unidentifiable);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.warnings, vec!["Could not identify 'Not eligible' for Retirees"]);
        assert_eq!(
            result.suggestions,
            vec!["Expected one of: Retiree, retirees, retired employees"]
        );
    }

    #[test]
    fn test_unknown_field_is_unidentifiable() {
        let store = LearningStore::in_memory();
        let result = check("Vision", "Covered", &store);
        assert_eq!(result.status, ValidationStatus::Unidentifiable);
        assert_eq!(result.suggestions, vec!["No identifiers are defined for Vision"]);
    }

    #[test]
    fn test_learned_synonym_keyed_by_identifier() {
        let mut store = LearningStore::in_memory();
        // keyed by the field name: not consulted
        store.teach_synonym("Retirees", "former staff", "u").unwrap();
        assert_eq!(
            check("Retirees", "Former staff are covered", &store).status,
            ValidationStatus::Unidentifiable
        );

        // keyed by an identifier: consulted
        store.teach_synonym("Retiree", "former staff", "u").unwrap();
        let result = check("Retirees", "Former staff are covered", &store);
        assert_eq!(result.status, ValidationStatus::Found);
    }

    #[test]
    fn test_candidates_keep_catalog_order_then_synonyms() {
        let mut store = LearningStore::in_memory();
        store.teach_synonym("TPA", "Benefits Administrator", "u").unwrap();
        store.teach_synonym("Claims Administrator", "Claims Admin", "u").unwrap();
        store.teach_synonym("Claims Provider", "TPA", "u").unwrap();

        let candidates = candidate_identifiers("TPA", &FieldCatalog::standard(), &store);
        assert_eq!(candidates.len(), 8);
        assert_eq!(candidates[0], "Claims Administrator");
        assert_eq!(candidates[6], "Claims Admin");
        assert_eq!(candidates[7], "Benefits Administrator");
    }

    #[test]
    fn test_correction_is_appended_to_any_status() {
        let mut store = LearningStore::in_memory();
        store
            .teach_correction("COBRA continuation", "COBRA", "u")
            .unwrap();
        store.teach_correction("Not eligible", "Retirees not covered", "u").unwrap();

        let found = check("COBRA", "COBRA continuation", &store);
        assert_eq!(found.status, ValidationStatus::Found);
        assert_eq!(found.suggestions, vec!["Previously corrected to: COBRA"]);

        let unidentified = check("Retirees", "Not eligible", &store);
        assert_eq!(unidentified.status, ValidationStatus::Unidentifiable);
        assert_eq!(
            unidentified.suggestions.last().unwrap(),
            "Previously corrected to: Retirees not covered"
        );
    }

    #[test]
    fn test_single_edit_of_long_identifier_is_typo() {
        let catalog = FieldCatalog::standard();
        let store = LearningStore::in_memory();
        let mut checked = 0;

        for field in catalog.fields() {
            let known: Vec<String> = field.identifiers.iter().map(|i| i.to_lowercase()).collect();
            for identifier in &field.identifiers {
                let chars: Vec<char> = identifier.chars().collect();
                if chars.len() < 8 {
                    continue;
                }
                let mid = chars.len() / 2;
                let mut deleted = chars.clone();
                deleted.remove(mid);
                let mut replaced = chars.clone();
                replaced[mid] = '#';

                for edited in [deleted, replaced] {
                    let edited: String = edited.into_iter().collect();
                    let lowered = edited.to_lowercase();
                    if known.iter().any(|k| lowered.contains(k.as_str())) {
                        continue;
                    }
                    let result = check(&field.canonical_name, &edited, &store);
                    assert_eq!(
                        result.status,
                        ValidationStatus::PossibleTypo,
                        "{} / {:?}",
                        field.canonical_name,
                        edited
                    );
                    assert_eq!(result.confidence, TYPO_CONFIDENCE);
                    assert!(field
                        .identifiers
                        .iter()
                        .any(|i| result.suggestions[0] == format!("Did you mean '{}'?", i)));
                    checked += 1;
                }
            }
        }

        assert!(checked > 40);
    }

    #[test]
    fn test_first_candidate_wins_over_later_exact_match() {
        // "TPA" appears verbatim, but the first identifier already clears
        // the typo threshold and stops the search.
        let store = LearningStore::in_memory();
        let result = check("TPA", "Claims Adminstrator TPA", &store);
        assert_eq!(result.status, ValidationStatus::PossibleTypo);
        assert_eq!(result.suggestions, vec!["Did you mean 'Claims Administrator'?"]);
    }
}
