//! Keyword-driven answers for the console chat mode.

use crate::checklist::Checklist;
use crate::validation::ChecklistValidationReport;

const STATUS_WORDS: &[&str] = &["status", "summary", "overview"];
const EXPORT_WORDS: &[&str] = &["export", "pdf", "save"];
const LEARN_WORDS: &[&str] = &["learn", "teach", "train"];
const HELP_WORDS: &[&str] = &["help", "how", "what"];

fn mentions(input: &str, words: &[&str]) -> bool {
    words.iter().any(|w| input.contains(w))
}

/// Whether the input ends chat mode.
pub fn is_exit(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit" | "back")
}

pub fn respond(input: &str, current: Option<&(Checklist, ChecklistValidationReport)>) -> String {
    let input = input.to_lowercase();

    if mentions(&input, STATUS_WORDS) {
        return match current {
            Some((checklist, report)) => format!(
                "Current checklist for {}. Status: {}. {} fields found, {} missing.",
                checklist.metadata.group_name,
                report.overall_status,
                report.fields_found,
                report.fields_missing
            ),
            None => "No checklist loaded yet. Generate one from the main menu first.".to_string(),
        };
    }

    if input.contains("missing") {
        return match current {
            Some((_, report)) => {
                let names: Vec<&str> = report
                    .field_results
                    .values()
                    .filter(|r| r.value.is_missing())
                    .map(|r| r.field_name.as_str())
                    .collect();
                if names.is_empty() {
                    "There are no missing fields.".to_string()
                } else {
                    format!(
                        "There are {} missing fields: {}.",
                        report.fields_missing,
                        names.join(", ")
                    )
                }
            }
            None => "No validation data available yet.".to_string(),
        };
    }

    if mentions(&input, EXPORT_WORDS) {
        return "You can preview the checklist as HTML or export it as JSON, CSV or PDF from the main menu."
            .to_string();
    }

    if mentions(&input, LEARN_WORDS) {
        return "Use the teach option to add synonyms or corrections. I'll remember them!".to_string();
    }

    if mentions(&input, HELP_WORDS) {
        return "I can process plan document extractions, generate checklists, validate them, \
                and learn from corrections. Check the main menu for all options!"
            .to_string();
    }

    "I'm here to help with plan document review. Try asking about status, missing fields, \
     exports, or use 'help' for more info."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::ingestion::ExtractionTable;
    use crate::learning_store::LearningStore;
    use crate::validation::validate_all;

    fn current() -> (Checklist, ChecklistValidationReport) {
        let table = ExtractionTable::from_csv_reader(
            "Field,Extracted_Value\nCOBRA,18 months\nSubrogation,N/F\n".as_bytes(),
        )
        .unwrap();
        let catalog = FieldCatalog::standard();
        let checklist = Checklist::generate("Aurora Dynamics", &table, &catalog);
        let report = validate_all(&checklist.field_values(), &catalog, &LearningStore::in_memory());
        (checklist, report)
    }

    #[test]
    fn test_status_without_checklist() {
        assert!(respond("what's the status?", None).starts_with("No checklist loaded"));
    }

    #[test]
    fn test_status_and_missing_with_checklist() {
        let state = current();
        let status = respond("Give me a summary", Some(&state));
        assert_eq!(
            status,
            "Current checklist for Aurora Dynamics. Status: complete. 1 fields found, 1 missing."
        );
        assert_eq!(
            respond("anything missing?", Some(&state)),
            "There are 1 missing fields: Subrogation."
        );
    }

    #[test]
    fn test_keyword_routes() {
        assert!(respond("how do I save a PDF", None).contains("export"));
        assert!(respond("can you learn this", None).contains("teach option"));
        assert!(respond("HELP", None).contains("main menu"));
        assert!(respond("hello there", None).starts_with("I'm here to help"));
    }

    #[test]
    fn test_exit_words() {
        assert!(is_exit(" Quit "));
        assert!(!is_exit("quitting time"));
    }
}
