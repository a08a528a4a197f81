use plan_review::catalog::FieldCatalog;
use plan_review::learning_store::{LearningAction, LearningStore, MappingSource};
use plan_review::types::{FieldValue, ValidationStatus};
use plan_review::validator::validate;
use tempfile::TempDir;

#[test]
fn test_persist_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("learned_mappings.json");

    {
        let mut store = LearningStore::open(&path).unwrap();
        store.teach_synonym("Retiree", "former staff", "analyst").unwrap();
        store.teach_synonym("Retiree", "pensioners", "analyst").unwrap();
        store.teach_correction("Claims Adminstrator", "Claims Administrator", "").unwrap();
        store.teach_correction("Claims Adminstrator", "Third Party Administrator", "analyst").unwrap();
    }

    let reloaded = LearningStore::open(&path).unwrap();
    assert_eq!(reloaded.synonyms_for("Retiree"), ["former staff", "pensioners"]);
    assert_eq!(
        reloaded.correction_for("Claims Adminstrator"),
        Some("Third Party Administrator")
    );
    assert_eq!(reloaded.history().len(), 4);
    assert_eq!(reloaded.history()[2].action, LearningAction::CorrectionAdded);
    assert_eq!(reloaded.history()[2].user_id, "system");

    let again = LearningStore::open(&path).unwrap();
    assert_eq!(again.mappings(), reloaded.mappings());
}

#[test]
fn test_teach_synonym_twice_keeps_one_entry() {
    let mut store = LearningStore::in_memory();
    store.teach_synonym("COBRA", "continuation coverage", "u").unwrap();
    store.teach_synonym("COBRA", "continuation coverage", "u").unwrap();

    assert_eq!(store.synonyms_for("COBRA").len(), 1);
    assert_eq!(store.history().len(), 2);
}

#[test]
fn test_learned_synonym_changes_validation_after_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("mappings.json");
    let catalog = FieldCatalog::standard();
    let value = FieldValue::from("Former staff keep coverage");

    let mut store = LearningStore::open(&path).unwrap();
    assert_eq!(
        validate("Retirees", &value, &catalog, &store).status,
        ValidationStatus::Unidentifiable
    );
    store.teach_synonym("Retiree", "former staff", "u").unwrap();

    let reloaded = LearningStore::open(&path).unwrap();
    let result = validate("Retirees", &value, &catalog, &reloaded);
    assert_eq!(result.status, ValidationStatus::Found);
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("learned_mappings.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(LearningStore::open(&path).is_err());
}
