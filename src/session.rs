//! Review session: the state the console menu and the dashboard work on.

use crate::catalog::FieldCatalog;
use crate::checklist::Checklist;
use crate::error::Result;
use crate::ingestion::ExtractionTable;
use crate::judgment::{augment_with_judgment, Judge};
use crate::learning_store::LearningStore;
use crate::validation::{validate_all, ChecklistValidationReport};
use std::path::Path;
use tracing::{info, warn};

pub struct ReviewSession {
    pub catalog: FieldCatalog,
    pub store: LearningStore,
    table: Option<ExtractionTable>,
    current: Option<(Checklist, ChecklistValidationReport)>,
}

impl ReviewSession {
    pub fn new(catalog: FieldCatalog, store: LearningStore) -> Self {
        Self {
            catalog,
            store,
            table: None,
            current: None,
        }
    }

    pub fn load_table(&mut self, path: impl AsRef<Path>) -> Result<&ExtractionTable> {
        let table = ExtractionTable::from_path(path)?;
        Ok(self.table.insert(table))
    }

    pub fn set_table(&mut self, table: ExtractionTable) {
        self.table = Some(table);
    }

    pub fn table(&self) -> Option<&ExtractionTable> {
        self.table.as_ref()
    }

    /// Generate and validate the checklist for one group. Groups with no
    /// rows (or no table at all) get the blank all-missing template.
    pub fn process_group(&mut self, group_name: &str) -> &(Checklist, ChecklistValidationReport) {
        let rows = match &self.table {
            Some(table) => table.for_group(group_name),
            None => ExtractionTable::default(),
        };
        let rows = if rows.is_empty() {
            warn!("No extraction rows for '{}', using blank template", group_name);
            ExtractionTable::blank_template()
        } else {
            rows
        };

        let checklist = Checklist::generate(group_name, &rows, &self.catalog);
        let report = validate_all(&checklist.field_values(), &self.catalog, &self.store);
        info!("{}: {}", group_name, report.overall_status);
        self.current.insert((checklist, report))
    }

    /// Re-run validation on the current checklist, picking up anything
    /// taught since it was generated.
    pub fn revalidate(&mut self) -> Option<&ChecklistValidationReport> {
        let (checklist, report) = self.current.as_mut()?;
        *report = validate_all(&checklist.field_values(), &self.catalog, &self.store);
        Some(&*report)
    }

    /// Attach AI judgments to the current report.
    pub async fn apply_judgment(&mut self, judge: &dyn Judge) -> Option<&ChecklistValidationReport> {
        let (checklist, report) = self.current.as_mut()?;
        *report = augment_with_judgment(report, judge, &self.catalog, &checklist.metadata.group_name).await;
        Some(&*report)
    }

    pub fn current(&self) -> Option<&(Checklist, ChecklistValidationReport)> {
        self.current.as_ref()
    }
}
