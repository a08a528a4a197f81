//! Checklist generation
//!
//! Turns one group's extraction rows into the reviewer-facing checklist:
//! group information first, then plan details, each entry carrying the
//! extracted value, its page and confidence, and an entry status.

use crate::catalog::FieldCatalog;
use crate::ingestion::ExtractionTable;
use crate::types::FieldValue;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Canonical fields shown in the group-information section.
pub const GROUP_INFO_FIELDS: &[&str] = &[
    "Group Name",
    "Group Effective Date",
    "TPA",
    "UR Vendor",
    "PPO Network",
    "Min. Hour Requirement",
];

/// Entries extracted with less confidence than this need a second look.
pub const REVIEW_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Found,
    Missing,
    NeedsReview,
}

impl EntryStatus {
    pub fn derive(value: &FieldValue, confidence: f64) -> Self {
        if value.is_missing() {
            EntryStatus::Missing
        } else if confidence < REVIEW_CONFIDENCE {
            EntryStatus::NeedsReview
        } else {
            EntryStatus::Found
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Found => "found",
            EntryStatus::Missing => "missing",
            EntryStatus::NeedsReview => "needs_review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn of(confidence: f64) -> Self {
        if confidence >= 0.8 {
            ConfidenceBand::High
        } else if confidence >= 0.5 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    /// Label as written upstream
    pub label: String,
    pub canonical_name: String,
    pub value: FieldValue,
    pub page: Option<u32>,
    pub confidence: f64,
    pub status: EntryStatus,
}

impl ChecklistEntry {
    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand::of(self.confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistMetadata {
    pub group_name: String,
    pub generated_at: String,
    pub generator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub metadata: ChecklistMetadata,
    pub group_info: Vec<ChecklistEntry>,
    pub plan_details: Vec<ChecklistEntry>,
}

impl Checklist {
    /// Build the checklist for `group_name` from an extraction. Rows whose
    /// labels the catalog cannot resolve are left out.
    pub fn generate(group_name: &str, table: &ExtractionTable, catalog: &FieldCatalog) -> Self {
        let mut group_info: Vec<ChecklistEntry> = Vec::new();
        let mut plan_details: Vec<ChecklistEntry> = Vec::new();

        for row in table.rows() {
            let Some(canonical) = catalog.resolve(&row.field_name) else {
                debug!("Leaving unrecognized label '{}' off the checklist", row.field_name);
                continue;
            };
            let entry = ChecklistEntry {
                label: row.field_name.clone(),
                canonical_name: canonical.to_string(),
                value: row.value.clone(),
                page: row.source_page,
                confidence: row.confidence,
                status: EntryStatus::derive(&row.value, row.confidence),
            };

            let section = if GROUP_INFO_FIELDS.contains(&canonical) {
                &mut group_info
            } else {
                &mut plan_details
            };
            match section
                .iter_mut()
                .find(|e| e.canonical_name == entry.canonical_name)
            {
                Some(existing) => *existing = entry,
                None => section.push(entry),
            }
        }

        info!(
            "Generated checklist for {}: {} group fields, {} plan details",
            group_name,
            group_info.len(),
            plan_details.len()
        );

        Self {
            metadata: ChecklistMetadata {
                group_name: group_name.to_string(),
                generated_at: Utc::now().to_rfc3339(),
                generator: format!("Plan Document Review System v{}", env!("CARGO_PKG_VERSION")),
            },
            group_info,
            plan_details,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChecklistEntry> {
        self.group_info.iter().chain(self.plan_details.iter())
    }

    /// Label -> value pairs in checklist order, as the aggregator takes them.
    pub fn field_values(&self) -> Vec<(String, FieldValue)> {
        self.entries()
            .map(|e| (e.label.clone(), e.value.clone()))
            .collect()
    }

    /// The flat export record: group and timestamp, then value, page and
    /// status columns per entry.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut record = vec![
            ("Group_Name".to_string(), self.metadata.group_name.clone()),
            ("Generated_At".to_string(), self.metadata.generated_at.clone()),
        ];
        for entry in self.entries() {
            record.push((entry.label.clone(), entry.value.display().to_string()));
            record.push((
                format!("{}_Page", entry.label),
                entry.page.map(|p| p.to_string()).unwrap_or_default(),
            ));
            record.push((format!("{}_Status", entry.label), entry.status.as_str().to_string()));
        }
        record
    }
}
