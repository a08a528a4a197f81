//! Optional AI judgment
//!
//! An external service can look at the validated checklist and flag items
//! that need approval, a member notice, or a handbook entry. The flags are
//! advisory: a report is complete without them, and a failing service only
//! adds a warning.

use crate::catalog::FieldCatalog;
use crate::error::Result;
use crate::llm::LlmClient;
use crate::types::{FieldValue, ValidationStatus};
use crate::validation::ChecklistValidationReport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentItem {
    pub field_name: String,
    pub value: FieldValue,
    pub status: ValidationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentDecision {
    pub field_name: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub requires_notice: bool,
    #[serde(default)]
    pub in_handbook: bool,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentContext {
    pub group_name: String,
    /// canonical field name -> definition
    pub field_definitions: BTreeMap<String, String>,
}

#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(
        &self,
        items: &[JudgmentItem],
        context: &JudgmentContext,
    ) -> Result<Vec<JudgmentDecision>>;
}

/// Base (non-AI) mode.
pub struct NoopJudge;

#[async_trait]
impl Judge for NoopJudge {
    async fn judge(
        &self,
        _items: &[JudgmentItem],
        _context: &JudgmentContext,
    ) -> Result<Vec<JudgmentDecision>> {
        Ok(Vec::new())
    }
}

pub struct LlmJudge {
    client: LlmClient,
}

impl LlmJudge {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn judge(
        &self,
        items: &[JudgmentItem],
        context: &JudgmentContext,
    ) -> Result<Vec<JudgmentDecision>> {
        self.client.judge_checklist(items, context).await
    }
}

/// Attach the judge's decisions to a copy of `report`.
///
/// Decisions naming fields that are not in the report are dropped. If the
/// judge fails, the copy is the base report plus one warning.
pub async fn augment_with_judgment(
    report: &ChecklistValidationReport,
    judge: &dyn Judge,
    catalog: &FieldCatalog,
    group_name: &str,
) -> ChecklistValidationReport {
    let items: Vec<JudgmentItem> = report
        .field_results
        .values()
        .map(|r| JudgmentItem {
            field_name: r.field_name.clone(),
            value: r.value.clone(),
            status: r.status,
        })
        .collect();

    let context = JudgmentContext {
        group_name: group_name.to_string(),
        field_definitions: items
            .iter()
            .map(|i| (i.field_name.clone(), catalog.definition_for(&i.field_name).to_string()))
            .collect(),
    };

    let mut augmented = report.clone();
    match judge.judge(&items, &context).await {
        Ok(decisions) => {
            let mut applied = 0;
            for decision in decisions {
                let Some(result) = augmented.field_results.remove(&decision.field_name) else {
                    warn!("Ignoring judgment for unknown field '{}'", decision.field_name);
                    continue;
                };
                augmented
                    .field_results
                    .insert(decision.field_name.clone(), result.with_judgment(decision));
                applied += 1;
            }
            info!("Applied {} AI judgments for {}", applied, group_name);
        }
        Err(e) => {
            warn!("AI judgment failed for {}: {}", group_name, e);
            augmented
                .warnings
                .push(format!("AI judgment unavailable: {}", e));
        }
    }

    augmented
}
