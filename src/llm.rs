use crate::config::{AppConfig, DUMMY_API_KEY};
use crate::error::{ReviewError, Result};
use crate::judgment::{JudgmentContext, JudgmentDecision, JudgmentItem};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JudgmentResponse {
    #[serde(default)]
    decisions: Vec<JudgmentDecision>,
}

pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        let defaults = AppConfig::default();
        Self {
            api_key,
            base_url: defaults.base_url,
            model: defaults.model,
            timeout: defaults.llm_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout: config.llm_timeout,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.api_key == DUMMY_API_KEY
    }

    /// Ask the model for approval/notice/handbook flags on each checklist item.
    pub async fn judge_checklist(
        &self,
        items: &[JudgmentItem],
        context: &JudgmentContext,
    ) -> Result<Vec<JudgmentDecision>> {
        let prompt = build_judgment_prompt(items, context)?;
        let response = self.call_llm(&prompt).await?;

        let parsed: JudgmentResponse = serde_json::from_str(strip_code_fence(&response))
            .map_err(|e| ReviewError::Llm(format!("Failed to parse judgment response: {}", e)))?;

        info!(
            "LLM returned {} decisions for {} items",
            parsed.decisions.len(),
            items.len()
        );
        Ok(parsed.decisions)
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        // Offline mode: never touch the network
        if self.is_offline() {
            return Ok(r#"{"decisions": []}"#.to_string());
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ReviewError::Llm(format!("Failed to build HTTP client: {}", e)))?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a precise JSON-only responder reviewing insurance plan documents. Always return valid JSON, no other text."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
            "max_tokens": 2000
        });

        debug!("Calling {} with model {}", self.base_url, self.model);
        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ReviewError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReviewError::Llm(format!("LLM API returned {}", status)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ReviewError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ReviewError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

fn build_judgment_prompt(items: &[JudgmentItem], context: &JudgmentContext) -> Result<String> {
    let items_json = serde_json::to_string_pretty(items)?;
    let definitions: Vec<String> = items
        .iter()
        .filter_map(|item| {
            context
                .field_definitions
                .get(&item.field_name)
                .map(|d| format!("- {}: {}", item.field_name, d))
        })
        .collect();

    Ok(format!(
        r#"You are reviewing the plan document checklist for group "{}".

Field definitions:
{}

Extracted checklist items:
{}

For every item decide:
1. requires_approval: does the provision need underwriting approval?
2. requires_notice: must members be sent a notice about it?
3. in_handbook: should it appear in the employee handbook?
4. reasoning: one or two sentences explaining the decision

Return JSON in this exact format:
{{
  "decisions": [
    {{
      "field_name": "COBRA",
      "requires_approval": false,
      "requires_notice": true,
      "in_handbook": true,
      "reasoning": "COBRA continuation must be communicated to terminating employees."
    }}
  ]
}}

Only return the JSON, no other text."#,
        context.group_name,
        definitions.join("\n"),
        items_json
    ))
}

/// Models sometimes wrap JSON in a markdown fence.
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldValue, ValidationStatus};
    use std::collections::BTreeMap;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
    }

    #[test]
    fn test_prompt_mentions_items_and_definitions() {
        let items = vec![JudgmentItem {
            field_name: "COBRA".to_string(),
            value: FieldValue::from("18 months"),
            status: ValidationStatus::Found,
        }];
        let mut field_definitions = BTreeMap::new();
        field_definitions.insert("COBRA".to_string(), "COBRA continuation coverage".to_string());
        let context = JudgmentContext {
            group_name: "Aurora Dynamics".to_string(),
            field_definitions,
        };

        let prompt = build_judgment_prompt(&items, &context).unwrap();
        assert!(prompt.contains("Aurora Dynamics"));
        assert!(prompt.contains("- COBRA: COBRA continuation coverage"));
        assert!(prompt.contains("18 months"));
    }

    #[tokio::test]
    async fn test_offline_client_returns_no_decisions() {
        let client = LlmClient::new(DUMMY_API_KEY.to_string());
        let context = JudgmentContext {
            group_name: "Aurora Dynamics".to_string(),
            field_definitions: BTreeMap::new(),
        };
        let decisions = client.judge_checklist(&[], &context).await.unwrap();
        assert!(decisions.is_empty());
    }
}
