//! Runtime configuration
//!
//! Values come from the process environment (after `.env` is loaded by the
//! binaries); CLI flags override individual fields.

use crate::error::{ReviewError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder key that keeps the LLM client offline.
pub const DUMMY_API_KEY: &str = "dummy-api-key";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Learned-mapping JSON document
    pub mappings_path: PathBuf,
    /// Directory for HTML/JSON/CSV exports
    pub output_dir: PathBuf,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub llm_timeout: Duration,
    /// Dashboard bind address
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mappings_path: PathBuf::from("learned_mappings.json"),
            output_dir: PathBuf::from("."),
            api_key: DUMMY_API_KEY.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            llm_timeout: Duration::from_secs(30),
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl AppConfig {
    /// Build a config from the current environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("PLAN_REVIEW_MAPPINGS") {
            config.mappings_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("PLAN_REVIEW_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            config.api_key = key;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("PLAN_REVIEW_MODEL") {
            config.model = model;
        }
        if let Some(secs) = lookup("PLAN_REVIEW_LLM_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ReviewError::Config(format!(
                    "PLAN_REVIEW_LLM_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    secs
                ))
            })?;
            config.llm_timeout = Duration::from_secs(secs);
        }
        if let Some(bind) = lookup("PLAN_REVIEW_BIND") {
            config.bind_addr = bind;
        }

        Ok(config)
    }

    /// AI mode is on only when a real API key is configured.
    pub fn ai_enabled(&self) -> bool {
        self.api_key != DUMMY_API_KEY
    }
}
