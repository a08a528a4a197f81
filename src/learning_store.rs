//! Learning Store - Learns from user-taught synonyms and corrections
//!
//! Reviewers teach the system new ways a field shows up in plan documents
//! (synonyms) and fixes for values the extraction keeps getting wrong
//! (corrections). Every teach call appends an audit event and rewrites the
//! whole JSON document before returning.
//!
//! A store either lives in memory only (tests, previews) or is backed by a
//! file. A backing file that exists but cannot be read or parsed is a hard
//! error: silently starting empty would throw away everything the reviewers
//! taught.

use crate::error::{ReviewError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// User recorded when a teach call names nobody.
pub const DEFAULT_USER: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningAction {
    SynonymAdded,
    CorrectionAdded,
}

impl std::fmt::Display for LearningAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearningAction::SynonymAdded => write!(f, "synonym_added"),
            LearningAction::CorrectionAdded => write!(f, "correction_added"),
        }
    }
}

/// One entry of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub action: LearningAction,
    #[serde(rename = "term")]
    pub subject_term: String,
    pub value: String,
    #[serde(rename = "user")]
    pub user_id: String,
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnedMappings {
    /// term -> synonyms, in the order they were taught
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
    /// incorrect term -> correct term
    #[serde(default)]
    pub corrections: BTreeMap<String, String>,
    /// Reserved for user-defined rules; carried through untouched
    #[serde(default)]
    pub custom_rules: Vec<serde_json::Value>,
    #[serde(default)]
    pub learning_history: Vec<LearningEvent>,
}

/// Read access to learned terms, as needed by validation.
pub trait MappingSource {
    fn synonyms_for(&self, term: &str) -> &[String];
    fn correction_for(&self, term: &str) -> Option<&str>;
}

impl MappingSource for LearnedMappings {
    fn synonyms_for(&self, term: &str) -> &[String] {
        self.synonyms.get(term).map(|s| s.as_slice()).unwrap_or(&[])
    }

    fn correction_for(&self, term: &str) -> Option<&str> {
        self.corrections.get(term).map(|s| s.as_str())
    }
}

pub struct LearningStore {
    /// None for in-memory stores
    path: Option<PathBuf>,
    mappings: LearnedMappings,
}

impl LearningStore {
    /// A store that never touches the file system.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            mappings: LearnedMappings::default(),
        }
    }

    /// Load the store backed by `path`, starting empty if the file does not
    /// exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mappings = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ReviewError::MappingStore {
                path: path.clone(),
                message: format!("failed to read learned mappings: {}", e),
            })?;
            let mappings: LearnedMappings =
                serde_json::from_str(&content).map_err(|e| ReviewError::MappingStore {
                    path: path.clone(),
                    message: format!("learned mappings are not valid JSON: {}", e),
                })?;
            info!(
                "Loaded learned mappings from {}: {} synonym terms, {} corrections, {} history events",
                path.display(),
                mappings.synonyms.len(),
                mappings.corrections.len(),
                mappings.learning_history.len()
            );
            mappings
        } else {
            info!("No learned mappings at {}, starting empty", path.display());
            LearnedMappings::default()
        };

        Ok(Self {
            path: Some(path),
            mappings,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn mappings(&self) -> &LearnedMappings {
        &self.mappings
    }

    pub fn history(&self) -> &[LearningEvent] {
        &self.mappings.learning_history
    }

    /// The last `n` events, oldest first.
    pub fn recent_history(&self, n: usize) -> &[LearningEvent] {
        let history = self.history();
        &history[history.len().saturating_sub(n)..]
    }

    /// Teach that `synonym` is another way of writing `term`.
    ///
    /// A synonym already known for `term` is not stored twice, but the call
    /// is still recorded in the history.
    pub fn teach_synonym(&mut self, term: &str, synonym: &str, user: &str) -> Result<()> {
        let term = required("term", term)?;
        let synonym = required("synonym", synonym)?;

        let previous = self.mappings.clone();
        let known = self.mappings.synonyms.entry(term.to_string()).or_default();
        if !known.iter().any(|s| s == synonym) {
            known.push(synonym.to_string());
        }
        self.record(LearningAction::SynonymAdded, term, synonym, user);

        self.commit(previous)?;
        info!("Learned synonym '{}' for '{}'", synonym, term);
        Ok(())
    }

    /// Teach that `incorrect` should read `correct`. Replaces any earlier
    /// correction for the same term.
    pub fn teach_correction(&mut self, incorrect: &str, correct: &str, user: &str) -> Result<()> {
        let incorrect = required("incorrect term", incorrect)?;
        let correct = required("correct term", correct)?;

        let previous = self.mappings.clone();
        self.mappings
            .corrections
            .insert(incorrect.to_string(), correct.to_string());
        self.record(LearningAction::CorrectionAdded, incorrect, correct, user);

        self.commit(previous)?;
        info!("Learned correction '{}' -> '{}'", incorrect, correct);
        Ok(())
    }

    /// Write the whole document to the backing file, if any.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.mappings)?;
        let tmp_path = path.with_extension("json.tmp");
        if let Err(e) = std::fs::write(&tmp_path, json).and_then(|()| std::fs::rename(&tmp_path, path)) {
            // drop the partial copy
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!("Saved learned mappings to {}", path.display());
        Ok(())
    }

    fn record(&mut self, action: LearningAction, term: &str, value: &str, user: &str) {
        let user = user.trim();
        self.mappings.learning_history.push(LearningEvent {
            timestamp: Utc::now().to_rfc3339(),
            action,
            subject_term: term.to_string(),
            value: value.to_string(),
            user_id: if user.is_empty() { DEFAULT_USER } else { user }.to_string(),
        });
    }

    /// Persist, restoring `previous` if the write fails so memory and disk
    /// stay in agreement.
    fn commit(&mut self, previous: LearnedMappings) -> Result<()> {
        if let Err(e) = self.save() {
            self.mappings = previous;
            return Err(e);
        }
        Ok(())
    }
}

impl MappingSource for LearningStore {
    fn synonyms_for(&self, term: &str) -> &[String] {
        self.mappings.synonyms_for(term)
    }

    fn correction_for(&self, term: &str) -> Option<&str> {
        self.mappings.correction_for(term)
    }
}

fn required<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ReviewError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(value)
}
