pub mod catalog;
pub mod chat;
pub mod checklist;
pub mod config;
pub mod error;
pub mod fuzzy_matcher;
pub mod ingestion;
pub mod judgment;
pub mod learning_store;
pub mod llm;
pub mod pdf;
pub mod render;
pub mod session;
pub mod similarity;
pub mod types;
pub mod validation;
pub mod validator;
