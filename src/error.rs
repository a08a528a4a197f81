use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Mapping store error ({path}): {message}")]
    MappingStore { path: PathBuf, message: String },

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ReviewError>;
