//! Error types for Reverie

use thiserror::Error;

/// Main error type for the memory system
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Model endpoint did not produce a usable reply
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// Text analyzer could not score an input
    #[error("Analyzer error: {0}")]
    Analyzer(String),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for MemoryError {
    fn from(e: serde_json::Error) -> Self {
        MemoryError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for MemoryError {
    fn from(e: reqwest::Error) -> Self {
        MemoryError::Dispatch(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MemoryError>;
