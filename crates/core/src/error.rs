//! Error types for the radar assistant.
//!
//! This module defines a unified error enum covering every error category
//! in the application. Crates with richer failure taxonomies (the index
//! crate in particular) define their own typed errors and convert into
//! `AppError` at the boundary.

use thiserror::Error;

/// Unified error type for the radar assistant.
///
/// All fallible entry points return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Telemetry source errors
    #[error("Source error: {0}")]
    Source(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index and snapshot errors
    #[error("Index error: {0}")]
    Index(String),

    /// Durable snapshot storage errors
    #[error("Persist error: {0}")]
    Persist(String),

    /// Query-path errors surfaced to callers
    #[error("Query error: {0}")]
    Query(String),

    /// Prompt assembly errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other(format!("{:#}", err))
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
