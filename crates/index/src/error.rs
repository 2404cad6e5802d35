//! Failure kinds of the semantic index engine.
//!
//! Each failure site has its own type so callers can decide how far it
//! propagates: source and embedding failures stay inside a rebuild cycle,
//! persistence failures are only logged, and query failures go back to the
//! one request that caused them.

use radar_core::AppError;
use std::path::PathBuf;
use thiserror::Error;

/// A telemetry source could not contribute to this cycle.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{kind} source {path:?} unavailable: {source}")]
    Unavailable {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} source {path:?} is empty")]
    Empty { kind: &'static str, path: PathBuf },

    #[error("{kind} source {path:?} could not be parsed: {reason}")]
    Parse {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },
}

/// One text could not be turned into a unit vector.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("embedding failed: {reason}")]
pub struct EmbeddingFailure {
    pub reason: String,
}

impl EmbeddingFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Structural problems building an index or a snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("vector {position} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{vectors} vectors cannot pair with {summaries} summaries")]
    LengthMismatch { vectors: usize, summaries: usize },
}

/// A rebuild cycle that ended without publishing.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("no summaries survived the {stage} stage")]
    EmptyCorpus { stage: crate::scheduler::CycleStage },

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),
}

/// Durable snapshot storage failures.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot file is malformed: {0}")]
    Format(String),

    #[error("snapshot files do not match: {0}")]
    Mismatch(String),

    #[error("snapshot does not fit the index: {0}")]
    Index(#[from] IndexError),
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        PersistError::Format(err.to_string())
    }
}

/// Failures returned to the caller of a single query.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("no indexed data available; wait for the first rebuild to complete")]
    NoIndexedData,

    #[error(transparent)]
    Embedding(#[from] EmbeddingFailure),

    #[error("invalid query parameters: {0}")]
    InvalidParameters(String),

    #[error("query does not fit the published index: {0}")]
    Index(#[from] IndexError),

    #[error("prompt assembly failed: {0}")]
    Prompt(String),
}

impl QueryError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::NoIndexedData => "no_indexed_data",
            QueryError::Embedding(_) => "embedding_failed",
            QueryError::InvalidParameters(_) => "invalid_parameters",
            QueryError::Index(_) => "index_mismatch",
            QueryError::Prompt(_) => "prompt_error",
        }
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        AppError::Source(err.to_string())
    }
}

impl From<EmbeddingFailure> for AppError {
    fn from(err: EmbeddingFailure) -> Self {
        AppError::Embedding(err.reason)
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        AppError::Index(err.to_string())
    }
}

impl From<CycleError> for AppError {
    fn from(err: CycleError) -> Self {
        AppError::Index(err.to_string())
    }
}

impl From<PersistError> for AppError {
    fn from(err: PersistError) -> Self {
        AppError::Persist(err.to_string())
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError::Query(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_codes() {
        assert_eq!(QueryError::NoIndexedData.code(), "no_indexed_data");
        assert_eq!(
            QueryError::Embedding(EmbeddingFailure::new("down")).code(),
            "embedding_failed"
        );
        assert_eq!(
            QueryError::InvalidParameters("q".into()).code(),
            "invalid_parameters"
        );
    }

    #[test]
    fn test_query_error_into_app_error() {
        let app: AppError = QueryError::NoIndexedData.into();
        assert!(matches!(app, AppError::Query(_)));
        assert!(app.to_string().contains("no indexed data"));
    }

    #[test]
    fn test_embedding_failure_display() {
        let err = EmbeddingFailure::new("connection refused");
        assert_eq!(err.to_string(), "embedding failed: connection refused");
    }
}
