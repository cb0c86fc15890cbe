//! Error types for PostApply.
//!
//! A single enum covers configuration, I/O, provider, knowledge and prompt
//! failures. The retrieval subsystem's own taxonomy (embedding and generation
//! provider failures, a missing index snapshot, inconsistent vector sizes) is
//! represented by dedicated variants so callers can match on them.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for PostApply.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// An embedding call failed (fatal to index build, retryable by the caller for search)
    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// A generation call failed
    #[error("Generation provider error: {0}")]
    GenerationProvider(String),

    /// No index snapshot exists at the given path
    #[error("Index snapshot not found at {0:?}")]
    IndexMissing(PathBuf),

    /// The embedder returned a vector of unexpected size
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Knowledge base, chunking and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Stable snake_case tag for this error, used in structured error output.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Llm(_) => "llm",
            AppError::EmbeddingProvider(_) => "embedding_provider",
            AppError::GenerationProvider(_) => "generation_provider",
            AppError::IndexMissing(_) => "index_missing",
            AppError::DimensionMismatch { .. } => "dimension_mismatch",
            AppError::Knowledge(_) => "knowledge",
            AppError::Prompt(_) => "prompt",
            AppError::Serialization(_) => "serialization",
            AppError::Other(_) => "other",
        }
    }

    /// Re-tag a provider failure as an embedding failure.
    ///
    /// Errors that already carry a more specific meaning (dimension
    /// mismatches, for example) pass through untouched.
    pub fn into_embedding_error(self) -> Self {
        match self {
            AppError::DimensionMismatch { .. } | AppError::EmbeddingProvider(_) => self,
            other => AppError::EmbeddingProvider(other.to_string()),
        }
    }

    /// Re-tag a provider failure as a generation failure.
    pub fn into_generation_error(self) -> Self {
        match self {
            AppError::GenerationProvider(_) => self,
            other => AppError::GenerationProvider(other.to_string()),
        }
    }
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

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(
            AppError::GenerationProvider("down".into()).kind(),
            "generation_provider"
        );
        assert_eq!(
            AppError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
            .kind(),
            "dimension_mismatch"
        );
        assert_eq!(
            AppError::IndexMissing(PathBuf::from("x")).kind(),
            "index_missing"
        );
    }

    #[test]
    fn test_into_embedding_error_keeps_dimension_mismatch() {
        let err = AppError::DimensionMismatch {
            expected: 3,
            actual: 2,
        }
        .into_embedding_error();
        assert!(matches!(err, AppError::DimensionMismatch { .. }));

        let err = AppError::Llm("connection refused".into()).into_embedding_error();
        match err {
            AppError::EmbeddingProvider(msg) => assert!(msg.contains("connection refused")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_into_generation_error() {
        let err = AppError::Llm("HTTP 500".into()).into_generation_error();
        assert_eq!(err.kind(), "generation_provider");
        assert!(err.to_string().contains("HTTP 500"));
    }
}
