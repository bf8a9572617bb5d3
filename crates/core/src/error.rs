//! Error types for ragcheck.
//!
//! A single error enum covers the whole pipeline. The first three variants are
//! the question-answering taxonomy (bad input, retrieval side unavailable,
//! generation side failed); the rest are ambient concerns such as
//! configuration, I/O and serialization.

use thiserror::Error;

/// Unified error type for ragcheck.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic on bad input; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid required input (empty query, zero chunk size, bad table name)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Index store or embedding collaborator unreachable, or table missing
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// LLM collaborator error or malformed structured output
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Task specification and prompt template errors
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
    /// Short machine-readable kind, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::RetrievalUnavailable(_) => "retrieval_unavailable",
            AppError::GenerationFailed(_) => "generation_failed",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Prompt(_) => "prompt",
            AppError::Serialization(_) => "serialization",
            AppError::Other(_) => "other",
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
