//! Error types for the SafeChat pipeline.
//!
//! This module defines a unified error enum covering every failure category
//! in the application: configuration, ingestion, retrieval, prompt building,
//! the guardrail gateway, the completion provider, and audit logging.

use thiserror::Error;

/// Unified error type for the SafeChat pipeline.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
///
/// A request blocked by policy is NOT an error: it is a deliberate terminal
/// outcome and is represented in the pipeline response, not here.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document ingestion errors (unreadable, malformed, or rejected files)
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// Retrieval over an empty or missing index, or a missing resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Prompt construction errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Guardrail gateway unreachable or failing after retries
    #[error("Gateway unavailable: {0}")]
    Gateway(String),

    /// Guardrail gateway reachable but returned a malformed verdict
    #[error("Guard error: {0}")]
    Guard(String),

    /// Completion provider errors
    #[error("Provider error: {0}")]
    Provider(String),

    /// Audit log write failures
    #[error("Audit error: {0}")]
    Audit(String),

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

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
