//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic problems with the input itself (malformed keys, unsupported
/// document types, missing registry rows). Infrastructure failures are modelled
/// separately in `docflow-infra` so they can never be mistaken for a job outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. empty path segment).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A document type outside the supported set.
    #[error("unsupported document type: {0}")]
    UnsupportedDocumentType(String),

    /// A requested resource was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
