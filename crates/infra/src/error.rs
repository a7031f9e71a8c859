//! Infrastructure and orchestration errors.

use std::sync::PoisonError;

use docflow_core::DomainError;

/// Failure of an external collaborator (object store, queue, registry, ...).
///
/// All variants are transient from the orchestrator's point of view: the
/// invocation fails and the trigger is redelivered. Job-level failures never
/// use this type; they are recorded as placeholder records instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InfraError {
    #[error("extraction service error: {0}")]
    Extraction(String),
    #[error("object store error: {0}")]
    ObjectStore(String),
    #[error("queue error: {0}")]
    Queue(String),
    #[error("scheduler error: {0}")]
    Scheduler(String),
    #[error("upload registry error: {0}")]
    Registry(String),
    #[error("result store error: {0}")]
    ResultStore(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),
}

impl InfraError {
    pub(crate) fn poisoned<T>(what: &'static str) -> impl FnOnce(PoisonError<T>) -> Self {
        move |_| InfraError::Poisoned(what)
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(e: serde_json::Error) -> Self {
        InfraError::Serialization(e.to_string())
    }
}

/// Error surfaced by an orchestrator invocation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrchestratorError {
    /// The trigger or its registry entry is malformed. Retrying will not help.
    #[error(transparent)]
    Validation(#[from] DomainError),
    /// A collaborator failed; the invocation should be retried.
    #[error(transparent)]
    Infrastructure(#[from] InfraError),
}

impl OrchestratorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestratorError::Infrastructure(_))
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
