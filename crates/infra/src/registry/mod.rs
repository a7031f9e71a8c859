//! Upload registry: per-document metadata owned by the upload side.
//!
//! The orchestrator reads an entry at submission, writes `InProgress` with
//! the job handle once the service accepted the document, and writes `Fail`
//! with a reason when the job ends in failure. While a job is `InProgress`
//! the entry also tracks how far orchestration got, so a redelivered trigger
//! can tell an interrupted first round from a job another round owns.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use docflow_core::{DocumentUploadId, JobHandle, TenantId};
use docflow_jobs::FailureReason;

use crate::error::InfraError;

pub use in_memory::InMemoryUploadRegistry;
pub use postgres::PostgresUploadRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadStatus {
    Pending,
    InProgress,
    Fail,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "Pending",
            UploadStatus::InProgress => "InProgress",
            UploadStatus::Fail => "Fail",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Pending" => Some(UploadStatus::Pending),
            "InProgress" => Some(UploadStatus::InProgress),
            "Fail" => Some(UploadStatus::Fail),
            _ => None,
        }
    }
}

/// Orchestration progress of an `InProgress` job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobProgress {
    /// Handle recorded; the submitting round has not finished.
    Submitted,
    /// A continuation was scheduled and owns the job from here.
    Continuing,
    /// Output dispatched and source relocated.
    Completed,
}

impl JobProgress {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobProgress::Submitted => "Submitted",
            JobProgress::Continuing => "Continuing",
            JobProgress::Completed => "Completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Submitted" => Some(JobProgress::Submitted),
            "Continuing" => Some(JobProgress::Continuing),
            "Completed" => Some(JobProgress::Completed),
            _ => None,
        }
    }
}

/// What a trigger for an existing entry may do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    /// Nothing started yet.
    Unclaimed,
    /// The submitting round was interrupted; resume it with this handle.
    Resumable(JobHandle),
    /// Another round owns the job, or it already ended.
    Claimed,
}

/// One registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEntry {
    pub document_upload_id: DocumentUploadId,
    pub tenant_id: TenantId,
    /// Raw type as recorded by the uploader; validated at submission.
    pub document_type: String,
    pub source_path: Option<String>,
    pub status: UploadStatus,
    pub exception_status: Option<String>,
    pub job_handle: Option<JobHandle>,
    /// Unset outside `InProgress`.
    pub progress: Option<JobProgress>,
}

impl UploadEntry {
    pub fn pending(
        document_upload_id: DocumentUploadId,
        tenant_id: TenantId,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            document_upload_id,
            tenant_id,
            document_type: document_type.into(),
            source_path: None,
            status: UploadStatus::Pending,
            exception_status: None,
            job_handle: None,
            progress: None,
        }
    }

    /// Entries `InProgress` with a handle but no recorded progress are
    /// treated as owned elsewhere.
    pub fn claim_state(&self) -> ClaimState {
        match (self.status, &self.job_handle) {
            (UploadStatus::Fail, _) => ClaimState::Claimed,
            (UploadStatus::Pending, _) | (UploadStatus::InProgress, None) => ClaimState::Unclaimed,
            (UploadStatus::InProgress, Some(handle)) => match self.progress {
                Some(JobProgress::Submitted) => ClaimState::Resumable(handle.clone()),
                Some(JobProgress::Continuing | JobProgress::Completed) | None => ClaimState::Claimed,
            },
        }
    }
}

pub trait UploadRegistry: Send + Sync {
    fn get(&self, id: &DocumentUploadId) -> Result<Option<UploadEntry>, InfraError>;

    /// Records the handle with progress `Submitted`.
    fn mark_in_progress(&self, id: &DocumentUploadId, handle: &JobHandle) -> Result<(), InfraError>;

    fn mark_progress(&self, id: &DocumentUploadId, progress: JobProgress) -> Result<(), InfraError>;

    /// Overwrites with the same values on repeat, so safe to call again.
    fn mark_failed(&self, id: &DocumentUploadId, reason: FailureReason) -> Result<(), InfraError>;
}

impl<R> UploadRegistry for Arc<R>
where
    R: UploadRegistry + ?Sized,
{
    fn get(&self, id: &DocumentUploadId) -> Result<Option<UploadEntry>, InfraError> {
        (**self).get(id)
    }

    fn mark_in_progress(&self, id: &DocumentUploadId, handle: &JobHandle) -> Result<(), InfraError> {
        (**self).mark_in_progress(id, handle)
    }

    fn mark_progress(&self, id: &DocumentUploadId, progress: JobProgress) -> Result<(), InfraError> {
        (**self).mark_progress(id, progress)
    }

    fn mark_failed(&self, id: &DocumentUploadId, reason: FailureReason) -> Result<(), InfraError> {
        (**self).mark_failed(id, reason)
    }
}
