//! Extraction job model and failure taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docflow_core::{DocumentType, DocumentUploadId, JobHandle, TenantId};

/// One document's in-flight extraction request.
///
/// Created at submission and carried between invocations inside the
/// continuation message. Only `retry_count` changes over its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub document_upload_id: DocumentUploadId,
    pub job_handle: JobHandle,
    pub tenant_id: TenantId,
    pub document_type: DocumentType,
    /// Bucket holding the source object.
    pub source_bucket: String,
    /// Decoded object key of the source document.
    pub source_object_key: String,
    /// Object key as delivered by the trigger (forwarded downstream as `sourcePath`).
    pub source_path: String,
    pub file_name: String,
    /// Polling round this invocation is running (0 in the submitting invocation).
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

impl ExtractionJob {
    /// The same job, one polling round later.
    pub fn next_round(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

/// Lifecycle phase of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Succeeded | JobPhase::Failed | JobPhase::TimedOut)
    }
}

/// Job-level failure causes.
///
/// All of these are recovered locally into a placeholder record; none of them
/// propagate as an invocation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobFailure {
    /// The service refused the job or returned no handle.
    SubmissionRejected { detail: String },
    /// The service accepted the job and later marked it failed.
    ServiceReportedFailure,
    /// The service reported a status outside the known vocabulary.
    UnexpectedStatus { raw: String },
    /// The service reported success but wrote no canonical result object.
    MissingOutput,
    /// The job never terminated within the retry budget.
    PollingTimeout { checks: u64 },
}

impl JobFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            JobFailure::PollingTimeout { .. } => FailureReason::ProcessingTimeout,
            _ => FailureReason::ExtractionFailed,
        }
    }
}

/// Human-readable `exceptionStatus` written to the registry and placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    #[serde(rename = "Extraction Failed")]
    ExtractionFailed,
    #[serde(rename = "Processing Timeout")]
    ProcessingTimeout,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ExtractionFailed => "Extraction Failed",
            FailureReason::ProcessingTimeout => "Processing Timeout",
        }
    }
}

impl core::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
