//! Continuation message: everything a later invocation needs to resume a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docflow_core::{DocumentType, DocumentUploadId, JobHandle, TenantId};

use crate::job::ExtractionJob;

/// Envelope handed to the continuation scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationMessage {
    /// Earliest time the scheduler should re-invoke the orchestrator.
    pub resume_at: DateTime<Utc>,
    pub job: ContinuationJob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationJob {
    pub is_retry: bool,
    pub job_handle: JobHandle,
    pub source_object_key: String,
    pub retry_count: u32,
    pub document_payload: DocumentPayload,
    /// Absent in messages produced by older writers; the configured input bucket applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    pub file_name: String,
    pub document_upload_id: DocumentUploadId,
    pub document_type: DocumentType,
    pub tenant_id: TenantId,
    pub source_path: String,
}

impl ContinuationMessage {
    pub fn for_job(job: &ExtractionJob, resume_at: DateTime<Utc>) -> Self {
        Self {
            resume_at,
            job: ContinuationJob {
                is_retry: true,
                job_handle: job.job_handle.clone(),
                source_object_key: job.source_object_key.clone(),
                retry_count: job.retry_count,
                document_payload: DocumentPayload {
                    file_name: job.file_name.clone(),
                    document_upload_id: job.document_upload_id.clone(),
                    document_type: job.document_type,
                    tenant_id: job.tenant_id.clone(),
                    source_path: job.source_path.clone(),
                },
                source_bucket: Some(job.source_bucket.clone()),
                submitted_at: Some(job.created_at),
            },
        }
    }

    /// Rebuild the job from the message alone.
    pub fn into_job(self, default_bucket: &str) -> ExtractionJob {
        let ContinuationJob {
            job_handle,
            source_object_key,
            retry_count,
            document_payload,
            source_bucket,
            submitted_at,
            ..
        } = self.job;

        ExtractionJob {
            document_upload_id: document_payload.document_upload_id,
            job_handle,
            tenant_id: document_payload.tenant_id,
            document_type: document_payload.document_type,
            source_bucket: source_bucket.unwrap_or_else(|| default_bucket.to_string()),
            source_object_key,
            source_path: document_payload.source_path,
            file_name: document_payload.file_name,
            retry_count,
            created_at: submitted_at.unwrap_or_else(Utc::now),
        }
    }

    pub fn document_upload_id(&self) -> &DocumentUploadId {
        &self.job.document_payload.document_upload_id
    }
}
