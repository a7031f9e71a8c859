//! Client side of the external document-extraction service.
//!
//! The service is asynchronous: `submit` returns an opaque job handle right
//! away and `status` reports progress for that handle. Results land in the
//! output bucket under the prefix derived from the handle.

pub mod scripted;
pub mod throttled;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use docflow_core::{DocumentType, JobHandle, TenantId};

use crate::error::InfraError;
use crate::profiles::ExtractionProfile;

pub use scripted::{ScriptedExtraction, SubmissionPlan};
pub use throttled::ThrottledExtraction;

/// One document submitted for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Idempotency token. A repeated token returns the job started for it
    /// instead of starting another one.
    pub client_token: String,
    pub tenant_id: TenantId,
    pub document_type: DocumentType,
    pub input_bucket: String,
    pub input_key: String,
    pub output_bucket: String,
    pub output_prefix: String,
    pub profile: ExtractionProfile,
}

/// Service answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(JobHandle),
    /// The service answered but did not start a job.
    Rejected(String),
}

pub trait ExtractionService: Send + Sync {
    fn submit(&self, request: &SubmitRequest) -> Result<SubmitOutcome, InfraError>;

    /// Raw status string as reported by the service.
    fn status(&self, handle: &JobHandle) -> Result<String, InfraError>;
}

impl<S> ExtractionService for Arc<S>
where
    S: ExtractionService + ?Sized,
{
    fn submit(&self, request: &SubmitRequest) -> Result<SubmitOutcome, InfraError> {
        (**self).submit(request)
    }

    fn status(&self, handle: &JobHandle) -> Result<String, InfraError> {
        (**self).status(handle)
    }
}
