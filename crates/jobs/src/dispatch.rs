//! Downstream routing message sent when extraction succeeded.

use serde::{Deserialize, Serialize};

use docflow_core::{DocumentUploadId, JobHandle, TenantId};

use crate::job::ExtractionJob;
use crate::manifest::OutputManifest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchMessage {
    pub job_handle: JobHandle,
    pub result_object_keys: Vec<String>,
    pub source_file_name: String,
    pub tenant_id: TenantId,
    pub document_upload_id: DocumentUploadId,
    pub source_path: String,
}

impl DispatchMessage {
    pub fn new(job: &ExtractionJob, manifest: OutputManifest) -> Self {
        Self {
            job_handle: job.job_handle.clone(),
            result_object_keys: manifest.into_keys(),
            source_file_name: job.file_name.clone(),
            tenant_id: job.tenant_id.clone(),
            document_upload_id: job.document_upload_id.clone(),
            source_path: job.source_path.clone(),
        }
    }
}
