//! Output collection and downstream routing for finished jobs.

use std::sync::Arc;

use tracing::{info, instrument};

use docflow_core::JobHandle;
use docflow_jobs::{DispatchMessage, ExtractionJob, OutputManifest};

use crate::error::{InfraError, OrchestratorResult};
use crate::object_store::ObjectStore;
use crate::queue::QueuePublisher;
use crate::routing::DocumentRoutes;

/// What was sent where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub queue: String,
    pub message: DispatchMessage,
}

pub struct OutputRouter {
    objects: Arc<dyn ObjectStore>,
    queues: Arc<dyn QueuePublisher>,
    routes: Arc<DocumentRoutes>,
    output_bucket: String,
    output_prefix: String,
}

impl OutputRouter {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        queues: Arc<dyn QueuePublisher>,
        routes: Arc<DocumentRoutes>,
        output_bucket: impl Into<String>,
        output_prefix: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            queues,
            routes,
            output_bucket: output_bucket.into(),
            output_prefix: output_prefix.into(),
        }
    }

    /// `<output prefix>/<invocation id>/`
    pub fn output_location(&self, handle: &JobHandle) -> String {
        format!("{}/{}/", self.output_prefix, handle.invocation_id())
    }

    #[instrument(skip(self), fields(job_handle = %handle))]
    pub fn collect(&self, handle: &JobHandle) -> Result<OutputManifest, InfraError> {
        let listing = self
            .objects
            .list(&self.output_bucket, &self.output_location(handle))?;
        Ok(OutputManifest::from_listing(listing))
    }

    /// Send exactly one message to the queue for the job's type and tenant.
    pub fn dispatch(
        &self,
        job: &ExtractionJob,
        manifest: OutputManifest,
    ) -> OrchestratorResult<DispatchReceipt> {
        let queue = self
            .routes
            .queue_for(&job.tenant_id, job.document_type)?
            .to_string();
        let message = DispatchMessage::new(job, manifest);
        let body = serde_json::to_string(&message).map_err(InfraError::from)?;

        self.queues.send(&queue, &body)?;
        info!(
            document_upload_id = %job.document_upload_id,
            job_handle = %job.job_handle,
            queue = %queue,
            results = message.result_object_keys.len(),
            "extraction output dispatched"
        );

        Ok(DispatchReceipt { queue, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::object_store::InMemoryObjectStore;
    use crate::queue::InMemoryQueues;
    use chrono::Utc;
    use docflow_core::{DocumentType, DocumentUploadId, TenantId};

    fn job(document_type: DocumentType) -> ExtractionJob {
        ExtractionJob {
            document_upload_id: DocumentUploadId::parse("D1").unwrap(),
            job_handle: JobHandle::parse("arn:extract:job/abc123").unwrap(),
            tenant_id: TenantId::parse("tenant-a").unwrap(),
            document_type,
            source_bucket: "docs".to_string(),
            source_object_key: "input/tenant-a/D1/a.pdf".to_string(),
            source_path: "input/tenant-a/D1/a.pdf".to_string(),
            file_name: "a.pdf".to_string(),
            retry_count: 0,
            created_at: Utc::now(),
        }
    }

    fn router(objects: Arc<InMemoryObjectStore>, queues: Arc<InMemoryQueues>) -> OutputRouter {
        OutputRouter::new(
            objects,
            queues,
            Arc::new(DocumentRoutes::from_config(&QueueConfig::default())),
            "out",
            "output",
        )
    }

    #[test]
    fn collects_only_this_jobs_canonical_results() {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.put("out", "output/abc123/0/custom_output/0/result.json", "{}");
        objects.put("out", "output/abc123/.s3_access_check", "");
        objects.put("out", "output/abc123/job_metadata.json", "{}");
        objects.put("out", "output/abc1234/0/custom_output/0/result.json", "{}");

        let router = router(objects, Arc::new(InMemoryQueues::new()));
        let manifest = router
            .collect(&JobHandle::parse("arn:extract:job/abc123").unwrap())
            .unwrap();

        assert_eq!(
            manifest.keys(),
            &["output/abc123/0/custom_output/0/result.json".to_string()]
        );
    }

    #[test]
    fn dispatches_to_the_type_queue_only() {
        let queues = Arc::new(InMemoryQueues::new());
        let router = router(Arc::new(InMemoryObjectStore::new()), queues.clone());
        let manifest = OutputManifest::from_listing(["output/abc123/custom_output/result.json"]);

        let receipt = router.dispatch(&job(DocumentType::PurchaseOrder), manifest).unwrap();

        assert_eq!(receipt.queue, "docflow-po");
        let sent = queues.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].queue, "docflow-po");
        let body: DispatchMessage = serde_json::from_str(&sent[0].body).unwrap();
        assert_eq!(body, receipt.message);
    }

    #[test]
    fn queue_outage_is_an_infrastructure_error() {
        let queues = Arc::new(InMemoryQueues::new());
        queues.set_unavailable(true);
        let router = router(Arc::new(InMemoryObjectStore::new()), queues);

        let err = router
            .dispatch(&job(DocumentType::Invoice), OutputManifest::default())
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
