//! Failure and timeout recording.
//!
//! Order of writes: placeholder (insert-if-absent), timeline entry for the
//! stored placeholder, registry entry. Each step converges when repeated, so
//! an invocation that dies halfway is finished by its redelivery.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use docflow_jobs::{ExtractionJob, FailureReason};

use crate::error::InfraError;
use crate::registry::UploadRegistry;
use crate::results::{FailedDocument, PlaceholderFailureRecord, ResultStore, TimelineRecord};
use crate::routing::DocumentRoute;

/// What a failure recording left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecorded {
    pub placeholder: PlaceholderFailureRecord,
    /// `false` when an earlier attempt had already written the placeholder.
    pub placeholder_inserted: bool,
    pub timeline_written: bool,
}

pub struct FailureHandler {
    results: Arc<dyn ResultStore>,
    registry: Arc<dyn UploadRegistry>,
}

impl FailureHandler {
    pub fn new(results: Arc<dyn ResultStore>, registry: Arc<dyn UploadRegistry>) -> Self {
        Self { results, registry }
    }

    #[instrument(
        skip(self, route, document),
        fields(
            document_upload_id = %document.document_upload_id,
            document_type = %document.document_type,
            reason = %reason,
        )
    )]
    pub fn record_failure(
        &self,
        route: &DocumentRoute,
        document: &FailedDocument,
        reason: FailureReason,
    ) -> Result<FailureRecorded, InfraError> {
        let candidate =
            PlaceholderFailureRecord::build(route.placeholder, document, reason, Utc::now());
        let stored = self.results.insert_placeholder_if_absent(&candidate)?;

        let timeline_written = route.placeholder.records_timeline;
        if timeline_written {
            self.results
                .append_timeline(&TimelineRecord::for_placeholder(&stored.record))?;
        }

        self.registry
            .mark_failed(&document.document_upload_id, stored.record.reason)?;

        info!(
            placeholder_inserted = stored.inserted,
            record_id = %stored.record.record_id,
            "failure recorded"
        );

        Ok(FailureRecorded {
            placeholder: stored.record,
            placeholder_inserted: stored.inserted,
            timeline_written,
        })
    }
}

impl From<&ExtractionJob> for FailedDocument {
    fn from(job: &ExtractionJob) -> Self {
        FailedDocument {
            document_upload_id: job.document_upload_id.clone(),
            document_type: job.document_type,
            tenant_id: job.tenant_id.clone(),
            file_name: job.file_name.clone(),
            source_path: job.source_path.clone(),
        }
    }
}
