//! Submission: from an observed input object to an accepted extraction job.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use docflow_core::{DocumentType, DocumentUploadId, DomainError, JobHandle, TenantId};
use docflow_jobs::ExtractionJob;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorResult;
use crate::extraction::{ExtractionService, SubmitOutcome, SubmitRequest};
use crate::profiles::ProfileStore;
use crate::registry::{ClaimState, UploadRegistry};
use crate::routing::DocumentRoutes;

/// An object-created notification, key exactly as delivered (URL-encoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectCreated {
    pub bucket: String,
    pub object_key: String,
}

/// Why a trigger was dropped without doing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IgnoreReason {
    OutsideInputPrefix,
    UnsupportedExtension,
    UnexpectedKeyLayout,
    ExcludedTenant { tenant_id: TenantId },
    /// A continuation owns this document, or it already ended.
    AlreadyClaimed { document_upload_id: DocumentUploadId },
}

/// A trigger key that names a document we should process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputObject {
    pub bucket: String,
    /// Decoded key.
    pub key: String,
    /// Key as delivered.
    pub raw_key: String,
    pub tenant_id: TenantId,
    pub document_upload_id: DocumentUploadId,
    pub file_name: String,
}

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Ignored(IgnoreReason),
    /// Accepted; the first polling round has not run yet.
    Accepted(ExtractionJob),
    /// An earlier delivery submitted the job but did not finish its first
    /// round. The round is run again with the recorded handle.
    Resumed(ExtractionJob),
    /// The service declined. The job has a document but no handle.
    Rejected {
        document: InputObject,
        document_type: DocumentType,
        detail: String,
    },
}

/// Decode an object key the way object-store notifications encode it
/// (`+` for space, then percent-encoding).
pub fn decode_object_key(raw: &str) -> Result<String, DomainError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| DomainError::validation(format!("object key is not valid UTF-8: {e}")))
}

/// Classify a trigger key: `<input prefix>/<tenant>/<upload id>/<file>.<ext>`.
pub fn parse_input_object(
    config: &OrchestratorConfig,
    trigger: &ObjectCreated,
) -> Result<Result<InputObject, IgnoreReason>, DomainError> {
    let key = decode_object_key(&trigger.object_key)?;

    let Some(rest) = key
        .strip_prefix(config.input_prefix.as_str())
        .and_then(|r| r.strip_prefix('/'))
    else {
        return Ok(Err(IgnoreReason::OutsideInputPrefix));
    };

    let accepted = rest
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| config.accepted_extensions.iter().any(|a| *a == ext));
    if !accepted {
        return Ok(Err(IgnoreReason::UnsupportedExtension));
    }

    let segments: Vec<&str> = rest.split('/').collect();
    let [tenant, upload_id, file_name] = segments.as_slice() else {
        return Ok(Err(IgnoreReason::UnexpectedKeyLayout));
    };
    let (Ok(tenant_id), Ok(document_upload_id)) =
        (TenantId::parse(*tenant), DocumentUploadId::parse(*upload_id))
    else {
        return Ok(Err(IgnoreReason::UnexpectedKeyLayout));
    };
    if file_name.is_empty() {
        return Ok(Err(IgnoreReason::UnexpectedKeyLayout));
    }

    let file_name = file_name.to_string();
    Ok(Ok(InputObject {
        bucket: trigger.bucket.clone(),
        key,
        raw_key: trigger.object_key.clone(),
        tenant_id,
        document_upload_id,
        file_name,
    }))
}

/// Turns input objects into submitted extraction jobs.
pub struct Submitter {
    config: Arc<OrchestratorConfig>,
    routes: Arc<DocumentRoutes>,
    extraction: Arc<dyn ExtractionService>,
    registry: Arc<dyn UploadRegistry>,
    profiles: Arc<dyn ProfileStore>,
}

impl Submitter {
    pub fn new(
        config: Arc<OrchestratorConfig>,
        routes: Arc<DocumentRoutes>,
        extraction: Arc<dyn ExtractionService>,
        registry: Arc<dyn UploadRegistry>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            config,
            routes,
            extraction,
            registry,
            profiles,
        }
    }

    pub fn submit(&self, trigger: &ObjectCreated) -> OrchestratorResult<Submission> {
        let input = match parse_input_object(&self.config, trigger)? {
            Ok(input) => input,
            Err(reason) => {
                debug!(bucket = %trigger.bucket, key = %trigger.object_key, ?reason, "trigger ignored");
                return Ok(Submission::Ignored(reason));
            }
        };

        if self.config.is_excluded(&input.tenant_id) {
            info!(tenant_id = %input.tenant_id, "tenant excluded from extraction");
            return Ok(Submission::Ignored(IgnoreReason::ExcludedTenant {
                tenant_id: input.tenant_id,
            }));
        }

        let entry = self
            .registry
            .get(&input.document_upload_id)?
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "no upload registered for {}",
                    input.document_upload_id
                ))
            })?;

        if entry.tenant_id != input.tenant_id {
            return Err(DomainError::validation(format!(
                "upload {} belongs to tenant {}, key names {}",
                input.document_upload_id, entry.tenant_id, input.tenant_id
            ))
            .into());
        }

        let claim = entry.claim_state();
        if claim == ClaimState::Claimed {
            warn!(
                document_upload_id = %input.document_upload_id,
                status = entry.status.as_str(),
                "duplicate trigger for claimed upload"
            );
            return Ok(Submission::Ignored(IgnoreReason::AlreadyClaimed {
                document_upload_id: input.document_upload_id,
            }));
        }

        let document_type = self.routes.resolve(&entry.document_type)?.document_type;
        if let ClaimState::Resumable(job_handle) = claim {
            info!(
                document_upload_id = %input.document_upload_id,
                job_handle = %job_handle,
                "resuming interrupted first round"
            );
            return Ok(Submission::Resumed(new_job(input, document_type, job_handle)));
        }

        let profile = self
            .profiles
            .profile(&input.tenant_id, document_type)?
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "no extraction profile for tenant {} and type {document_type}",
                    input.tenant_id
                ))
            })?;

        // Keyed by upload so a redelivery after a lost registry write gets
        // the same job back.
        let request = SubmitRequest {
            client_token: input.document_upload_id.as_str().to_string(),
            tenant_id: input.tenant_id.clone(),
            document_type,
            input_bucket: input.bucket.clone(),
            input_key: input.key.clone(),
            output_bucket: self.config.output_bucket.clone(),
            output_prefix: self.config.output_prefix.clone(),
            profile,
        };

        match self.extraction.submit(&request)? {
            SubmitOutcome::Accepted(job_handle) => {
                self.registry
                    .mark_in_progress(&input.document_upload_id, &job_handle)?;
                info!(
                    document_upload_id = %input.document_upload_id,
                    job_handle = %job_handle,
                    document_type = %document_type,
                    "extraction submitted"
                );
                Ok(Submission::Accepted(new_job(input, document_type, job_handle)))
            }
            SubmitOutcome::Rejected(detail) => {
                warn!(
                    document_upload_id = %input.document_upload_id,
                    detail = %detail,
                    "extraction submission rejected"
                );
                Ok(Submission::Rejected {
                    document: input,
                    document_type,
                    detail,
                })
            }
        }
    }
}

fn new_job(input: InputObject, document_type: DocumentType, job_handle: JobHandle) -> ExtractionJob {
    ExtractionJob {
        document_upload_id: input.document_upload_id,
        job_handle,
        tenant_id: input.tenant_id,
        document_type,
        source_bucket: input.bucket,
        source_object_key: input.key,
        source_path: input.raw_key,
        file_name: input.file_name,
        retry_count: 0,
        created_at: Utc::now(),
    }
}
