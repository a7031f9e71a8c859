//! Extraction job orchestration.
//!
//! ## Design
//!
//! - One invocation = one trigger or one continuation, handled synchronously
//! - Each invocation runs at most one bounded polling round
//! - The next step is decided by `docflow_jobs::step`; this module only
//!   performs the action it names
//! - Job-level failures end in a placeholder record, never in an error
//! - Infrastructure errors propagate so the trigger is redelivered
//! - The registry records how far a job got, so a redelivered trigger reruns
//!   an interrupted first round instead of dropping it
//!
//! ## Components
//!
//! - `Submitter`: trigger → accepted job (or ignore / reject)
//! - `StatusPoller`: bounded checks within one invocation
//! - `OutputRouter`: manifest collection and per-type dispatch
//! - `FailureHandler`: idempotent placeholder + registry update
//! - `SourceRelocator`: idempotent input → processed move

pub mod failure;
pub mod poller;
pub mod relocation;
pub mod router;
pub mod submission;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Span, field, info, instrument, warn};

use docflow_core::{DocumentUploadId, JobHandle};
use docflow_jobs::{
    Action, ContinuationMessage, ExtractionJob, FailureReason, JobFailure, JobPhase, PollPolicy,
    step,
};

use crate::config::OrchestratorConfig;
use crate::error::{InfraError, OrchestratorResult};
use crate::extraction::ExtractionService;
use crate::object_store::ObjectStore;
use crate::pause::Pause;
use crate::profiles::ProfileStore;
use crate::queue::QueuePublisher;
use crate::registry::{JobProgress, UploadRegistry};
use crate::results::{FailedDocument, ResultStore};
use crate::routing::DocumentRoutes;
use crate::scheduler::ContinuationScheduler;

pub use failure::{FailureHandler, FailureRecorded};
pub use poller::StatusPoller;
pub use relocation::{Relocation, SourceRelocator};
pub use router::{DispatchReceipt, OutputRouter};
pub use submission::{IgnoreReason, InputObject, ObjectCreated, Submission, Submitter};

/// External collaborators of the orchestrator.
#[derive(Clone)]
pub struct Ports {
    pub extraction: Arc<dyn ExtractionService>,
    pub objects: Arc<dyn ObjectStore>,
    pub queues: Arc<dyn QueuePublisher>,
    pub scheduler: Arc<dyn ContinuationScheduler>,
    pub registry: Arc<dyn UploadRegistry>,
    pub results: Arc<dyn ResultStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub pause: Arc<dyn Pause>,
}

/// What one invocation did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationReport {
    pub document_upload_id: Option<DocumentUploadId>,
    pub job_handle: Option<JobHandle>,
    pub retry_count: Option<u32>,
    pub outcome: InvocationOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Ignored {
        #[serde(flatten)]
        reason: IgnoreReason,
    },
    Dispatched {
        queue: String,
        result_object_keys: Vec<String>,
        relocation: Relocation,
        checks: u32,
    },
    Failed {
        reason: FailureReason,
        failure: JobFailure,
        placeholder_inserted: bool,
    },
    Rescheduled {
        next_retry_count: u32,
        resume_at: DateTime<Utc>,
        checks: u32,
    },
}

impl InvocationOutcome {
    pub fn phase(&self) -> Option<JobPhase> {
        match self {
            InvocationOutcome::Ignored { .. } => None,
            InvocationOutcome::Dispatched { .. } => Some(JobPhase::Succeeded),
            InvocationOutcome::Failed {
                failure: JobFailure::PollingTimeout { .. },
                ..
            } => Some(JobPhase::TimedOut),
            InvocationOutcome::Failed { .. } => Some(JobPhase::Failed),
            InvocationOutcome::Rescheduled { .. } => Some(JobPhase::Polling),
        }
    }
}

pub struct Orchestrator {
    config: Arc<OrchestratorConfig>,
    routes: Arc<DocumentRoutes>,
    scheduler: Arc<dyn ContinuationScheduler>,
    registry: Arc<dyn UploadRegistry>,
    submitter: Submitter,
    poller: StatusPoller,
    router: OutputRouter,
    failures: FailureHandler,
    relocator: SourceRelocator,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, routes: DocumentRoutes, ports: Ports) -> Self {
        let config = Arc::new(config);
        let routes = Arc::new(routes);

        Self {
            submitter: Submitter::new(
                config.clone(),
                routes.clone(),
                ports.extraction.clone(),
                ports.registry.clone(),
                ports.profiles.clone(),
            ),
            poller: StatusPoller::new(
                ports.extraction.clone(),
                ports.pause.clone(),
                config.poll.max_checks,
                config.poll.check_delay,
            ),
            router: OutputRouter::new(
                ports.objects.clone(),
                ports.queues.clone(),
                routes.clone(),
                config.output_bucket.clone(),
                config.output_prefix.clone(),
            ),
            failures: FailureHandler::new(ports.results.clone(), ports.registry.clone()),
            relocator: SourceRelocator::new(
                ports.objects.clone(),
                config.input_prefix.clone(),
                config.processed_prefix.clone(),
            ),
            scheduler: ports.scheduler,
            registry: ports.registry,
            config,
            routes,
        }
    }

    /// Routes and placeholders follow the configured queues.
    pub fn from_config(config: OrchestratorConfig, ports: Ports) -> Self {
        let routes = DocumentRoutes::from_config(&config.queues);
        Self::new(config, routes, ports)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.config.poll
    }

    /// Entry point for a new input object.
    #[instrument(
        skip(self, trigger),
        fields(bucket = %trigger.bucket, key = %trigger.object_key, job_handle = field::Empty)
    )]
    pub fn handle_object_created(&self, trigger: &ObjectCreated) -> OrchestratorResult<InvocationReport> {
        match self.submitter.submit(trigger)? {
            Submission::Ignored(reason) => Ok(InvocationReport {
                document_upload_id: None,
                job_handle: None,
                retry_count: None,
                outcome: InvocationOutcome::Ignored { reason },
            }),
            Submission::Rejected {
                document,
                document_type,
                detail,
            } => {
                let failed = FailedDocument {
                    document_upload_id: document.document_upload_id.clone(),
                    document_type,
                    tenant_id: document.tenant_id,
                    file_name: document.file_name,
                    source_path: document.raw_key,
                };
                let outcome =
                    self.record_failure(&failed, JobFailure::SubmissionRejected { detail })?;
                Ok(InvocationReport {
                    document_upload_id: Some(document.document_upload_id),
                    job_handle: None,
                    retry_count: None,
                    outcome,
                })
            }
            Submission::Accepted(job) | Submission::Resumed(job) => self.run_round(job),
        }
    }

    /// Entry point for a continuation handed back by the scheduler.
    #[instrument(
        skip(self, message),
        fields(
            document_upload_id = %message.document_upload_id(),
            retry_count = message.job.retry_count,
            job_handle = field::Empty,
        )
    )]
    pub fn handle_continuation(&self, message: ContinuationMessage) -> OrchestratorResult<InvocationReport> {
        if !message.job.is_retry {
            warn!("continuation without retry flag; resuming anyway");
        }
        let job = message.into_job(&self.config.input_bucket);
        self.routes.route(job.document_type)?;
        self.run_round(job)
    }

    fn run_round(&self, job: ExtractionJob) -> OrchestratorResult<InvocationReport> {
        Span::current().record("job_handle", job.job_handle.as_str());

        let outcome = self.poller.poll_round(&job.job_handle)?;
        let checks = outcome.checks();
        let transition = step(&job, &outcome, self.policy());

        let outcome = match transition.action {
            Action::Dispatch => self.finish_success(&job, checks)?,
            Action::RecordFailure { failure } => {
                self.record_failure(&FailedDocument::from(&job), failure)?
            }
            Action::Continue { job: next } => self.reschedule(&next, checks)?,
        };

        Ok(InvocationReport {
            document_upload_id: Some(job.document_upload_id),
            job_handle: Some(job.job_handle),
            retry_count: Some(job.retry_count),
            outcome,
        })
    }

    fn finish_success(&self, job: &ExtractionJob, checks: u32) -> OrchestratorResult<InvocationOutcome> {
        let manifest = self.router.collect(&job.job_handle)?;
        if manifest.is_empty() {
            warn!(
                document_upload_id = %job.document_upload_id,
                job_handle = %job.job_handle,
                "extraction succeeded without canonical output"
            );
            return self.record_failure(&FailedDocument::from(job), JobFailure::MissingOutput);
        }

        let receipt = self.router.dispatch(job, manifest)?;
        let relocation = self
            .relocator
            .relocate(&job.source_bucket, &job.source_object_key)?;
        self.registry
            .mark_progress(&job.document_upload_id, JobProgress::Completed)?;

        Ok(InvocationOutcome::Dispatched {
            queue: receipt.queue,
            result_object_keys: receipt.message.result_object_keys,
            relocation,
            checks,
        })
    }

    fn record_failure(
        &self,
        document: &FailedDocument,
        failure: JobFailure,
    ) -> OrchestratorResult<InvocationOutcome> {
        let route = self.routes.route(document.document_type)?;
        let reason = failure.reason();
        warn!(
            document_upload_id = %document.document_upload_id,
            failure = ?failure,
            reason = %reason,
            "extraction job failed"
        );

        let recorded = self.failures.record_failure(route, document, reason)?;
        Ok(InvocationOutcome::Failed {
            reason: recorded.placeholder.reason,
            failure,
            placeholder_inserted: recorded.placeholder_inserted,
        })
    }

    fn reschedule(&self, next: &ExtractionJob, checks: u32) -> Result<InvocationOutcome, InfraError> {
        let delay = self.policy().continuation_delay(&mut rand::thread_rng());
        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| InfraError::Scheduler(format!("continuation delay out of range: {e}")))?;
        let resume_at = Utc::now() + delay;

        self.scheduler
            .schedule(&ContinuationMessage::for_job(next, resume_at))?;
        // Only after the continuation exists may the trigger stop owning the job.
        self.registry
            .mark_progress(&next.document_upload_id, JobProgress::Continuing)?;
        info!(
            document_upload_id = %next.document_upload_id,
            job_handle = %next.job_handle,
            next_retry_count = next.retry_count,
            resume_at = %resume_at,
            "extraction still running; continuation scheduled"
        );

        Ok(InvocationOutcome::Rescheduled {
            next_retry_count: next.retry_count,
            resume_at,
            checks,
        })
    }
}
