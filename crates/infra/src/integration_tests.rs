//! End-to-end tests for the orchestration pipeline.
//!
//! Trigger → Submitter → StatusPoller → step → (Router | FailureHandler | Scheduler)
//!
//! Verifies:
//! - Every job ends in exactly one terminal outcome
//! - Continuations chain rounds and respect the retry budget
//! - Failure recording and relocation are idempotent

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, Utc};

    use docflow_core::{DocumentType, DocumentUploadId, JobHandle, TenantId};
    use docflow_jobs::{DispatchMessage, FailureReason, JobFailure, JobPhase, PollPolicy};

    use crate::config::OrchestratorConfig;
    use crate::error::OrchestratorError;
    use crate::extraction::{ScriptedExtraction, SubmissionPlan};
    use crate::object_store::InMemoryObjectStore;
    use crate::orchestrator::{
        IgnoreReason, InvocationOutcome, InvocationReport, ObjectCreated, Orchestrator, Ports,
        Relocation,
    };
    use crate::pause::RecordingPause;
    use crate::profiles::{ExtractionProfile, InMemoryProfiles};
    use crate::queue::InMemoryQueues;
    use crate::registry::{
        InMemoryUploadRegistry, JobProgress, UploadEntry, UploadRegistry, UploadStatus,
    };
    use crate::results::InMemoryResultStore;
    use crate::scheduler::{ContinuationScheduler, InMemoryScheduler};
    use crate::workers::{ContinuationPump, PumpSettings};

    const DOCS: &str = "docflow-documents";
    const OUT: &str = "docflow-extraction-output";

    struct Harness {
        extraction: Arc<ScriptedExtraction>,
        objects: Arc<InMemoryObjectStore>,
        queues: Arc<InMemoryQueues>,
        scheduler: Arc<InMemoryScheduler>,
        registry: Arc<InMemoryUploadRegistry>,
        results: Arc<InMemoryResultStore>,
        pause: Arc<RecordingPause>,
        orchestrator: Arc<Orchestrator>,
    }

    fn tenant() -> TenantId {
        TenantId::parse("tenant-a").unwrap()
    }

    fn handle(id: &str) -> JobHandle {
        JobHandle::parse(format!("arn:docflow:extraction-job/{id}")).unwrap()
    }

    fn harness_with(config: OrchestratorConfig) -> Harness {
        let extraction = Arc::new(ScriptedExtraction::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let queues = Arc::new(InMemoryQueues::new());
        let scheduler = Arc::new(InMemoryScheduler::new());
        let registry = Arc::new(InMemoryUploadRegistry::new());
        let results = Arc::new(InMemoryResultStore::new());
        let pause = Arc::new(RecordingPause::new());

        let mut profiles = InMemoryProfiles::new();
        for document_type in DocumentType::ALL {
            profiles = profiles.with(
                tenant(),
                document_type,
                ExtractionProfile {
                    project_id: "project-1".to_string(),
                    profile_id: format!("{document_type}-profile"),
                },
            );
        }

        let ports = Ports {
            extraction: extraction.clone(),
            objects: objects.clone(),
            queues: queues.clone(),
            scheduler: scheduler.clone(),
            registry: registry.clone(),
            results: results.clone(),
            profiles: Arc::new(profiles),
            pause: pause.clone(),
        };

        Harness {
            orchestrator: Arc::new(Orchestrator::from_config(config, ports)),
            extraction,
            objects,
            queues,
            scheduler,
            registry,
            results,
            pause,
        }
    }

    /// K = 20 checks per round, R = 4 rounds.
    fn harness() -> Harness {
        harness_with(OrchestratorConfig {
            poll: PollPolicy {
                jitter_min: std::time::Duration::from_secs(60),
                jitter_max: std::time::Duration::from_secs(120),
                ..PollPolicy::immediate(20, 4)
            },
            ..OrchestratorConfig::default()
        })
    }

    impl Harness {
        /// Register and upload a document; returns the trigger for it.
        fn upload(&self, id: &str, document_type: &str) -> ObjectCreated {
            let key = format!("input/tenant-a/{id}/scan.pdf");
            self.registry.insert(UploadEntry::pending(
                DocumentUploadId::parse(id).unwrap(),
                tenant(),
                document_type,
            ));
            self.objects.put(DOCS, &key, "%PDF");
            ObjectCreated {
                bucket: DOCS.to_string(),
                object_key: key,
            }
        }

        fn write_results(&self, handle: &JobHandle, names: &[&str]) {
            for name in names {
                self.objects.put(
                    OUT,
                    &format!("output/{}/0/custom_output/0/{name}", handle.invocation_id()),
                    "{}",
                );
            }
        }

        /// Run the trigger, then resume every scheduled continuation until none remain.
        fn run_to_completion(&self, trigger: &ObjectCreated) -> Vec<InvocationReport> {
            let mut reports = vec![self.orchestrator.handle_object_created(trigger).unwrap()];
            while let Some(next) = self.scheduler.take_next() {
                reports.push(self.orchestrator.handle_continuation(next).unwrap());
            }
            reports
        }

        fn entry(&self, id: &str) -> UploadEntry {
            self.registry
                .get(&DocumentUploadId::parse(id).unwrap())
                .unwrap()
                .unwrap()
        }
    }

    fn terminal_outcomes(reports: &[InvocationReport]) -> usize {
        reports
            .iter()
            .filter(|r| r.outcome.phase().is_some_and(|p| p.is_terminal()))
            .count()
    }

    #[test]
    fn scenario_success_on_second_round_dispatches_ordered_results() {
        let h = harness();
        let job = handle("job-a");
        h.extraction
            .plan(SubmissionPlan::finishing_after(job.clone(), 25, "Success"));
        h.write_results(&job, &["result-001.json", "result-000.json"]);
        h.objects.put(
            OUT,
            &format!("output/{}/.s3_access_check", job.invocation_id()),
            "",
        );
        let trigger = h.upload("D1", "invoice");

        let reports = h.run_to_completion(&trigger);

        assert_eq!(reports.len(), 2);
        assert!(matches!(
            reports[0].outcome,
            InvocationOutcome::Rescheduled {
                next_retry_count: 1,
                checks: 20,
                ..
            }
        ));
        match &reports[1].outcome {
            InvocationOutcome::Dispatched {
                queue,
                relocation,
                checks,
                ..
            } => {
                assert_eq!(queue, "docflow-invoice");
                assert_eq!(*checks, 6);
                assert_eq!(
                    relocation,
                    &Relocation::Moved {
                        to: "processed/tenant-a/D1/scan.pdf".to_string()
                    }
                );
            }
            other => panic!("expected dispatch, got {other:?}"),
        }
        assert_eq!(h.extraction.checks(&job), 26);
        assert_eq!(terminal_outcomes(&reports), 1);

        let sent = h.queues.sent();
        assert_eq!(sent.len(), 1);
        let message: DispatchMessage = serde_json::from_str(&sent[0].body).unwrap();
        assert_eq!(
            message.result_object_keys,
            vec![
                "output/job-a/0/custom_output/0/result-000.json".to_string(),
                "output/job-a/0/custom_output/0/result-001.json".to_string(),
            ]
        );
        assert_eq!(message.source_file_name, "scan.pdf");
        assert_eq!(message.document_upload_id.as_str(), "D1");

        assert!(!h.objects.contains(DOCS, "input/tenant-a/D1/scan.pdf"));
        assert!(h.objects.contains(DOCS, "processed/tenant-a/D1/scan.pdf"));
        assert!(h.results.placeholders().is_empty());

        let entry = h.entry("D1");
        assert_eq!(entry.status, UploadStatus::InProgress);
        assert_eq!(entry.job_handle, Some(job));
    }

    #[test]
    fn continuation_is_scheduled_within_jitter_window() {
        let h = harness();
        h.extraction
            .plan(SubmissionPlan::accept(handle("job-j"), ["InProgress"]));
        let trigger = h.upload("D1", "invoice");

        let before = Utc::now();
        h.orchestrator.handle_object_created(&trigger).unwrap();
        let after = Utc::now();

        let pending = h.scheduler.pending();
        assert_eq!(pending.len(), 1);
        let message = &pending[0];
        assert!(message.job.is_retry);
        assert_eq!(message.job.retry_count, 1);
        assert!(message.resume_at >= before + ChronoDuration::seconds(60));
        assert!(message.resume_at <= after + ChronoDuration::seconds(120));
    }

    #[test]
    fn scenario_service_failure_writes_placeholder_and_leaves_source() {
        let h = harness();
        let job = handle("job-b");
        h.extraction
            .plan(SubmissionPlan::finishing_after(job.clone(), 4, "Failed"));
        let trigger = h.upload("D2", "invoice");

        let reports = h.run_to_completion(&trigger);

        assert_eq!(reports.len(), 1);
        assert!(matches!(
            reports[0].outcome,
            InvocationOutcome::Failed {
                reason: FailureReason::ExtractionFailed,
                failure: JobFailure::ServiceReportedFailure,
                placeholder_inserted: true,
            }
        ));
        assert_eq!(h.extraction.checks(&job), 5);

        let placeholders = h.results.placeholders();
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].collection, "extracted_documents");
        assert_eq!(h.results.timeline().len(), 1);

        let entry = h.entry("D2");
        assert_eq!(entry.status, UploadStatus::Fail);
        assert_eq!(entry.exception_status.as_deref(), Some("Extraction Failed"));

        assert!(h.queues.sent().is_empty());
        assert!(h.objects.contains(DOCS, "input/tenant-a/D2/scan.pdf"));
    }

    #[test]
    fn scenario_never_terminating_job_times_out_after_budget() {
        let h = harness();
        let job = handle("job-c");
        h.extraction
            .plan(SubmissionPlan::accept(job.clone(), ["InProgress"]));
        let trigger = h.upload("D3", "grn");

        let reports = h.run_to_completion(&trigger);

        assert_eq!(reports.len(), 4);
        assert_eq!(h.extraction.checks(&job), 80);
        for (round, report) in reports[..3].iter().enumerate() {
            assert_eq!(report.retry_count, Some(round as u32));
            assert_eq!(report.outcome.phase(), Some(JobPhase::Polling));
        }
        assert!(matches!(
            reports[3].outcome,
            InvocationOutcome::Failed {
                reason: FailureReason::ProcessingTimeout,
                failure: JobFailure::PollingTimeout { checks: 80 },
                ..
            }
        ));
        assert_eq!(terminal_outcomes(&reports), 1);

        let placeholders = h.results.placeholders();
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].collection, "extracted_grn");
        assert!(h.results.timeline().is_empty());

        let entry = h.entry("D3");
        assert_eq!(entry.status, UploadStatus::Fail);
        assert_eq!(entry.exception_status.as_deref(), Some("Processing Timeout"));
        assert!(h.queues.sent().is_empty());
        assert!(h.scheduler.pending().is_empty());
    }

    #[test]
    fn each_document_type_reaches_only_its_queue() {
        let h = harness();
        let cases = [
            ("D10", "invoice", "docflow-invoice"),
            ("D11", "grn", "docflow-grn"),
            ("D12", "po", "docflow-po"),
            ("D13", "medicalReferralLetter", "docflow-medical-referral-letter"),
        ];

        for (id, document_type, _) in cases {
            let job = handle(&format!("job-{id}"));
            h.extraction
                .plan(SubmissionPlan::accept(job.clone(), ["Succeeded"]));
            h.write_results(&job, &["result.json"]);
            let trigger = h.upload(id, document_type);
            h.run_to_completion(&trigger);
        }

        for (id, _, queue) in cases {
            let messages = h.queues.messages(queue);
            assert_eq!(messages.len(), 1, "queue {queue}");
            let message: DispatchMessage = serde_json::from_str(&messages[0]).unwrap();
            assert_eq!(message.document_upload_id.as_str(), id);
        }
        assert_eq!(h.queues.sent().len(), 4);
    }

    #[test]
    fn rejected_submission_records_failure_without_polling() {
        let h = harness();
        h.extraction
            .plan(SubmissionPlan::Reject("profile disabled".to_string()));
        let trigger = h.upload("D4", "po");

        let report = h.orchestrator.handle_object_created(&trigger).unwrap();

        assert!(matches!(
            report.outcome,
            InvocationOutcome::Failed {
                reason: FailureReason::ExtractionFailed,
                failure: JobFailure::SubmissionRejected { .. },
                ..
            }
        ));
        assert_eq!(report.job_handle, None);
        assert_eq!(h.results.placeholders()[0].collection, "extracted_po");
        assert_eq!(h.entry("D4").status, UploadStatus::Fail);
        assert!(h.scheduler.pending().is_empty());
    }

    #[test]
    fn unknown_status_fails_closed() {
        let h = harness();
        h.extraction
            .plan(SubmissionPlan::accept(handle("job-u"), ["Created", "Paused"]));
        let trigger = h.upload("D5", "invoice");

        let reports = h.run_to_completion(&trigger);

        assert_eq!(reports.len(), 1);
        assert!(matches!(
            &reports[0].outcome,
            InvocationOutcome::Failed {
                failure: JobFailure::UnexpectedStatus { raw },
                ..
            } if raw == "Paused"
        ));
        assert!(h.queues.sent().is_empty());
    }

    #[test]
    fn success_without_output_is_recorded_as_failure() {
        let h = harness();
        h.extraction
            .plan(SubmissionPlan::accept(handle("job-e"), ["Success"]));
        let trigger = h.upload("D6", "invoice");

        let report = h.orchestrator.handle_object_created(&trigger).unwrap();

        assert!(matches!(
            report.outcome,
            InvocationOutcome::Failed {
                failure: JobFailure::MissingOutput,
                reason: FailureReason::ExtractionFailed,
                ..
            }
        ));
        assert!(h.queues.sent().is_empty());
        assert!(h.objects.contains(DOCS, "input/tenant-a/D6/scan.pdf"));
    }

    #[test]
    fn duplicate_trigger_is_ignored_once_claimed() {
        let h = harness();
        h.extraction
            .plan(SubmissionPlan::accept(handle("job-d"), ["InProgress"]));
        let trigger = h.upload("D7", "invoice");

        h.orchestrator.handle_object_created(&trigger).unwrap();
        let again = h.orchestrator.handle_object_created(&trigger).unwrap();

        assert_eq!(
            again.outcome,
            InvocationOutcome::Ignored {
                reason: IgnoreReason::AlreadyClaimed {
                    document_upload_id: DocumentUploadId::parse("D7").unwrap()
                }
            }
        );
        assert_eq!(h.extraction.submissions().len(), 1);
        assert_eq!(h.scheduler.pending().len(), 1);
        assert_eq!(h.entry("D7").progress, Some(JobProgress::Continuing));
    }

    #[test]
    fn queue_outage_in_submitting_round_is_resumed_on_redelivery() {
        let h = harness();
        let job = handle("job-s");
        h.extraction
            .plan(SubmissionPlan::accept(job.clone(), ["Success"]));
        h.write_results(&job, &["result.json"]);
        let trigger = h.upload("D40", "invoice");

        h.queues.set_unavailable(true);
        let err = h.orchestrator.handle_object_created(&trigger).unwrap_err();
        assert!(err.is_retryable());
        let entry = h.entry("D40");
        assert_eq!(entry.status, UploadStatus::InProgress);
        assert_eq!(entry.progress, Some(JobProgress::Submitted));

        // The platform redelivers the same trigger once the queue is back.
        h.queues.set_unavailable(false);
        let report = h.orchestrator.handle_object_created(&trigger).unwrap();
        assert!(matches!(report.outcome, InvocationOutcome::Dispatched { .. }));
        assert_eq!(report.job_handle, Some(job));
        assert_eq!(h.extraction.submissions().len(), 1);
        assert_eq!(h.queues.sent().len(), 1);
        assert!(h.objects.contains(DOCS, "processed/tenant-a/D40/scan.pdf"));
        assert_eq!(h.entry("D40").progress, Some(JobProgress::Completed));

        // A later duplicate of a finished job does nothing.
        let again = h.orchestrator.handle_object_created(&trigger).unwrap();
        assert!(matches!(again.outcome, InvocationOutcome::Ignored { .. }));
        assert_eq!(h.queues.sent().len(), 1);
    }

    #[test]
    fn relocation_failure_in_submitting_round_is_resumed_on_redelivery() {
        let h = harness();
        let job = handle("job-t");
        h.extraction
            .plan(SubmissionPlan::accept(job.clone(), ["Success"]));
        h.write_results(&job, &["result.json"]);
        let trigger = h.upload("D41", "grn");

        h.objects.fail_next_copies(1);
        let err = h.orchestrator.handle_object_created(&trigger).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(h.queues.sent().len(), 1);
        assert!(h.objects.contains(DOCS, "input/tenant-a/D41/scan.pdf"));

        // Dispatch is at-least-once: the rerun round sends again, then moves the source.
        let report = h.orchestrator.handle_object_created(&trigger).unwrap();
        assert!(matches!(report.outcome, InvocationOutcome::Dispatched { .. }));
        assert_eq!(h.queues.messages("docflow-grn").len(), 2);
        assert!(h.objects.contains(DOCS, "processed/tenant-a/D41/scan.pdf"));
        assert_eq!(h.entry("D41").progress, Some(JobProgress::Completed));
        assert!(h.results.placeholders().is_empty());
    }

    #[test]
    fn lost_registry_write_does_not_start_a_second_job() {
        let h = harness();
        let job = handle("job-w");
        h.extraction
            .plan(SubmissionPlan::accept(job.clone(), ["InProgress"]));
        h.extraction
            .plan(SubmissionPlan::accept(handle("job-w2"), ["InProgress"]));
        let trigger = h.upload("D50", "invoice");

        h.registry.fail_next_writes(1);
        let err = h.orchestrator.handle_object_created(&trigger).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(h.entry("D50").status, UploadStatus::Pending);

        let report = h.orchestrator.handle_object_created(&trigger).unwrap();
        assert_eq!(report.job_handle, Some(job.clone()));
        assert!(matches!(report.outcome, InvocationOutcome::Rescheduled { .. }));
        assert_eq!(h.extraction.submissions().len(), 1);
        assert_eq!(h.entry("D50").job_handle, Some(job));
    }

    #[test]
    fn excluded_tenant_and_foreign_keys_are_ignored() {
        let mut config = OrchestratorConfig::default();
        config.excluded_tenants.insert(tenant());
        let h = harness_with(config);
        let trigger = h.upload("D8", "invoice");

        let report = h.orchestrator.handle_object_created(&trigger).unwrap();
        assert_eq!(
            report.outcome,
            InvocationOutcome::Ignored {
                reason: IgnoreReason::ExcludedTenant {
                    tenant_id: tenant()
                }
            }
        );

        let foreign = ObjectCreated {
            bucket: DOCS.to_string(),
            object_key: "processed/tenant-a/D8/scan.pdf".to_string(),
        };
        let report = h.orchestrator.handle_object_created(&foreign).unwrap();
        assert_eq!(
            report.outcome,
            InvocationOutcome::Ignored {
                reason: IgnoreReason::OutsideInputPrefix
            }
        );
        assert!(h.extraction.submissions().is_empty());
    }

    #[test]
    fn unknown_document_type_is_a_validation_error() {
        let h = harness();
        let trigger = h.upload("D9", "receipt");

        let err = h.orchestrator.handle_object_created(&trigger).unwrap_err();

        assert!(matches!(err, OrchestratorError::Validation(_)));
        assert!(!err.is_retryable());
        assert!(h.extraction.submissions().is_empty());
        assert_eq!(h.entry("D9").status, UploadStatus::Pending);
    }

    #[test]
    fn queue_outage_leaves_source_and_retry_completes() {
        let h = harness();
        let job = handle("job-q");
        h.extraction
            .plan(SubmissionPlan::finishing_after(job.clone(), 20, "Success"));
        h.write_results(&job, &["result.json"]);
        let trigger = h.upload("D20", "invoice");

        h.orchestrator.handle_object_created(&trigger).unwrap();
        let continuation = h.scheduler.take_next().unwrap();

        h.queues.set_unavailable(true);
        let err = h
            .orchestrator
            .handle_continuation(continuation.clone())
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(h.objects.contains(DOCS, "input/tenant-a/D20/scan.pdf"));
        assert!(h.results.placeholders().is_empty());

        h.queues.set_unavailable(false);
        let report = h.orchestrator.handle_continuation(continuation).unwrap();
        assert!(matches!(report.outcome, InvocationOutcome::Dispatched { .. }));
        assert_eq!(h.queues.sent().len(), 1);
        assert!(h.objects.contains(DOCS, "processed/tenant-a/D20/scan.pdf"));
    }

    #[test]
    fn redelivered_failure_converges_on_one_placeholder() {
        let h = harness();
        let job = handle("job-r");
        h.extraction
            .plan(SubmissionPlan::accept(job.clone(), ["InProgress"]));
        let trigger = h.upload("D21", "invoice");

        let mut reports = h.run_to_completion(&trigger);
        let last = reports.pop().unwrap();
        assert_eq!(last.outcome.phase(), Some(JobPhase::TimedOut));

        // The final round is delivered a second time.
        let replay = docflow_jobs::ContinuationMessage::for_job(
            &docflow_jobs::ExtractionJob {
                document_upload_id: DocumentUploadId::parse("D21").unwrap(),
                job_handle: job,
                tenant_id: tenant(),
                document_type: DocumentType::Invoice,
                source_bucket: DOCS.to_string(),
                source_object_key: "input/tenant-a/D21/scan.pdf".to_string(),
                source_path: "input/tenant-a/D21/scan.pdf".to_string(),
                file_name: "scan.pdf".to_string(),
                retry_count: 3,
                created_at: Utc::now(),
            },
            Utc::now(),
        );
        let again = h.orchestrator.handle_continuation(replay).unwrap();

        assert!(matches!(
            again.outcome,
            InvocationOutcome::Failed {
                placeholder_inserted: false,
                ..
            }
        ));
        assert_eq!(h.results.placeholders().len(), 1);
        assert_eq!(h.results.timeline().len(), 1);
    }

    #[test]
    fn polling_pauses_between_checks_only() {
        let h = harness_with(OrchestratorConfig {
            poll: PollPolicy {
                check_delay: std::time::Duration::from_secs(3),
                ..PollPolicy::immediate(20, 4)
            },
            ..OrchestratorConfig::default()
        });
        h.extraction
            .plan(SubmissionPlan::finishing_after(handle("job-p"), 4, "Failed"));
        let trigger = h.upload("D22", "invoice");

        h.orchestrator.handle_object_created(&trigger).unwrap();

        assert_eq!(h.pause.waits().len(), 4);
        assert_eq!(h.pause.total(), std::time::Duration::from_secs(12));
    }

    #[test]
    fn pump_resumes_due_continuations_only() {
        let h = harness();
        h.extraction
            .plan(SubmissionPlan::finishing_after(handle("job-m"), 20, "Failed"));
        let trigger = h.upload("D23", "invoice");
        h.orchestrator.handle_object_created(&trigger).unwrap();

        let scheduler: Arc<InMemoryScheduler> = h.scheduler.clone();
        let pump = ContinuationPump::new(h.orchestrator.clone(), scheduler, PumpSettings::default());

        let early = pump.drain_due(Utc::now());
        assert_eq!(early.handled, 0);
        assert_eq!(h.scheduler.pending().len(), 1);

        let later = pump.drain_due(Utc::now() + ChronoDuration::minutes(5));
        assert_eq!(later.handled, 1);
        assert!(h.scheduler.pending().is_empty());
        assert!(h.scheduler.leased().is_empty());
        assert_eq!(h.entry("D23").status, UploadStatus::Fail);
    }

    #[test]
    fn continuation_of_a_dead_worker_is_resumed_after_lease_expiry() {
        let h = harness();
        h.extraction
            .plan(SubmissionPlan::finishing_after(handle("job-l"), 20, "Failed"));
        let trigger = h.upload("D25", "invoice");
        h.orchestrator.handle_object_created(&trigger).unwrap();

        let settings = PumpSettings::default();
        let due = Utc::now() + ChronoDuration::minutes(5);

        // A worker claims the continuation and dies before settling it.
        let claimed = h
            .scheduler
            .claim_due(due, 16, ChronoDuration::from_std(settings.lease).unwrap())
            .unwrap();
        assert_eq!(claimed.len(), 1);
        drop(claimed);

        let pump = ContinuationPump::new(h.orchestrator.clone(), h.scheduler.clone(), settings.clone());
        assert_eq!(pump.drain_due(due).handled, 0);
        assert_eq!(h.entry("D25").status, UploadStatus::InProgress);

        let after_expiry = due + ChronoDuration::from_std(settings.lease).unwrap();
        let stats = pump.drain_due(after_expiry);
        assert_eq!(stats.handled, 1);
        assert_eq!(h.entry("D25").status, UploadStatus::Fail);
        assert!(h.scheduler.pending().is_empty());
        assert!(h.scheduler.leased().is_empty());
        assert_eq!(h.results.placeholders().len(), 1);
    }

    #[test]
    fn pump_requeues_on_infrastructure_error() {
        let h = harness();
        h.extraction
            .plan(SubmissionPlan::accept(handle("job-n"), ["InProgress"]));
        let trigger = h.upload("D24", "invoice");
        h.orchestrator.handle_object_created(&trigger).unwrap();

        h.extraction.set_unavailable(true);
        let pump = ContinuationPump::new(
            h.orchestrator.clone(),
            h.scheduler.clone(),
            PumpSettings::default(),
        );
        let now = Utc::now() + ChronoDuration::minutes(5);
        let stats = pump.drain_due(now);

        assert_eq!(stats.requeued, 1);
        assert!(h.scheduler.leased().is_empty());
        let pending = h.scheduler.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].job.retry_count, 1);
        assert!(pending[0].resume_at > now);
    }
}
