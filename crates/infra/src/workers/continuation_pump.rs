use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;
use crate::scheduler::{ContinuationScheduler, Lease};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

#[derive(Debug, Clone)]
pub struct PumpSettings {
    /// Sleep between scheduler sweeps.
    pub tick: Duration,
    /// Continuations claimed per sweep.
    pub batch: usize,
    /// Delay before a continuation that hit an infrastructure error is retried.
    pub retry_delay: Duration,
    /// How long a claimed continuation stays with this pump before another
    /// sweep may claim it. Must exceed one polling round.
    pub lease: Duration,
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(500),
            batch: 16,
            retry_delay: Duration::from_secs(30),
            lease: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub handled: usize,
    pub requeued: usize,
    pub dropped: usize,
}

/// Feeds due continuation messages back into the orchestrator.
///
/// - Leases due messages from the scheduler in batches
/// - A message is settled only after its round returned
/// - Infrastructure errors put the message back with a delay
/// - Invalid messages are logged and dropped
/// - A pump that dies mid-round leaves the lease to expire, so the message
///   is claimed again by the next sweep
pub struct ContinuationPump {
    orchestrator: Arc<Orchestrator>,
    scheduler: Arc<dyn ContinuationScheduler>,
    settings: PumpSettings,
}

impl ContinuationPump {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        scheduler: Arc<dyn ContinuationScheduler>,
        settings: PumpSettings,
    ) -> Self {
        Self {
            orchestrator,
            scheduler,
            settings,
        }
    }

    /// One sweep: handle every message due at `now`, up to the batch size.
    pub fn drain_due(&self, now: DateTime<Utc>) -> PumpStats {
        let mut stats = PumpStats::default();

        let lease_for = chrono::Duration::from_std(self.settings.lease)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let leases = match self.scheduler.claim_due(now, self.settings.batch, lease_for) {
            Ok(leases) => leases,
            Err(err) => {
                warn!(error = %err, "failed to claim due continuations");
                return stats;
            }
        };

        for lease in leases {
            match self.orchestrator.handle_continuation(lease.message.clone()) {
                Ok(report) => {
                    stats.handled += 1;
                    debug!(outcome = ?report.outcome, "continuation handled");
                    self.settle(&lease);
                }
                Err(err) if err.is_retryable() => {
                    stats.requeued += 1;
                    self.requeue(&lease, now, &err);
                }
                Err(err) => {
                    stats.dropped += 1;
                    error!(
                        document_upload_id = %lease.message.document_upload_id(),
                        error = %err,
                        "dropping invalid continuation"
                    );
                    self.settle(&lease);
                }
            }
        }

        stats
    }

    fn settle(&self, lease: &Lease) {
        if let Err(err) = self.scheduler.complete(lease) {
            warn!(
                document_upload_id = %lease.message.document_upload_id(),
                error = %err,
                "failed to settle continuation; it will be claimed again after the lease expires"
            );
        }
    }

    fn requeue(&self, lease: &Lease, now: DateTime<Utc>, cause: &OrchestratorError) {
        let delay = chrono::Duration::from_std(self.settings.retry_delay)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        let mut message = lease.message.clone();
        message.resume_at = now + delay;

        warn!(
            document_upload_id = %message.document_upload_id(),
            error = %cause,
            resume_at = %message.resume_at,
            "continuation failed; requeued"
        );
        if let Err(err) = self.scheduler.retry_later(lease, &message) {
            warn!(
                document_upload_id = %message.document_upload_id(),
                error = %err,
                "requeue failed; continuation returns when its lease expires"
            );
        }
    }

    /// Spawn a worker thread that sweeps the scheduler until shut down.
    pub fn spawn(self, name: &'static str) -> io::Result<WorkerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || self.run(name, shutdown_rx))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }

    fn run(self, name: &'static str, shutdown_rx: mpsc::Receiver<()>) {
        info!(worker = name, "continuation pump started");

        loop {
            let stats = self.drain_due(Utc::now());
            if stats != PumpStats::default() {
                debug!(worker = name, ?stats, "continuation sweep");
            }

            match shutdown_rx.recv_timeout(self.settings.tick) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => continue,
            }
        }

        info!(worker = name, "continuation pump stopped");
    }
}
