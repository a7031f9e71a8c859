//! Bounded status polling within one invocation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use docflow_core::JobHandle;
use docflow_jobs::{ExtractionStatus, RoundOutcome};

use crate::error::InfraError;
use crate::extraction::ExtractionService;
use crate::pause::Pause;

/// Runs at most `max_checks` status checks, `check_delay` apart.
///
/// Stops at the first terminal status. Never writes business state.
pub struct StatusPoller {
    extraction: Arc<dyn ExtractionService>,
    pause: Arc<dyn Pause>,
    max_checks: u32,
    check_delay: Duration,
}

impl StatusPoller {
    pub fn new(
        extraction: Arc<dyn ExtractionService>,
        pause: Arc<dyn Pause>,
        max_checks: u32,
        check_delay: Duration,
    ) -> Self {
        Self {
            extraction,
            pause,
            max_checks: max_checks.max(1),
            check_delay,
        }
    }

    pub fn poll_round(&self, handle: &JobHandle) -> Result<RoundOutcome, InfraError> {
        for check in 1..=self.max_checks {
            let raw = self.extraction.status(handle)?;
            let status = ExtractionStatus::classify(&raw);

            if let ExtractionStatus::Unexpected { raw } = &status {
                warn!(job_handle = %handle, status = %raw, check, "unexpected extraction status");
            }
            if status.is_terminal() {
                debug!(job_handle = %handle, check, ?status, "extraction reached terminal status");
                return Ok(RoundOutcome::Terminal {
                    status,
                    checks: check,
                });
            }

            if check < self.max_checks {
                self.pause.pause(self.check_delay);
            }
        }

        debug!(job_handle = %handle, checks = self.max_checks, "extraction still running");
        Ok(RoundOutcome::StillRunning {
            checks: self.max_checks,
        })
    }
}
