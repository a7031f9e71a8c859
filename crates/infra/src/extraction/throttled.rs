//! Rate-limited extraction client.

use governor::Quota;
use tracing::debug;

use docflow_core::JobHandle;

use super::{ExtractionService, SubmitOutcome, SubmitRequest};
use crate::error::InfraError;
use crate::pause::Pause;
use crate::throttle::{self, DirectRateLimiter};

/// Wraps an extraction client so every call first waits for the limiter.
///
/// Affects throughput only: a call waits for a cell, it is never dropped.
pub struct ThrottledExtraction<S, P> {
    inner: S,
    limiter: DirectRateLimiter,
    pause: P,
}

impl<S, P> ThrottledExtraction<S, P>
where
    S: ExtractionService,
    P: Pause,
{
    pub fn new(inner: S, quota: Quota, pause: P) -> Self {
        Self {
            inner,
            limiter: throttle::limiter(quota),
            pause,
        }
    }

    fn acquire(&self) {
        while let Err(wait) = throttle::try_acquire(&self.limiter) {
            debug!(wait_ms = wait.as_millis() as u64, "extraction call throttled");
            self.pause.pause(wait);
        }
    }
}

impl<S, P> ExtractionService for ThrottledExtraction<S, P>
where
    S: ExtractionService,
    P: Pause,
{
    fn submit(&self, request: &SubmitRequest) -> Result<SubmitOutcome, InfraError> {
        self.acquire();
        self.inner.submit(request)
    }

    fn status(&self, handle: &JobHandle) -> Result<String, InfraError> {
        self.acquire();
        self.inner.status(handle)
    }
}
