//! Resume-later primitive for continuation messages.
//!
//! The orchestrator hands a continuation to the scheduler and returns. Once
//! `resumeAt` has passed, `claim_due` leases the message to one caller. The
//! message stays with the scheduler until the lease holder calls `complete`
//! or `retry_later`; a lease that is never settled expires and the message
//! is claimable again. A worker that dies mid-invocation therefore delays a
//! continuation but never loses it.

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_zset;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use docflow_jobs::ContinuationMessage;

use crate::error::InfraError;

pub use in_memory::InMemoryScheduler;
#[cfg(feature = "redis")]
pub use redis_zset::RedisContinuationScheduler;

/// A claimed continuation, held until settled or expired.
#[derive(Debug, Clone, PartialEq)]
pub struct Lease {
    pub message: ContinuationMessage,
    /// Adapter-specific identity of the leased entry.
    token: String,
}

impl Lease {
    pub fn token(&self) -> &str {
        &self.token
    }
}

pub trait ContinuationScheduler: Send + Sync {
    fn schedule(&self, message: &ContinuationMessage) -> Result<(), InfraError>;

    /// Lease up to `limit` messages whose `resumeAt` is at or before `now`,
    /// earliest first, for `lease_for`. Expired leases are claimable again.
    fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease_for: Duration,
    ) -> Result<Vec<Lease>, InfraError>;

    /// Drop a leased message for good. Settling an expired or unknown lease
    /// is not an error.
    fn complete(&self, lease: &Lease) -> Result<(), InfraError>;

    /// Replace a leased message with `message` (usually a later `resumeAt`).
    fn retry_later(&self, lease: &Lease, message: &ContinuationMessage) -> Result<(), InfraError>;
}

impl<S> ContinuationScheduler for Arc<S>
where
    S: ContinuationScheduler + ?Sized,
{
    fn schedule(&self, message: &ContinuationMessage) -> Result<(), InfraError> {
        (**self).schedule(message)
    }

    fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease_for: Duration,
    ) -> Result<Vec<Lease>, InfraError> {
        (**self).claim_due(now, limit, lease_for)
    }

    fn complete(&self, lease: &Lease) -> Result<(), InfraError> {
        (**self).complete(lease)
    }

    fn retry_later(&self, lease: &Lease, message: &ContinuationMessage) -> Result<(), InfraError> {
        (**self).retry_later(lease, message)
    }
}
