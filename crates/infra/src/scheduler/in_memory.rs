//! In-memory continuation scheduler for tests/dev.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use docflow_jobs::ContinuationMessage;

use super::{ContinuationScheduler, Lease};
use crate::error::InfraError;

#[derive(Debug)]
struct Leased {
    token: String,
    expires_at: DateTime<Utc>,
    message: ContinuationMessage,
}

#[derive(Debug, Default)]
struct State {
    /// Sorted by `resume_at`.
    pending: Vec<ContinuationMessage>,
    leased: Vec<Leased>,
    next_token: u64,
}

impl State {
    fn insert_pending(&mut self, message: ContinuationMessage) {
        let at = self
            .pending
            .partition_point(|m| m.resume_at <= message.resume_at);
        self.pending.insert(at, message);
    }

    fn release(&mut self, token: &str) -> bool {
        let before = self.leased.len();
        self.leased.retain(|l| l.token != token);
        self.leased.len() != before
    }
}

#[derive(Debug, Default)]
pub struct InMemoryScheduler {
    state: Mutex<State>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages not currently leased, earliest first.
    pub fn pending(&self) -> Vec<ContinuationMessage> {
        self.state
            .lock()
            .map(|s| s.pending.clone())
            .unwrap_or_default()
    }

    /// Messages leased and not yet settled.
    pub fn leased(&self) -> Vec<ContinuationMessage> {
        self.state
            .lock()
            .map(|s| s.leased.iter().map(|l| l.message.clone()).collect())
            .unwrap_or_default()
    }

    /// Take the earliest pending message regardless of its `resumeAt`.
    pub fn take_next(&self) -> Option<ContinuationMessage> {
        let mut state = self.state.lock().ok()?;
        if state.pending.is_empty() {
            None
        } else {
            Some(state.pending.remove(0))
        }
    }
}

impl ContinuationScheduler for InMemoryScheduler {
    fn schedule(&self, message: &ContinuationMessage) -> Result<(), InfraError> {
        let mut state = self
            .state
            .lock()
            .map_err(InfraError::poisoned("scheduler"))?;
        state.insert_pending(message.clone());
        Ok(())
    }

    fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease_for: Duration,
    ) -> Result<Vec<Lease>, InfraError> {
        let mut state = self
            .state
            .lock()
            .map_err(InfraError::poisoned("scheduler"))?;

        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut state.leased)
            .into_iter()
            .partition(|l| l.expires_at <= now);
        state.leased = live;
        for lease in expired {
            state.insert_pending(lease.message);
        }

        let ready = state
            .pending
            .partition_point(|m| m.resume_at <= now)
            .min(limit);
        let claimed: Vec<ContinuationMessage> = state.pending.drain(..ready).collect();

        let mut leases = Vec::with_capacity(claimed.len());
        for message in claimed {
            state.next_token += 1;
            let token = format!("lease-{}", state.next_token);
            state.leased.push(Leased {
                token: token.clone(),
                expires_at: now + lease_for,
                message: message.clone(),
            });
            leases.push(Lease { message, token });
        }
        Ok(leases)
    }

    fn complete(&self, lease: &Lease) -> Result<(), InfraError> {
        let mut state = self
            .state
            .lock()
            .map_err(InfraError::poisoned("scheduler"))?;
        state.release(&lease.token);
        Ok(())
    }

    fn retry_later(&self, lease: &Lease, message: &ContinuationMessage) -> Result<(), InfraError> {
        let mut state = self
            .state
            .lock()
            .map_err(InfraError::poisoned("scheduler"))?;
        // An expired lease may already be back in `pending`; don't duplicate it.
        if state.release(&lease.token) {
            state.insert_pending(message.clone());
        }
        Ok(())
    }
}
