//! Scripted extraction service for tests/dev.
//!
//! Each new submission consumes the next queued [`SubmissionPlan`]. A repeated
//! client token gets the handle it was first given back. Status checks
//! walk the plan's status script; once the script is exhausted the last
//! status repeats forever.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use docflow_core::JobHandle;

use super::{ExtractionService, SubmitOutcome, SubmitRequest};
use crate::error::InfraError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPlan {
    Accept {
        handle: JobHandle,
        statuses: Vec<String>,
    },
    Reject(String),
}

impl SubmissionPlan {
    pub fn accept<I, S>(handle: JobHandle, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SubmissionPlan::Accept {
            handle,
            statuses: statuses.into_iter().map(Into::into).collect(),
        }
    }

    /// `running` in-progress checks followed by `terminal`.
    pub fn finishing_after(handle: JobHandle, running: usize, terminal: &str) -> Self {
        Self::accept(
            handle,
            std::iter::repeat_n("InProgress", running).chain(std::iter::once(terminal)),
        )
    }
}

#[derive(Debug)]
struct Script {
    remaining: VecDeque<String>,
    last: String,
    checks: u64,
}

#[derive(Debug, Default)]
struct State {
    plans: VecDeque<SubmissionPlan>,
    scripts: HashMap<JobHandle, Script>,
    by_token: HashMap<String, JobHandle>,
    submissions: Vec<SubmitRequest>,
    unavailable: bool,
    fallback: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct ScriptedExtraction {
    state: Mutex<State>,
}

impl ScriptedExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self, plan: SubmissionPlan) {
        if let Ok(mut state) = self.state.lock() {
            state.plans.push_back(plan);
        }
    }

    /// Accept unplanned submissions with a generated handle and this script.
    pub fn with_fallback<I, S>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut state) = self.state.lock() {
            state.fallback = Some(statuses.into_iter().map(Into::into).collect());
        }
        self
    }

    /// Simulate a transport outage for every call.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = unavailable;
        }
    }

    /// Submissions that reached a plan; repeated tokens are not counted.
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.state
            .lock()
            .map(|s| s.submissions.clone())
            .unwrap_or_default()
    }

    /// Status checks performed so far for `handle`.
    pub fn checks(&self, handle: &JobHandle) -> u64 {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.scripts.get(handle).map(|script| script.checks))
            .unwrap_or(0)
    }
}

impl ExtractionService for ScriptedExtraction {
    fn submit(&self, request: &SubmitRequest) -> Result<SubmitOutcome, InfraError> {
        let mut state = self
            .state
            .lock()
            .map_err(InfraError::poisoned("scripted extraction"))?;
        if state.unavailable {
            return Err(InfraError::Extraction("service unavailable".to_string()));
        }
        if let Some(handle) = state.by_token.get(&request.client_token) {
            return Ok(SubmitOutcome::Accepted(handle.clone()));
        }

        let plan = match (state.plans.pop_front(), &state.fallback) {
            (Some(plan), _) => plan,
            (None, Some(statuses)) => SubmissionPlan::accept(generated_handle()?, statuses.clone()),
            (None, None) => {
                return Err(InfraError::Extraction("no submission planned".to_string()));
            }
        };
        state.submissions.push(request.clone());

        match plan {
            SubmissionPlan::Reject(reason) => Ok(SubmitOutcome::Rejected(reason)),
            SubmissionPlan::Accept { handle, statuses } => {
                let mut remaining: VecDeque<String> = statuses.into();
                let last = remaining
                    .back()
                    .cloned()
                    .unwrap_or_else(|| "InProgress".to_string());
                if remaining.is_empty() {
                    remaining.push_back(last.clone());
                }
                state
                    .by_token
                    .insert(request.client_token.clone(), handle.clone());
                state.scripts.insert(
                    handle.clone(),
                    Script {
                        remaining,
                        last,
                        checks: 0,
                    },
                );
                Ok(SubmitOutcome::Accepted(handle))
            }
        }
    }

    fn status(&self, handle: &JobHandle) -> Result<String, InfraError> {
        let mut state = self
            .state
            .lock()
            .map_err(InfraError::poisoned("scripted extraction"))?;
        if state.unavailable {
            return Err(InfraError::Extraction("service unavailable".to_string()));
        }

        let script = state
            .scripts
            .get_mut(handle)
            .ok_or_else(|| InfraError::Extraction(format!("unknown job handle {handle}")))?;
        script.checks += 1;
        Ok(script
            .remaining
            .pop_front()
            .unwrap_or_else(|| script.last.clone()))
    }
}

fn generated_handle() -> Result<JobHandle, InfraError> {
    JobHandle::parse(format!("arn:docflow:extraction-job/{}", uuid::Uuid::now_v7()))
        .map_err(|e| InfraError::Extraction(e.to_string()))
}
