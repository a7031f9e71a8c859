//! Polling state machine (pure, no IO).
//!
//! One invocation runs one bounded polling round and feeds its outcome to
//! [`step`], which decides the next phase and the single action the caller
//! must perform. Continuing is an action like any other: the caller hands the
//! advanced job to an external scheduler and returns, and the scheduler
//! bounces it back later (a trampoline). Nothing about an unfinished job is
//! kept in process memory between rounds.

use serde::{Deserialize, Serialize};

use crate::job::{ExtractionJob, FailureReason, JobFailure, JobPhase};
use crate::policy::PollPolicy;
use crate::status::ExtractionStatus;

/// Result of one bounded polling round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundOutcome {
    /// A check observed a terminal status after `checks` checks.
    Terminal { status: ExtractionStatus, checks: u32 },
    /// All `checks` checks observed a running job.
    StillRunning { checks: u32 },
}

impl RoundOutcome {
    pub fn checks(&self) -> u32 {
        match self {
            RoundOutcome::Terminal { checks, .. } | RoundOutcome::StillRunning { checks } => {
                *checks
            }
        }
    }
}

/// What the orchestrator must do after a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Collect the output manifest, dispatch it, then relocate the source.
    Dispatch,
    /// Write the placeholder record and fail the registry entry.
    RecordFailure { failure: JobFailure },
    /// Schedule `job` to resume in a later invocation.
    Continue { job: ExtractionJob },
}

/// Next phase plus the action that realizes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub phase: JobPhase,
    pub action: Action,
}

impl Transition {
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match &self.action {
            Action::RecordFailure { failure } => Some(failure.reason()),
            _ => None,
        }
    }
}

/// Decide what follows a polling round.
///
/// - terminal success → `Succeeded` / `Dispatch`
/// - terminal failure or unrecognized status → `Failed` / `RecordFailure`
/// - still running with budget left → `Polling` / `Continue` with `retry_count + 1`
/// - still running on the last round → `TimedOut` / `RecordFailure`
pub fn step(job: &ExtractionJob, outcome: &RoundOutcome, policy: &PollPolicy) -> Transition {
    match outcome {
        RoundOutcome::Terminal { status, .. } => match status {
            ExtractionStatus::Succeeded => Transition {
                phase: JobPhase::Succeeded,
                action: Action::Dispatch,
            },
            ExtractionStatus::Failed => failed(JobFailure::ServiceReportedFailure),
            ExtractionStatus::Unexpected { raw } => {
                failed(JobFailure::UnexpectedStatus { raw: raw.clone() })
            }
            // A round never reports Running as terminal; fail closed regardless.
            ExtractionStatus::Running => failed(JobFailure::UnexpectedStatus {
                raw: "Running".to_string(),
            }),
        },
        RoundOutcome::StillRunning { .. } if policy.has_budget_after(job.retry_count) => {
            Transition {
                phase: JobPhase::Polling,
                action: Action::Continue {
                    job: job.next_round(),
                },
            }
        }
        RoundOutcome::StillRunning { .. } => Transition {
            phase: JobPhase::TimedOut,
            action: Action::RecordFailure {
                failure: JobFailure::PollingTimeout {
                    checks: policy.max_total_checks(),
                },
            },
        },
    }
}

fn failed(failure: JobFailure) -> Transition {
    Transition {
        phase: JobPhase::Failed,
        action: Action::RecordFailure { failure },
    }
}
