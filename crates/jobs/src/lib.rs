//! Extraction job mechanics (pure, no IO).
//!
//! ## Design
//!
//! - A job is polled in bounded rounds, one round per invocation
//! - Rounds are chained through continuation messages, never through process memory
//! - Two budgets: checks per round and rounds per job
//! - Unknown service statuses fail closed
//! - Every job ends in exactly one of: dispatch, failure record
//!
//! ## Components
//!
//! - `ExtractionJob`: the in-flight request and its identity
//! - `PollPolicy`: both polling budgets plus continuation jitter
//! - `step`: the state machine deciding the next action after a round
//! - `ContinuationMessage` / `DispatchMessage`: wire contracts
//! - `OutputManifest`: canonical, ordered result keys

pub mod continuation;
pub mod dispatch;
pub mod job;
pub mod machine;
pub mod manifest;
pub mod policy;
pub mod status;

pub use continuation::{ContinuationJob, ContinuationMessage, DocumentPayload};
pub use dispatch::DispatchMessage;
pub use job::{ExtractionJob, FailureReason, JobFailure, JobPhase};
pub use machine::{Action, RoundOutcome, Transition, step};
pub use manifest::OutputManifest;
pub use policy::PollPolicy;
pub use status::ExtractionStatus;
