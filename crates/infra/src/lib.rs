//! Orchestration and infrastructure for document extraction jobs.
//!
//! ## Design
//!
//! - Every external system sits behind a small synchronous trait (port)
//! - Each port has an in-memory adapter for tests and local runs
//! - Persistent adapters: Postgres for records, Redis for queues and scheduling
//! - The orchestrator composes the ports; `docflow_jobs` decides what it does
//!
//! ## Layout
//!
//! - `orchestrator`: submission, polling, routing, failure handling, relocation
//! - `workers`: continuation pump feeding scheduled rounds back in
//! - `routing`: document type registry
//! - `throttle`: outbound rate limiting
//! - one module per port: `extraction`, `object_store`, `queue`, `scheduler`,
//!   `registry`, `results`, `profiles`

pub mod config;
pub mod error;
pub mod extraction;
pub mod object_store;
pub mod orchestrator;
pub mod pause;
pub mod profiles;
pub mod queue;
pub mod registry;
pub mod results;
pub mod routing;
pub mod scheduler;
pub mod throttle;
pub mod workers;

pub use config::{ConfigError, OrchestratorConfig, QueueConfig};
pub use error::{InfraError, OrchestratorError, OrchestratorResult};
pub use orchestrator::{InvocationOutcome, InvocationReport, ObjectCreated, Orchestrator, Ports};

#[cfg(test)]
mod integration_tests;
