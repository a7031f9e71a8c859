//! HTTP ingress for the extraction orchestrator.

pub mod app;
