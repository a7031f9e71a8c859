//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: port adapters and orchestrator construction
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: trigger envelopes and responses
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, StoreMode};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/v1/events/object-created", post(routes::events::object_created))
        .route("/v1/events/continuation", post(routes::events::continuation))
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
