use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};
use tracing::info;

use docflow_jobs::ContinuationMessage;

use crate::app::dto::{InvocationResponse, ObjectCreatedRequest};
use crate::app::errors::{join_error_to_response, orchestrator_error_to_response};
use crate::app::services::AppServices;

/// One invocation per record, in delivery order.
///
/// The first failing record fails the request so the whole notification is
/// redelivered; records already handled are idempotent on redelivery.
pub async fn object_created(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<ObjectCreatedRequest>,
) -> axum::response::Response {
    let triggers = req.into_triggers();
    info!(records = triggers.len(), "object-created notification received");

    let orchestrator = services.orchestrator.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        triggers
            .iter()
            .map(|trigger| orchestrator.handle_object_created(trigger))
            .collect::<Result<Vec<_>, _>>()
    })
    .await;

    match outcome {
        Ok(Ok(reports)) => Json(InvocationResponse { reports }).into_response(),
        Ok(Err(e)) => orchestrator_error_to_response(e),
        Err(e) => join_error_to_response(e),
    }
}

pub async fn continuation(
    Extension(services): Extension<Arc<AppServices>>,
    Json(message): Json<ContinuationMessage>,
) -> axum::response::Response {
    let orchestrator = services.orchestrator.clone();
    let outcome =
        tokio::task::spawn_blocking(move || orchestrator.handle_continuation(message)).await;

    match outcome {
        Ok(Ok(report)) => Json(InvocationResponse {
            reports: vec![report],
        })
        .into_response(),
        Ok(Err(e)) => orchestrator_error_to_response(e),
        Err(e) => join_error_to_response(e),
    }
}
