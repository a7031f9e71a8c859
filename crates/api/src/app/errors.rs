use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use docflow_infra::OrchestratorError;

/// Validation errors are the caller's problem; infrastructure errors ask for redelivery.
pub fn orchestrator_error_to_response(err: OrchestratorError) -> axum::response::Response {
    match err {
        OrchestratorError::Validation(e) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        OrchestratorError::Infrastructure(e) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "infrastructure_error",
            e.to_string(),
        ),
    }
}

pub fn join_error_to_response(err: tokio::task::JoinError) -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "invocation_aborted",
        err.to_string(),
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
