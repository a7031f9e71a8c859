use std::sync::Arc;

use axum::{Json, extract::Extension};
use serde_json::json;

use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "stores": services.mode.as_str(),
    }))
}
