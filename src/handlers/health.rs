use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};

use crate::AppState;

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Connectivity check against the configured bosun.
pub async fn test_datasource(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = state.datasource.test_datasource().await.map_err(|e| {
        tracing::warn!("datasource test failed: {e}");
        (e.status_code(), e.to_string())
    })?;
    Ok(Json(status))
}
