use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::models::query::QueryOptions;

/// Run the panel's targets against bosun.
pub async fn query(
    State(state): State<AppState>,
    Json(options): Json<QueryOptions>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let response = state.datasource.query(&options).await.map_err(|e| {
        tracing::error!("query failed: {e}");
        (e.status_code(), format!("query failed: {e}"))
    })?;

    Ok(Json(response))
}
