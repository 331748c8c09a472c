use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::models::annotation::AnnotationQueryOptions;

pub async fn annotation_query(
    State(state): State<AppState>,
    Json(options): Json<AnnotationQueryOptions>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let events = state
        .datasource
        .annotation_query(&options)
        .await
        .map_err(|e| {
            tracing::error!("annotation query failed: {e}");
            (e.status_code(), format!("annotation query failed: {e}"))
        })?;

    Ok(Json(events))
}
