pub mod annotations;
pub mod backend;
pub mod config;
pub mod datasource;
pub mod error;
pub mod handlers;
pub mod models;
pub mod template;
pub mod transform;

use axum::{Router, routing::get, routing::post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use datasource::BosunDatasource;

#[derive(Clone)]
pub struct AppState {
    pub datasource: Arc<BosunDatasource>,
}

/// Host-facing routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(handlers::query::query))
        .route("/annotations", post(handlers::annotations::annotation_query))
        .route("/test", get(handlers::health::test_datasource))
        .route("/healthz", get(handlers::health::healthz))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
