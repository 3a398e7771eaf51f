mod api;
mod fonts;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use api::ExtractResponse;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/generate", post(api::generate))
        .route("/extract-names", post(api::extract_names))
        .route("/merge", post(api::merge))
        .route("/fonts", get(fonts::list))
        .route("/fonts/preview", get(fonts::preview))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
