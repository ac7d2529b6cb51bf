//! HTTP routes for the ARKI server

pub mod download;
pub mod health;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Room for multipart boundaries, part headers and the `mode` field on top
/// of the file ceiling. The gate enforces the exact file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(state.config().storage.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .merge(health::router())
        .merge(upload::router())
        .merge(download::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
