//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Layers (outermost → innermost): request logging, permissive CORS, body
//! size limit.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Headroom above the image limit for multipart boundaries and headers.
/// Oversized images still reach the pipeline's own size check.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the service router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let body_limit = core.config.image.max_bytes + MULTIPART_OVERHEAD_BYTES;
    let ctx = ApiContext::new(core);

    Router::new()
        .route("/", get(endpoints::health::root))
        .route("/health", get(endpoints::health::check))
        .route("/analyze-medication", post(endpoints::analyze::analyze))
        .route(
            "/medications",
            get(endpoints::medications::list).delete(endpoints::medications::clear),
        )
        .route("/medications/export", get(endpoints::medications::export))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(middleware::logging::log_request))
}
