//! Request logging middleware.
//!
//! One span per request, one line per response with status and latency.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

pub async fn log_request(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let span = tracing::info_span!("http_request", %method, %path);

    async move {
        let start = Instant::now();
        let response = next.run(req).await;
        let status = response.status().as_u16();
        let elapsed_ms = start.elapsed().as_millis();

        if response.status().is_server_error() {
            tracing::warn!(status, elapsed_ms = %elapsed_ms, "Request failed");
        } else {
            tracing::info!(status, elapsed_ms = %elapsed_ms, "Request served");
        }
        response
    }
    .instrument(span)
    .await
}
