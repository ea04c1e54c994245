//! Service info and health check.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::config::{APP_NAME, APP_VERSION};

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub vision_available: bool,
    pub vision_provider: &'static str,
    pub stored_records: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub vision_available: bool,
    pub demo_mode: bool,
    pub stored_records: usize,
    pub uptime_secs: u64,
}

/// `GET /`: service banner.
pub async fn root(State(ctx): State<ApiContext>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: APP_NAME,
        version: APP_VERSION,
        status: "running",
        vision_available: ctx.core.vision_available(),
        vision_provider: ctx.core.config.vision.provider.label(),
        stored_records: ctx.core.store().total_records(),
    })
}

/// `GET /health`
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        vision_available: ctx.core.vision_available(),
        demo_mode: ctx.core.config.demo_mode,
        stored_records: ctx.core.store().total_records(),
        uptime_secs: ctx.core.uptime_secs(),
    })
}
