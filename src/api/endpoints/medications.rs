//! Session inventory endpoints.
//!
//! - `GET /medications`: records of one session with totals
//! - `DELETE /medications`: clear one session
//! - `GET /medications/export`: CSV attachment

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionQuery};
use crate::inventory::{export_file_name, render_csv, ClearOutcome, MedicationRecord};
use crate::pipeline::normalize_session_key;

#[derive(Serialize, Deserialize)]
pub struct MedicationsResponse {
    pub session_id: String,
    pub medications: Vec<MedicationRecord>,
    pub total_count: usize,
    pub total_units: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ClearResponse {
    pub session_id: String,
    pub cleared: usize,
    /// Records still held across all sessions.
    pub remaining: usize,
    pub message: String,
}

/// `GET /medications`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<SessionQuery>,
) -> Json<MedicationsResponse> {
    let session_id = normalize_session_key(&query.session_id);
    let snapshot = ctx.core.store().list(&session_id);
    let aggregate = snapshot.aggregate();

    Json(MedicationsResponse {
        session_id,
        total_count: aggregate.count,
        total_units: aggregate.total_units,
        medications: snapshot.into_vec(),
    })
}

/// `DELETE /medications`
pub async fn clear(
    State(ctx): State<ApiContext>,
    Query(query): Query<SessionQuery>,
) -> Json<ClearResponse> {
    let session_id = normalize_session_key(&query.session_id);
    let ClearOutcome { cleared, remaining } = ctx.core.store().clear(&session_id);

    tracing::info!(session = %session_id, cleared, remaining, "Session cleared");

    Json(ClearResponse {
        message: format!("{cleared} médicament(s) supprimé(s)"),
        session_id,
        cleared,
        remaining,
    })
}

/// `GET /medications/export`
pub async fn export(
    State(ctx): State<ApiContext>,
    Query(query): Query<SessionQuery>,
) -> Result<Response, ApiError> {
    let session_id = normalize_session_key(&query.session_id);
    let csv = render_csv(ctx.core.store(), &session_id)?;
    let file_name = export_file_name(&session_id, chrono::Utc::now());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        csv,
    )
        .into_response())
}
