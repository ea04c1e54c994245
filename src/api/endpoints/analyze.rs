//! `POST /analyze-medication`: run the extraction pipeline on one upload.
//!
//! The image arrives as the multipart field `file`. Its MIME type is the
//! part's content type, or a guess from the file name when the client sent
//! none.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{AnalyzeResponse, ApiContext, SessionQuery};
use crate::inventory::MedicationRecord;
use crate::pipeline::{normalize_session_key, PipelineError};

const FILE_FIELD: &str = "file";

struct Upload {
    bytes: Vec<u8>,
    mime_type: String,
}

pub async fn analyze(
    State(ctx): State<ApiContext>,
    Query(query): Query<SessionQuery>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    let session_key = normalize_session_key(&query.session_id);

    tracing::info!(
        session = %session_key,
        mime = %upload.mime_type,
        bytes = upload.bytes.len(),
        "Analysis requested"
    );

    match ctx
        .core
        .pipeline()
        .run(&upload.bytes, &upload.mime_type, &session_key)
        .await
    {
        Ok(outcome) => Ok(Json(AnalyzeResponse {
            medications: outcome.records,
            success: true,
            message: outcome.message,
            count: outcome.count,
            low_confidence_count: outcome.low_confidence_count,
            degraded: false,
        })),
        Err(PipelineError::ServiceUnavailable(reason))
            if ctx.core.config.demo_mode && !ctx.core.vision_available() =>
        {
            tracing::warn!(session = %session_key, reason = %reason, "Answering with placeholder data");
            Ok(Json(degraded_response(&session_key)))
        }
        Err(e) => Err(e.into()),
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let declared = field.content_type().map(str::to_string);
        let guessed = field
            .file_name()
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .map(str::to_string);
        let mime_type = declared
            .filter(|m| !m.is_empty() && m != "application/octet-stream")
            .or(guessed)
            .unwrap_or_default();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Upload {
            bytes: bytes.to_vec(),
            mime_type,
        });
    }
    Err(ApiError::BadRequest(format!(
        "multipart field '{FILE_FIELD}' is required"
    )))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Fixed placeholder answer for demo deployments without a provider.
/// Nothing is written to the store.
fn degraded_response(session_key: &str) -> AnalyzeResponse {
    let record = MedicationRecord {
        id: Uuid::new_v4(),
        name: "Doliprane 1000mg (TEST)".into(),
        manufacturer: "Sanofi (TEST)".into(),
        expiry: "31/12/2025".into(),
        lot_number: "TEST123".into(),
        unit_count: 8,
        confidence: 0.9,
        created_at: chrono::Utc::now(),
        session_key: session_key.to_string(),
    };
    AnalyzeResponse {
        medications: vec![record],
        success: true,
        message: "Mode test - aucun service de vision configuré".into(),
        count: 1,
        low_confidence_count: 0,
        degraded: true,
    }
}
