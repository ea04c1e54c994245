//! Two-stage decode of the model's free-form reply.
//!
//! 1. Span isolation: the text between the first `{` and the last `}`.
//!    Models often wrap the object in prose or code fences.
//! 2. Strict JSON decode of that span. No repair past this point.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::ExtractedMedication;
use super::validation::{confidence_field, text_field, unit_count_field};
use super::PipelineError;

const KEY_NAME: &str = "nom";
const KEY_MANUFACTURER: &str = "laboratoire";
const KEY_EXPIRY: &str = "date_peremption";
const KEY_LOT: &str = "numero_lot";
const KEY_UNITS: &str = "nombre_unites";
const KEY_CONFIDENCE: &str = "confiance";

/// Parse the model reply into validated medications, in payload order.
pub fn parse_extraction_response(raw: &str) -> Result<Vec<ExtractedMedication>, PipelineError> {
    let span = extract_json_span(raw).ok_or_else(|| {
        PipelineError::MalformedResponse("no JSON object found in model reply".into())
    })?;

    #[derive(Deserialize)]
    struct RawPayload {
        #[serde(default)]
        medications: Vec<Value>,
    }

    let payload: RawPayload = serde_json::from_str(span)
        .map_err(|e| PipelineError::MalformedResponse(format!("invalid JSON payload: {e}")))?;

    payload
        .medications
        .iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Object(fields) => Ok(medication_from_fields(fields)),
            other => Err(PipelineError::MalformedResponse(format!(
                "medication entry {index} is not an object: {other}"
            ))),
        })
        .collect()
}

/// Slice from the first `{` to the last `}` inclusive.
pub fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn medication_from_fields(fields: &Map<String, Value>) -> ExtractedMedication {
    ExtractedMedication {
        name: text_field(fields.get(KEY_NAME)),
        manufacturer: text_field(fields.get(KEY_MANUFACTURER)),
        expiry: text_field(fields.get(KEY_EXPIRY)),
        lot_number: text_field(fields.get(KEY_LOT)),
        unit_count: unit_count_field(fields.get(KEY_UNITS)),
        confidence: confidence_field(fields.get(KEY_CONFIDENCE)),
    }
}
