//! Field-level normalization of the model's payload.
//!
//! Infallible by construction: a missing or unreadable value becomes data
//! (placeholder text, zero count, zero confidence), never an error.

use serde_json::Value;

use crate::config::UNREADABLE_PLACEHOLDER;

/// Text field: the trimmed value if present and non-empty, else the placeholder.
///
/// Numbers are accepted as text; lot numbers are often emitted unquoted.
pub fn text_field(value: Option<&Value>) -> String {
    let text = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        UNREADABLE_PLACEHOLDER.to_string()
    } else {
        text
    }
}

/// Unit count: a non-negative integer, else 0.
///
/// Accepts integers, non-negative floats (truncated) and integer strings.
pub fn unit_count_field(value: Option<&Value>) -> u32 {
    let count = match value {
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                Some(u)
            } else if n.is_i64() {
                None
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.trunc() as u64)
            }
        }
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    count.map(|c| c.min(u64::from(u32::MAX)) as u32).unwrap_or(0)
}

/// Confidence: the value as a real number, else 0.0. Not clamped.
pub fn confidence_field(value: Option<&Value>) -> f64 {
    let confidence = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    confidence.filter(|c| c.is_finite()).unwrap_or(0.0)
}
