//! CSV export of one session.

use chrono::{DateTime, Utc};

use super::store::SessionStore;
use super::types::MedicationRecord;
use super::InventoryError;

const CSV_HEADER: &str =
    "Nom,Laboratoire,Date péremption,Numéro de lot,Unités,Confiance (%),Horodatage";

/// Render a session as CSV: one header line, then one line per record in
/// insertion order. An empty session is an error, not an empty table.
pub fn render_csv(store: &SessionStore, session_key: &str) -> Result<String, InventoryError> {
    let records = store.list(session_key);
    if records.is_empty() {
        return Err(InventoryError::EmptySession(session_key.to_string()));
    }

    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + records.len() * 96);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for record in &records {
        out.push_str(&csv_row(record));
        out.push('\n');
    }

    tracing::debug!(session = session_key, rows = records.len(), "CSV export rendered");
    Ok(out)
}

/// Attachment name, e.g. `medicaments_default_20261018_142501.csv`.
pub fn export_file_name(session_key: &str, now: DateTime<Utc>) -> String {
    // Session keys come from query strings; keep the header value tame.
    let safe: String = session_key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("medicaments_{}_{}.csv", safe, now.format("%Y%m%d_%H%M%S"))
}

fn csv_row(record: &MedicationRecord) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        quote(&record.name),
        quote(&record.manufacturer),
        quote(&record.expiry),
        quote(&record.lot_number),
        record.unit_count,
        confidence_percent(record.confidence),
        quote(&record.created_at.to_rfc3339()),
    )
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn confidence_percent(confidence: f64) -> u32 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u32
}
