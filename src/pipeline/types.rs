use serde::Serialize;

use crate::inventory::MedicationRecord;

/// One medication as read from the model's payload, after field validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMedication {
    pub name: String,
    pub manufacturer: String,
    pub expiry: String,
    pub lot_number: String,
    pub unit_count: u32,
    /// As emitted by the model; clamped when the record is built.
    pub confidence: f64,
}

/// Result of one successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub records: Vec<MedicationRecord>,
    pub count: usize,
    /// Records under the configured minimum confidence.
    pub low_confidence_count: usize,
    pub message: String,
}
