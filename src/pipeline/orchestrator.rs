//! End-to-end extraction run: one image in, one batch of stored records out.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::client::ExtractionClient;
use super::parser::parse_extraction_response;
use super::types::{ExtractedMedication, ExtractionOutcome};
use super::PipelineError;
use crate::config::{ValidationPolicy, DEFAULT_SESSION_KEY};
use crate::inventory::{MedicationRecord, SessionStore};

pub struct ExtractionPipeline {
    client: ExtractionClient,
    store: Arc<SessionStore>,
    policy: ValidationPolicy,
    clock: MonotonicClock,
}

impl ExtractionPipeline {
    pub fn new(client: ExtractionClient, store: Arc<SessionStore>, policy: ValidationPolicy) -> Self {
        Self {
            client,
            store,
            policy,
            clock: MonotonicClock::default(),
        }
    }

    pub fn client(&self) -> &ExtractionClient {
        &self.client
    }

    /// Analyze one image and append its records under `session_key`.
    ///
    /// Failures from the client or the parser are returned unchanged and
    /// leave the store untouched. The vision model is called at most once.
    pub async fn run(
        &self,
        image: &[u8],
        mime_type: &str,
        session_key: &str,
    ) -> Result<ExtractionOutcome, PipelineError> {
        let session_key = normalize_session_key(session_key);
        let start = Instant::now();

        let raw = self.client.extract(image, mime_type).await?;
        let mut detected = parse_extraction_response(&raw)?;

        if detected.len() > self.policy.max_detections {
            tracing::warn!(
                session = %session_key,
                detected = detected.len(),
                max = self.policy.max_detections,
                "Too many detections, extra entries dropped"
            );
            detected.truncate(self.policy.max_detections);
        }

        let records: Vec<MedicationRecord> = detected
            .into_iter()
            .map(|med| self.build_record(med, &session_key))
            .collect();

        let low_confidence_count = records
            .iter()
            .filter(|r| r.confidence < self.policy.min_confidence)
            .count();

        let stored = self.store.append_batch(records.clone());
        let count = records.len();

        tracing::info!(
            session = %session_key,
            count,
            stored,
            low_confidence_count,
            elapsed_ms = %start.elapsed().as_millis(),
            "Extraction complete"
        );

        Ok(ExtractionOutcome {
            records,
            count,
            low_confidence_count,
            message: summary_message(count),
        })
    }

    fn build_record(&self, med: ExtractedMedication, session_key: &str) -> MedicationRecord {
        MedicationRecord {
            id: Uuid::new_v4(),
            name: med.name,
            manufacturer: med.manufacturer,
            expiry: med.expiry,
            lot_number: med.lot_number,
            unit_count: med.unit_count,
            confidence: med.confidence.clamp(0.0, 1.0),
            created_at: self.clock.now(),
            session_key: session_key.to_string(),
        }
    }
}

/// Blank keys fall back to the default session.
pub fn normalize_session_key(session_key: &str) -> String {
    let trimmed = session_key.trim();
    if trimmed.is_empty() {
        DEFAULT_SESSION_KEY.to_string()
    } else {
        trimmed.to_string()
    }
}

fn summary_message(count: usize) -> String {
    format!("Analyse terminée. {count} médicament(s) ajouté(s) au stockage.")
}

/// Wall clock that never goes backwards across calls.
#[derive(Default)]
struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(next);
        next
    }
}
