use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One detected medication unit-group on a package.
///
/// Built once by the extraction pipeline and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub id: Uuid,
    /// Name, with dosage when visible.
    pub name: String,
    pub manufacturer: String,
    /// Expiry as read on the box (DD/MM/YYYY), kept verbatim.
    pub expiry: String,
    pub lot_number: String,
    pub unit_count: u32,
    /// In [0.0, 1.0].
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub session_key: String,
}

/// Count and unit total over one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionAggregate {
    pub count: usize,
    pub total_units: u64,
}

impl SessionAggregate {
    pub fn of<'a>(records: impl IntoIterator<Item = &'a MedicationRecord>) -> Self {
        records.into_iter().fold(Self::default(), |acc, r| Self {
            count: acc.count + 1,
            total_units: acc.total_units + u64::from(r.unit_count),
        })
    }
}

/// Result of clearing one session, taken under a single lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearOutcome {
    /// Records removed from the session.
    pub cleared: usize,
    /// Records still held across all sessions.
    pub remaining: usize,
}
