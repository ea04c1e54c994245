//! In-memory session store.
//!
//! Records are partitioned by session key at the storage level, so a read for
//! one key cannot see another key's records. Every mutation happens under a
//! single write lock, which makes a pipeline run's batch visible all at once.
//! Ids stay reserved for the store's lifetime, even after their session is
//! cleared. Nothing is persisted: a restart drops every session.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use super::types::{ClearOutcome, MedicationRecord, SessionAggregate};

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Vec<MedicationRecord>>,
    ids: HashSet<Uuid>,
}

/// Shared record collection, keyed by session.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<Inner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-applied batch
    // (mutations are single `extend`/`remove` calls), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add one record. Returns false if its id was ever stored.
    pub fn append(&self, record: MedicationRecord) -> bool {
        self.append_batch(vec![record]) == 1
    }

    /// Add a pipeline run's records in one step.
    ///
    /// Concurrent readers observe either none or all of the batch. Records
    /// whose id was ever stored are skipped; the number added is returned.
    pub fn append_batch(&self, records: Vec<MedicationRecord>) -> usize {
        if records.is_empty() {
            return 0;
        }

        let mut guard = self.write();
        let inner = &mut *guard;
        let mut added = 0;
        for record in records {
            if !inner.ids.insert(record.id) {
                tracing::warn!(id = %record.id, "Duplicate record id skipped");
                continue;
            }
            inner
                .sessions
                .entry(record.session_key.clone())
                .or_default()
                .push(record);
            added += 1;
        }
        added
    }

    /// Snapshot of one session's records in insertion order.
    ///
    /// Unknown keys yield an empty snapshot.
    pub fn list(&self, session_key: &str) -> SessionSnapshot {
        let records = self
            .read()
            .sessions
            .get(session_key)
            .cloned()
            .unwrap_or_default();
        SessionSnapshot { records }
    }

    /// Remove every record of one session.
    ///
    /// The removed ids are not released.
    pub fn clear(&self, session_key: &str) -> ClearOutcome {
        let mut guard = self.write();
        let cleared = guard.sessions.remove(session_key).map_or(0, |r| r.len());
        ClearOutcome {
            cleared,
            remaining: count_all(&guard),
        }
    }

    /// Record count and unit total for one session.
    pub fn aggregate(&self, session_key: &str) -> SessionAggregate {
        self.read()
            .sessions
            .get(session_key)
            .map(SessionAggregate::of)
            .unwrap_or_default()
    }

    /// Records held across all sessions.
    pub fn total_records(&self) -> usize {
        count_all(&self.read())
    }
}

fn count_all(inner: &Inner) -> usize {
    inner.sessions.values().map(Vec::len).sum()
}

// ═══════════════════════════════════════════════════════════
// SessionSnapshot
// ═══════════════════════════════════════════════════════════

/// Owned, re-iterable copy of one session's records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    records: Vec<MedicationRecord>,
}

impl SessionSnapshot {
    pub fn iter(&self) -> std::slice::Iter<'_, MedicationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Totals over exactly the records in this snapshot.
    pub fn aggregate(&self) -> SessionAggregate {
        SessionAggregate::of(&self.records)
    }

    pub fn into_vec(self) -> Vec<MedicationRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a SessionSnapshot {
    type Item = &'a MedicationRecord;
    type IntoIter = std::slice::Iter<'a, MedicationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for SessionSnapshot {
    type Item = MedicationRecord;
    type IntoIter = std::vec::IntoIter<MedicationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;

    pub(crate) fn record(session: &str, name: &str, units: u32) -> MedicationRecord {
        MedicationRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            manufacturer: "Sanofi".to_string(),
            expiry: "12/05/2026".to_string(),
            lot_number: "AB1234".to_string(),
            unit_count: units,
            confidence: 0.9,
            created_at: Utc::now(),
            session_key: session.to_string(),
        }
    }

    #[test]
    fn list_untouched_key_is_empty() {
        let store = SessionStore::new();
        let snapshot = store.list("nobody");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.iter().count(), 0);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = SessionStore::new();
        store.append(record("s1", "Doliprane 1000mg", 8));
        store.append(record("s1", "Spasfon", 10));
        store.append_batch(vec![record("s1", "Smecta", 12), record("s1", "Efferalgan", 4)]);

        let names: Vec<String> = store.list("s1").into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Doliprane 1000mg", "Spasfon", "Smecta", "Efferalgan"]);
    }

    #[test]
    fn snapshot_can_be_iterated_twice() {
        let store = SessionStore::new();
        store.append(record("s1", "A", 1));
        store.append(record("s1", "B", 2));
        let snapshot = store.list("s1");
        let first: Vec<_> = snapshot.iter().map(|r| r.id).collect();
        let second: Vec<_> = (&snapshot).into_iter().map(|r| r.id).collect();
        assert_eq!(first, second);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn append_then_clear_then_list_is_empty() {
        let store = SessionStore::new();
        store.append(record("s1", "A", 1));
        store.append(record("s1", "B", 2));
        assert_eq!(store.clear("s1").cleared, 2);
        assert!(store.list("s1").is_empty());
        assert_eq!(store.aggregate("s1"), SessionAggregate::default());
    }

    #[test]
    fn clear_empty_session_returns_zero() {
        let store = SessionStore::new();
        assert_eq!(store.clear("ghost"), ClearOutcome::default());
        store.append(record("s1", "A", 1));
        assert_eq!(
            store.clear("ghost"),
            ClearOutcome {
                cleared: 0,
                remaining: 1
            }
        );
        assert_eq!(store.list("s1").len(), 1);
    }

    #[test]
    fn clear_only_touches_its_session() {
        let store = SessionStore::new();
        store.append(record("s1", "A", 1));
        store.append(record("s2", "B", 2));
        store.append(record("s2", "C", 3));
        assert_eq!(
            store.clear("s1"),
            ClearOutcome {
                cleared: 1,
                remaining: 2
            }
        );
        assert_eq!(store.list("s2").len(), 2);
        assert_eq!(store.total_records(), 2);
    }

    #[test]
    fn aggregate_matches_records() {
        let store = SessionStore::new();
        let records = vec![record("s1", "A", 8), record("s1", "B", 0), record("s1", "C", 30)];
        let expected_units: u64 = records.iter().map(|r| u64::from(r.unit_count)).sum();
        store.append_batch(records.clone());
        store.append(record("s2", "D", 100));

        let agg = store.aggregate("s1");
        assert_eq!(agg.count, records.len());
        assert_eq!(agg.total_units, expected_units);
        assert_eq!(store.list("s1").aggregate(), agg);
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new();
        store.append(record("pharmacy-a", "A", 1));
        store.append(record("pharmacy-b", "B", 2));
        let a = store.list("pharmacy-a");
        assert_eq!(a.len(), 1);
        assert!(a.iter().all(|r| r.session_key == "pharmacy-a"));
        assert_eq!(store.aggregate("pharmacy-b").total_units, 2);
    }

    #[test]
    fn duplicate_id_is_skipped() {
        let store = SessionStore::new();
        let rec = record("s1", "A", 1);
        assert!(store.append(rec.clone()));
        assert!(!store.append(rec.clone()));
        assert_eq!(store.list("s1").len(), 1);
    }

    #[test]
    fn cleared_ids_are_never_reused() {
        let store = SessionStore::new();
        let rec = record("s1", "A", 1);
        assert!(store.append(rec.clone()));
        store.clear("s1");

        assert!(!store.append(rec.clone()));
        let mut moved = rec;
        moved.session_key = "s2".into();
        assert_eq!(store.append_batch(vec![moved]), 0);
        assert_eq!(store.total_records(), 0);
    }

    #[test]
    fn empty_batch_adds_nothing() {
        let store = SessionStore::new();
        assert_eq!(store.append_batch(Vec::new()), 0);
        assert_eq!(store.total_records(), 0);
    }

    #[test]
    fn concurrent_batches_are_never_partial() {
        let store = Arc::new(SessionStore::new());
        let batch_size = 5;

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let batch = (0..batch_size).map(|i| record("shared", "X", i)).collect();
                        store.append_batch(batch);
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let n = store.list("shared").len();
                    assert_eq!(n % batch_size as usize, 0, "saw a partial batch: {n}");
                    let agg = store.aggregate("shared");
                    assert_eq!(agg.count % batch_size as usize, 0);
                    let snapshot = store.list("shared");
                    let units: u64 = snapshot.iter().map(|r| u64::from(r.unit_count)).sum();
                    assert_eq!(snapshot.aggregate().total_units, units);
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(store.list("shared").len(), 8 * 50 * batch_size as usize);
    }
}
