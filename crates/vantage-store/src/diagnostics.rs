// ── Emission tracking (diagnostics) ──
//
// Records the status transitions one subscription observed, for devtools
// and correctness inspection of cache and optimistic-update behavior.
// Off the production data path entirely: nothing reads these records at
// runtime.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::emission::{OptimisticId, QuerySnapshot, Status};
use crate::subscription::lock;

/// One observed emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionRecord {
    pub timestamp: DateTime<Utc>,
    pub status: Status,
    pub has_data: bool,
    pub is_optimistic: bool,
    pub optimistic_id: Option<OptimisticId>,
    pub sequence: u64,
}

/// Per-subscription emission log.
#[derive(Debug, Default)]
pub struct EmissionTracker {
    records: Mutex<Vec<EmissionRecord>>,
}

impl EmissionTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, snapshot: &QuerySnapshot) {
        lock(&self.records).push(EmissionRecord {
            timestamp: Utc::now(),
            status: snapshot.status,
            has_data: snapshot.has_data(),
            is_optimistic: snapshot.is_optimistic,
            optimistic_id: snapshot.optimistic_id.clone(),
            sequence: snapshot.sequence,
        });
    }

    /// Everything observed so far, oldest first.
    pub fn records(&self) -> Vec<EmissionRecord> {
        lock(&self.records).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }

    /// True when sequence numbers strictly increased across the log.
    pub fn sequences_ordered(&self) -> bool {
        let records = lock(&self.records);
        records
            .windows(2)
            .all(|pair| pair[1].sequence > pair[0].sequence)
    }

    /// Statuses in observation order, for terse test assertions.
    pub fn statuses(&self) -> Vec<Status> {
        lock(&self.records).iter().map(|r| r.status).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emission::QueryValue;
    use std::sync::Arc;

    fn snapshot(status: Status, sequence: u64, key: &crate::CacheKey) -> QuerySnapshot {
        QuerySnapshot {
            key: key.clone(),
            status,
            value: matches!(status, Status::Loaded)
                .then(|| QueryValue::Object(Arc::new(serde_json::json!({"ok": true})))),
            error: None,
            is_optimistic: false,
            optimistic_id: None,
            sequence,
            last_updated: Utc::now(),
        }
    }

    fn test_key() -> crate::CacheKey {
        let keys = crate::keys::CacheKeys::new();
        keys.get(crate::keys::KeySpec::Object {
            object_type: "Employee".into(),
            primary_key: "1".into(),
        })
    }

    #[test]
    fn records_status_and_data_presence() {
        let tracker = EmissionTracker::new();
        let key = test_key();
        tracker.record(&snapshot(Status::Init, 0, &key));
        tracker.record(&snapshot(Status::Loaded, 1, &key));

        let records = tracker.records();
        assert_eq!(records.len(), 2);
        assert!(!records[0].has_data);
        assert!(records[1].has_data);
        assert!(tracker.sequences_ordered());
    }

    #[test]
    fn detects_out_of_order_sequences() {
        let tracker = EmissionTracker::new();
        let key = test_key();
        tracker.record(&snapshot(Status::Loaded, 2, &key));
        tracker.record(&snapshot(Status::Loaded, 1, &key));
        assert!(!tracker.sequences_ordered());
    }
}
