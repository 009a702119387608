//! Merge server-confirmed mutation results into the cached collection.
//!
//! The collection is held newest date first, as the store returns it. These
//! functions patch it in place after a response arrives and never re-sort it.

use tracing::{debug, warn};

use crate::models::HealthRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The element at this index was replaced.
    Replaced(usize),
    /// A new element was inserted at this index.
    Inserted(usize),
    /// The element previously at this index was removed.
    Removed(usize),
    Unchanged,
}

/// Apply the result of a full-field update. The element keeps its position.
///
/// An update result whose id is not cached means the cache and the store
/// disagree; it is logged and ignored until the next full load.
pub fn apply_update(records: &mut [HealthRecord], updated: HealthRecord) -> Reconciled {
    if let Some(idx) = records.iter().position(|r| r.id == updated.id) {
        records[idx] = updated;
        Reconciled::Replaced(idx)
    } else {
        warn!(id = %updated.id, "update result does not match any cached record");
        Reconciled::Unchanged
    }
}

/// Apply the result of a create-or-update (upsert keyed by date).
///
/// Matching id or matching date replaces in place. Otherwise the record is
/// inserted before the first cached record with an older date, which is the
/// front of the collection for today's entry.
pub fn apply_upsert(records: &mut Vec<HealthRecord>, stored: HealthRecord) -> Reconciled {
    let existing = records
        .iter()
        .position(|r| r.id == stored.id)
        .or_else(|| records.iter().position(|r| r.date == stored.date));

    if let Some(idx) = existing {
        debug!(id = %stored.id, idx, "upsert replaced cached record");
        records[idx] = stored;
        return Reconciled::Replaced(idx);
    }

    let idx = records.partition_point(|r| r.date > stored.date);
    debug!(id = %stored.id, idx, "upsert inserted new record");
    records.insert(idx, stored);
    Reconciled::Inserted(idx)
}

/// Apply a confirmed delete. A missing id is a no-op.
pub fn apply_delete(records: &mut Vec<HealthRecord>, id: &str) -> Reconciled {
    match records.iter().position(|r| r.id == id) {
        Some(idx) => {
            records.remove(idx);
            Reconciled::Removed(idx)
        }
        None => Reconciled::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(id: &str, day: u32, morning: f64) -> HealthRecord {
        HealthRecord {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            morning_weight: morning,
            evening_weight: morning + 1.0,
            has_bm: false,
            bm_count: 0,
            notes: None,
        }
    }

    /// Newest first, as loaded from the store.
    fn cached() -> Vec<HealthRecord> {
        vec![rec("c", 5, 130.0), rec("b", 3, 131.0), rec("a", 1, 132.0)]
    }

    fn ids(records: &[HealthRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_update_replaces_exactly_one() {
        let mut records = cached();
        let result = apply_update(&mut records, rec("b", 3, 125.0));
        assert_eq!(result, Reconciled::Replaced(1));
        assert_eq!(records.len(), 3);
        assert!((records[1].morning_weight - 125.0).abs() < f64::EPSILON);
        assert!((records[0].morning_weight - 130.0).abs() < f64::EPSILON);
        assert!((records[2].morning_weight - 132.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_unknown_id_is_ignored() {
        let mut records = cached();
        let result = apply_update(&mut records, rec("zzz", 9, 100.0));
        assert_eq!(result, Reconciled::Unchanged);
        assert_eq!(records, cached());
    }

    #[test]
    fn test_upsert_new_latest_date_prepends() {
        let mut records = cached();
        let result = apply_upsert(&mut records, rec("d", 6, 129.0));
        assert_eq!(result, Reconciled::Inserted(0));
        assert_eq!(ids(&records), ["d", "c", "b", "a"]);
    }

    #[test]
    fn test_upsert_back_dated_keeps_order() {
        let mut records = cached();
        let result = apply_upsert(&mut records, rec("d", 4, 129.0));
        assert_eq!(result, Reconciled::Inserted(1));
        assert_eq!(ids(&records), ["c", "d", "b", "a"]);

        apply_upsert(&mut records, rec("e", 2, 129.0));
        assert_eq!(ids(&records), ["c", "d", "b", "e", "a"]);
    }

    #[test]
    fn test_upsert_existing_id_replaces_in_place() {
        let mut records = cached();
        let result = apply_upsert(&mut records, rec("b", 3, 120.0));
        assert_eq!(result, Reconciled::Replaced(1));
        assert_eq!(records.len(), 3);
        assert!((records[1].morning_weight - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_upsert_same_date_conflict_replaces_prior_entry() {
        let mut records = cached();
        let result = apply_upsert(&mut records, rec("b2", 3, 119.0));
        assert_eq!(result, Reconciled::Replaced(1));
        assert_eq!(ids(&records), ["c", "b2", "a"]);
    }

    #[test]
    fn test_upsert_into_empty() {
        let mut records = Vec::new();
        assert_eq!(
            apply_upsert(&mut records, rec("a", 1, 130.0)),
            Reconciled::Inserted(0)
        );
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_delete_present_and_absent() {
        let mut records = cached();
        assert_eq!(apply_delete(&mut records, "b"), Reconciled::Removed(1));
        assert_eq!(ids(&records), ["c", "a"]);

        assert_eq!(apply_delete(&mut records, "b"), Reconciled::Unchanged);
        assert_eq!(records.len(), 2);
    }
}
