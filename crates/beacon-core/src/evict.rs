//! Pure capacity-eviction policy.
//!
//! Given a store's records and a capacity, select which identities to remove
//! so that exactly `capacity` records remain. Ordering is deterministic:
//! inactive records are always evicted before active ones, within each group
//! the oldest `last_seen` goes first, and ties fall back to key order.
//!
//! The policy only selects; the sweep applies. Keeping it pure makes the
//! priority ordering testable without a store or a clock.

use std::collections::BTreeMap;

use crate::store::RegistryRecord;

/// Select the identities to evict to bring `records` down to `capacity`.
///
/// Returns an empty vector when the store is within capacity. The returned
/// keys are in eviction order (first entry is evicted first), though the
/// sweep removes them all at once.
pub fn select_evictions<R: RegistryRecord>(
    records: &BTreeMap<R::Key, R>,
    capacity: usize,
) -> Vec<R::Key> {
    let overflow = records.len().saturating_sub(capacity);
    if overflow == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<(&R::Key, &R)> = records.iter().collect();
    // BTreeMap iteration is key-ordered and the sort is stable, so equal
    // (active, last_seen) pairs keep key order as the final tie-break.
    candidates.sort_by(|(_, a), (_, b)| {
        a.active()
            .cmp(&b.active())
            .then_with(|| a.last_seen().cmp(&b.last_seen()))
    });

    candidates
        .into_iter()
        .take(overflow)
        .map(|(key, _)| key.clone())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};

    use beacon_types::{PresenceKey, PresenceRecord, Source};

    use super::*;

    fn record(name: &str, active: bool, seen_offset_secs: i64) -> (PresenceKey, PresenceRecord) {
        let key = PresenceKey::new("s1", name, "j1").unwrap();
        let seen = DateTime::<Utc>::UNIX_EPOCH
            .checked_add_signed(TimeDelta::seconds(seen_offset_secs))
            .unwrap();
        let record = PresenceRecord {
            key: key.clone(),
            players: None,
            money_per_sec: None,
            source: Source::Script,
            first_seen: seen,
            last_seen: seen,
            active,
        };
        (key, record)
    }

    fn map(entries: Vec<(PresenceKey, PresenceRecord)>) -> BTreeMap<PresenceKey, PresenceRecord> {
        entries.into_iter().collect()
    }

    #[test]
    fn within_capacity_selects_nothing() {
        let records = map(vec![record("a", true, 0), record("b", true, 1)]);
        assert!(select_evictions(&records, 2).is_empty());
        assert!(select_evictions(&records, 5).is_empty());
    }

    #[test]
    fn inactive_evicted_before_any_active() {
        // The inactive record is the freshest, but still goes first.
        let records = map(vec![
            record("old-active", true, 0),
            record("fresh-inactive", false, 100),
            record("mid-active", true, 50),
        ]);
        let evicted = select_evictions(&records, 2);
        assert_eq!(
            evicted,
            vec![PresenceKey::new("s1", "fresh-inactive", "j1").unwrap()]
        );
    }

    #[test]
    fn oldest_last_seen_first_within_group() {
        let records = map(vec![
            record("a", true, 30),
            record("b", true, 10),
            record("c", true, 20),
        ]);
        let evicted = select_evictions(&records, 1);
        assert_eq!(
            evicted,
            vec![
                PresenceKey::new("s1", "b", "j1").unwrap(),
                PresenceKey::new("s1", "c", "j1").unwrap(),
            ]
        );
    }

    #[test]
    fn equal_timestamps_break_ties_by_key_order() {
        let records = map(vec![
            record("zulu", true, 0),
            record("alpha", true, 0),
            record("mike", true, 0),
        ]);
        let evicted = select_evictions(&records, 1);
        assert_eq!(
            evicted,
            vec![
                PresenceKey::new("s1", "alpha", "j1").unwrap(),
                PresenceKey::new("s1", "mike", "j1").unwrap(),
            ]
        );
    }

    #[test]
    fn mixed_groups_exhaust_inactive_then_oldest_active() {
        let records = map(vec![
            record("ia", false, 90),
            record("ib", false, 10),
            record("aa", true, 5),
            record("ab", true, 50),
        ]);
        let evicted = select_evictions(&records, 1);
        assert_eq!(
            evicted,
            vec![
                PresenceKey::new("s1", "ib", "j1").unwrap(),
                PresenceKey::new("s1", "ia", "j1").unwrap(),
                PresenceKey::new("s1", "aa", "j1").unwrap(),
            ]
        );
    }
}
