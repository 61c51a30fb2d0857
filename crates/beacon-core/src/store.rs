//! Generic TTL registry store with a two-stage expiry state machine.
//!
//! One engine holds both the presence registry and the player-location
//! registry: the record shape differs, the lifecycle does not. A record is
//! created `Active` on first upsert, demoted to `Inactive` once its heartbeat
//! goes silent past the heartbeat timeout, and deleted once the silence
//! exceeds the livetime timeout. Deletion removes the entry; there is no
//! third state.
//!
//! The store owns its map and is constructed with injected configuration and
//! clock -- no ambient state, so tests build as many independent instances
//! as they like. Time-based mutation happens only inside [`RegistryStore::sweep`];
//! every other operation is purely reactive to its caller.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;

use beacon_types::{PlayerKey, PlayerRecord, PresenceKey, PresenceRecord, Source};

use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::evict::select_evictions;
use crate::janitor::SweepStats;

/// Contract a record type must satisfy to live in a [`RegistryStore`].
///
/// `create` and `merge` split the upsert: `create` builds a fresh record
/// (both timestamps set to now, active), `merge` replaces the payload fields
/// of an existing record and nothing else -- the store itself manages
/// `last_seen` and `active` so the lifecycle rules live in one place.
pub trait RegistryRecord: Clone + Serialize {
    /// Composite identity type. Ordering doubles as the eviction tie-break.
    type Key: Ord + Clone;
    /// Payload carried by an upsert.
    type Patch;

    /// Extract the identity from a patch.
    fn key_of(patch: &Self::Patch) -> Self::Key;

    /// Build a brand-new record from a patch.
    fn create(patch: Self::Patch, now: DateTime<Utc>) -> Self;

    /// Replace the payload fields of an existing record. Identity,
    /// `first_seen`, `last_seen`, and `active` are left untouched.
    fn merge(&mut self, patch: Self::Patch);

    /// When this record was last refreshed.
    fn last_seen(&self) -> DateTime<Utc>;

    /// Overwrite the last-refresh instant.
    fn set_last_seen(&mut self, instant: DateTime<Utc>);

    /// Whether the record is in the `Active` state.
    fn active(&self) -> bool;

    /// Move the record between `Active` and `Inactive`.
    fn set_active(&mut self, active: bool);
}

/// TTL-bounded key-value store with per-record active/inactive state.
pub struct RegistryStore<R: RegistryRecord> {
    records: BTreeMap<R::Key, R>,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
}

impl<R: RegistryRecord> RegistryStore<R> {
    /// Create an empty store with the given configuration and clock.
    pub fn new(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: BTreeMap::new(),
            config,
            clock,
        }
    }

    /// Merge a patch into the record with its identity, creating the record
    /// if absent. Returns whether the identity was newly created.
    ///
    /// Sets `last_seen` to now and flips the record back to `Active`;
    /// `first_seen` is preserved on merge and set on create. Never removes
    /// other records -- capacity is enforced by [`sweep`](Self::sweep) only.
    pub fn upsert(&mut self, patch: R::Patch) -> bool {
        let now = self.clock.now();
        match self.records.entry(R::key_of(&patch)) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                // last_seen is non-decreasing even if the clock steps back.
                let floor = record.last_seen().max(now);
                record.merge(patch);
                record.set_last_seen(floor);
                record.set_active(true);
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(R::create(patch, now));
                true
            }
        }
    }

    /// Explicitly demote a record to `Inactive`, refreshing `last_seen` so
    /// the livetime countdown restarts from the leave call. No-op (returning
    /// `false`) if the identity is unknown.
    pub fn mark_inactive(&mut self, key: &R::Key) -> bool {
        let now = self.clock.now();
        self.records.get_mut(key).is_some_and(|record| {
            record.set_active(false);
            record.set_last_seen(record.last_seen().max(now));
            true
        })
    }

    /// Point-in-time clone of all `Active` records, in key order.
    ///
    /// Reflects the state as of the most recent sweep; no demotions happen
    /// during the snapshot itself.
    pub fn snapshot_active(&self) -> Vec<R> {
        self.records
            .values()
            .filter(|record| record.active())
            .cloned()
            .collect()
    }

    /// Clone of every record regardless of state, in key order.
    pub fn all(&self) -> Vec<R> {
        self.records.values().cloned().collect()
    }

    /// Look up a single record.
    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.records.get(key)
    }

    /// Remove all records, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// Current total record count, active and inactive.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Apply the two-stage expiry passes and capacity eviction as one unit.
    ///
    /// 1. Demote `Active` records silent past the heartbeat timeout.
    ///    Automatic demotion does not touch `last_seen`, so the livetime
    ///    countdown keeps running from the last heartbeat.
    /// 2. Delete `Inactive` records silent past the livetime timeout. A
    ///    record demoted in step 1 whose silence already exceeds the
    ///    livetime is deleted in the same sweep.
    /// 3. Evict down to capacity, inactive-first then oldest-first.
    ///
    /// Callers hold one mutable borrow across the whole sweep, so a reader
    /// never observes eviction applied ahead of the transition passes.
    pub fn sweep(&mut self) -> SweepStats {
        let now = self.clock.now();
        let heartbeat = self.config.heartbeat_timeout();
        let livetime = self.config.livetime_timeout();
        let mut stats = SweepStats::default();

        for record in self.records.values_mut() {
            if record.active() && now.signed_duration_since(record.last_seen()) > heartbeat {
                record.set_active(false);
                stats.demoted = stats.demoted.saturating_add(1);
            }
        }

        let before = self.records.len();
        self.records.retain(|_, record| {
            record.active() || now.signed_duration_since(record.last_seen()) <= livetime
        });
        stats.deleted = before.saturating_sub(self.records.len());

        for key in select_evictions(&self.records, self.config.capacity) {
            if self.records.remove(&key).is_some() {
                stats.evicted = stats.evicted.saturating_add(1);
            }
        }

        if !stats.is_noop() {
            trace!(
                demoted = stats.demoted,
                deleted = stats.deleted,
                evicted = stats.evicted,
                remaining = self.records.len(),
                "registry sweep"
            );
        }

        stats
    }
}

// ---------------------------------------------------------------------------
// Record implementations
// ---------------------------------------------------------------------------

/// Upsert payload for the presence registry.
#[derive(Debug, Clone)]
pub struct PresencePatch {
    /// Validated identity of the sighting.
    pub key: PresenceKey,
    /// Reported player count, if any.
    pub players: Option<u32>,
    /// Reported money-per-second rate, if any.
    pub money_per_sec: Option<f64>,
    /// Origin of the report.
    pub source: Source,
}

impl RegistryRecord for PresenceRecord {
    type Key = PresenceKey;
    type Patch = PresencePatch;

    fn key_of(patch: &Self::Patch) -> Self::Key {
        patch.key.clone()
    }

    fn create(patch: Self::Patch, now: DateTime<Utc>) -> Self {
        Self {
            key: patch.key,
            players: patch.players,
            money_per_sec: patch.money_per_sec,
            source: patch.source,
            first_seen: now,
            last_seen: now,
            active: true,
        }
    }

    fn merge(&mut self, patch: Self::Patch) {
        // Full payload replace: an ingest that omits a field clears it.
        self.players = patch.players;
        self.money_per_sec = patch.money_per_sec;
        self.source = patch.source;
    }

    fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    fn set_last_seen(&mut self, instant: DateTime<Utc>) {
        self.last_seen = instant;
    }

    fn active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// Upsert payload for the player-location registry.
#[derive(Debug, Clone)]
pub struct PlayerPatch {
    /// Validated identity of the heartbeat.
    pub key: PlayerKey,
    /// Reported place, if any.
    pub place_id: Option<String>,
}

impl RegistryRecord for PlayerRecord {
    type Key = PlayerKey;
    type Patch = PlayerPatch;

    fn key_of(patch: &Self::Patch) -> Self::Key {
        patch.key.clone()
    }

    fn create(patch: Self::Patch, now: DateTime<Utc>) -> Self {
        Self {
            key: patch.key,
            place_id: patch.place_id,
            first_seen: now,
            last_seen: now,
            active: true,
        }
    }

    fn merge(&mut self, patch: Self::Patch) {
        self.place_id = patch.place_id;
    }

    fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    fn set_last_seen(&mut self, instant: DateTime<Utc>) {
        self.last_seen = instant;
    }

    fn active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use crate::clock::ManualClock;

    use super::*;

    const HEARTBEAT: i64 = 60;
    const LIVETIME: i64 = 180;

    fn test_config(capacity: usize) -> StoreConfig {
        StoreConfig {
            heartbeat_timeout_secs: 60,
            livetime_timeout_secs: 180,
            capacity,
        }
    }

    fn make_store(capacity: usize) -> (Arc<ManualClock>, RegistryStore<PresenceRecord>) {
        let clock = Arc::new(ManualClock::epoch());
        let store = RegistryStore::new(test_config(capacity), Arc::clone(&clock) as Arc<dyn Clock>);
        (clock, store)
    }

    fn patch(name: &str) -> PresencePatch {
        PresencePatch {
            key: PresenceKey::new("s1", name, "j1").unwrap(),
            players: Some(3),
            money_per_sec: None,
            source: Source::Script,
        }
    }

    #[test]
    fn upsert_creates_then_mutates_in_place() {
        let (_clock, mut store) = make_store(10);

        assert!(store.upsert(patch("Noob")));
        assert_eq!(store.len(), 1);

        // Same identity, different payload: no second record.
        let mut second = patch("NOOB");
        second.players = Some(7);
        assert!(!store.upsert(second));
        assert_eq!(store.len(), 1);

        let key = PresenceKey::new("s1", "noob", "j1").unwrap();
        assert_eq!(store.get(&key).unwrap().players, Some(7));
    }

    #[test]
    fn upsert_refreshes_last_seen_and_preserves_first_seen() {
        let (clock, mut store) = make_store(10);
        store.upsert(patch("Noob"));

        let key = PresenceKey::new("s1", "noob", "j1").unwrap();
        let first_seen = store.get(&key).unwrap().first_seen;
        let last_seen = store.get(&key).unwrap().last_seen;

        clock.advance(TimeDelta::seconds(10));
        store.upsert(patch("Noob"));

        let record = store.get(&key).unwrap();
        assert_eq!(record.first_seen, first_seen);
        assert!(record.last_seen > last_seen);
    }

    #[test]
    fn upsert_omitting_fields_clears_them() {
        let (_clock, mut store) = make_store(10);
        store.upsert(patch("Noob"));

        let mut bare = patch("Noob");
        bare.players = None;
        store.upsert(bare);

        let key = PresenceKey::new("s1", "noob", "j1").unwrap();
        assert_eq!(store.get(&key).unwrap().players, None);
    }

    #[test]
    fn two_stage_expiry() {
        let (clock, mut store) = make_store(10);
        store.upsert(patch("Noob"));
        let key = PresenceKey::new("s1", "noob", "j1").unwrap();

        // Inside the heartbeat window: still active.
        clock.advance(TimeDelta::seconds(HEARTBEAT));
        store.sweep();
        assert!(store.get(&key).unwrap().active);

        // Past the heartbeat, inside the livetime: inactive but present.
        clock.advance(TimeDelta::seconds(1));
        let stats = store.sweep();
        assert_eq!(stats.demoted, 1);
        let record = store.get(&key).unwrap();
        assert!(!record.active);
        assert!(store.snapshot_active().is_empty());
        assert_eq!(store.all().len(), 1);

        // Past the livetime: gone.
        clock.advance(TimeDelta::seconds(LIVETIME));
        let stats = store.sweep();
        assert_eq!(stats.deleted, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn active_record_past_livetime_is_deleted_in_one_sweep() {
        let (clock, mut store) = make_store(10);
        store.upsert(patch("Noob"));

        clock.advance(TimeDelta::seconds(LIVETIME.checked_add(1).unwrap()));
        let stats = store.sweep();
        assert_eq!(stats.demoted, 1);
        assert_eq!(stats.deleted, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn fresh_upsert_reactivates_demoted_record() {
        let (clock, mut store) = make_store(10);
        store.upsert(patch("Noob"));
        let key = PresenceKey::new("s1", "noob", "j1").unwrap();

        clock.advance(TimeDelta::seconds(HEARTBEAT.checked_add(1).unwrap()));
        store.sweep();
        assert!(!store.get(&key).unwrap().active);

        // The entity reappeared.
        store.upsert(patch("Noob"));
        let record = store.get(&key).unwrap();
        assert!(record.active);
        // Same lifecycle: first_seen survives because the record was never
        // deleted.
        assert_eq!(record.first_seen, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn reappearance_after_deletion_is_a_fresh_record() {
        let (clock, mut store) = make_store(10);
        store.upsert(patch("Noob"));
        let key = PresenceKey::new("s1", "noob", "j1").unwrap();

        clock.advance(TimeDelta::seconds(LIVETIME.checked_add(1).unwrap()));
        store.sweep();
        assert!(store.is_empty());

        store.upsert(patch("Noob"));
        let record = store.get(&key).unwrap();
        assert!(record.active);
        assert_eq!(record.first_seen, clock.now());
    }

    #[test]
    fn mark_inactive_is_explicit_leave() {
        let (clock, mut store) = make_store(10);
        store.upsert(patch("Noob"));
        let key = PresenceKey::new("s1", "noob", "j1").unwrap();

        clock.advance(TimeDelta::seconds(5));
        assert!(store.mark_inactive(&key));
        let record = store.get(&key).unwrap();
        assert!(!record.active);
        // Leave refreshes last_seen so the livetime countdown restarts.
        assert_eq!(record.last_seen, clock.now());

        // Unknown identity is a no-op, not an error.
        let missing = PresenceKey::new("s1", "ghost", "j1").unwrap();
        assert!(!store.mark_inactive(&missing));
    }

    #[test]
    fn snapshot_active_is_key_ordered_and_excludes_inactive() {
        let (_clock, mut store) = make_store(10);
        store.upsert(patch("charlie"));
        store.upsert(patch("alpha"));
        store.upsert(patch("bravo"));

        let bravo = PresenceKey::new("s1", "bravo", "j1").unwrap();
        store.mark_inactive(&bravo);

        let names: Vec<String> = store
            .snapshot_active()
            .into_iter()
            .map(|r| r.key.name)
            .collect();
        assert_eq!(names, vec!["alpha".to_owned(), "charlie".to_owned()]);
    }

    #[test]
    fn eviction_prefers_inactive_then_oldest() {
        let (clock, mut store) = make_store(3);

        // Five records with distinct last_seen, oldest first.
        for name in ["a", "b", "c", "d", "e"] {
            store.upsert(patch(name));
            clock.advance(TimeDelta::seconds(1));
        }
        // Demote "e" (the freshest) explicitly: inactive goes first anyway.
        let e_key = PresenceKey::new("s1", "e", "j1").unwrap();
        store.mark_inactive(&e_key);

        let stats = store.sweep();
        assert_eq!(stats.evicted, 2);
        assert_eq!(store.len(), 3);

        // "e" (inactive) went first, then "a" (oldest active).
        assert!(store.get(&e_key).is_none());
        assert!(store
            .get(&PresenceKey::new("s1", "a", "j1").unwrap())
            .is_none());
        for survivor in ["b", "c", "d"] {
            assert!(store
                .get(&PresenceKey::new("s1", survivor, "j1").unwrap())
                .is_some());
        }
    }

    #[test]
    fn capacity_overflow_drops_oldest_active() {
        let (clock, mut store) = make_store(2);
        for name in ["a", "b", "c", "d"] {
            store.upsert(patch(name));
            clock.advance(TimeDelta::seconds(1));
        }

        // Upsert alone never evicts.
        assert_eq!(store.len(), 4);

        let stats = store.sweep();
        assert_eq!(stats.evicted, 2);
        assert_eq!(store.len(), 2);
        assert!(store
            .get(&PresenceKey::new("s1", "a", "j1").unwrap())
            .is_none());
        assert!(store
            .get(&PresenceKey::new("s1", "b", "j1").unwrap())
            .is_none());
    }

    #[test]
    fn clear_reports_count() {
        let (_clock, mut store) = make_store(10);
        store.upsert(patch("a"));
        store.upsert(patch("b"));
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(store.clear(), 0);
    }

    #[test]
    fn sweep_is_idempotent() {
        let (clock, mut store) = make_store(10);
        store.upsert(patch("Noob"));
        clock.advance(TimeDelta::seconds(HEARTBEAT.checked_add(1).unwrap()));

        let first = store.sweep();
        assert_eq!(first.demoted, 1);
        let second = store.sweep();
        assert!(second.is_noop());
    }

    #[test]
    fn player_store_shares_the_engine() {
        let clock = Arc::new(ManualClock::epoch());
        let mut store: RegistryStore<PlayerRecord> =
            RegistryStore::new(test_config(10), Arc::clone(&clock) as Arc<dyn Clock>);

        let key = PlayerKey::new("Alice", "s1", "j1").unwrap();
        assert!(store.upsert(PlayerPatch {
            key: key.clone(),
            place_id: Some("place-9".to_owned()),
        }));
        assert!(!store.upsert(PlayerPatch {
            key: key.clone(),
            place_id: None,
        }));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key).unwrap().place_id, None);

        clock.advance(TimeDelta::seconds(LIVETIME.checked_add(1).unwrap()));
        store.sweep();
        assert!(store.is_empty());
    }
}
