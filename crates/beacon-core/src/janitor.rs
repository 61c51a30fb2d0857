//! Sweep statistics and the sweep contract.
//!
//! A sweep is the single place where time-based mutation happens: demote
//! stale active records, delete stale inactive records, then evict down to
//! capacity -- in that order, under one mutable borrow, so readers never
//! observe a half-applied sweep. The stores implement the sweep themselves
//! ([`RegistryStore::sweep`](crate::store::RegistryStore::sweep),
//! [`CommandQueue::sweep`](crate::commands::CommandQueue::sweep)); this
//! module holds the shared bookkeeping.
//!
//! Sweeps are idempotent and infallible. The driver (a timer task in the
//! shipped binary, or an inline call before reads in eager mode) just calls
//! them again on the next tick.

use serde::Serialize;

/// Counters describing what one sweep changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Active records demoted to inactive (heartbeat timeout).
    pub demoted: usize,
    /// Inactive records deleted (livetime timeout), including expired
    /// commands in the queue.
    pub deleted: usize,
    /// Records removed by capacity eviction.
    pub evicted: usize,
}

impl SweepStats {
    /// Total records touched by the sweep.
    pub const fn total(&self) -> usize {
        self.demoted
            .saturating_add(self.deleted)
            .saturating_add(self.evicted)
    }

    /// Whether the sweep changed anything.
    pub const fn is_noop(&self) -> bool {
        self.total() == 0
    }

    /// Combine counters from sweeps over several stores.
    pub const fn merged(self, other: Self) -> Self {
        Self {
            demoted: self.demoted.saturating_add(other.demoted),
            deleted: self.deleted.saturating_add(other.deleted),
            evicted: self.evicted.saturating_add(other.evicted),
        }
    }
}
