//! Force-join command queue with at-most-once delivery.
//!
//! An operator issues a command per target username; the first consume after
//! the issue gets the payload, every later consume sees nothing until a new
//! issue overwrites the entry. Executed commands are retained (not deleted)
//! until their TTL expires or they are cancelled, so a status listing can
//! show recently-delivered commands.
//!
//! Expiry and capacity eviction run in the sweep, keyed purely on age --
//! the queue has no active/inactive distinction.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;

use beacon_types::{normalize_username, require_field, ForceJoinCommand};

use crate::clock::Clock;
use crate::config::QueueConfig;
use crate::error::RegistryError;
use crate::janitor::SweepStats;

/// A command with its derived remaining lifetime, for status listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandStatus {
    /// The command itself.
    #[serde(flatten)]
    pub command: ForceJoinCommand,
    /// Seconds until the command expires, clamped at zero.
    pub seconds_remaining: u64,
}

/// TTL-keyed store of pending force-join directives.
pub struct CommandQueue {
    commands: BTreeMap<String, ForceJoinCommand>,
    config: QueueConfig,
    clock: Arc<dyn Clock>,
}

impl CommandQueue {
    /// Create an empty queue with the given configuration and clock.
    pub fn new(config: QueueConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            commands: BTreeMap::new(),
            config,
            clock,
        }
    }

    /// Queue a command for each target username, overwriting any existing
    /// entry (pending or executed) per user. Returns how many commands were
    /// queued after username normalization and deduplication.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyTargets`] for an empty target list, or
    /// a validation error if any username, the place, or the job is blank.
    /// A rejected call queues nothing, even when other targets in the same
    /// call were valid.
    pub fn issue(
        &mut self,
        usernames: &[String],
        place_id: &str,
        job_id: &str,
        issuer: Option<&str>,
    ) -> Result<usize, RegistryError> {
        if usernames.is_empty() {
            return Err(RegistryError::EmptyTargets);
        }
        let place_id = require_field(place_id, "placeId")?;
        let job_id = require_field(job_id, "jobId")?;
        let issuer = issuer
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("operator")
            .to_owned();

        // Validate every target before touching the map: a rejected call
        // must leave the queue exactly as it found it.
        let targets = usernames
            .iter()
            .map(|raw| normalize_username(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let now = self.clock.now();
        let mut queued = 0_usize;
        for username in targets {
            let command = ForceJoinCommand {
                username: username.clone(),
                place_id: place_id.clone(),
                job_id: job_id.clone(),
                issuer: issuer.clone(),
                issued_at: now,
                executed: false,
                executed_at: None,
            };
            // Duplicate usernames in one call collapse to one entry.
            self.commands.insert(username, command);
            queued = queued.saturating_add(1);
        }
        Ok(queued)
    }

    /// Atomically deliver the pending command for a username, if any.
    ///
    /// Returns the payload on the first consume after an issue and marks the
    /// command executed; returns `None` if the username has no command or
    /// its command was already delivered. A miss is a negative result, never
    /// an error.
    pub fn consume(&mut self, username: &str) -> Option<ForceJoinCommand> {
        let username = normalize_username(username).ok()?;
        let now = self.clock.now();
        match self.commands.entry(username) {
            Entry::Occupied(mut occupied) => {
                let command = occupied.get_mut();
                if command.executed {
                    return None;
                }
                command.executed = true;
                command.executed_at = Some(now);
                Some(command.clone())
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Remove the command for a username. Returns whether one existed.
    pub fn cancel(&mut self, username: &str) -> bool {
        normalize_username(username)
            .ok()
            .is_some_and(|username| self.commands.remove(&username).is_some())
    }

    /// All commands (pending and executed) with their remaining lifetimes,
    /// in username order.
    pub fn status(&self) -> Vec<CommandStatus> {
        let now = self.clock.now();
        self.commands
            .values()
            .map(|command| CommandStatus {
                command: command.clone(),
                seconds_remaining: self
                    .config
                    .ttl_secs
                    .saturating_sub(elapsed_secs(command.issued_at, now)),
            })
            .collect()
    }

    /// Current command count, pending and executed.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the queue holds no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Configured TTL in seconds, for issue responses.
    pub const fn ttl_secs(&self) -> u64 {
        self.config.ttl_secs
    }

    /// Expire commands past their TTL, then evict oldest-`issued_at`-first
    /// down to capacity. Same shape as the registry sweep but keyed only on
    /// age.
    pub fn sweep(&mut self) -> SweepStats {
        let now = self.clock.now();
        let ttl = self.config.ttl();
        let mut stats = SweepStats::default();

        let before = self.commands.len();
        self.commands
            .retain(|_, command| now.signed_duration_since(command.issued_at) <= ttl);
        stats.deleted = before.saturating_sub(self.commands.len());

        let overflow = self.commands.len().saturating_sub(self.config.capacity);
        if overflow > 0 {
            let mut candidates: Vec<(String, DateTime<Utc>)> = self
                .commands
                .iter()
                .map(|(username, command)| (username.clone(), command.issued_at))
                .collect();
            // Stable sort over username-ordered entries: equal issue times
            // fall back to username order.
            candidates.sort_by_key(|(_, issued_at)| *issued_at);
            for (username, _) in candidates.into_iter().take(overflow) {
                if self.commands.remove(&username).is_some() {
                    stats.evicted = stats.evicted.saturating_add(1);
                }
            }
        }

        if !stats.is_noop() {
            trace!(
                deleted = stats.deleted,
                evicted = stats.evicted,
                remaining = self.commands.len(),
                "command queue sweep"
            );
        }

        stats
    }
}

/// Whole seconds elapsed between two instants, clamped at zero.
fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from(to.signed_duration_since(from).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use crate::clock::ManualClock;

    use super::*;

    fn make_queue(ttl_secs: u64, capacity: usize) -> (Arc<ManualClock>, CommandQueue) {
        let clock = Arc::new(ManualClock::epoch());
        let queue = CommandQueue::new(
            QueueConfig { ttl_secs, capacity },
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (clock, queue)
    }

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn at_most_once_delivery() {
        let (_clock, mut queue) = make_queue(300, 10);
        queue
            .issue(&targets(&["alice"]), "place-1", "job-1", Some("op"))
            .unwrap();

        let delivered = queue.consume("Alice").unwrap();
        assert_eq!(delivered.place_id, "place-1");
        assert_eq!(delivered.job_id, "job-1");
        assert_eq!(delivered.issuer, "op");

        // Second consume before a new issue: nothing.
        assert!(queue.consume("alice").is_none());
        // The executed command is retained for status visibility.
        assert_eq!(queue.len(), 1);
        assert!(queue.status().first().unwrap().command.executed);
    }

    #[test]
    fn reissue_overwrites_pending_payload() {
        let (_clock, mut queue) = make_queue(300, 10);
        queue
            .issue(&targets(&["alice"]), "place-1", "job-1", None)
            .unwrap();
        queue
            .issue(&targets(&["alice"]), "place-2", "job-2", None)
            .unwrap();

        assert_eq!(queue.len(), 1);
        let delivered = queue.consume("alice").unwrap();
        assert_eq!(delivered.place_id, "place-2");
    }

    #[test]
    fn reissue_after_delivery_rearms() {
        let (_clock, mut queue) = make_queue(300, 10);
        queue
            .issue(&targets(&["alice"]), "place-1", "job-1", None)
            .unwrap();
        assert!(queue.consume("alice").is_some());
        assert!(queue.consume("alice").is_none());

        queue
            .issue(&targets(&["alice"]), "place-3", "job-3", None)
            .unwrap();
        let delivered = queue.consume("alice").unwrap();
        assert_eq!(delivered.place_id, "place-3");
    }

    #[test]
    fn issue_validates_input() {
        let (_clock, mut queue) = make_queue(300, 10);

        assert!(matches!(
            queue.issue(&[], "place", "job", None),
            Err(RegistryError::EmptyTargets)
        ));
        assert!(queue.issue(&targets(&["  "]), "place", "job", None).is_err());
        assert!(queue.issue(&targets(&["alice"]), " ", "job", None).is_err());
        assert!(queue
            .issue(&targets(&["alice"]), "place", "", None)
            .is_err());
        // Nothing was queued by the failed calls.
        assert!(queue.is_empty());
    }

    #[test]
    fn rejected_issue_queues_no_valid_targets() {
        let (_clock, mut queue) = make_queue(300, 10);

        // One valid target alongside a blank one: all-or-nothing.
        assert!(queue
            .issue(&targets(&["alice", "   "]), "place", "job", None)
            .is_err());
        assert!(queue.is_empty());
        assert!(queue.consume("alice").is_none());

        // An existing pending command survives a later rejected call intact.
        queue
            .issue(&targets(&["alice"]), "place-1", "job-1", None)
            .unwrap();
        assert!(queue
            .issue(&targets(&["alice", ""]), "place-2", "job-2", None)
            .is_err());
        let delivered = queue.consume("alice").unwrap();
        assert_eq!(delivered.place_id, "place-1");
    }

    #[test]
    fn issue_fans_out_and_dedupes() {
        let (_clock, mut queue) = make_queue(300, 10);
        let queued = queue
            .issue(&targets(&["alice", "Bob", "ALICE"]), "p", "j", None)
            .unwrap();
        assert_eq!(queued, 3);
        assert_eq!(queue.len(), 2);
        assert!(queue.consume("bob").is_some());
    }

    #[test]
    fn cancel_reports_existence() {
        let (_clock, mut queue) = make_queue(300, 10);
        queue.issue(&targets(&["alice"]), "p", "j", None).unwrap();

        assert!(queue.cancel("ALICE"));
        assert!(!queue.cancel("alice"));
        assert!(queue.consume("alice").is_none());
    }

    #[test]
    fn ttl_expiry_in_sweep() {
        let (clock, mut queue) = make_queue(60, 10);
        queue.issue(&targets(&["alice"]), "p", "j", None).unwrap();

        clock.advance(TimeDelta::seconds(60));
        assert!(queue.sweep().is_noop());
        assert_eq!(queue.len(), 1);

        clock.advance(TimeDelta::seconds(1));
        let stats = queue.sweep();
        assert_eq!(stats.deleted, 1);
        assert!(queue.is_empty());
        assert!(queue.consume("alice").is_none());
    }

    #[test]
    fn capacity_evicts_oldest_issued_first() {
        let (clock, mut queue) = make_queue(300, 2);
        queue.issue(&targets(&["alice"]), "p", "j", None).unwrap();
        clock.advance(TimeDelta::seconds(1));
        queue.issue(&targets(&["bob"]), "p", "j", None).unwrap();
        clock.advance(TimeDelta::seconds(1));
        queue.issue(&targets(&["carol"]), "p", "j", None).unwrap();

        let stats = queue.sweep();
        assert_eq!(stats.evicted, 1);
        assert!(queue.consume("alice").is_none());
        assert!(queue.consume("bob").is_some());
        assert!(queue.consume("carol").is_some());
    }

    #[test]
    fn status_reports_remaining_seconds() {
        let (clock, mut queue) = make_queue(300, 10);
        queue.issue(&targets(&["alice"]), "p", "j", None).unwrap();

        clock.advance(TimeDelta::seconds(40));
        let status = queue.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status.first().unwrap().seconds_remaining, 260);

        // Past expiry but before the sweep: clamped at zero, not negative.
        clock.advance(TimeDelta::seconds(400));
        assert_eq!(queue.status().first().unwrap().seconds_remaining, 0);
    }

    #[test]
    fn status_serializes_flat_camel_case() {
        let (_clock, mut queue) = make_queue(300, 10);
        queue
            .issue(&targets(&["alice"]), "p", "j", Some("op"))
            .unwrap();

        let value = serde_json::to_value(queue.status()).unwrap();
        let first = value.get(0).unwrap();
        assert_eq!(first["username"], "alice");
        assert_eq!(first["placeId"], "p");
        assert_eq!(first["secondsRemaining"], 300);
        assert_eq!(first["executed"], false);
    }
}
