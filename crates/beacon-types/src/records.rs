//! Record structs tracked by the registry stores and the command queue.
//!
//! Records carry their own identity key alongside the tracked attributes so
//! that a snapshot is self-contained. Timestamps are `chrono` UTC instants
//! supplied by the injected clock -- records never read the system time
//! themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::{PlayerKey, PresenceKey};

/// Where a presence report originated.
///
/// Supplied explicitly by the reporter (or stamped by an upstream admission
/// layer); the registry never infers it from connection metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Reported by an in-game script.
    #[default]
    Script,
    /// Reported by an automated bot.
    Bot,
}

/// A tracked sighting of a transient in-game entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    /// Composite identity of the sighting.
    #[serde(flatten)]
    pub key: PresenceKey,
    /// Player count observed at the sighting, if reported.
    pub players: Option<u32>,
    /// Observed money-per-second rate, if reported.
    pub money_per_sec: Option<f64>,
    /// Origin of the report.
    pub source: Source,
    /// When this identity was first seen. Immutable across upserts.
    pub first_seen: DateTime<Utc>,
    /// When this identity was last refreshed. Non-decreasing.
    pub last_seen: DateTime<Utc>,
    /// Whether the record is fresh (heartbeat within the timeout).
    pub active: bool,
}

/// A tracked player location, refreshed by heartbeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    /// Composite identity of the player sighting.
    #[serde(flatten)]
    pub key: PlayerKey,
    /// Place the player was last seen in, if reported.
    pub place_id: Option<String>,
    /// When this identity was first seen. Immutable across upserts.
    pub first_seen: DateTime<Utc>,
    /// When this identity was last refreshed. Non-decreasing.
    pub last_seen: DateTime<Utc>,
    /// Whether the record is fresh (heartbeat within the timeout).
    pub active: bool,
}

/// A one-shot force-join directive queued for a specific user.
///
/// Delivered to at most one consumer: the first successful consume flips
/// [`executed`](Self::executed) and later consumes see nothing until a new
/// issue overwrites the entry. Executed commands are retained until TTL
/// expiry or explicit cancel so status listings can show recent deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceJoinCommand {
    /// Target username, lowercased.
    pub username: String,
    /// Place the user should join.
    pub place_id: String,
    /// Job (game instance) the user should join.
    pub job_id: String,
    /// Who issued the command.
    pub issuer: String,
    /// When the command was issued.
    pub issued_at: DateTime<Utc>,
    /// Whether the command has been delivered.
    pub executed: bool,
    /// When the command was delivered, if it has been.
    pub executed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn presence_record_serializes_camel_case_with_flat_key() {
        let record = PresenceRecord {
            key: PresenceKey::new("s1", "Noob", "j1").unwrap(),
            players: Some(3),
            money_per_sec: None,
            source: Source::Script,
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            active: true,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["serverId"], "s1");
        assert_eq!(value["name"], "noob");
        assert_eq!(value["jobId"], "j1");
        assert_eq!(value["players"], 3);
        assert_eq!(value["source"], "script");
        assert!(value.get("moneyPerSec").is_some());
    }

    #[test]
    fn source_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&Source::Bot).unwrap(), "\"bot\"");
        let parsed: Source = serde_json::from_str("\"script\"").unwrap();
        assert_eq!(parsed, Source::Script);
    }
}
