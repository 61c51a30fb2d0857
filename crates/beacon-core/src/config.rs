//! Typed configuration for the registry engine.
//!
//! The deployment chooses a handful of constants: per-store timeouts and
//! capacities, the command TTL, the sweep interval, and the consistency
//! mode. Structs here are plain serde targets with defaults; how they are
//! populated (environment variables in the shipped binary) is the caller's
//! concern.

use chrono::TimeDelta;
use serde::Deserialize;

use crate::error::RegistryError;

/// When expiry transitions become visible to readers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    /// Sweep synchronously before every read. A read never observes a
    /// record that is logically expired.
    Eager,
    /// Sweep only on the background timer. Reads may observe expired but
    /// unswept records, bounded by the sweep interval.
    #[default]
    Lazy,
}

/// Timeouts and capacity for one registry store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Max silence in seconds before an active record is demoted to inactive.
    pub heartbeat_timeout_secs: u64,
    /// Max silence in seconds before an inactive record is deleted.
    /// Must be strictly greater than `heartbeat_timeout_secs`.
    pub livetime_timeout_secs: u64,
    /// Max records the store may hold immediately after a sweep.
    pub capacity: usize,
}

impl StoreConfig {
    /// Heartbeat timeout as a time delta.
    pub fn heartbeat_timeout(&self) -> TimeDelta {
        delta_secs(self.heartbeat_timeout_secs)
    }

    /// Livetime timeout as a time delta.
    pub fn livetime_timeout(&self) -> TimeDelta {
        delta_secs(self.livetime_timeout_secs)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidConfig`] if the livetime timeout does
    /// not exceed the heartbeat timeout (a record must go inactive before it
    /// can be deleted) or the capacity is zero.
    pub fn validate(&self, store: &str) -> Result<(), RegistryError> {
        if self.livetime_timeout_secs <= self.heartbeat_timeout_secs {
            return Err(RegistryError::InvalidConfig {
                reason: format!(
                    "{store}: livetime_timeout_secs ({}) must exceed heartbeat_timeout_secs ({})",
                    self.livetime_timeout_secs, self.heartbeat_timeout_secs
                ),
            });
        }
        if self.capacity == 0 {
            return Err(RegistryError::InvalidConfig {
                reason: format!("{store}: capacity must be at least 1"),
            });
        }
        Ok(())
    }
}

/// TTL and capacity for the force-join command queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueueConfig {
    /// Seconds a command stays deliverable (and visible) after issue.
    pub ttl_secs: u64,
    /// Max pending/executed commands retained.
    pub capacity: usize,
}

impl QueueConfig {
    /// Command TTL as a time delta.
    pub fn ttl(&self) -> TimeDelta {
        delta_secs(self.ttl_secs)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidConfig`] if the capacity is zero.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.capacity == 0 {
            return Err(RegistryError::InvalidConfig {
                reason: "force_join: capacity must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    /// Presence store timeouts and capacity.
    #[serde(default = "RegistryConfig::default_presence")]
    pub presence: StoreConfig,
    /// Player store timeouts and capacity.
    #[serde(default = "RegistryConfig::default_players")]
    pub players: StoreConfig,
    /// Force-join queue TTL and capacity.
    #[serde(default = "RegistryConfig::default_force_join")]
    pub force_join: QueueConfig,
    /// Background sweep period in milliseconds.
    #[serde(default = "RegistryConfig::default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Whether reads sweep inline or rely on the timer.
    #[serde(default)]
    pub consistency: ConsistencyMode,
}

impl RegistryConfig {
    fn default_presence() -> StoreConfig {
        StoreConfig {
            heartbeat_timeout_secs: 120,
            livetime_timeout_secs: 600,
            capacity: 500,
        }
    }

    fn default_players() -> StoreConfig {
        StoreConfig {
            heartbeat_timeout_secs: 60,
            livetime_timeout_secs: 300,
            capacity: 1000,
        }
    }

    const fn default_force_join() -> QueueConfig {
        QueueConfig {
            ttl_secs: 300,
            capacity: 200,
        }
    }

    const fn default_sweep_interval_ms() -> u64 {
        30_000
    }

    /// Check internal consistency of every section.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidConfig`] for a zero sweep interval or
    /// any invalid store/queue section.
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.presence.validate("presence")?;
        self.players.validate("players")?;
        self.force_join.validate()?;
        if self.sweep_interval_ms == 0 {
            return Err(RegistryError::InvalidConfig {
                reason: "sweep_interval_ms must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            presence: Self::default_presence(),
            players: Self::default_players(),
            force_join: Self::default_force_join(),
            sweep_interval_ms: Self::default_sweep_interval_ms(),
            consistency: ConsistencyMode::default(),
        }
    }
}

/// Convert a seconds count into a `TimeDelta`, saturating at the maximum
/// representable delta instead of panicking on absurd values.
fn delta_secs(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RegistryConfig::default().validate().unwrap();
    }

    #[test]
    fn livetime_must_exceed_heartbeat() {
        let cfg = StoreConfig {
            heartbeat_timeout_secs: 60,
            livetime_timeout_secs: 60,
            capacity: 10,
        };
        assert!(cfg.validate("presence").is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let cfg = StoreConfig {
            heartbeat_timeout_secs: 60,
            livetime_timeout_secs: 120,
            capacity: 0,
        };
        assert!(cfg.validate("players").is_err());

        let queue = QueueConfig {
            ttl_secs: 60,
            capacity: 0,
        };
        assert!(queue.validate().is_err());
    }

    #[test]
    fn consistency_mode_parses_lowercase() {
        let mode: ConsistencyMode = serde_json::from_str("\"eager\"").unwrap();
        assert_eq!(mode, ConsistencyMode::Eager);
        let mode: ConsistencyMode = serde_json::from_str("\"lazy\"").unwrap();
        assert_eq!(mode, ConsistencyMode::Lazy);
    }

    #[test]
    fn oversized_timeout_saturates() {
        let cfg = StoreConfig {
            heartbeat_timeout_secs: u64::MAX,
            livetime_timeout_secs: u64::MAX,
            capacity: 1,
        };
        // Saturates rather than panicking; validation still rejects the
        // equal pair.
        assert_eq!(cfg.heartbeat_timeout(), TimeDelta::MAX);
        assert!(cfg.validate("presence").is_err());
    }
}
