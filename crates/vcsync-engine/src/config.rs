//! Engine configuration
//!
//! Values only, no behavior: intervals for the two scheduler timers and
//! the command poll policy. Deserializable from TOML with the same
//! defaults the constructor applies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Hard floor for the status refresh interval
pub const MIN_SCAN_INTERVAL_MINUTES: u64 = 1;

/// Hard floor for the health-update wake interval. The vendor documents
/// no limit, but frequent wake calls drain the vehicle battery, so
/// anything below this is rejected outright (the documented
/// recommendation is 120 minutes or more).
pub const MIN_HEALTH_UPDATE_INTERVAL_MINUTES: u64 = 30;

/// Configuration for one synchronized account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Status refresh period in minutes
    #[serde(default = "default_scan_interval")]
    pub scan_interval_minutes: u64,
    /// Health-update wake period in minutes; the wake timer only runs
    /// when both this and `pin` are set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_update_interval_minutes: Option<u64>,
    /// Account PIN for commands and health-update wakes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    /// Overall deadline for one command execution in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// Delay between job status polls in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_scan_interval() -> u64 {
    5
}

fn default_command_timeout() -> u64 {
    90
}

fn default_poll_interval() -> u64 {
    3
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            scan_interval_minutes: default_scan_interval(),
            health_update_interval_minutes: None,
            pin: None,
            command_timeout_secs: default_command_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl SyncConfig {
    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, EngineError> {
        let config: SyncConfig =
            toml::from_str(raw).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check interval floors and internal consistency
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.scan_interval_minutes < MIN_SCAN_INTERVAL_MINUTES {
            return Err(EngineError::InvalidConfig(format!(
                "scan_interval_minutes must be at least {MIN_SCAN_INTERVAL_MINUTES}, got {}",
                self.scan_interval_minutes
            )));
        }

        if let Some(minutes) = self.health_update_interval_minutes {
            if minutes < MIN_HEALTH_UPDATE_INTERVAL_MINUTES {
                return Err(EngineError::InvalidConfig(format!(
                    "health_update_interval_minutes must be at least \
                     {MIN_HEALTH_UPDATE_INTERVAL_MINUTES}, got {minutes}"
                )));
            }
        }

        if self.command_timeout_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "command_timeout_secs must be non-zero".to_string(),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "poll_interval_secs must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        // Saturate: an absurdly large configured interval means
        // "effectively never", not an overflow
        Duration::from_secs(self.scan_interval_minutes.saturating_mul(60))
    }

    /// The wake interval, if the wake timer is enabled (both interval
    /// and PIN configured)
    pub fn health_update_interval(&self) -> Option<Duration> {
        match (&self.pin, self.health_update_interval_minutes) {
            (Some(_), Some(minutes)) => Some(Duration::from_secs(minutes.saturating_mul(60))),
            _ => None,
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
