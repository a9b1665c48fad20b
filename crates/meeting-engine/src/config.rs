//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! [availability]
//! unknown_attendee = "assume-free"
//!
//! [booking]
//! max_attempts = 3
//! notify_attendees = true
//! conferencing = true
//!
//! [clock]
//! timezone = "Asia/Kolkata"
//! ```

use std::path::Path;

use chrono::FixedOffset;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::availability::UnknownAttendeePolicy;
use crate::clock::LocalZone;
use crate::error::{Result, SchedulingError};
use crate::lifecycle::LifecyclePolicy;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub availability: AvailabilityConfig,
    pub booking: BookingConfig,
    pub clock: ClockConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AvailabilityConfig {
    pub unknown_attendee: UnknownAttendeePolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookingConfig {
    /// Searches attempted by book-next-slot before giving up on taken slots.
    pub max_attempts: u32,
    pub notify_attendees: bool,
    pub conferencing: bool,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            notify_attendees: true,
            conferencing: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClockConfig {
    /// IANA zone name. Takes precedence over `utc_offset`.
    pub timezone: Option<String>,
    /// Fixed offset such as `+05:30` or `-07:00`.
    pub utc_offset: Option<String>,
}

impl EngineConfig {
    /// # Errors
    /// `SchedulingError::Config` on malformed TOML or invalid values.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(raw).map_err(|e| SchedulingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `SchedulingError::Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SchedulingError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.booking.max_attempts == 0 {
            return Err(SchedulingError::Config(
                "booking.max_attempts must be at least 1".to_string(),
            ));
        }
        self.clock.zone()?;
        Ok(())
    }

    pub fn lifecycle_policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            notify_attendees: self.booking.notify_attendees,
            conferencing: self.booking.conferencing,
        }
    }
}

impl ClockConfig {
    /// # Errors
    /// `SchedulingError::Config` for an unknown zone or malformed offset.
    pub fn zone(&self) -> Result<LocalZone> {
        if let Some(name) = &self.timezone {
            let tz: Tz = name
                .parse()
                .map_err(|_| SchedulingError::Config(format!("unknown timezone '{name}'")))?;
            return Ok(LocalZone::Named(tz));
        }
        if let Some(raw) = &self.utc_offset {
            let offset: FixedOffset = raw
                .parse()
                .map_err(|_| SchedulingError::Config(format!("malformed utc_offset '{raw}'")))?;
            return Ok(LocalZone::Fixed(offset));
        }
        Ok(LocalZone::System)
    }
}
