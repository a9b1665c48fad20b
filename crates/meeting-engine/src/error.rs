//! Error types for scheduling operations.

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

use crate::provider::ProviderError;

/// Errors surfaced by the scheduling engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    /// Duration was non-positive, fractional, or not a finite number.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// A time window whose start is not strictly before its end.
    #[error("Invalid window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    /// An attendee set was empty, or an attendee identity was blank.
    #[error("Invalid attendees: {0}")]
    InvalidAttendees(String),

    /// The calendar backend could not be reached (I/O, auth, throttling).
    #[error("Calendar provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The referenced meeting does not exist (or is already cancelled).
    #[error("Meeting not found: {0}")]
    NotFound(String),

    /// The provider refused a create or update for a reason other than not-found.
    #[error("Scheduling rejected by provider: {0}")]
    Rejected(String),

    /// The chosen slot was taken between search and booking, and re-search
    /// ran out of attempts.
    #[error("Slot taken: {0}")]
    SlotTaken(String),

    /// The provider had no free/busy data for an attendee and the
    /// configured policy is to reject.
    #[error("No free/busy data for attendee {0}")]
    UnknownAttendee(String),

    /// No free slot was found before the search horizon. `degraded` is set when
    /// provider failures caused windows to be skipped.
    #[error("No free slot before the search horizon (degraded search: {degraded})")]
    NoFreeSlot { degraded: bool },

    /// The caller's cancellation handle fired (flag or deadline).
    #[error("Operation cancelled")]
    Cancelled,

    /// Malformed configuration or tool arguments.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SchedulingError {
    /// Whether the same request might succeed if simply retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SchedulingError::ProviderUnavailable(_)
                | SchedulingError::Cancelled
                | SchedulingError::SlotTaken(_)
                | SchedulingError::NoFreeSlot { degraded: true }
        )
    }
}

impl From<ProviderError> for SchedulingError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(msg) => SchedulingError::ProviderUnavailable(msg),
            ProviderError::NotFound(id) => SchedulingError::NotFound(id),
            ProviderError::Conflict(msg) => SchedulingError::SlotTaken(msg),
            ProviderError::Rejected(msg) => SchedulingError::Rejected(msg),
        }
    }
}

/// Convenience alias used throughout meeting-engine.
pub type Result<T> = std::result::Result<T, SchedulingError>;
