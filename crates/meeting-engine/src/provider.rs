//! The calendar provider seam.
//!
//! The engine holds no authoritative state: every decision re-queries a
//! [`CalendarProvider`]. Calls are blocking network boundaries from the engine's
//! point of view.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::{AttendeeId, EventPatch, Meeting, NewMeeting, TimeWindow};

/// Errors reported by a calendar backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport, auth or throttling failure. Usually transient.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// No event with this id.
    #[error("event not found: {0}")]
    NotFound(String),

    /// The requested time is no longer free (reported at insert time).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Refused for permissions, validation or quota reasons.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Free/busy answer for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarBusy {
    /// Busy intervals inside the queried window. May overlap each other.
    Busy(Vec<TimeWindow>),
    /// The provider has nothing for this identity (unknown or not shared).
    NoData,
}

/// Per-attendee free/busy answer for one query window.
pub type FreeBusyResponse = BTreeMap<AttendeeId, CalendarBusy>;

/// A remote calendar service operating on the user's primary calendar.
pub trait CalendarProvider {
    /// Aggregated free/busy query for every identity over `window`.
    ///
    /// Identities missing from the returned map are treated as `NoData`.
    fn query_free_busy(
        &self,
        attendees: &BTreeSet<AttendeeId>,
        window: &TimeWindow,
    ) -> Result<FreeBusyResponse, ProviderError>;

    /// Confirmed events on the primary calendar overlapping `window`, ordered by start.
    fn list_events(&self, window: &TimeWindow) -> Result<Vec<Meeting>, ProviderError>;

    /// Create an event. Conferencing and notification are requested in the same call.
    fn insert_event(&self, meeting: &NewMeeting) -> Result<Meeting, ProviderError>;

    fn get_event(&self, id: &str) -> Result<Meeting, ProviderError>;

    fn update_event(&self, id: &str, patch: &EventPatch) -> Result<Meeting, ProviderError>;

    fn delete_event(&self, id: &str, notify_attendees: bool) -> Result<(), ProviderError>;
}

impl<P: CalendarProvider + ?Sized> CalendarProvider for &P {
    fn query_free_busy(
        &self,
        attendees: &BTreeSet<AttendeeId>,
        window: &TimeWindow,
    ) -> Result<FreeBusyResponse, ProviderError> {
        (**self).query_free_busy(attendees, window)
    }

    fn list_events(&self, window: &TimeWindow) -> Result<Vec<Meeting>, ProviderError> {
        (**self).list_events(window)
    }

    fn insert_event(&self, meeting: &NewMeeting) -> Result<Meeting, ProviderError> {
        (**self).insert_event(meeting)
    }

    fn get_event(&self, id: &str) -> Result<Meeting, ProviderError> {
        (**self).get_event(id)
    }

    fn update_event(&self, id: &str, patch: &EventPatch) -> Result<Meeting, ProviderError> {
        (**self).update_event(id, patch)
    }

    fn delete_event(&self, id: &str, notify_attendees: bool) -> Result<(), ProviderError> {
        (**self).delete_event(id, notify_attendees)
    }
}

impl<P: CalendarProvider + ?Sized> CalendarProvider for Box<P> {
    fn query_free_busy(
        &self,
        attendees: &BTreeSet<AttendeeId>,
        window: &TimeWindow,
    ) -> Result<FreeBusyResponse, ProviderError> {
        (**self).query_free_busy(attendees, window)
    }

    fn list_events(&self, window: &TimeWindow) -> Result<Vec<Meeting>, ProviderError> {
        (**self).list_events(window)
    }

    fn insert_event(&self, meeting: &NewMeeting) -> Result<Meeting, ProviderError> {
        (**self).insert_event(meeting)
    }

    fn get_event(&self, id: &str) -> Result<Meeting, ProviderError> {
        (**self).get_event(id)
    }

    fn update_event(&self, id: &str, patch: &EventPatch) -> Result<Meeting, ProviderError> {
        (**self).update_event(id, patch)
    }

    fn delete_event(&self, id: &str, notify_attendees: bool) -> Result<(), ProviderError> {
        (**self).delete_event(id, notify_attendees)
    }
}
