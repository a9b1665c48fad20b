//! Per-attendee busy intervals for a time window.
//!
//! The resolver issues one aggregated free/busy query per call and never caches:
//! every snapshot is fresh, because scheduling decisions must see the provider's
//! current state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SchedulingError};
use crate::model::{AttendeeId, TimeWindow};
use crate::provider::{CalendarBusy, CalendarProvider};

/// What to do when the provider has no free/busy data for an attendee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownAttendeePolicy {
    /// Treat the attendee as free for the whole window.
    #[default]
    AssumeFree,
    /// Treat the attendee as busy for the whole window.
    AssumeBusy,
    /// Fail the query with `SchedulingError::UnknownAttendee`.
    Reject,
}

/// Busy intervals per attendee, covering exactly the queried window.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilitySnapshot {
    window: TimeWindow,
    busy: BTreeMap<AttendeeId, Vec<TimeWindow>>,
}

impl AvailabilitySnapshot {
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Busy intervals for one attendee, ordered by start. Empty if free.
    pub fn busy_for(&self, attendee: &AttendeeId) -> &[TimeWindow] {
        self.busy.get(attendee).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttendeeId, &Vec<TimeWindow>)> {
        self.busy.iter()
    }

    /// Every attendee's intervals, in no particular order.
    pub fn all_busy(&self) -> impl Iterator<Item = &TimeWindow> {
        self.busy.values().flatten()
    }

    /// True iff no attendee has any busy interval in the window.
    pub fn is_free(&self) -> bool {
        self.busy.values().all(Vec::is_empty)
    }
}

/// Turns attendees + a window into an [`AvailabilitySnapshot`].
pub struct AvailabilityResolver<P> {
    provider: P,
    unknown_attendee: UnknownAttendeePolicy,
}

impl<P: CalendarProvider> AvailabilityResolver<P> {
    pub fn new(provider: P, unknown_attendee: UnknownAttendeePolicy) -> Self {
        Self {
            provider,
            unknown_attendee,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn policy(&self) -> UnknownAttendeePolicy {
        self.unknown_attendee
    }

    /// Query the provider once for all attendees over `window`.
    ///
    /// Busy intervals are clipped to the window and sorted by start; overlaps
    /// between intervals of the same attendee are kept as reported. Provider
    /// errors are not retried.
    ///
    /// # Errors
    /// - `InvalidAttendees` if `attendees` is empty.
    /// - `ProviderUnavailable` (or another mapped provider error) on failure.
    /// - `UnknownAttendee` when the policy is `Reject` and an attendee has no data.
    pub fn resolve(
        &self,
        attendees: &BTreeSet<AttendeeId>,
        window: &TimeWindow,
    ) -> Result<AvailabilitySnapshot> {
        if attendees.is_empty() {
            return Err(SchedulingError::InvalidAttendees(
                "at least one attendee is required".to_string(),
            ));
        }

        let mut response = self.provider.query_free_busy(attendees, window)?;

        let mut busy = BTreeMap::new();
        for attendee in attendees {
            let answer = response.remove(attendee).unwrap_or(CalendarBusy::NoData);
            let intervals = match answer {
                CalendarBusy::Busy(intervals) => {
                    let mut clipped: Vec<TimeWindow> =
                        intervals.iter().filter_map(|w| w.clip_to(window)).collect();
                    clipped.sort_by_key(|w| (w.start(), w.end()));
                    clipped
                }
                CalendarBusy::NoData => match self.unknown_attendee {
                    UnknownAttendeePolicy::AssumeFree => {
                        debug!(attendee = %attendee, "no free/busy data, assuming free");
                        Vec::new()
                    }
                    UnknownAttendeePolicy::AssumeBusy => {
                        debug!(attendee = %attendee, "no free/busy data, assuming busy");
                        vec![*window]
                    }
                    UnknownAttendeePolicy::Reject => {
                        warn!(attendee = %attendee, "no free/busy data, rejecting query");
                        return Err(SchedulingError::UnknownAttendee(attendee.to_string()));
                    }
                },
            };
            busy.insert(attendee.clone(), intervals);
        }

        Ok(AvailabilitySnapshot {
            window: *window,
            busy,
        })
    }
}
