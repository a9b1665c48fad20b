//! Create, update and delete meetings on the provider.
//!
//! The provider owns every meeting. Updates re-fetch the event immediately
//! before writing so the read-modify-write window stays as small as possible.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::error::{Result, SchedulingError};
use crate::model::{
    AttendeeId, CancelOutcome, EventPatch, Meeting, MeetingDuration, MeetingStatus, MeetingUpdate,
    NewMeeting, Slot, TimeWindow,
};
use crate::provider::{CalendarProvider, ProviderError};

/// Conferencing and notification policy applied to every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub notify_attendees: bool,
    pub conferencing: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            notify_attendees: true,
            conferencing: true,
        }
    }
}

pub struct MeetingLifecycleManager<'p, P> {
    provider: &'p P,
    policy: LifecyclePolicy,
}

impl<'p, P: CalendarProvider> MeetingLifecycleManager<'p, P> {
    pub fn new(provider: &'p P, policy: LifecyclePolicy) -> Self {
        Self { provider, policy }
    }

    /// Insert a meeting for `slot`, inviting every attendee and requesting a
    /// conferencing link in the same provider call.
    ///
    /// # Errors
    /// `InvalidAttendees` for an empty set; otherwise the mapped provider
    /// error. A failed insert leaves no event behind.
    pub fn create(
        &self,
        title: &str,
        description: &str,
        attendees: &BTreeSet<AttendeeId>,
        slot: &Slot,
    ) -> Result<Meeting> {
        if attendees.is_empty() {
            return Err(SchedulingError::InvalidAttendees(
                "a meeting needs at least one attendee".to_string(),
            ));
        }

        let request = NewMeeting {
            title: title.to_string(),
            description: description.to_string(),
            window: slot.window,
            attendees: attendees.clone(),
            want_conferencing: self.policy.conferencing,
            notify_attendees: self.policy.notify_attendees,
        };

        let meeting = self.provider.insert_event(&request)?;
        if self.policy.conferencing && meeting.conferencing_link.is_none() {
            warn!(
                meeting_id = %meeting.id,
                "provider created the meeting without a conferencing link"
            );
        }
        info!(
            meeting_id = %meeting.id,
            window = %meeting.window,
            attendees = meeting.attendees.len(),
            "meeting created"
        );
        Ok(meeting)
    }

    /// Apply `update` to a freshly fetched copy of the meeting.
    ///
    /// A new start without a duration keeps the original length; a duration
    /// without a start keeps the original start. Conferencing data is kept.
    ///
    /// # Errors
    /// `NotFound` if the meeting does not exist or was cancelled,
    /// `InvalidWindow` if the resulting window is empty, otherwise the mapped
    /// provider error.
    pub fn update(&self, meeting_id: &str, update: &MeetingUpdate) -> Result<Meeting> {
        let current = self.fetch_live(meeting_id)?;

        if update.is_empty() {
            return Ok(current);
        }

        let window = match (update.start, update.duration) {
            (None, None) => None,
            (start, duration) => {
                let start = start.unwrap_or_else(|| current.window.start());
                let duration =
                    duration.unwrap_or_else(|| MeetingDuration::of_window(&current.window));
                Some(TimeWindow::starting_at(start, duration))
            }
        };

        let patch = EventPatch {
            title: update.title.clone().filter(|t| !t.trim().is_empty()),
            window,
            notify_attendees: self.policy.notify_attendees,
            preserve_conferencing: true,
        };

        let mut updated = self.provider.update_event(meeting_id, &patch)?;

        if updated.conferencing_link.is_none() && current.conferencing_link.is_some() {
            warn!(
                meeting_id,
                "provider response dropped the conferencing link, keeping the previous one"
            );
            updated.conferencing_link = current.conferencing_link;
        }

        info!(meeting_id, window = %updated.window, "meeting updated");
        Ok(updated)
    }

    /// Delete the meeting and notify attendees. Deleting a meeting that is
    /// already gone succeeds with [`CancelOutcome::AlreadyGone`].
    ///
    /// # Errors
    /// Any provider error other than not-found.
    pub fn delete(&self, meeting_id: &str) -> Result<CancelOutcome> {
        match self
            .provider
            .delete_event(meeting_id, self.policy.notify_attendees)
        {
            Ok(()) => {
                info!(meeting_id, "meeting cancelled");
                Ok(CancelOutcome::Cancelled)
            }
            Err(ProviderError::NotFound(_)) => {
                info!(meeting_id, "meeting already gone, nothing to cancel");
                Ok(CancelOutcome::AlreadyGone)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn fetch_live(&self, meeting_id: &str) -> Result<Meeting> {
        let meeting = self.provider.get_event(meeting_id)?;
        if meeting.status == MeetingStatus::Cancelled {
            return Err(SchedulingError::NotFound(meeting_id.to_string()));
        }
        Ok(meeting)
    }
}
