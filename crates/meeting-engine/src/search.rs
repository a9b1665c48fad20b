//! Forward search for the earliest slot free for every attendee.
//!
//! Each round queries `[cursor, cursor + 2·duration)` (clipped to the horizon)
//! and decides, from that one fresh snapshot, every candidate start in
//! `[cursor, cursor + duration]`. A round that finds nothing moves the cursor
//! at least one duration forward, skipping straight past a busy block that
//! covers the new position. Rounds therefore never exceed
//! `ceil((horizon - start) / duration)`, and candidates are examined strictly
//! in increasing time order.
//!
//! A round whose free/busy query fails is skipped by one duration and counted
//! in [`SlotSearch::provider_failures`]; only errors that would fail every
//! round (bad input, a rejected unknown attendee, cancellation) abort.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::{debug, warn};

use crate::availability::AvailabilityResolver;
use crate::cancel::CancelHandle;
use crate::error::{Result, SchedulingError};
use crate::freebusy;
use crate::model::{ceil_to_minute, AttendeeId, MeetingDuration, Slot, TimeWindow};
use crate::provider::CalendarProvider;

/// Why a search came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// Every round was answered and nothing was free.
    NoFreeSlot,
    /// At least one round was skipped because the provider failed, so a free
    /// slot may have been missed.
    Degraded,
}

/// Result of a slot search with its diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlotSearch {
    /// Found slots in increasing start order. At most one for `find_next_slot`.
    pub slots: Vec<Slot>,
    /// Number of free/busy queries issued.
    pub windows_evaluated: usize,
    /// Number of queries that failed and were skipped.
    pub provider_failures: usize,
}

impl SlotSearch {
    /// The earliest slot found, if any.
    pub fn slot(&self) -> Option<Slot> {
        self.slots.first().copied()
    }

    pub fn not_found_reason(&self) -> Option<NotFoundReason> {
        if !self.slots.is_empty() {
            return None;
        }
        Some(if self.provider_failures > 0 {
            NotFoundReason::Degraded
        } else {
            NotFoundReason::NoFreeSlot
        })
    }
}

/// Slot finder layered on an [`AvailabilityResolver`].
pub struct SlotSearchEngine<'r, P> {
    resolver: &'r AvailabilityResolver<P>,
}

impl<'r, P: CalendarProvider> SlotSearchEngine<'r, P> {
    pub fn new(resolver: &'r AvailabilityResolver<P>) -> Self {
        Self { resolver }
    }

    /// Earliest `duration`-long window starting at or after `search_start` and
    /// ending no later than `horizon` that is free for every attendee.
    ///
    /// `search_start` is rounded up to a whole minute. An empty result is not an
    /// error; see [`SlotSearch::not_found_reason`].
    ///
    /// # Errors
    /// `InvalidAttendees`, `UnknownAttendee` (reject policy) or `Cancelled`.
    pub fn find_next_slot(
        &self,
        attendees: &BTreeSet<AttendeeId>,
        duration: MeetingDuration,
        search_start: DateTime<FixedOffset>,
        horizon: DateTime<FixedOffset>,
        cancel: &CancelHandle,
    ) -> Result<SlotSearch> {
        self.search(attendees, duration, search_start, horizon, cancel, Some(1))
    }

    /// Every back-to-back free slot of `duration` between `search_start` and
    /// `horizon`. After a found slot the next candidate starts where it ends.
    ///
    /// # Errors
    /// Same as [`find_next_slot`](Self::find_next_slot).
    pub fn find_all_slots(
        &self,
        attendees: &BTreeSet<AttendeeId>,
        duration: MeetingDuration,
        search_start: DateTime<FixedOffset>,
        horizon: DateTime<FixedOffset>,
        cancel: &CancelHandle,
    ) -> Result<SlotSearch> {
        self.search(attendees, duration, search_start, horizon, cancel, None)
    }

    fn search(
        &self,
        attendees: &BTreeSet<AttendeeId>,
        duration: MeetingDuration,
        search_start: DateTime<FixedOffset>,
        horizon: DateTime<FixedOffset>,
        cancel: &CancelHandle,
        limit: Option<usize>,
    ) -> Result<SlotSearch> {
        if attendees.is_empty() {
            return Err(SchedulingError::InvalidAttendees(
                "at least one attendee is required".to_string(),
            ));
        }

        let length = duration.as_duration();
        let mut report = SlotSearch::default();
        let mut cursor = ceil_to_minute(search_start);

        while cursor + length <= horizon {
            if limit.is_some_and(|n| report.slots.len() >= n) {
                break;
            }
            cancel.check()?;

            let lookahead_end = (cursor + length + length).min(horizon);
            let query = TimeWindow::new(cursor, lookahead_end)?;
            let latest_start = (cursor + length).min(lookahead_end - length);
            report.windows_evaluated += 1;

            let snapshot = match self.resolver.resolve(attendees, &query) {
                Ok(snapshot) => snapshot,
                Err(err) if is_provider_failure(&err) => {
                    report.provider_failures += 1;
                    warn!(window = %query, error = %err, "free/busy query failed, skipping window");
                    cursor = cursor + length;
                    continue;
                }
                Err(err) => return Err(err),
            };

            if let Some(start) =
                freebusy::earliest_free_start(snapshot.all_busy(), &query, latest_start, length)
            {
                let slot = Slot {
                    window: TimeWindow::starting_at(start, duration),
                };
                debug!(slot = %slot.window, round = report.windows_evaluated, "free slot found");
                report.slots.push(slot);
                cursor = slot.end();
                continue;
            }

            let step = cursor + length;
            let next = freebusy::busy_until(snapshot.all_busy(), &query, step).unwrap_or(step);
            debug!(window = %query, next = %next, "no free slot in window, advancing");
            cursor = ceil_to_minute(next);
        }

        Ok(report)
    }
}

fn is_provider_failure(err: &SchedulingError) -> bool {
    matches!(
        err,
        SchedulingError::ProviderUnavailable(_)
            | SchedulingError::Rejected(_)
            | SchedulingError::NotFound(_)
            | SchedulingError::SlotTaken(_)
    )
}
