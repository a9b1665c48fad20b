//! The single entry point for the orchestration layer.
//!
//! Every operation takes plain values and returns an explicit `Result`; the
//! facade holds no state between calls beyond its configuration.

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, warn};

use crate::availability::AvailabilityResolver;
use crate::cancel::CancelHandle;
use crate::clock::{self, Clock, SystemClock};
use crate::config::EngineConfig;
use crate::conflict::find_conflicts;
use crate::error::{Result, SchedulingError};
use crate::lifecycle::MeetingLifecycleManager;
use crate::model::{
    attendee_set, CancelOutcome, Meeting, MeetingDuration, MeetingStatus, MeetingUpdate, Slot,
    TimeWindow,
};
use crate::provider::CalendarProvider;
use crate::search::{SlotSearch, SlotSearchEngine};

pub struct SchedulingFacade<P, C = SystemClock> {
    resolver: AvailabilityResolver<P>,
    clock: C,
    config: EngineConfig,
    cancel: CancelHandle,
}

impl<P: CalendarProvider> SchedulingFacade<P, SystemClock> {
    /// # Errors
    /// `SchedulingError::Config` if the configured clock zone is invalid.
    pub fn new(provider: P, config: EngineConfig) -> Result<Self> {
        let clock = SystemClock::new(config.clock.zone()?);
        Ok(Self::with_clock(provider, config, clock))
    }
}

impl<P: CalendarProvider, C: Clock> SchedulingFacade<P, C> {
    pub fn with_clock(provider: P, config: EngineConfig, clock: C) -> Self {
        Self {
            resolver: AvailabilityResolver::new(provider, config.availability.unknown_attendee),
            clock,
            config,
            cancel: CancelHandle::new(),
        }
    }

    /// Abort promptly with `Cancelled` once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn provider(&self) -> &P {
        self.resolver.provider()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    /// True iff no attendee has a busy interval inside `window`.
    ///
    /// # Errors
    /// Invalid attendees, provider failure, or cancellation.
    pub fn check_availability<I, S>(&self, attendees: I, window: &TimeWindow) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attendees = attendee_set(attendees)?;
        self.cancel.check()?;
        let snapshot = self.resolver.resolve(&attendees, window)?;
        Ok(snapshot.is_free())
    }

    /// Earliest free slot from now until the end of the current local day.
    ///
    /// # Errors
    /// Invalid duration or attendees, a rejected unknown attendee, or
    /// cancellation. An empty search is `Ok` with diagnostics.
    pub fn find_slot<I, S>(&self, attendees: I, duration_minutes: i64) -> Result<SlotSearch>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let duration = MeetingDuration::from_minutes(duration_minutes)?;
        let attendees = attendee_set(attendees)?;
        let (now, horizon) = self.today()?;
        SlotSearchEngine::new(&self.resolver).find_next_slot(
            &attendees,
            duration,
            now,
            horizon,
            &self.cancel,
        )
    }

    /// Earliest free slot inside an explicit `range` instead of "rest of today".
    ///
    /// # Errors
    /// Same as [`find_slot`](Self::find_slot).
    pub fn find_slot_in<I, S>(
        &self,
        attendees: I,
        duration_minutes: i64,
        range: &TimeWindow,
    ) -> Result<SlotSearch>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let duration = MeetingDuration::from_minutes(duration_minutes)?;
        let attendees = attendee_set(attendees)?;
        SlotSearchEngine::new(&self.resolver).find_next_slot(
            &attendees,
            duration,
            range.start(),
            range.end(),
            &self.cancel,
        )
    }

    /// Every back-to-back free slot from now until the end of the local day.
    ///
    /// # Errors
    /// Same as [`find_slot`](Self::find_slot).
    pub fn find_all_slots<I, S>(&self, attendees: I, duration_minutes: i64) -> Result<SlotSearch>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let duration = MeetingDuration::from_minutes(duration_minutes)?;
        let attendees = attendee_set(attendees)?;
        let (now, horizon) = self.today()?;
        SlotSearchEngine::new(&self.resolver).find_all_slots(
            &attendees,
            duration,
            now,
            horizon,
            &self.cancel,
        )
    }

    /// Create a meeting at `slot` as given.
    ///
    /// # Errors
    /// See [`MeetingLifecycleManager::create`].
    pub fn schedule<I, S>(
        &self,
        title: &str,
        description: &str,
        attendees: I,
        slot: &Slot,
    ) -> Result<Meeting>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attendees = attendee_set(attendees)?;
        self.cancel.check()?;
        self.lifecycle().create(title, description, &attendees, slot)
    }

    /// Find today's next free slot and book it.
    ///
    /// The chosen window is re-verified immediately before the insert. A
    /// window that turned busy, or an insert the provider rejects as a
    /// conflict, triggers a fresh search, up to `booking.max_attempts` times.
    ///
    /// # Errors
    /// `NoFreeSlot` when today has no room, `SlotTaken` when every attempt
    /// lost its slot, otherwise the underlying search or provider error.
    pub fn book_next_slot<I, S>(
        &self,
        title: &str,
        description: &str,
        attendees: I,
        duration_minutes: i64,
    ) -> Result<Meeting>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let duration = MeetingDuration::from_minutes(duration_minutes)?;
        let attendees = attendee_set(attendees)?;
        let (mut search_from, horizon) = self.today()?;
        let engine = SlotSearchEngine::new(&self.resolver);
        let lifecycle = self.lifecycle();
        let attempts = self.config.booking.max_attempts.max(1);

        for attempt in 1..=attempts {
            let search =
                engine.find_next_slot(&attendees, duration, search_from, horizon, &self.cancel)?;
            let Some(slot) = search.slot() else {
                return Err(SchedulingError::NoFreeSlot {
                    degraded: search.provider_failures > 0,
                });
            };

            self.cancel.check()?;
            let recheck = self.resolver.resolve(&attendees, &slot.window)?;
            if !recheck.is_free() {
                let conflicts = find_conflicts(&slot.window, &recheck);
                warn!(
                    attempt,
                    slot = %slot.window,
                    conflicts = conflicts.len(),
                    "slot turned busy before booking, searching again"
                );
                search_from = slot.start();
                continue;
            }

            self.cancel.check()?;
            match lifecycle.create(title, description, &attendees, &slot) {
                Ok(meeting) => return Ok(meeting),
                Err(SchedulingError::SlotTaken(reason)) => {
                    warn!(
                        attempt,
                        slot = %slot.window,
                        %reason,
                        "slot taken at insert, searching again"
                    );
                    search_from = slot.end();
                }
                Err(err) => return Err(err),
            }
        }

        Err(SchedulingError::SlotTaken(format!(
            "every proposed slot was taken before it could be booked ({attempts} attempts)"
        )))
    }

    /// # Errors
    /// See [`MeetingLifecycleManager::update`].
    pub fn reschedule(&self, meeting_id: &str, update: &MeetingUpdate) -> Result<Meeting> {
        self.cancel.check()?;
        self.lifecycle().update(meeting_id, update)
    }

    /// Cancelling a meeting that no longer exists succeeds.
    ///
    /// # Errors
    /// See [`MeetingLifecycleManager::delete`].
    pub fn cancel(&self, meeting_id: &str) -> Result<CancelOutcome> {
        self.cancel.check()?;
        self.lifecycle().delete(meeting_id)
    }

    /// Confirmed meetings on `date` (local day), ordered by start.
    ///
    /// # Errors
    /// Provider failure or cancellation.
    pub fn events_for_day(&self, date: NaiveDate) -> Result<Vec<Meeting>> {
        let window = clock::day_window(date, *self.now().offset())?;
        self.list(&window)
    }

    /// Confirmed meetings in the current Monday-to-Sunday week.
    ///
    /// # Errors
    /// Provider failure or cancellation.
    pub fn events_for_week(&self) -> Result<Vec<Meeting>> {
        let window = clock::week_window(self.now())?;
        self.list(&window)
    }

    fn list(&self, window: &TimeWindow) -> Result<Vec<Meeting>> {
        self.cancel.check()?;
        let mut meetings: Vec<Meeting> = self
            .provider()
            .list_events(window)?
            .into_iter()
            .filter(|m| m.status == MeetingStatus::Confirmed && m.window.overlaps(window))
            .collect();
        meetings.sort_by_key(|m| m.window.start());
        debug!(window = %window, count = meetings.len(), "listed meetings");
        Ok(meetings)
    }

    fn today(&self) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        let now = self.now();
        Ok((now, clock::end_of_day(now)?))
    }

    fn lifecycle(&self) -> MeetingLifecycleManager<'_, P> {
        MeetingLifecycleManager::new(self.provider(), self.config.lifecycle_policy())
    }
}
