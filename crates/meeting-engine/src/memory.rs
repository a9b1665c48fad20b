//! An in-process calendar provider.
//!
//! Backs the CLI's calendar file and the test suites. Behaves like a hosted
//! calendar where it matters to the engine: free/busy intervals are clipped to
//! the query window, identities without a registered calendar report no data,
//! deleted events stay readable with status `cancelled`, and deleting them
//! again reports not-found. Faults (outages, insert conflicts) can be injected.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SchedulingError};
use crate::model::{AttendeeId, EventPatch, Meeting, MeetingStatus, NewMeeting, TimeWindow};
use crate::provider::{CalendarBusy, CalendarProvider, FreeBusyResponse, ProviderError};

/// Serializable calendar contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarStore {
    /// Registered identities and their commitments outside this calendar.
    #[serde(default)]
    pub calendars: BTreeMap<AttendeeId, Vec<TimeWindow>>,
    /// Events on the primary calendar, including cancelled ones.
    #[serde(default)]
    pub meetings: Vec<Meeting>,
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    outages: Vec<TimeWindow>,
    insert_conflicts: usize,
    drop_link_on_update: bool,
}

#[derive(Debug)]
pub struct InMemoryProvider {
    store: Mutex<CalendarStore>,
    faults: Mutex<Faults>,
    free_busy_calls: AtomicUsize,
    meet_host: String,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::from_store(CalendarStore::default())
    }
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: CalendarStore) -> Self {
        Self {
            store: Mutex::new(store),
            faults: Mutex::new(Faults::default()),
            free_busy_calls: AtomicUsize::new(0),
            meet_host: "meet.example.com".to_string(),
        }
    }

    /// Load a calendar file written by [`save`](Self::save).
    ///
    /// # Errors
    /// `SchedulingError::Config` if the file is unreadable or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SchedulingError::Config(format!("cannot read calendar {}: {e}", path.display()))
        })?;
        let store: CalendarStore = serde_json::from_str(&raw).map_err(|e| {
            SchedulingError::Config(format!("malformed calendar {}: {e}", path.display()))
        })?;
        Ok(Self::from_store(store))
    }

    /// # Errors
    /// `SchedulingError::Config` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&*self.store.lock())
            .map_err(|e| SchedulingError::Config(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| {
            SchedulingError::Config(format!("cannot write calendar {}: {e}", path.display()))
        })
    }

    pub fn snapshot(&self) -> CalendarStore {
        self.store.lock().clone()
    }

    /// Register an identity with an empty calendar.
    pub fn register(&self, attendee: &AttendeeId) {
        self.store
            .lock()
            .calendars
            .entry(attendee.clone())
            .or_default();
    }

    /// Register an identity (if needed) and mark it busy over `window`.
    pub fn add_busy(&self, attendee: &AttendeeId, window: TimeWindow) {
        self.store
            .lock()
            .calendars
            .entry(attendee.clone())
            .or_default()
            .push(window);
    }

    /// Make every call fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.lock().unavailable = unavailable;
    }

    /// Free/busy queries overlapping `window` fail with `Unavailable`.
    pub fn add_outage(&self, window: TimeWindow) {
        self.faults.lock().outages.push(window);
    }

    /// The next `count` inserts fail with `Conflict`.
    pub fn reject_next_inserts(&self, count: usize) {
        self.faults.lock().insert_conflicts = count;
    }

    /// Update responses omit the conferencing link (stored data is kept).
    pub fn drop_link_on_update(&self, drop: bool) {
        self.faults.lock().drop_link_on_update = drop;
    }

    /// Number of free/busy queries received so far.
    pub fn free_busy_calls(&self) -> usize {
        self.free_busy_calls.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> std::result::Result<(), ProviderError> {
        if self.faults.lock().unavailable {
            return Err(ProviderError::Unavailable(
                "calendar backend is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn conference_link(&self) -> String {
        let code = Uuid::new_v4().simple().to_string();
        format!(
            "https://{}/{}-{}-{}",
            self.meet_host,
            &code[0..3],
            &code[3..7],
            &code[7..10]
        )
    }
}

impl CalendarProvider for InMemoryProvider {
    fn query_free_busy(
        &self,
        attendees: &BTreeSet<AttendeeId>,
        window: &TimeWindow,
    ) -> std::result::Result<FreeBusyResponse, ProviderError> {
        self.free_busy_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        if self.faults.lock().outages.iter().any(|o| o.overlaps(window)) {
            return Err(ProviderError::Unavailable(format!(
                "free/busy backend timed out for {window}"
            )));
        }

        let store = self.store.lock();
        let mut response = FreeBusyResponse::new();
        for attendee in attendees {
            let Some(external) = store.calendars.get(attendee) else {
                response.insert(attendee.clone(), CalendarBusy::NoData);
                continue;
            };
            let meetings = store
                .meetings
                .iter()
                .filter(|m| m.status == MeetingStatus::Confirmed && m.attendees.contains(attendee))
                .map(|m| &m.window);
            let busy: Vec<TimeWindow> = external
                .iter()
                .chain(meetings)
                .filter_map(|w| w.clip_to(window))
                .collect();
            response.insert(attendee.clone(), CalendarBusy::Busy(busy));
        }
        Ok(response)
    }

    fn list_events(&self, window: &TimeWindow) -> std::result::Result<Vec<Meeting>, ProviderError> {
        self.ensure_available()?;
        let mut events: Vec<Meeting> = self
            .store
            .lock()
            .meetings
            .iter()
            .filter(|m| m.status == MeetingStatus::Confirmed && m.window.overlaps(window))
            .cloned()
            .collect();
        events.sort_by_key(|m| m.window.start());
        Ok(events)
    }

    fn insert_event(&self, meeting: &NewMeeting) -> std::result::Result<Meeting, ProviderError> {
        self.ensure_available()?;
        {
            let mut faults = self.faults.lock();
            if faults.insert_conflicts > 0 {
                faults.insert_conflicts -= 1;
                return Err(ProviderError::Conflict(format!(
                    "{} is no longer free",
                    meeting.window
                )));
            }
        }

        let created = Meeting {
            id: Uuid::new_v4().simple().to_string(),
            title: meeting.title.clone(),
            description: meeting.description.clone(),
            window: meeting.window,
            attendees: meeting.attendees.clone(),
            conferencing_link: meeting.want_conferencing.then(|| self.conference_link()),
            status: MeetingStatus::Confirmed,
        };
        self.store.lock().meetings.push(created.clone());
        Ok(created)
    }

    fn get_event(&self, id: &str) -> std::result::Result<Meeting, ProviderError> {
        self.ensure_available()?;
        self.store
            .lock()
            .meetings
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    fn update_event(
        &self,
        id: &str,
        patch: &EventPatch,
    ) -> std::result::Result<Meeting, ProviderError> {
        self.ensure_available()?;
        let mut store = self.store.lock();
        let meeting = store
            .meetings
            .iter_mut()
            .find(|m| m.id == id && m.status == MeetingStatus::Confirmed)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;

        if let Some(title) = &patch.title {
            meeting.title.clone_from(title);
        }
        if let Some(window) = patch.window {
            meeting.window = window;
        }
        if !patch.preserve_conferencing {
            meeting.conferencing_link = None;
        }

        let mut response = meeting.clone();
        if self.faults.lock().drop_link_on_update {
            response.conferencing_link = None;
        }
        Ok(response)
    }

    fn delete_event(
        &self,
        id: &str,
        _notify_attendees: bool,
    ) -> std::result::Result<(), ProviderError> {
        self.ensure_available()?;
        let mut store = self.store.lock();
        match store
            .meetings
            .iter_mut()
            .find(|m| m.id == id && m.status == MeetingStatus::Confirmed)
        {
            Some(meeting) => {
                meeting.status = MeetingStatus::Cancelled;
                Ok(())
            }
            None => Err(ProviderError::NotFound(id.to_string())),
        }
    }
}
