//! Google Calendar v3 request and response bodies.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use meeting_engine::clock;
use meeting_engine::model::{AttendeeId, Meeting, MeetingStatus, TimeWindow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GoogleError, Result};

// ── freeBusy ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FreeBusyRequest {
    pub time_min: DateTime<FixedOffset>,
    pub time_max: DateTime<FixedOffset>,
    pub items: Vec<CalendarRef>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CalendarRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FreeBusyResponse {
    #[serde(default)]
    pub calendars: BTreeMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FreeBusyCalendar {
    #[serde(default)]
    pub busy: Vec<BusyPeriod>,
    /// e.g. `[{"domain": "global", "reason": "notFound"}]`
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BusyPeriod {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

// ── events ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventList {
    #[serde(default)]
    pub items: Vec<Event>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<EventAttendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hangout_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<ConferenceData>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    /// All-day events carry a date only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl EventTime {
    pub fn at(instant: DateTime<FixedOffset>) -> Self {
        Self {
            date_time: Some(instant),
            date: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventAttendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConferenceData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_request: Option<CreateConferenceRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateConferenceRequest {
    pub request_id: String,
    pub conference_solution_key: ConferenceSolutionKey,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ConferenceSolutionKey {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EntryPoint {
    pub entry_point_type: String,
    pub uri: String,
}

impl Event {
    /// `hangoutLink`, else the first video entry point.
    fn meeting_link(&self) -> Option<String> {
        self.hangout_link.clone().or_else(|| {
            self.conference_data
                .as_ref()?
                .entry_points
                .iter()
                .find(|e| e.entry_point_type == "video")
                .map(|e| e.uri.clone())
        })
    }

    pub fn into_meeting(self) -> Result<Meeting> {
        let id = self
            .id
            .clone()
            .ok_or_else(|| GoogleError::Malformed("event without an id".to_string()))?;
        let start = resolve_time(self.start.as_ref(), &id)?;
        let end = resolve_time(self.end.as_ref(), &id)?;
        let window = TimeWindow::new(start, end)
            .map_err(|e| GoogleError::Malformed(format!("event {id}: {e}")))?;

        let attendees = self
            .attendees
            .iter()
            .filter_map(|a| match AttendeeId::new(a.email.as_str()) {
                Ok(attendee) => Some(attendee),
                Err(_) => {
                    warn!(event_id = %id, "empty attendee email");
                    None
                }
            })
            .collect();

        let status = match self.status.as_deref() {
            Some("cancelled") => MeetingStatus::Cancelled,
            _ => MeetingStatus::Confirmed,
        };

        Ok(Meeting {
            conferencing_link: self.meeting_link(),
            title: self.summary.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            window,
            attendees,
            status,
            id,
        })
    }
}

/// All-day dates become UTC midnights; an all-day end date is already exclusive.
fn resolve_time(time: Option<&EventTime>, id: &str) -> Result<DateTime<FixedOffset>> {
    let time =
        time.ok_or_else(|| GoogleError::Malformed(format!("event {id} has no start/end")))?;
    if let Some(instant) = time.date_time {
        return Ok(instant);
    }
    let date = time
        .date
        .ok_or_else(|| GoogleError::Malformed(format!("event {id} has an empty time")))?;
    debug!(event_id = id, %date, "all-day event, using UTC day boundaries");
    clock::start_of_day(date, Utc.fix()).map_err(|e| GoogleError::Malformed(e.to_string()))
}
