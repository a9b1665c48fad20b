//! [`GoogleCalendarProvider`]: the engine's provider seam over HTTP.

use std::collections::BTreeSet;
use std::time::Duration;

use meeting_engine::model::{AttendeeId, EventPatch, Meeting, NewMeeting, TimeWindow};
use meeting_engine::provider::FreeBusyResponse as Answer;
use meeting_engine::{CalendarBusy, CalendarProvider, ProviderError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use urlencoding::encode;
use uuid::Uuid;

use crate::error::{GoogleError, Result};
use crate::wire::{
    CalendarRef, ConferenceData, ConferenceSolutionKey, CreateConferenceRequest, Event,
    EventAttendee, EventList, EventTime, FreeBusyRequest, FreeBusyResponse,
};

pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Environment variable holding the OAuth access token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_CALENDAR_ACCESS_TOKEN";

const PRIMARY: &str = "primary";

pub struct GoogleCalendarProvider {
    http: Client,
    base_url: String,
    access_token: String,
}

impl GoogleCalendarProvider {
    /// # Errors
    /// `GoogleError::Transport` if the HTTP client cannot be built.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: GOOGLE_CALENDAR_API_BASE.to_string(),
            access_token: access_token.into(),
        })
    }

    /// Read the access token from [`ACCESS_TOKEN_ENV`].
    ///
    /// # Errors
    /// `GoogleError::MissingToken` when the variable is unset or blank.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Self::new(token.trim()),
            _ => Err(GoogleError::MissingToken(ACCESS_TOKEN_ENV)),
        }
    }

    /// Point at another API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// The id is one percent-encoded path segment. `.` and `..` survive
    /// encoding and would be resolved as dot segments, so they are refused.
    fn event_url(&self, id: &str) -> Result<String> {
        if matches!(id, "" | "." | "..") {
            return Err(GoogleError::InvalidEventId(id.to_string()));
        }
        Ok(self.url(&format!("/calendars/{PRIMARY}/events/{}", encode(id))))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(&self.access_token).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
        debug!(status = status.as_u16(), %body, "Google API error");
        Err(GoogleError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        Ok(self.send(request)?.json()?)
    }

    fn free_busy(&self, attendees: &BTreeSet<AttendeeId>, window: &TimeWindow) -> Result<Answer> {
        let body = FreeBusyRequest {
            time_min: window.start(),
            time_max: window.end(),
            items: attendees
                .iter()
                .map(|a| CalendarRef { id: a.to_string() })
                .collect(),
        };
        let response: FreeBusyResponse =
            self.send_json(self.http.post(self.url("/freeBusy")).json(&body))?;

        let mut answer = Answer::new();
        for attendee in attendees {
            let busy = match response.calendars.get(attendee.as_str()) {
                Some(calendar) if calendar.errors.is_empty() => {
                    let intervals = calendar
                        .busy
                        .iter()
                        .filter_map(|p| match TimeWindow::new(p.start, p.end) {
                            Ok(w) => Some(w),
                            Err(_) => {
                                warn!(attendee = %attendee, "ignoring empty busy period");
                                None
                            }
                        })
                        .collect();
                    CalendarBusy::Busy(intervals)
                }
                Some(calendar) => {
                    debug!(attendee = %attendee, errors = ?calendar.errors, "free/busy errors");
                    CalendarBusy::NoData
                }
                None => CalendarBusy::NoData,
            };
            answer.insert(attendee.clone(), busy);
        }
        Ok(answer)
    }

    fn list(&self, window: &TimeWindow) -> Result<Vec<Meeting>> {
        let url = self.url(&format!("/calendars/{PRIMARY}/events"));
        let mut meetings = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("timeMin", window.start().to_rfc3339()),
                ("timeMax", window.end().to_rfc3339()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let page: EventList = self.send_json(self.http.get(&url).query(&query))?;
            for event in page.items {
                match event.into_meeting() {
                    Ok(meeting) => meetings.push(meeting),
                    Err(e) => warn!(error = %e, "skipping unreadable event"),
                }
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(meetings)
    }

    fn insert(&self, meeting: &NewMeeting) -> Result<Meeting> {
        let body = Event {
            summary: Some(meeting.title.clone()),
            description: Some(meeting.description.clone()),
            start: Some(EventTime::at(meeting.window.start())),
            end: Some(EventTime::at(meeting.window.end())),
            attendees: meeting
                .attendees
                .iter()
                .map(|a| EventAttendee {
                    email: a.to_string(),
                    response_status: None,
                })
                .collect(),
            conference_data: meeting.want_conferencing.then(|| ConferenceData {
                create_request: Some(CreateConferenceRequest {
                    request_id: Uuid::new_v4().to_string(),
                    conference_solution_key: ConferenceSolutionKey {
                        kind: "hangoutsMeet".to_string(),
                    },
                }),
                entry_points: Vec::new(),
            }),
            ..Event::default()
        };
        let url = self.url(&format!("/calendars/{PRIMARY}/events"));
        let request = self
            .http
            .post(url)
            .query(&[
                ("conferenceDataVersion", "1"),
                ("sendUpdates", send_updates(meeting.notify_attendees)),
            ])
            .json(&body);
        let created: Event = self.send_json(request)?;
        created.into_meeting()
    }

    fn get(&self, id: &str) -> Result<Meeting> {
        let event: Event = self.send_json(self.http.get(self.event_url(id)?))?;
        event.into_meeting()
    }

    fn patch(&self, id: &str, patch: &EventPatch) -> Result<Meeting> {
        let body = Event {
            summary: patch.title.clone(),
            start: patch.window.map(|w| EventTime::at(w.start())),
            end: patch.window.map(|w| EventTime::at(w.end())),
            ..Event::default()
        };
        // Version 1 keeps the event's existing conference data.
        let version = if patch.preserve_conferencing { "1" } else { "0" };
        let request = self
            .http
            .patch(self.event_url(id)?)
            .query(&[
                ("conferenceDataVersion", version),
                ("sendUpdates", send_updates(patch.notify_attendees)),
            ])
            .json(&body);
        let updated: Event = self.send_json(request)?;
        updated.into_meeting()
    }

    fn delete(&self, id: &str, notify_attendees: bool) -> Result<()> {
        let request = self
            .http
            .delete(self.event_url(id)?)
            .query(&[("sendUpdates", send_updates(notify_attendees))]);
        self.send(request)?;
        Ok(())
    }
}

fn send_updates(notify: bool) -> &'static str {
    if notify {
        "all"
    } else {
        "none"
    }
}

impl CalendarProvider for GoogleCalendarProvider {
    fn query_free_busy(
        &self,
        attendees: &BTreeSet<AttendeeId>,
        window: &TimeWindow,
    ) -> std::result::Result<Answer, ProviderError> {
        Ok(self.free_busy(attendees, window)?)
    }

    fn list_events(&self, window: &TimeWindow) -> std::result::Result<Vec<Meeting>, ProviderError> {
        Ok(self.list(window)?)
    }

    fn insert_event(&self, meeting: &NewMeeting) -> std::result::Result<Meeting, ProviderError> {
        Ok(self.insert(meeting)?)
    }

    fn get_event(&self, id: &str) -> std::result::Result<Meeting, ProviderError> {
        Ok(self.get(id)?)
    }

    fn update_event(
        &self,
        id: &str,
        patch: &EventPatch,
    ) -> std::result::Result<Meeting, ProviderError> {
        Ok(self.patch(id, patch)?)
    }

    fn delete_event(
        &self,
        id: &str,
        notify_attendees: bool,
    ) -> std::result::Result<(), ProviderError> {
        self.delete(id, notify_attendees)?;
        Ok(())
    }
}
