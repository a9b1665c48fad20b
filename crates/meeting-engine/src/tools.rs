//! Tool adapter for an LLM orchestration layer.
//!
//! Arguments arrive as plain strings and numbers (RFC 3339 instants, email
//! lists, minutes that may be floats). Each call returns a [`ToolReply`]: a
//! success flag, a plain-language message for the model to relay, and JSON
//! data. Nothing here panics or returns `Err`; failures become replies that
//! explain what went wrong and, when it makes sense, suggest retrying.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};

use crate::clock::Clock;
use crate::error::{Result, SchedulingError};
use crate::facade::SchedulingFacade;
use crate::model::{
    parse_instant, CancelOutcome, Meeting, MeetingDuration, MeetingUpdate, Slot, TimeWindow,
};
use crate::provider::CalendarProvider;
use crate::search::{NotFoundReason, SlotSearch};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolReply {
    pub success: bool,
    pub message: String,
    pub data: Value,
}

impl ToolReply {
    fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    fn failure(err: &SchedulingError) -> Self {
        Self {
            success: false,
            message: explain(err),
            data: json!({ "error": err.to_string(), "retryable": err.is_retryable() }),
        }
    }

    fn from_result(result: Result<ToolReply>) -> Self {
        result.unwrap_or_else(|err| Self::failure(&err))
    }
}

/// Plain-language explanation of an engine error, with a retry hint when the
/// same request may succeed later.
pub fn explain(err: &SchedulingError) -> String {
    let text = match err {
        SchedulingError::InvalidDuration(detail) => {
            format!("The meeting length must be a whole, positive number of minutes ({detail}).")
        }
        SchedulingError::InvalidWindow { .. } => {
            "The start time must be before the end time.".to_string()
        }
        SchedulingError::InvalidAttendees(detail) => {
            format!("I need at least one valid attendee email ({detail}).")
        }
        SchedulingError::ProviderUnavailable(_) => {
            "I couldn't reach the calendar service.".to_string()
        }
        SchedulingError::NotFound(id) => {
            format!("I couldn't find a meeting with id '{id}'. It may have been cancelled already.")
        }
        SchedulingError::Rejected(detail) => {
            format!("The calendar service refused the change: {detail}.")
        }
        SchedulingError::SlotTaken(_) => {
            "Someone booked that time before I could.".to_string()
        }
        SchedulingError::UnknownAttendee(id) => format!(
            "I can't see the calendar of {id}, so I can't confirm they are free."
        ),
        SchedulingError::NoFreeSlot { degraded: false } => {
            "There is no free slot of that length left today for everyone.".to_string()
        }
        SchedulingError::NoFreeSlot { degraded: true } => {
            "I couldn't find a free slot today, but some of the calendar checks failed.".to_string()
        }
        SchedulingError::Cancelled => "The request took too long and was stopped.".to_string(),
        SchedulingError::Config(detail) => format!("Some of the details were not valid: {detail}."),
    };
    if err.is_retryable() {
        format!("{text} Please try again in a moment.")
    } else {
        text
    }
}

pub struct CalendarTools<'f, P, C> {
    facade: &'f SchedulingFacade<P, C>,
}

impl<'f, P: CalendarProvider, C: Clock> CalendarTools<'f, P, C> {
    pub fn new(facade: &'f SchedulingFacade<P, C>) -> Self {
        Self { facade }
    }

    /// Are all attendees free between `start` and `end`?
    pub fn check_availability(&self, attendees: &[String], start: &str, end: &str) -> ToolReply {
        ToolReply::from_result(self.try_check_availability(attendees, start, end))
    }

    /// Next slot of `duration_minutes` for everyone, today.
    pub fn find_next_slot(&self, attendees: &[String], duration_minutes: f64) -> ToolReply {
        ToolReply::from_result(self.try_find_next_slot(attendees, duration_minutes))
    }

    /// All free back-to-back slots of `duration_minutes` for the rest of today.
    pub fn list_available_slots(&self, attendees: &[String], duration_minutes: f64) -> ToolReply {
        ToolReply::from_result(self.try_list_available_slots(attendees, duration_minutes))
    }

    /// Book a meeting at an explicit start time.
    pub fn schedule_meeting(
        &self,
        title: &str,
        description: &str,
        attendees: &[String],
        start: &str,
        duration_minutes: f64,
    ) -> ToolReply {
        ToolReply::from_result(self.try_schedule_meeting(
            title,
            description,
            attendees,
            start,
            duration_minutes,
        ))
    }

    /// Find today's next free slot and book it in one step.
    pub fn book_next_available(
        &self,
        title: &str,
        description: &str,
        attendees: &[String],
        duration_minutes: f64,
    ) -> ToolReply {
        ToolReply::from_result(self.try_book_next_available(
            title,
            description,
            attendees,
            duration_minutes,
        ))
    }

    /// Change a meeting's title and/or time. Without a duration the meeting
    /// keeps its current length.
    pub fn update_meeting(
        &self,
        meeting_id: &str,
        new_title: Option<&str>,
        new_start: Option<&str>,
        new_duration_minutes: Option<f64>,
    ) -> ToolReply {
        ToolReply::from_result(self.try_update_meeting(
            meeting_id,
            new_title,
            new_start,
            new_duration_minutes,
        ))
    }

    /// Cancel a meeting. Cancelling twice is fine.
    pub fn delete_meeting(&self, meeting_id: &str) -> ToolReply {
        ToolReply::from_result(self.try_delete_meeting(meeting_id))
    }

    /// Meetings on a `YYYY-MM-DD` date.
    pub fn events_for_day(&self, date: &str) -> ToolReply {
        ToolReply::from_result(self.try_events_for_day(date))
    }

    /// Meetings this week (Monday to Sunday).
    pub fn events_for_week(&self) -> ToolReply {
        ToolReply::from_result(self.try_events_for_week())
    }

    fn try_check_availability(
        &self,
        attendees: &[String],
        start: &str,
        end: &str,
    ) -> Result<ToolReply> {
        let window = TimeWindow::parse(start, end)?;
        let free = self.facade.check_availability(attendees.iter().cloned(), &window)?;
        let message = if free {
            format!("Everyone is free from {}.", describe_window(&window))
        } else {
            format!("Not everyone is free from {}.", describe_window(&window))
        };
        Ok(ToolReply::ok(message, json!({ "free": free, "window": window })))
    }

    fn try_find_next_slot(&self, attendees: &[String], duration_minutes: f64) -> Result<ToolReply> {
        let duration = MeetingDuration::from_minutes_f64(duration_minutes)?;
        let search = self
            .facade
            .find_slot(attendees.iter().cloned(), i64::from(duration.minutes()))?;
        Ok(slot_reply(&search))
    }

    fn try_list_available_slots(
        &self,
        attendees: &[String],
        duration_minutes: f64,
    ) -> Result<ToolReply> {
        let duration = MeetingDuration::from_minutes_f64(duration_minutes)?;
        let search = self
            .facade
            .find_all_slots(attendees.iter().cloned(), i64::from(duration.minutes()))?;
        if let Some(reason) = search.not_found_reason() {
            return Err(SchedulingError::NoFreeSlot {
                degraded: reason == NotFoundReason::Degraded,
            });
        }
        let starts: Vec<String> = search
            .slots
            .iter()
            .map(|s| s.start().format("%H:%M").to_string())
            .collect();
        Ok(ToolReply::ok(
            format!(
                "Free {}-minute slots today start at: {}.",
                duration.minutes(),
                starts.join(", ")
            ),
            serde_json::to_value(&search).unwrap_or(Value::Null),
        ))
    }

    fn try_schedule_meeting(
        &self,
        title: &str,
        description: &str,
        attendees: &[String],
        start: &str,
        duration_minutes: f64,
    ) -> Result<ToolReply> {
        let duration = MeetingDuration::from_minutes_f64(duration_minutes)?;
        let slot = Slot {
            window: TimeWindow::starting_at(parse_instant(start)?, duration),
        };
        let meeting = self
            .facade
            .schedule(title, description, attendees.iter().cloned(), &slot)?;
        Ok(meeting_reply("scheduled", &meeting))
    }

    fn try_book_next_available(
        &self,
        title: &str,
        description: &str,
        attendees: &[String],
        duration_minutes: f64,
    ) -> Result<ToolReply> {
        let duration = MeetingDuration::from_minutes_f64(duration_minutes)?;
        let meeting = self.facade.book_next_slot(
            title,
            description,
            attendees.iter().cloned(),
            i64::from(duration.minutes()),
        )?;
        Ok(meeting_reply("scheduled", &meeting))
    }

    fn try_update_meeting(
        &self,
        meeting_id: &str,
        new_title: Option<&str>,
        new_start: Option<&str>,
        new_duration_minutes: Option<f64>,
    ) -> Result<ToolReply> {
        let update = MeetingUpdate {
            title: new_title
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            start: new_start
                .filter(|s| !s.trim().is_empty())
                .map(parse_instant)
                .transpose()?,
            duration: new_duration_minutes
                .map(MeetingDuration::from_minutes_f64)
                .transpose()?,
        };
        let meeting = self.facade.reschedule(meeting_id, &update)?;
        Ok(meeting_reply("updated", &meeting))
    }

    fn try_delete_meeting(&self, meeting_id: &str) -> Result<ToolReply> {
        let outcome = self.facade.cancel(meeting_id)?;
        let message = match outcome {
            CancelOutcome::Cancelled => format!(
                "Success! Meeting '{meeting_id}' has been cancelled and attendees notified."
            ),
            CancelOutcome::AlreadyGone => {
                format!("Meeting '{meeting_id}' was already cancelled.")
            }
        };
        Ok(ToolReply::ok(message, json!({ "id": meeting_id, "outcome": outcome })))
    }

    fn try_events_for_day(&self, date: &str) -> Result<ToolReply> {
        let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
            SchedulingError::Config(format!("'{date}' is not a YYYY-MM-DD date: {e}"))
        })?;
        let meetings = self.facade.events_for_day(day)?;
        Ok(agenda_reply(&format!("on {day}"), &meetings))
    }

    fn try_events_for_week(&self) -> Result<ToolReply> {
        let meetings = self.facade.events_for_week()?;
        Ok(agenda_reply("this week", &meetings))
    }
}

fn slot_reply(search: &SlotSearch) -> ToolReply {
    let data = serde_json::to_value(search).unwrap_or(Value::Null);
    match search.slot() {
        Some(slot) => ToolReply::ok(
            format!("The next free slot for everyone is {}.", describe_window(&slot.window)),
            data,
        ),
        None => {
            let degraded = search.not_found_reason() == Some(NotFoundReason::Degraded);
            let mut reply = ToolReply::failure(&SchedulingError::NoFreeSlot { degraded });
            reply.data = data;
            reply
        }
    }
}

fn meeting_reply(verb: &str, meeting: &Meeting) -> ToolReply {
    let invited: Vec<&str> = meeting.attendees.iter().map(|a| a.as_str()).collect();
    let mut message = format!(
        "Success! Meeting '{}' {verb} for {}. Attendees notified: {}.",
        meeting.title,
        describe_window(&meeting.window),
        invited.join(", ")
    );
    if let Some(link) = &meeting.conferencing_link {
        message.push_str(&format!(" Join link: {link}"));
    }
    ToolReply::ok(message, serde_json::to_value(meeting).unwrap_or(Value::Null))
}

fn agenda_reply(period: &str, meetings: &[Meeting]) -> ToolReply {
    let message = if meetings.is_empty() {
        format!("You have no meetings {period}.")
    } else {
        let lines: Vec<String> = meetings
            .iter()
            .map(|m| format!("- {} ({}) [{}]", m.title, describe_window(&m.window), m.id))
            .collect();
        format!("You have {} meeting(s) {period}:\n{}", meetings.len(), lines.join("\n"))
    };
    ToolReply::ok(message, serde_json::to_value(meetings).unwrap_or(Value::Null))
}

fn describe_window(window: &TimeWindow) -> String {
    format!("{} to {}", describe_instant(window.start()), window.end().format("%H:%M"))
}

fn describe_instant(t: DateTime<FixedOffset>) -> String {
    t.format("%a %d %b %H:%M (UTC%:z)").to_string()
}
