//! Core value types: attendees, time windows, durations and meetings.
//!
//! Every instant carries an explicit UTC offset (`DateTime<FixedOffset>`); there
//! are no naive timestamps anywhere in the engine.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};

/// Opaque calendar identity, typically an email address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttendeeId(String);

impl AttendeeId {
    /// Build an identity, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns `SchedulingError::InvalidAttendees` for a blank identity.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(SchedulingError::InvalidAttendees(
                "attendee identity is empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttendeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AttendeeId {
    type Error = SchedulingError;

    fn try_from(value: String) -> Result<Self> {
        AttendeeId::new(value)
    }
}

impl From<AttendeeId> for String {
    fn from(id: AttendeeId) -> Self {
        id.0
    }
}

/// Parse a list of identities into a non-empty, de-duplicated set.
///
/// # Errors
/// Returns `SchedulingError::InvalidAttendees` when any identity is blank or the
/// resulting set is empty.
pub fn attendee_set<I, S>(ids: I) -> Result<BTreeSet<AttendeeId>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set = ids
        .into_iter()
        .map(AttendeeId::new)
        .collect::<Result<BTreeSet<_>>>()?;
    if set.is_empty() {
        return Err(SchedulingError::InvalidAttendees(
            "at least one attendee is required".to_string(),
        ));
    }
    Ok(set)
}

/// A half-open interval `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

#[derive(Deserialize)]
struct RawWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = SchedulingError;

    fn try_from(raw: RawWindow) -> Result<Self> {
        TimeWindow::new(raw.start, raw.end)
    }
}

impl TimeWindow {
    /// # Errors
    /// Returns `SchedulingError::InvalidWindow` unless `start < end`.
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<Self> {
        if start >= end {
            return Err(SchedulingError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// A window of `duration` starting at `start`.
    pub fn starting_at(start: DateTime<FixedOffset>, duration: MeetingDuration) -> Self {
        Self {
            start,
            end: start + duration.as_duration(),
        }
    }

    /// Parse two RFC 3339 strings (offset required).
    ///
    /// # Errors
    /// `SchedulingError::Config` on unparseable input, `InvalidWindow` on ordering.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_instant(start)?, parse_instant(end)?)
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Two windows overlap iff `a.start < b.end && b.start < a.end`.
    /// Adjacent windows do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The part of `self` inside `bounds`, if any.
    pub fn clip_to(&self, bounds: &TimeWindow) -> Option<TimeWindow> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        (start < end).then_some(TimeWindow { start, end })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Parse an RFC 3339 instant. Timestamps without an offset are refused.
///
/// # Errors
/// Returns `SchedulingError::Config` describing the bad input.
pub fn parse_instant(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|e| SchedulingError::Config(format!("'{raw}' is not an RFC 3339 instant: {e}")))
}

/// Round an instant up to the next whole minute (unchanged if already whole).
pub(crate) fn ceil_to_minute(t: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    if t.second() == 0 && t.nanosecond() == 0 {
        return t;
    }
    let truncated = t - Duration::seconds(i64::from(t.second()))
        - Duration::nanoseconds(i64::from(t.nanosecond()));
    truncated + Duration::minutes(1)
}

/// A strictly positive whole number of minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MeetingDuration(u32);

impl MeetingDuration {
    /// # Errors
    /// `SchedulingError::InvalidDuration` for zero, negative or oversized values.
    pub fn from_minutes(minutes: i64) -> Result<Self> {
        if minutes <= 0 {
            return Err(SchedulingError::InvalidDuration(format!(
                "{minutes} minutes is not a positive duration"
            )));
        }
        u32::try_from(minutes)
            .map(Self)
            .map_err(|_| SchedulingError::InvalidDuration(format!("{minutes} minutes is too long")))
    }

    /// Accept a float only when it is a whole number of minutes.
    ///
    /// # Errors
    /// `SchedulingError::InvalidDuration` for fractional, non-finite or
    /// non-positive values.
    pub fn from_minutes_f64(minutes: f64) -> Result<Self> {
        if !minutes.is_finite() || minutes.fract() != 0.0 {
            return Err(SchedulingError::InvalidDuration(format!(
                "{minutes} is not a whole number of minutes"
            )));
        }
        if minutes > f64::from(u32::MAX) {
            return Err(SchedulingError::InvalidDuration(format!("{minutes} minutes is too long")));
        }
        // Whole and in range, so the cast is exact.
        Self::from_minutes(minutes as i64)
    }

    /// The duration of an existing window, rounded up to whole minutes.
    pub fn of_window(window: &TimeWindow) -> Self {
        let secs = window.duration().num_seconds().max(1);
        let minutes = u32::try_from((secs + 59) / 60).unwrap_or(u32::MAX);
        Self(minutes)
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::minutes(i64::from(self.0))
    }
}

impl TryFrom<i64> for MeetingDuration {
    type Error = SchedulingError;

    fn try_from(value: i64) -> Result<Self> {
        MeetingDuration::from_minutes(value)
    }
}

impl From<MeetingDuration> for i64 {
    fn from(d: MeetingDuration) -> Self {
        i64::from(d.0)
    }
}

/// A proposed window free for every queried attendee.
///
/// A slot is a proposal, not a reservation: nothing is held on the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub window: TimeWindow,
}

impl Slot {
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.window.start()
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.window.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Confirmed,
    Cancelled,
}

/// A meeting as held by the calendar provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub window: TimeWindow,
    pub attendees: BTreeSet<AttendeeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conferencing_link: Option<String>,
    pub status: MeetingStatus,
}

/// Insert payload for a new event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeeting {
    pub title: String,
    pub description: String,
    pub window: TimeWindow,
    pub attendees: BTreeSet<AttendeeId>,
    pub want_conferencing: bool,
    pub notify_attendees: bool,
}

/// Partial update sent to the provider. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub window: Option<TimeWindow>,
    pub notify_attendees: bool,
    /// Keep existing conferencing data on the event.
    pub preserve_conferencing: bool,
}

/// Caller-facing update request for an existing meeting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeetingUpdate {
    pub title: Option<String>,
    pub start: Option<DateTime<FixedOffset>>,
    /// Without a duration the original meeting length is kept.
    pub duration: Option<MeetingDuration>,
}

impl MeetingUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Move to exactly `window` (start and length).
    pub fn window(window: TimeWindow) -> Self {
        Self {
            title: None,
            start: Some(window.start()),
            duration: Some(MeetingDuration::of_window(&window)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start.is_none() && self.duration.is_none()
    }
}

/// Acknowledgement of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// The provider deleted the event and notified attendees.
    Cancelled,
    /// The event was already gone; nothing to do.
    AlreadyGone,
}
