//! Source of "now" and local calendar-day boundaries.

use chrono::{DateTime, Datelike, Days, FixedOffset, Local, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SchedulingError};
use crate::model::TimeWindow;

pub trait Clock {
    /// Current instant in the user's local offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// How [`SystemClock`] picks the local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalZone {
    /// The host's local zone.
    #[default]
    System,
    /// A fixed UTC offset.
    Fixed(FixedOffset),
    /// An IANA zone; the offset in effect at the current instant is used.
    Named(Tz),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    zone: LocalZone,
}

impl SystemClock {
    pub fn new(zone: LocalZone) -> Self {
        Self { zone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.zone {
            LocalZone::System => Local::now().fixed_offset(),
            LocalZone::Fixed(offset) => Utc::now().with_timezone(&offset),
            LocalZone::Named(tz) => Utc::now().with_timezone(&tz).fixed_offset(),
        }
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Midnight at the start of `date` in `offset`.
///
/// # Errors
/// `SchedulingError::Config` if the date is out of chrono's range.
pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    date.and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(offset).single())
        .ok_or_else(|| SchedulingError::Config(format!("date {date} is out of range")))
}

/// The whole local day of `date`: `[00:00, next 00:00)` in `offset`.
///
/// # Errors
/// `SchedulingError::Config` if the date is out of range.
pub fn day_window(date: NaiveDate, offset: FixedOffset) -> Result<TimeWindow> {
    let next = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| SchedulingError::Config(format!("date {date} is out of range")))?;
    TimeWindow::new(start_of_day(date, offset)?, start_of_day(next, offset)?)
}

/// End of the local day containing `now` (the following midnight).
///
/// # Errors
/// `SchedulingError::Config` if the date is out of range.
pub fn end_of_day(now: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>> {
    Ok(day_window(now.date_naive(), *now.offset())?.end())
}

/// Monday 00:00 through the following Monday 00:00 around `now`.
///
/// # Errors
/// `SchedulingError::Config` if the dates are out of range.
pub fn week_window(now: DateTime<FixedOffset>) -> Result<TimeWindow> {
    let today = now.date_naive();
    let since_monday = u64::from(today.weekday().num_days_from_monday());
    let monday = today
        .checked_sub_days(Days::new(since_monday))
        .ok_or_else(|| SchedulingError::Config(format!("date {today} is out of range")))?;
    let next_monday = monday
        .checked_add_days(Days::new(7))
        .ok_or_else(|| SchedulingError::Config(format!("date {monday} is out of range")))?;
    TimeWindow::new(
        start_of_day(monday, *now.offset())?,
        start_of_day(next_monday, *now.offset())?,
    )
}
