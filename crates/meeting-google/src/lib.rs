//! # meeting-google
//!
//! A [`CalendarProvider`](meeting_engine::CalendarProvider) backed by the
//! Google Calendar v3 REST API, operating on the authenticated user's primary
//! calendar. Requests are blocking; the caller supplies an OAuth access token.

pub mod error;
pub mod provider;
mod wire;

pub use error::GoogleError;
pub use provider::{GoogleCalendarProvider, ACCESS_TOKEN_ENV, GOOGLE_CALENDAR_API_BASE};
