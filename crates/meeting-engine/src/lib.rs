//! # meeting-engine
//!
//! Multi-attendee meeting scheduling for AI calendar assistants.
//!
//! The engine aggregates free/busy data for a set of attendees, searches
//! forward for the earliest slot that is free for all of them, and manages the
//! lifecycle of the resulting meeting (create with a conferencing link, update
//! preserving it, idempotent delete). It is stateless: the calendar provider
//! is the single source of truth and is re-queried for every decision.
//!
//! ## Modules
//!
//! - [`model`]: attendees, time windows, durations, meetings
//! - [`provider`]: the `CalendarProvider` seam and its error type
//! - [`availability`]: per-attendee busy intervals for a window
//! - [`freebusy`]: merging busy periods and finding gaps
//! - [`conflict`]: busy intervals colliding with a proposed window
//! - [`search`]: earliest-free-slot search with diagnostics
//! - [`lifecycle`]: create / update / delete meetings
//! - [`facade`]: the single entry point for callers
//! - [`tools`]: string-in, message-out adapter for LLM tool calling
//! - [`memory`]: in-process provider (calendar files, tests)
//! - [`clock`], [`cancel`], [`config`], [`error`]

pub mod availability;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod conflict;
pub mod error;
pub mod facade;
pub mod freebusy;
pub mod lifecycle;
pub mod memory;
pub mod model;
pub mod provider;
pub mod search;
pub mod tools;

pub use availability::{AvailabilityResolver, AvailabilitySnapshot, UnknownAttendeePolicy};
pub use cancel::CancelHandle;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use error::SchedulingError;
pub use facade::SchedulingFacade;
pub use lifecycle::MeetingLifecycleManager;
pub use memory::InMemoryProvider;
pub use model::{
    AttendeeId, CancelOutcome, Meeting, MeetingDuration, MeetingUpdate, Slot, TimeWindow,
};
pub use provider::{CalendarBusy, CalendarProvider, ProviderError};
pub use search::{NotFoundReason, SlotSearch, SlotSearchEngine};
pub use tools::{CalendarTools, ToolReply};
