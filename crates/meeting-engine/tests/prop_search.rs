//! Property-based tests for the slot search using proptest.
//!
//! Busy calendars are generated at minute granularity and the search result is
//! compared against a brute-force scan of every candidate minute.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, FixedOffset};
use meeting_engine::{
    AttendeeId, AvailabilityResolver, CancelHandle, InMemoryProvider, MeetingDuration,
    SlotSearchEngine, TimeWindow, UnknownAttendeePolicy,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const PEOPLE: [&str; 3] = ["a@x.com", "b@x.com", "c@x.com"];

/// (attendee index, start minute after 08:00, length in minutes)
fn arb_busy() -> impl Strategy<Value = Vec<(usize, i64, i64)>> {
    prop::collection::vec((0usize..3, 0i64..600, 1i64..=120), 0..12)
}

fn base() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-03-16T08:00:00-04:00").unwrap()
}

fn minute(n: i64) -> DateTime<FixedOffset> {
    base() + Duration::minutes(n)
}

fn build(busy: &[(usize, i64, i64)]) -> (InMemoryProvider, Vec<TimeWindow>) {
    let provider = InMemoryProvider::new();
    for name in PEOPLE {
        provider.register(&AttendeeId::new(name).unwrap());
    }
    let mut windows = Vec::new();
    for &(who, start, len) in busy {
        let w = TimeWindow::new(minute(start), minute(start + len)).unwrap();
        provider.add_busy(&AttendeeId::new(PEOPLE[who]).unwrap(), w);
        windows.push(w);
    }
    (provider, windows)
}

fn everyone() -> BTreeSet<AttendeeId> {
    PEOPLE.iter().map(|p| AttendeeId::new(*p).unwrap()).collect()
}

/// Earliest minute whose window is free, by exhaustive scan.
fn brute_force(busy: &[TimeWindow], start: i64, horizon: i64, duration: i64) -> Option<i64> {
    (start..=horizon - duration).find(|&t| {
        let candidate = TimeWindow::new(minute(t), minute(t + duration)).unwrap();
        !busy.iter().any(|b| b.overlaps(&candidate))
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn finds_the_earliest_free_slot(
        busy in arb_busy(),
        duration in 5i64..=90,
        start in 0i64..120,
        span in 60i64..=600,
    ) {
        let (provider, windows) = build(&busy);
        let horizon = start + span;
        let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::AssumeFree);

        let result = SlotSearchEngine::new(&resolver)
            .find_next_slot(
                &everyone(),
                MeetingDuration::from_minutes(duration).unwrap(),
                minute(start),
                minute(horizon),
                &CancelHandle::new(),
            )
            .unwrap();

        let expected = brute_force(&windows, start, horizon, duration).map(minute);
        prop_assert_eq!(result.slot().map(|s| s.start()), expected);
    }

    #[test]
    fn found_slot_never_overlaps_busy_time(
        busy in arb_busy(),
        duration in 5i64..=90,
        start in 0i64..120,
    ) {
        let (provider, windows) = build(&busy);
        let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::AssumeFree);

        let result = SlotSearchEngine::new(&resolver)
            .find_all_slots(
                &everyone(),
                MeetingDuration::from_minutes(duration).unwrap(),
                minute(start),
                minute(720),
                &CancelHandle::new(),
            )
            .unwrap();

        for slot in &result.slots {
            prop_assert!(slot.start() >= minute(start));
            prop_assert!(slot.end() <= minute(720));
            prop_assert_eq!(slot.window.duration(), Duration::minutes(duration));
            for b in &windows {
                prop_assert!(!b.overlaps(&slot.window), "{} overlaps {}", slot.window, b);
            }
        }
        for pair in result.slots.windows(2) {
            prop_assert!(pair[0].end() <= pair[1].start());
        }
    }

    #[test]
    fn rounds_are_bounded_by_horizon_over_duration(
        busy in arb_busy(),
        duration in 5i64..=90,
        start in 0i64..120,
        span in 1i64..=600,
    ) {
        let (provider, _) = build(&busy);
        let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::AssumeFree);

        let result = SlotSearchEngine::new(&resolver)
            .find_next_slot(
                &everyone(),
                MeetingDuration::from_minutes(duration).unwrap(),
                minute(start),
                minute(start + span),
                &CancelHandle::new(),
            )
            .unwrap();

        let bound = ((span + duration - 1) / duration) as usize;
        prop_assert!(result.windows_evaluated <= bound);
        prop_assert_eq!(result.windows_evaluated, provider.free_busy_calls());
    }
}
