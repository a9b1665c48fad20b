//! Tests for free/busy resolution and the unknown-attendee policy.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};
use meeting_engine::model::attendee_set;
use meeting_engine::{
    AttendeeId, AvailabilityResolver, InMemoryProvider, SchedulingError, TimeWindow,
    UnknownAttendeePolicy,
};

fn at(hh_mm: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(&format!("2026-03-16T{hh_mm}:00Z")).unwrap()
}

fn window(start: &str, end: &str) -> TimeWindow {
    TimeWindow::new(at(start), at(end)).unwrap()
}

fn id(raw: &str) -> AttendeeId {
    AttendeeId::new(raw).unwrap()
}

fn provider() -> InMemoryProvider {
    let provider = InMemoryProvider::new();
    provider.add_busy(&id("a@x.com"), window("10:00", "10:30"));
    provider.add_busy(&id("a@x.com"), window("10:15", "11:00"));
    provider.register(&id("b@x.com"));
    provider
}

#[test]
fn busy_intervals_are_reported_per_attendee_and_clipped() {
    let provider = provider();
    let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::AssumeFree);
    let attendees = attendee_set(["a@x.com", "b@x.com"]).unwrap();

    let snapshot = resolver.resolve(&attendees, &window("10:20", "12:00")).unwrap();

    // Overlapping intervals of one attendee are kept as reported, clipped to the window.
    assert_eq!(
        snapshot.busy_for(&id("a@x.com")),
        &[window("10:20", "10:30"), window("10:20", "11:00")]
    );
    assert!(snapshot.busy_for(&id("b@x.com")).is_empty());
    assert!(!snapshot.is_free());
    assert_eq!(snapshot.window(), &window("10:20", "12:00"));
}

#[test]
fn one_aggregated_query_per_resolve() {
    let provider = provider();
    let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::AssumeFree);
    let attendees = attendee_set(["a@x.com", "b@x.com", "c@x.com"]).unwrap();

    resolver.resolve(&attendees, &window("09:00", "17:00")).unwrap();
    resolver.resolve(&attendees, &window("09:00", "17:00")).unwrap();

    // No caching: two resolves, two queries.
    assert_eq!(provider.free_busy_calls(), 2);
}

#[test]
fn unknown_attendee_is_free_by_default() {
    let provider = provider();
    let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::default());
    let attendees = attendee_set(["ghost@elsewhere.org"]).unwrap();

    let snapshot = resolver.resolve(&attendees, &window("10:00", "11:00")).unwrap();
    assert!(snapshot.is_free());
}

#[test]
fn unknown_attendee_can_be_assumed_busy() {
    let provider = provider();
    let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::AssumeBusy);
    let attendees = attendee_set(["ghost@elsewhere.org", "b@x.com"]).unwrap();

    let snapshot = resolver.resolve(&attendees, &window("10:00", "11:00")).unwrap();
    assert_eq!(
        snapshot.busy_for(&id("ghost@elsewhere.org")),
        &[window("10:00", "11:00")]
    );
    assert!(snapshot.busy_for(&id("b@x.com")).is_empty());
}

#[test]
fn unknown_attendee_can_be_rejected() {
    let provider = provider();
    let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::Reject);
    let attendees = attendee_set(["a@x.com", "ghost@elsewhere.org"]).unwrap();

    let err = resolver.resolve(&attendees, &window("10:00", "11:00")).unwrap_err();
    assert_eq!(err, SchedulingError::UnknownAttendee("ghost@elsewhere.org".to_string()));
}

#[test]
fn provider_failure_surfaces_as_unavailable() {
    let provider = provider();
    provider.set_unavailable(true);
    let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::AssumeFree);
    let attendees = attendee_set(["a@x.com"]).unwrap();

    let err = resolver.resolve(&attendees, &window("10:00", "11:00")).unwrap_err();
    assert!(matches!(err, SchedulingError::ProviderUnavailable(_)));
    assert_eq!(provider.free_busy_calls(), 1, "resolver must not retry");
}

#[test]
fn empty_attendee_set_is_rejected() {
    let provider = provider();
    let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::AssumeFree);

    let err = resolver
        .resolve(&BTreeSet::new(), &window("10:00", "11:00"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::InvalidAttendees(_)));
    assert_eq!(provider.free_busy_calls(), 0);
}

#[test]
fn confirmed_meetings_count_as_busy_for_their_attendees() {
    use meeting_engine::lifecycle::LifecyclePolicy;
    use meeting_engine::{MeetingLifecycleManager, Slot};

    let provider = provider();
    let lifecycle = MeetingLifecycleManager::new(&provider, LifecyclePolicy::default());
    let attendees = attendee_set(["b@x.com"]).unwrap();
    lifecycle
        .create("Sync", "", &attendees, &Slot { window: window("13:00", "13:30") })
        .unwrap();

    let resolver = AvailabilityResolver::new(&provider, UnknownAttendeePolicy::AssumeFree);
    let snapshot = resolver.resolve(&attendees, &window("12:00", "14:00")).unwrap();
    assert_eq!(snapshot.busy_for(&id("b@x.com")), &[window("13:00", "13:30")]);
}
