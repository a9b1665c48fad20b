//! Tests for the in-process calendar provider.

use meeting_engine::memory::CalendarStore;
use meeting_engine::model::{attendee_set, MeetingStatus, NewMeeting};
use meeting_engine::{
    AttendeeId, CalendarBusy, CalendarProvider, InMemoryProvider, ProviderError, TimeWindow,
};

fn window(start: &str, end: &str) -> TimeWindow {
    TimeWindow::parse(
        &format!("2026-03-16T{start}:00Z"),
        &format!("2026-03-16T{end}:00Z"),
    )
    .unwrap()
}

fn id(raw: &str) -> AttendeeId {
    AttendeeId::new(raw).unwrap()
}

fn new_meeting() -> NewMeeting {
    NewMeeting {
        title: "Sync".to_string(),
        description: String::new(),
        window: window("11:00", "11:30"),
        attendees: attendee_set(["a@x.com"]).unwrap(),
        want_conferencing: true,
        notify_attendees: true,
    }
}

#[test]
fn free_busy_clips_and_reports_unknown_identities() {
    let provider = InMemoryProvider::new();
    provider.add_busy(&id("a@x.com"), window("08:00", "09:30"));

    let answer = provider
        .query_free_busy(
            &attendee_set(["a@x.com", "nobody@x.com"]).unwrap(),
            &window("09:00", "12:00"),
        )
        .unwrap();
    assert_eq!(answer[&id("a@x.com")], CalendarBusy::Busy(vec![window("09:00", "09:30")]));
    assert_eq!(answer[&id("nobody@x.com")], CalendarBusy::NoData);
}

#[test]
fn cancelled_meetings_stop_blocking_time() {
    let provider = InMemoryProvider::new();
    provider.register(&id("a@x.com"));
    let meeting = provider.insert_event(&new_meeting()).unwrap();
    let attendees = attendee_set(["a@x.com"]).unwrap();

    let busy = provider.query_free_busy(&attendees, &window("09:00", "12:00")).unwrap();
    assert_eq!(busy[&id("a@x.com")], CalendarBusy::Busy(vec![window("11:00", "11:30")]));

    provider.delete_event(&meeting.id, true).unwrap();
    let busy = provider.query_free_busy(&attendees, &window("09:00", "12:00")).unwrap();
    assert_eq!(busy[&id("a@x.com")], CalendarBusy::Busy(vec![]));
    assert!(matches!(
        provider.delete_event(&meeting.id, true),
        Err(ProviderError::NotFound(_))
    ));
    assert!(provider.list_events(&window("09:00", "12:00")).unwrap().is_empty());
}

#[test]
fn save_and_load_preserve_the_calendar() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("calendar.json");

    let provider = InMemoryProvider::new();
    provider.add_busy(&id("a@x.com"), window("09:00", "10:00"));
    let meeting = provider.insert_event(&new_meeting()).unwrap();
    provider.save(&path).unwrap();

    let loaded = InMemoryProvider::load(&path).unwrap();
    assert_eq!(loaded.snapshot(), provider.snapshot());
    let fetched = loaded.get_event(&meeting.id).unwrap();
    assert_eq!(fetched.status, MeetingStatus::Confirmed);
    assert_eq!(fetched.conferencing_link, meeting.conferencing_link);
}

#[test]
fn malformed_calendar_file_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("calendar.json");
    std::fs::write(&path, r#"{"calendars": {}, "unexpected": 1}"#).unwrap();

    assert!(InMemoryProvider::load(&path).is_err());
    assert_eq!(
        serde_json::from_str::<CalendarStore>("{}").unwrap(),
        CalendarStore::default()
    );
}
