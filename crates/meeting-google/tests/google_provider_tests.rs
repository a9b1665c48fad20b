//! Tests for the Google Calendar provider against a mock HTTP server.

use std::collections::BTreeSet;

use httpmock::prelude::*;
use httpmock::Method::PATCH;
use meeting_engine::model::{attendee_set, EventPatch, MeetingStatus, NewMeeting};
use meeting_engine::{AttendeeId, CalendarBusy, CalendarProvider, ProviderError, TimeWindow};
use meeting_google::GoogleCalendarProvider;
use serde_json::json;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn provider(server: &MockServer) -> GoogleCalendarProvider {
    GoogleCalendarProvider::new("test-token")
        .unwrap()
        .with_base_url(server.base_url())
}

fn window(start: &str, end: &str) -> TimeWindow {
    TimeWindow::parse(start, end).unwrap()
}

fn people() -> BTreeSet<AttendeeId> {
    attendee_set(["alice@x.com", "bob@x.com", "ghost@elsewhere.org"]).unwrap()
}

fn event_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": "confirmed",
        "summary": "Design review",
        "description": "Walk through the draft",
        "start": { "dateTime": "2026-03-16T10:00:00+05:30" },
        "end": { "dateTime": "2026-03-16T10:30:00+05:30" },
        "attendees": [
            { "email": "alice@x.com", "responseStatus": "needsAction" },
            { "email": "bob@x.com" }
        ],
        "hangoutLink": "https://meet.google.com/abc-defg-hij"
    })
}

fn new_meeting() -> NewMeeting {
    NewMeeting {
        title: "Design review".to_string(),
        description: "Walk through the draft".to_string(),
        window: window("2026-03-16T10:00:00+05:30", "2026-03-16T10:30:00+05:30"),
        attendees: attendee_set(["alice@x.com", "bob@x.com"]).unwrap(),
        want_conferencing: true,
        notify_attendees: true,
    }
}

fn id(raw: &str) -> AttendeeId {
    AttendeeId::new(raw).unwrap()
}

// ── freeBusy ─────────────────────────────────────────────────────────────────

#[test]
fn free_busy_maps_calendars_and_errors() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/freeBusy")
            .header("authorization", "Bearer test-token")
            .body_contains("alice@x.com");
        then.status(200).json_body(json!({
            "kind": "calendar#freeBusy",
            "calendars": {
                "alice@x.com": {
                    "busy": [
                        { "start": "2026-03-16T10:00:00Z", "end": "2026-03-16T10:30:00Z" }
                    ]
                },
                "bob@x.com": { "busy": [] },
                "ghost@elsewhere.org": {
                    "errors": [{ "domain": "global", "reason": "notFound" }],
                    "busy": []
                }
            }
        }));
    });

    let answer = provider(&server)
        .query_free_busy(&people(), &window("2026-03-16T09:00:00Z", "2026-03-16T17:00:00Z"))
        .unwrap();

    mock.assert();
    assert_eq!(
        answer[&id("alice@x.com")],
        CalendarBusy::Busy(vec![window("2026-03-16T10:00:00Z", "2026-03-16T10:30:00Z")])
    );
    assert_eq!(answer[&id("bob@x.com")], CalendarBusy::Busy(vec![]));
    assert_eq!(answer[&id("ghost@elsewhere.org")], CalendarBusy::NoData);
}

#[test]
fn missing_calendar_is_no_data() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/freeBusy");
        then.status(200).json_body(json!({ "calendars": {} }));
    });

    let answer = provider(&server)
        .query_free_busy(&people(), &window("2026-03-16T09:00:00Z", "2026-03-16T17:00:00Z"))
        .unwrap();
    assert!(answer.values().all(|b| *b == CalendarBusy::NoData));
}

#[test]
fn status_codes_map_to_provider_errors() {
    let cases = [
        (401, "unavailable"),
        (429, "unavailable"),
        (503, "unavailable"),
        (403, "rejected"),
        (400, "rejected"),
    ];
    for (status, expected) in cases {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/freeBusy");
            then.status(status).body("nope");
        });

        let err = provider(&server)
            .query_free_busy(&people(), &window("2026-03-16T09:00:00Z", "2026-03-16T17:00:00Z"))
            .unwrap_err();
        let kind = match err {
            ProviderError::Unavailable(_) => "unavailable",
            ProviderError::Rejected(_) => "rejected",
            ProviderError::NotFound(_) => "not_found",
            ProviderError::Conflict(_) => "conflict",
        };
        assert_eq!(kind, expected, "HTTP {status}");
    }
}

#[test]
fn unreachable_server_is_unavailable() {
    let google = GoogleCalendarProvider::new("t")
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
    let err = google
        .query_free_busy(&people(), &window("2026-03-16T09:00:00Z", "2026-03-16T17:00:00Z"))
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
}

// ── events ───────────────────────────────────────────────────────────────────

#[test]
fn insert_requests_conferencing_and_notifications() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/calendars/primary/events")
            .query_param("conferenceDataVersion", "1")
            .query_param("sendUpdates", "all")
            .body_contains("hangoutsMeet")
            .body_contains("\"summary\":\"Design review\"");
        then.status(200).json_body(event_json("evt1"));
    });

    let meeting = provider(&server).insert_event(&new_meeting()).unwrap();

    mock.assert();
    assert_eq!(meeting.id, "evt1");
    assert_eq!(meeting.title, "Design review");
    assert_eq!(meeting.attendees.len(), 2);
    assert_eq!(
        meeting.conferencing_link.as_deref(),
        Some("https://meet.google.com/abc-defg-hij")
    );
    assert_eq!(meeting.status, MeetingStatus::Confirmed);
}

#[test]
fn insert_conflict_maps_to_conflict() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/calendars/primary/events");
        then.status(409).body("duplicate");
    });

    let err = provider(&server).insert_event(&new_meeting()).unwrap_err();
    assert!(matches!(err, ProviderError::Conflict(_)));
}

#[test]
fn link_falls_back_to_video_entry_point() {
    let server = MockServer::start();
    let mut body = event_json("evt2");
    body.as_object_mut().unwrap().remove("hangoutLink");
    body["conferenceData"] = json!({
        "entryPoints": [
            { "entryPointType": "phone", "uri": "tel:+1-555-0100" },
            { "entryPointType": "video", "uri": "https://meet.google.com/xyz-wxyz-xyz" }
        ]
    });
    server.mock(|when, then| {
        when.method(GET).path("/calendars/primary/events/evt2");
        then.status(200).json_body(body);
    });

    let meeting = provider(&server).get_event("evt2").unwrap();
    assert_eq!(
        meeting.conferencing_link.as_deref(),
        Some("https://meet.google.com/xyz-wxyz-xyz")
    );
}

#[test]
fn cancelled_event_keeps_cancelled_status() {
    let server = MockServer::start();
    let mut body = event_json("evt3");
    body["status"] = json!("cancelled");
    server.mock(|when, then| {
        when.method(GET).path("/calendars/primary/events/evt3");
        then.status(200).json_body(body);
    });

    let meeting = provider(&server).get_event("evt3").unwrap();
    assert_eq!(meeting.status, MeetingStatus::Cancelled);
}

#[test]
fn patch_preserves_conference_data() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path("/calendars/primary/events/evt1")
            .query_param("conferenceDataVersion", "1")
            .body_contains("\"summary\":\"Renamed\"");
        then.status(200).json_body(event_json("evt1"));
    });

    let patch = EventPatch {
        title: Some("Renamed".to_string()),
        window: None,
        notify_attendees: true,
        preserve_conferencing: true,
    };
    let meeting = provider(&server).update_event("evt1", &patch).unwrap();
    mock.assert();
    assert!(meeting.conferencing_link.is_some());
}

#[test]
fn delete_gone_event_is_not_found() {
    let server = MockServer::start();
    let ok = server.mock(|when, then| {
        when.method(DELETE)
            .path("/calendars/primary/events/evt1")
            .query_param("sendUpdates", "all");
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(DELETE).path("/calendars/primary/events/evt9");
        then.status(410).body("deleted");
    });

    let google = provider(&server);
    google.delete_event("evt1", true).unwrap();
    ok.assert();

    let err = google.delete_event("evt9", true).unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}

#[test]
fn event_id_stays_one_path_segment() {
    let server = MockServer::start();
    let elsewhere = server.mock(|when, then| {
        when.method(DELETE).path("/users/me/calendarList/work");
        then.status(204);
    });
    let event = server.mock(|when, then| {
        when.method(DELETE)
            .path_contains("/calendars/primary/events/")
            .path_contains("%2F");
        then.status(410).body("deleted");
    });

    let err = provider(&server)
        .delete_event("x/../../../../users/me/calendarList/work", true)
        .unwrap_err();

    assert!(matches!(err, ProviderError::NotFound(_)));
    event.assert();
    elsewhere.assert_hits(0);
}

#[test]
fn query_characters_in_event_id_are_encoded() {
    let server = MockServer::start();
    let patched = server.mock(|when, then| {
        when.method(PATCH)
            .path_contains("/calendars/primary/events/evt1%3FsendUpdates%3Dnone%23x")
            .query_param("sendUpdates", "all");
        then.status(200).json_body(event_json("evt1?sendUpdates=none#x"));
    });
    let patch = EventPatch {
        title: Some("Renamed".to_string()),
        window: None,
        notify_attendees: true,
        preserve_conferencing: true,
    };

    let meeting = provider(&server)
        .update_event("evt1?sendUpdates=none#x", &patch)
        .unwrap();

    patched.assert();
    assert_eq!(meeting.id, "evt1?sendUpdates=none#x");
}

#[test]
fn dot_segment_ids_never_reach_the_server() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.any_request();
        then.status(204);
    });

    let google = provider(&server);
    for bad in ["", ".", ".."] {
        let err = google.delete_event(bad, true).unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(_)), "{bad:?}: {err:?}");
        let err = google.get_event(bad).unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(_)), "{bad:?}: {err:?}");
    }
    any.assert_hits(0);
}

#[test]
fn list_events_follows_pages() {
    let server = MockServer::start();
    // Mocks match in registration order; the page-2 mock goes first.
    let second = server.mock(|when, then| {
        when.method(GET)
            .path("/calendars/primary/events")
            .query_param("pageToken", "page2");
        then.status(200).json_body(json!({
            "items": [{
                "id": "allday",
                "summary": "Offsite",
                "start": { "date": "2026-03-17" },
                "end": { "date": "2026-03-18" }
            }]
        }));
    });

    let first = server.mock(|when, then| {
        when.method(GET)
            .path("/calendars/primary/events")
            .query_param("singleEvents", "true")
            .query_param("orderBy", "startTime");
        then.status(200).json_body(json!({
            "items": [event_json("evt1")],
            "nextPageToken": "page2"
        }));
    });

    let meetings = provider(&server)
        .list_events(&window("2026-03-16T00:00:00Z", "2026-03-23T00:00:00Z"))
        .unwrap();

    first.assert();
    second.assert();
    let ids: Vec<_> = meetings.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["evt1", "allday"]);
    assert_eq!(
        meetings[1].window,
        window("2026-03-17T00:00:00Z", "2026-03-18T00:00:00Z")
    );
}
