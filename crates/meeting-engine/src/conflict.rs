//! Detect busy intervals that collide with a proposed window.
//!
//! Adjacent intervals (where one ends exactly when another starts) are NOT
//! conflicts.

use crate::availability::AvailabilitySnapshot;
use crate::model::{AttendeeId, TimeWindow};

/// A busy interval of one attendee overlapping a proposed window.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub attendee: AttendeeId,
    pub busy: TimeWindow,
    pub overlap_minutes: i64,
}

/// Every busy interval in `snapshot` that overlaps `proposed`.
///
/// The overlap duration is `min(a.end, b.end) - max(a.start, b.start)`.
pub fn find_conflicts(proposed: &TimeWindow, snapshot: &AvailabilitySnapshot) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (attendee, busy) in snapshot.iter() {
        for interval in busy {
            if let Some(overlap) = interval.clip_to(proposed) {
                conflicts.push(Conflict {
                    attendee: attendee.clone(),
                    busy: *interval,
                    overlap_minutes: overlap.duration().num_minutes(),
                });
            }
        }
    }

    conflicts
}
