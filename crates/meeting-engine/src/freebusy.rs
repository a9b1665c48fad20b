//! Interval arithmetic over busy periods.
//!
//! Sorts busy intervals by start time, merges overlapping or adjacent periods,
//! then answers gap questions within a given window.

use chrono::{DateTime, Duration, FixedOffset};

use crate::model::{ceil_to_minute, TimeWindow};

/// Merge overlapping or adjacent busy periods, clipped to `bounds`.
///
/// Returns a sorted, non-overlapping list of windows.
pub fn merge_busy_periods<'a, I>(busy: I, bounds: &TimeWindow) -> Vec<TimeWindow>
where
    I: IntoIterator<Item = &'a TimeWindow>,
{
    // Clip to the bounds, discarding intervals entirely outside.
    let mut intervals: Vec<TimeWindow> = busy
        .into_iter()
        .filter_map(|w| w.clip_to(bounds))
        .collect();

    if intervals.is_empty() {
        return Vec::new();
    }

    intervals.sort_by_key(|w| (w.start(), w.end()));

    let mut merged: Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)> = Vec::new();
    for w in intervals {
        if let Some(last) = merged.last_mut() {
            if w.start() <= last.1 {
                // Overlapping or adjacent: extend the current interval.
                last.1 = last.1.max(w.end());
                continue;
            }
        }
        merged.push((w.start(), w.end()));
    }

    merged
        .into_iter()
        .filter_map(|(start, end)| TimeWindow::new(start, end).ok())
        .collect()
}

/// Free gaps between merged busy periods inside `bounds`, sorted by start.
pub fn find_free_gaps<'a, I>(busy: I, bounds: &TimeWindow) -> Vec<TimeWindow>
where
    I: IntoIterator<Item = &'a TimeWindow>,
{
    let merged = merge_busy_periods(busy, bounds);

    let mut gaps = Vec::new();
    let mut cursor = bounds.start();

    for block in &merged {
        if cursor < block.start() {
            if let Ok(gap) = TimeWindow::new(cursor, block.start()) {
                gaps.push(gap);
            }
        }
        cursor = cursor.max(block.end());
    }

    // Trailing gap after the last busy period.
    if cursor < bounds.end() {
        if let Ok(gap) = TimeWindow::new(cursor, bounds.end()) {
            gaps.push(gap);
        }
    }

    gaps
}

/// Earliest whole-minute `t` in `[bounds.start, latest_start]` such that
/// `[t, t + length)` lies inside `bounds` and clear of every busy period.
///
/// Gap starts falling between minutes are rounded up to the next minute.
pub fn earliest_free_start<'a, I>(
    busy: I,
    bounds: &TimeWindow,
    latest_start: DateTime<FixedOffset>,
    length: Duration,
) -> Option<DateTime<FixedOffset>>
where
    I: IntoIterator<Item = &'a TimeWindow>,
{
    find_free_gaps(busy, bounds)
        .into_iter()
        .map(|gap| (ceil_to_minute(gap.start()), gap.end()))
        .take_while(|(start, _)| *start <= latest_start)
        .find(|(start, end)| *start + length <= *end)
        .map(|(start, _)| start)
}

/// End of the merged busy block containing `instant`, if `instant` is busy.
///
/// A block ending exactly at `instant` does not contain it.
pub fn busy_until<'a, I>(
    busy: I,
    bounds: &TimeWindow,
    instant: DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>>
where
    I: IntoIterator<Item = &'a TimeWindow>,
{
    merge_busy_periods(busy, bounds)
        .into_iter()
        .find(|block| block.start() <= instant && instant < block.end())
        .map(|block| block.end())
}
