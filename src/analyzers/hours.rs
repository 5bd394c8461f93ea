use chrono::{DateTime, FixedOffset, Timelike};

use crate::types::{HourCount, HourSample, RankedHours};

pub const HOURS_PER_DAY: usize = 24;

/// Local hour of day (0–23) of an epoch-seconds timestamp.
pub fn local_hour(timestamp: i64, offset: FixedOffset) -> Option<u32> {
    DateTime::from_timestamp(timestamp, 0).map(|utc| utc.with_timezone(&offset).hour())
}

/// Buckets samples by local hour and orders the hours busiest first.
///
/// Hours with equal counts keep the order in which they were first seen.
/// Timestamps chrono cannot represent are ignored.
pub fn rank_hours(samples: &[HourSample], offset: FixedOffset) -> RankedHours {
    let mut counts: Vec<HourCount> = Vec::with_capacity(HOURS_PER_DAY);

    for hour in samples.iter().filter_map(|s| local_hour(s.timestamp, offset)) {
        match counts.iter_mut().find(|c| c.hour == hour) {
            Some(bucket) => bucket.count += 1,
            None => counts.push(HourCount { hour, count: 1 }),
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(HOURS_PER_DAY);

    RankedHours(counts)
}
