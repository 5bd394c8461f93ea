//! The "today" window sent with every feed request.

use chrono::{DateTime, Days, FixedOffset, TimeZone, Utc};
use serde::Serialize;

use crate::config::Airport;
use crate::error::FeedError;

/// Start of the local day and start of the next local day, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    #[serde(rename = "startTime")]
    pub start_ms: i64,
    #[serde(rename = "endTime")]
    pub end_ms: i64,
}

impl DayWindow {
    /// Window for the airport's current local day. Recomputed on every call.
    pub fn today(airport: &Airport) -> Result<Self, FeedError> {
        Self::containing(Utc::now(), airport.offset())
    }

    /// Window for the local day (at `offset`) that contains `instant`.
    pub fn containing(instant: DateTime<Utc>, offset: FixedOffset) -> Result<Self, FeedError> {
        let midnight = instant
            .with_timezone(&offset)
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| skew_at(instant))?;
        let start = offset
            .from_local_datetime(&midnight)
            .single()
            .ok_or_else(|| skew_at(instant))?;
        let end = start
            .checked_add_days(Days::new(1))
            .ok_or_else(|| skew_at(instant))?;

        Self::new(start.timestamp_millis(), end.timestamp_millis())
    }

    pub fn new(start_ms: i64, end_ms: i64) -> Result<Self, FeedError> {
        if end_ms <= start_ms {
            return Err(FeedError::ClockSkew { start_ms, end_ms });
        }
        Ok(Self { start_ms, end_ms })
    }
}

fn skew_at(instant: DateTime<Utc>) -> FeedError {
    let ms = instant.timestamp_millis();
    FeedError::ClockSkew {
        start_ms: ms,
        end_ms: ms,
    }
}
