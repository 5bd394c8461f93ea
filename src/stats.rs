use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::FeedError;
use crate::types::{Direction, DirectionSnapshot, RankedHours};

/// Summary of one poll cycle. Recorded on every cycle, including skipped ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleStats {
    pub timestamp: DateTime<Utc>,
    pub direction: Option<Direction>,

    // batch
    pub records: usize,
    pub dropped: usize,

    // outputs
    pub airlines: usize,
    pub top_airline: Option<String>,
    pub top_airline_flights: usize,
    pub operated: usize,
    pub hour_samples: usize,
    pub busiest_hour: Option<u32>,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            direction: None,
            records: 0,
            dropped: 0,
            airlines: 0,
            top_airline: None,
            top_airline_flights: 0,
            operated: 0,
            hour_samples: 0,
            busiest_hour: None,
            error_type: None,
            error_message: None,
        }
    }
}

impl CycleStats {
    pub fn from_cycle(
        snapshot: &DirectionSnapshot,
        hours: &RankedHours,
        records: usize,
        dropped: usize,
    ) -> Self {
        let top = snapshot.entries.first();

        CycleStats {
            direction: Some(snapshot.direction),
            records,
            dropped,
            airlines: snapshot.len(),
            top_airline: top.map(|e| e.airline.clone()),
            top_airline_flights: top.map_or(0, |e| e.match_count),
            operated: snapshot
                .entries
                .iter()
                .filter(|e| e.most_recent.is_some())
                .count(),
            hour_samples: hours.0.iter().map(|h| h.count).sum(),
            busiest_hour: hours.busiest().map(|h| h.hour),
            ..Default::default()
        }
    }

    /// Create an error record with timestamp and error information
    pub fn from_error(direction: Direction, error: &FeedError) -> Self {
        CycleStats {
            direction: Some(direction),
            error_type: Some(error.kind().to_string()),
            error_message: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_type.is_some()
    }

    /// Share of the batch that was malformed, in percent.
    pub fn dropped_pct(&self) -> f64 {
        let total = self.records + self.dropped;
        if total == 0 {
            0.0
        } else {
            (self.dropped as f64 / total as f64) * 100.0
        }
    }
}
