//! Flight records and the per-cycle values derived from them.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Which half of the flight information board a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Departures,
    Arrivals,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Departures, Direction::Arrivals];

    /// Path segment of the FIDS web service for this direction.
    pub fn path(&self) -> &'static str {
        match self {
            Direction::Departures => "departures",
            Direction::Arrivals => "arrivals",
        }
    }

    /// JSON key carrying the actual take-off / touch-down time.
    pub fn actual_time_key(&self) -> &'static str {
        match self {
            Direction::Departures => "actualTimeOfDep",
            Direction::Arrivals => "actualTimeOfArr",
        }
    }

    /// JSON key (under `lang.en`) naming the country at the other end of the flight.
    pub fn counterpart_country_key(&self) -> &'static str {
        match self {
            Direction::Departures => "destinationCountry",
            Direction::Arrivals => "originCountry",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "departures" | "departure" | "dep" => Ok(Direction::Departures),
            "arrivals" | "arrival" | "arr" => Ok(Direction::Arrivals),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// One flight as reported by the feed. Times are epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawFlightRecord {
    pub airline: String,
    pub flight_number: String,
    pub scheduled_time: i64,
    pub actual_time: Option<i64>,
    pub status: Option<String>,
    /// Destination for departures, origin for arrivals.
    pub counterpart_country: Option<String>,
}

/// Rollup of every sighting of one airline within a single cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirlineSnapshotEntry {
    pub airline: String,
    /// Matching record with the latest scheduled time.
    pub representative: RawFlightRecord,
    pub match_count: usize,
    /// Matching record with the latest actual operation time, if any has operated.
    pub most_recent: Option<RawFlightRecord>,
}

/// Top airlines of one direction for one cycle, in ranking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectionSnapshot {
    pub direction: Direction,
    pub entries: Vec<AirlineSnapshotEntry>,
}

impl DirectionSnapshot {
    pub fn empty(direction: Direction) -> Self {
        Self {
            direction,
            entries: Vec::new(),
        }
    }

    pub fn get(&self, airline: &str) -> Option<&AirlineSnapshotEntry> {
        self.entries.iter().find(|e| e.airline == airline)
    }

    pub fn airlines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.airline.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An actual operation timestamp feeding the busiest-hours histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourSample {
    pub timestamp: i64,
}

/// One bucket of the busiest-hours histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

/// Local hours of day ordered busiest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RankedHours(pub Vec<HourCount>);

impl RankedHours {
    pub fn hours(&self) -> Vec<u32> {
        self.0.iter().map(|h| h.hour).collect()
    }

    pub fn busiest(&self) -> Option<HourCount> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ranked hours of both directions, handed to the display layer as one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusiestHours {
    pub departures: RankedHours,
    pub arrivals: RankedHours,
}

impl BusiestHours {
    pub fn get(&self, direction: Direction) -> &RankedHours {
        match direction {
            Direction::Departures => &self.departures,
            Direction::Arrivals => &self.arrivals,
        }
    }

    pub fn set(&mut self, direction: Direction, hours: RankedHours) {
        match direction {
            Direction::Departures => self.departures = hours,
            Direction::Arrivals => self.arrivals = hours,
        }
    }
}
