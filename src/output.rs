//! Output formatting and persistence for published snapshots.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::types::{Direction, DirectionSnapshot};

/// One CSV row per airline per published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub published_at: DateTime<Utc>,
    pub direction: Direction,
    pub rank: usize,
    pub airline: String,
    pub flights: usize,
    pub last_flight: String,
    pub last_scheduled: String,
    pub recent_flight: Option<String>,
    pub recent_operated: Option<String>,
    pub recent_status: Option<String>,
    pub recent_country: Option<String>,
}

impl SnapshotRow {
    /// Flattens a snapshot; times are rendered as airport-local `HH:MM`.
    pub fn from_snapshot(
        snapshot: &DirectionSnapshot,
        published_at: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Vec<Self> {
        snapshot
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let recent = entry.most_recent.as_ref();
                SnapshotRow {
                    published_at,
                    direction: snapshot.direction,
                    rank: i + 1,
                    airline: entry.airline.clone(),
                    flights: entry.match_count,
                    last_flight: entry.representative.flight_number.clone(),
                    last_scheduled: clock(entry.representative.scheduled_time, offset),
                    recent_flight: recent.map(|r| r.flight_number.clone()),
                    recent_operated: recent.and_then(|r| r.actual_time).map(|t| clock(t, offset)),
                    recent_status: recent.and_then(|r| r.status.clone()),
                    recent_country: recent.and_then(|r| r.counterpart_country.clone()),
                }
            })
            .collect()
    }
}

/// Formats epoch seconds as local `HH:MM`, or `N/A` when out of range.
pub fn clock(epoch_secs: i64, offset: FixedOffset) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|t| t.with_timezone(&offset).format("%H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = rows.len(), "Appending CSV records");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Airport;
    use crate::types::{AirlineSnapshotEntry, RawFlightRecord};
    use chrono::TimeZone;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn record(number: &str, scheduled: i64, actual: Option<i64>) -> RawFlightRecord {
        RawFlightRecord {
            airline: "Qatar Airways".to_string(),
            flight_number: number.to_string(),
            scheduled_time: scheduled,
            actual_time: actual,
            status: Some("Departed".to_string()),
            counterpart_country: Some("Japan".to_string()),
        }
    }

    fn snapshot() -> DirectionSnapshot {
        // 2024-03-10 06:00Z = 09:00 Doha
        let six = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap().timestamp();
        DirectionSnapshot {
            direction: Direction::Departures,
            entries: vec![AirlineSnapshotEntry {
                airline: "Qatar Airways".to_string(),
                representative: record("QR 806", six + 3_600, None),
                match_count: 9,
                most_recent: Some(record("QR 812", six, Some(six + 600))),
            }],
        }
    }

    #[test]
    fn test_clock_is_airport_local() {
        let t = Utc.with_ymd_and_hms(2024, 3, 10, 22, 5, 0).unwrap().timestamp();
        assert_eq!(clock(t, Airport::HAMAD.offset()), "01:05");
    }

    #[test]
    fn test_rows_from_snapshot() {
        let rows = SnapshotRow::from_snapshot(&snapshot(), Utc::now(), Airport::HAMAD.offset());

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.rank, 1);
        assert_eq!(row.flights, 9);
        assert_eq!(row.last_flight, "QR 806");
        assert_eq!(row.last_scheduled, "10:00");
        assert_eq!(row.recent_flight.as_deref(), Some("QR 812"));
        assert_eq!(row.recent_operated.as_deref(), Some("09:10"));
        assert_eq!(row.recent_country.as_deref(), Some("Japan"));
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&snapshot());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&snapshot()).unwrap();
    }

    #[test]
    fn test_append_records_writes_header_once() {
        let path = temp_path("hamad_fids_watch_test_header.csv");
        let _ = fs::remove_file(&path);

        let rows = SnapshotRow::from_snapshot(&snapshot(), Utc::now(), Airport::HAMAD.offset());
        append_records(&path, &rows).unwrap();
        append_records(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("published_at")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_records_creates_parent_dirs() {
        let dir = temp_path("hamad_fids_watch_test_nested");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("departures").join("date=2024-03-10.csv");

        let rows = SnapshotRow::from_snapshot(&snapshot(), Utc::now(), Airport::HAMAD.offset());
        append_records(&path, &rows).unwrap();

        assert!(path.exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
