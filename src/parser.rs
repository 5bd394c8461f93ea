//! JSON parser for FIDS flight-status responses.
//!
//! The service wraps flights in `{"flights": [...]}`. Numeric fields arrive
//! either as numbers or as numeric strings, and anything except the airline,
//! flight number and scheduled time may be null.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FeedError, RecordError};
use crate::types::{Direction, RawFlightRecord};

/// Records decoded from one response, plus how many flight objects were dropped.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub records: Vec<RawFlightRecord>,
    pub dropped: usize,
}

/// Decodes a response body into flight records.
///
/// # Errors
///
/// Returns [`FeedError::Decode`] if the body is not JSON and
/// [`FeedError::MissingFlights`] if it has no `flights` array. A single
/// malformed flight is dropped with a warning instead.
pub fn parse_flights(bytes: &[u8], direction: Direction) -> Result<ParsedBatch, FeedError> {
    let body: Value =
        serde_json::from_slice(bytes).map_err(|source| FeedError::Decode { direction, source })?;

    let flights = body
        .get("flights")
        .and_then(Value::as_array)
        .ok_or(FeedError::MissingFlights { direction })?;

    let mut batch = ParsedBatch::default();
    for (index, flight) in flights.iter().enumerate() {
        match parse_record(flight, direction) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                warn!(%direction, index, error = %e, "Dropping malformed flight record");
                batch.dropped += 1;
            }
        }
    }

    debug!(
        %direction,
        records = batch.records.len(),
        dropped = batch.dropped,
        "Parsed flights"
    );
    Ok(batch)
}

/// Converts one flight object into a [`RawFlightRecord`].
pub fn parse_record(flight: &Value, direction: Direction) -> Result<RawFlightRecord, RecordError> {
    let en = &flight["lang"]["en"];

    let airline = text(&en["airlineName"]).ok_or(RecordError::Missing {
        field: "airlineName",
    })?;
    let flight_number = text(&flight["flightNumber"]).ok_or(RecordError::Missing {
        field: "flightNumber",
    })?;
    let scheduled_time =
        epoch_secs(&flight["scheduledTime"], "scheduledTime")?.ok_or(RecordError::Missing {
            field: "scheduledTime",
        })?;

    // A zero actual time is the feed's way of saying "not yet operated".
    let actual_key = direction.actual_time_key();
    let actual_time = match epoch_secs(&flight[actual_key], actual_key) {
        Ok(t) => t.filter(|t| *t != 0),
        Err(e) => {
            warn!(%direction, %flight_number, error = %e, "Ignoring unreadable actual time");
            None
        }
    };

    Ok(RawFlightRecord {
        airline,
        flight_number,
        scheduled_time,
        actual_time,
        status: text(&en["flightStatus"]),
        counterpart_country: text(&en[direction.counterpart_country_key()]),
    })
}

fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn epoch_secs(value: &Value, field: &'static str) -> Result<Option<i64>, RecordError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or(RecordError::Invalid { field }),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| RecordError::Invalid { field }),
        _ => Err(RecordError::Invalid { field }),
    }
}
