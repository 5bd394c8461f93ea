//! Error types for the polling pipeline.
//!
//! None of these are fatal: a [`FeedError`] skips one cycle and a
//! [`RecordError`] drops one record.

use reqwest::StatusCode;
use thiserror::Error;

use crate::types::Direction;

/// Why a cycle produced no update.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{direction} feed unavailable: {source}")]
    Unavailable {
        direction: Direction,
        #[source]
        source: reqwest::Error,
    },
    #[error("{direction} feed returned status {status}")]
    Status {
        direction: Direction,
        status: StatusCode,
    },
    #[error("{direction} request body could not be encoded: {source}")]
    Encode {
        direction: Direction,
        #[source]
        source: serde_json::Error,
    },
    #[error("{direction} feed body could not be decoded: {source}")]
    Decode {
        direction: Direction,
        #[source]
        source: serde_json::Error,
    },
    #[error("{direction} feed body has no `flights` array")]
    MissingFlights { direction: Direction },
    #[error("day window is empty or inverted ({start_ms}..{end_ms})")]
    ClockSkew { start_ms: i64, end_ms: i64 },
}

impl FeedError {
    /// Short tag used in log fields and CSV error rows.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::ClockSkew { .. } => "clock_skew",
            _ => "feed_unavailable",
        }
    }
}

/// A single flight object that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing required field `{field}`")]
    Missing { field: &'static str },
    #[error("field `{field}` is not a valid value")]
    Invalid { field: &'static str },
}
