//! Per-cycle reduction of a flight batch.
//!
//! [`top::select_top`] picks the busiest airlines, [`aggregate::aggregate`]
//! rolls their flights up into one entry each and collects actual operation
//! times, and [`hours::rank_hours`] turns those times into a busiest-hours
//! ranking. All three are pure: nothing survives from one cycle to the next.

pub mod aggregate;
pub mod hours;
pub mod top;

use chrono::FixedOffset;

use crate::config::SamplingPolicy;
use crate::types::{Direction, DirectionSnapshot, RankedHours, RawFlightRecord};

/// Runs the full reduction for one batch.
pub fn analyze_batch(
    direction: Direction,
    records: &[RawFlightRecord],
    policy: SamplingPolicy,
    offset: FixedOffset,
) -> (DirectionSnapshot, RankedHours) {
    let top = top::select_top(records);
    let aggregation = aggregate::aggregate(direction, records, &top, policy);
    let ranked = hours::rank_hours(&aggregation.samples, offset);
    (aggregation.snapshot, ranked)
}
