use crate::config::SamplingPolicy;
use crate::types::{AirlineSnapshotEntry, Direction, DirectionSnapshot, HourSample, RawFlightRecord};

/// Result of aggregating one batch for one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub snapshot: DirectionSnapshot,
    /// Actual operation times of the top airlines' flights, in batch order per airline.
    pub samples: Vec<HourSample>,
}

/// Folds every record of each airline in `top` into a single [`AirlineSnapshotEntry`].
///
/// Entries follow the order of `top`; airlines with no records in the batch are
/// left out. The first record seen for an airline seeds its entry; later ones
/// bump the count, may replace the representative (later scheduled time), and
/// may replace the most recent operation (later actual time). Unless `policy`
/// is [`SamplingPolicy::AllMatches`], only those later records feed the
/// busiest-hours samples.
pub fn aggregate(
    direction: Direction,
    records: &[RawFlightRecord],
    top: &[String],
    policy: SamplingPolicy,
) -> Aggregation {
    let mut entries = Vec::with_capacity(top.len());
    let mut samples = Vec::new();

    for airline in top {
        let mut entry: Option<AirlineSnapshotEntry> = None;

        for record in records.iter().filter(|r| &r.airline == airline) {
            let Some(current) = entry.as_mut() else {
                if policy == SamplingPolicy::AllMatches {
                    samples.extend(record.actual_time.map(|timestamp| HourSample { timestamp }));
                }
                entry = Some(AirlineSnapshotEntry {
                    airline: airline.clone(),
                    representative: record.clone(),
                    match_count: 1,
                    most_recent: None,
                });
                continue;
            };

            current.match_count += 1;

            if record.scheduled_time > current.representative.scheduled_time {
                current.representative = record.clone();
            }

            if let Some(actual) = record.actual_time {
                samples.push(HourSample { timestamp: actual });

                let newer = match current.most_recent.as_ref().and_then(|r| r.actual_time) {
                    Some(latest) => actual > latest,
                    None => true,
                };
                if newer {
                    current.most_recent = Some(record.clone());
                }
            }
        }

        entries.extend(entry);
    }

    Aggregation {
        snapshot: DirectionSnapshot { direction, entries },
        samples,
    }
}
