//! One-slot hand-off channels between the poll loops and the display layer.
//!
//! Channels are `tokio::sync::watch`: publishing overwrites whatever the
//! consumer has not read yet and never waits, so a slow or missing display
//! cannot stall polling. The slot always holds the last published value.
//! Every cycle, skipped or not, also replaces its direction's [`CycleStats`].

use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

use crate::stats::CycleStats;
use crate::types::{BusiestHours, Direction, DirectionSnapshot, RankedHours};

/// Receiving ends handed to the display layer.
#[derive(Debug, Clone)]
pub struct Channels {
    pub departures: watch::Receiver<DirectionSnapshot>,
    pub arrivals: watch::Receiver<DirectionSnapshot>,
    pub busiest_hours: watch::Receiver<BusiestHours>,
    pub departure_cycles: watch::Receiver<CycleStats>,
    pub arrival_cycles: watch::Receiver<CycleStats>,
}

impl Channels {
    pub fn snapshot(&self, direction: Direction) -> &watch::Receiver<DirectionSnapshot> {
        match direction {
            Direction::Departures => &self.departures,
            Direction::Arrivals => &self.arrivals,
        }
    }

    pub fn cycles(&self, direction: Direction) -> &watch::Receiver<CycleStats> {
        match direction {
            Direction::Departures => &self.departure_cycles,
            Direction::Arrivals => &self.arrival_cycles,
        }
    }
}

/// Sending side for one direction.
#[derive(Debug)]
pub struct Publisher {
    direction: Direction,
    snapshot: watch::Sender<DirectionSnapshot>,
    hours: Arc<watch::Sender<BusiestHours>>,
    cycles: watch::Sender<CycleStats>,
}

impl Publisher {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Replaces this direction's snapshot and its half of the busiest hours.
    pub fn publish(&self, snapshot: DirectionSnapshot, hours: RankedHours) {
        let direction = self.direction;
        trace!(%direction, airlines = snapshot.len(), hours = hours.len(), "Publishing");

        self.snapshot.send_replace(snapshot);
        self.hours.send_modify(|pair| pair.set(direction, hours));
    }

    /// Replaces the summary of this direction's latest cycle.
    pub fn record(&self, stats: CycleStats) {
        self.cycles.send_replace(stats);
    }
}

/// Creates a departures publisher, an arrivals publisher and the matching receivers.
pub fn channels() -> (Publisher, Publisher, Channels) {
    let (dep_tx, dep_rx) = watch::channel(DirectionSnapshot::empty(Direction::Departures));
    let (arr_tx, arr_rx) = watch::channel(DirectionSnapshot::empty(Direction::Arrivals));
    let (hours_tx, hours_rx) = watch::channel(BusiestHours::default());
    let hours_tx = Arc::new(hours_tx);
    let (dep_cycles_tx, dep_cycles_rx) = watch::channel(CycleStats::default());
    let (arr_cycles_tx, arr_cycles_rx) = watch::channel(CycleStats::default());

    let departures = Publisher {
        direction: Direction::Departures,
        snapshot: dep_tx,
        hours: Arc::clone(&hours_tx),
        cycles: dep_cycles_tx,
    };
    let arrivals = Publisher {
        direction: Direction::Arrivals,
        snapshot: arr_tx,
        hours: hours_tx,
        cycles: arr_cycles_tx,
    };

    (
        departures,
        arrivals,
        Channels {
            departures: dep_rx,
            arrivals: arr_rx,
            busiest_hours: hours_rx,
            departure_cycles: dep_cycles_rx,
            arrival_cycles: arr_cycles_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::types::HourCount;

    fn hours(hour: u32) -> RankedHours {
        RankedHours(vec![HourCount { hour, count: 1 }])
    }

    #[test]
    fn test_publish_overwrites_unread_value() {
        let (departures, _arrivals, channels) = channels();
        let mut rx = channels.departures.clone();

        departures.publish(DirectionSnapshot::empty(Direction::Departures), hours(1));
        departures.publish(DirectionSnapshot::empty(Direction::Departures), hours(2));

        // two publishes, one pending change
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();
        assert!(!rx.has_changed().unwrap());
        assert_eq!(channels.busiest_hours.borrow().departures.hours(), vec![2]);
    }

    #[test]
    fn test_directions_fill_their_own_half() {
        let (departures, arrivals, channels) = channels();

        departures.publish(DirectionSnapshot::empty(Direction::Departures), hours(6));
        arrivals.publish(DirectionSnapshot::empty(Direction::Arrivals), hours(18));
        departures.publish(DirectionSnapshot::empty(Direction::Departures), hours(7));

        let pair = channels.busiest_hours.borrow();
        assert_eq!(pair.departures.hours(), vec![7]);
        assert_eq!(pair.arrivals.hours(), vec![18]);
    }

    #[test]
    fn test_record_replaces_cycle_stats_per_direction() {
        let (departures, _arrivals, channels) = channels();
        let mut rx = channels.cycles(Direction::Departures).clone();
        assert!(!rx.has_changed().unwrap());

        let err = FeedError::MissingFlights {
            direction: Direction::Departures,
        };
        departures.record(CycleStats::from_error(Direction::Departures, &err));

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_error());
        assert!(!channels.cycles(Direction::Arrivals).has_changed().unwrap());
    }

    #[test]
    fn test_publish_without_consumer_does_not_fail() {
        let (departures, _arrivals, channels) = channels();
        drop(channels);

        departures.publish(DirectionSnapshot::empty(Direction::Departures), hours(3));
        assert_eq!(departures.direction(), Direction::Departures);
    }
}
