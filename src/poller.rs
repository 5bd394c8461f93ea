//! Per-direction poll loops.
//!
//! Each loop fetches today's board, reduces it, publishes the result and
//! sleeps for the poll interval, forever. A failed fetch skips straight to
//! the sleep, leaving the previous snapshot in place for the display.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{Instrument, debug, error, info, trace, warn};

use crate::analyzers::analyze_batch;
use crate::config::PollerConfig;
use crate::error::FeedError;
use crate::fetch::FlightFeed;
use crate::parser::ParsedBatch;
use crate::publish::{Channels, Publisher, channels};
use crate::stats::CycleStats;
use crate::types::Direction;
use crate::window::DayWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
    Aggregating,
    Publishing,
    Waiting,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Published(CycleStats),
    Skipped(FeedError),
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published(_))
    }

    pub fn stats(&self, direction: Direction) -> CycleStats {
        match self {
            CycleOutcome::Published(stats) => stats.clone(),
            CycleOutcome::Skipped(e) => CycleStats::from_error(direction, e),
        }
    }
}

/// Drives fetch → aggregate → rank → publish for one direction.
pub struct PollLoop<F> {
    feed: Arc<F>,
    publisher: Publisher,
    config: Arc<PollerConfig>,
    state: CycleState,
}

impl<F: FlightFeed> PollLoop<F> {
    pub fn new(feed: Arc<F>, publisher: Publisher, config: Arc<PollerConfig>) -> Self {
        Self {
            feed,
            publisher,
            config,
            state: CycleState::Idle,
        }
    }

    pub fn direction(&self) -> Direction {
        self.publisher.direction()
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    fn transition(&mut self, next: CycleState) {
        trace!(direction = %self.direction(), from = ?self.state, to = ?next, "Cycle state");
        self.state = next;
    }

    /// Runs a single cycle and leaves the loop in [`CycleState::Waiting`].
    ///
    /// The cycle's [`CycleStats`] are recorded whether or not it published.
    #[tracing::instrument(skip(self), fields(direction = %self.direction()))]
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = self.cycle().await;
        self.publisher.record(outcome.stats(self.direction()));
        self.transition(CycleState::Waiting);
        outcome
    }

    async fn cycle(&mut self) -> CycleOutcome {
        self.transition(CycleState::Fetching);

        let batch = match self.fetch().await {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Skipping cycle");
                return CycleOutcome::Skipped(e);
            }
        };

        self.transition(CycleState::Aggregating);
        let (snapshot, hours) = analyze_batch(
            self.direction(),
            &batch.records,
            self.config.sampling,
            self.config.airport.offset(),
        );
        let stats = CycleStats::from_cycle(&snapshot, &hours, batch.records.len(), batch.dropped);

        self.transition(CycleState::Publishing);
        self.publisher.publish(snapshot, hours);

        info!(
            records = stats.records,
            dropped = stats.dropped,
            dropped_pct = stats.dropped_pct(),
            airlines = stats.airlines,
            top_airline = stats.top_airline.as_deref().unwrap_or("-"),
            busiest_hour = ?stats.busiest_hour,
            "Cycle published"
        );

        CycleOutcome::Published(stats)
    }

    /// Fetches today's batch, retrying up to `fetch_retries` times.
    async fn fetch(&self) -> Result<ParsedBatch, FeedError> {
        let direction = self.direction();
        let attempts = self.config.fetch_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            // recomputed per attempt so a retry straddling midnight asks for the new day
            let window = DayWindow::today(&self.config.airport)?;

            match self.feed.fetch(direction, window).await {
                Ok(batch) => return Ok(batch),
                Err(e) if attempt < attempts => {
                    warn!(attempt, attempts, error = %e, "Fetch failed, retrying");
                    sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Polls until the task is aborted.
    pub async fn run(mut self) {
        info!(
            direction = %self.direction(),
            interval_secs = self.config.poll_interval.as_secs_f64(),
            "Poll loop started"
        );

        loop {
            self.run_cycle().await;
            debug!(direction = %self.direction(), "Waiting before next cycle");
            sleep(self.config.poll_interval).await;
        }
    }
}

/// Running departure and arrival loops plus the channels they publish to.
pub struct PollerHandle {
    pub channels: Channels,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Aborts both loops. A fetch in flight is dropped, not awaited.
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            let _ = task.await;
        }
        info!("Poller stopped");
    }
}

/// Spawns one poll loop per direction on the current tokio runtime.
pub fn spawn<F>(feed: F, config: PollerConfig) -> PollerHandle
where
    F: FlightFeed + 'static,
{
    let feed = Arc::new(feed);
    let config = Arc::new(config);
    let (departures, arrivals, channels) = channels();

    let tasks = [departures, arrivals]
        .into_iter()
        .map(|publisher| {
            let span = tracing::info_span!("poll_loop", direction = %publisher.direction());
            let poll = PollLoop::new(Arc::clone(&feed), publisher, Arc::clone(&config));
            tokio::spawn(poll.run().instrument(span))
        })
        .collect();

    PollerHandle { channels, tasks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawFlightRecord;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays scripted responses, then repeats the last one.
    struct ScriptedFeed {
        script: Mutex<VecDeque<Result<Vec<RawFlightRecord>, ()>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFeed {
        fn new(script: Vec<Result<Vec<RawFlightRecord>, ()>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FlightFeed for ScriptedFeed {
        async fn fetch(
            &self,
            direction: Direction,
            _window: DayWindow,
        ) -> Result<ParsedBatch, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    script.front().cloned().unwrap()
                }
            };
            match next {
                Ok(records) => Ok(ParsedBatch { records, dropped: 0 }),
                Err(()) => Err(FeedError::MissingFlights { direction }),
            }
        }
    }

    fn record(airline: &str, scheduled: i64) -> RawFlightRecord {
        RawFlightRecord {
            airline: airline.to_string(),
            flight_number: "QR 1".to_string(),
            scheduled_time: scheduled,
            actual_time: Some(scheduled),
            status: None,
            counterpart_country: None,
        }
    }

    fn config() -> Arc<PollerConfig> {
        Arc::new(PollerConfig::default().with_retries(0, Duration::from_millis(1)))
    }

    fn single_loop(
        feed: ScriptedFeed,
        config: Arc<PollerConfig>,
    ) -> (PollLoop<ScriptedFeed>, Channels) {
        let (departures, _arrivals, channels) = channels();
        (PollLoop::new(Arc::new(feed), departures, config), channels)
    }

    #[tokio::test]
    async fn test_cycle_publishes_snapshot_and_hours() {
        let feed = ScriptedFeed::new(vec![Ok(vec![
            record("A", 100),
            record("A", 200),
            record("B", 300),
        ])]);
        let (mut poll, channels) = single_loop(feed, config());
        assert_eq!(poll.state(), CycleState::Idle);

        let outcome = poll.run_cycle().await;

        assert!(outcome.is_published());
        assert_eq!(poll.state(), CycleState::Waiting);
        let snapshot = channels.departures.borrow();
        assert_eq!(snapshot.airlines().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(snapshot.get("A").unwrap().match_count, 2);
        // only A's second flight is sampled
        assert_eq!(channels.busiest_hours.borrow().departures.len(), 1);
        assert!(channels.busiest_hours.borrow().arrivals.is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_snapshot() {
        let feed = ScriptedFeed::new(vec![Ok(vec![record("A", 100)]), Err(())]);
        let (mut poll, channels) = single_loop(feed, config());
        let mut rx = channels.departures.clone();

        assert!(poll.run_cycle().await.is_published());
        let published = rx.borrow_and_update().clone();

        let outcome = poll.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::Skipped(_)));
        assert_eq!(poll.state(), CycleState::Waiting);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), published);
        let stats = outcome.stats(Direction::Departures);
        assert_eq!(stats.error_type.as_deref(), Some("feed_unavailable"));
    }

    #[tokio::test]
    async fn test_empty_batch_publishes_empty_outputs() {
        let feed = ScriptedFeed::new(vec![Ok(vec![])]);
        let (mut poll, channels) = single_loop(feed, config());
        let mut rx = channels.departures.clone();

        assert!(poll.run_cycle().await.is_published());

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
        assert!(channels.busiest_hours.borrow().departures.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_sequential_within_a_cycle() {
        let feed = ScriptedFeed::new(vec![Err(()), Err(()), Ok(vec![record("A", 1)])]);
        let config = Arc::new(PollerConfig::default().with_retries(2, Duration::from_secs(1)));
        let (mut poll, _channels) = single_loop(feed, config);

        assert!(poll.run_cycle().await.is_published());
        assert_eq!(poll.feed.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_skips_cycle() {
        let feed = ScriptedFeed::new(vec![Err(())]);
        let config = Arc::new(PollerConfig::default().with_retries(1, Duration::from_secs(1)));
        let (mut poll, _channels) = single_loop(feed, config);

        assert!(!poll.run_cycle().await.is_published());
        assert_eq!(poll.feed.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retries_does_not_overflow_attempts() {
        let feed = ScriptedFeed::new(vec![Ok(vec![record("A", 1)])]);
        let config =
            Arc::new(PollerConfig::default().with_retries(u32::MAX, Duration::from_millis(1)));
        let (mut poll, _channels) = single_loop(feed, config);

        assert!(poll.run_cycle().await.is_published());
        assert_eq!(poll.feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_every_cycle_records_its_stats() {
        let feed = ScriptedFeed::new(vec![Ok(vec![record("A", 1), record("B", 2)]), Err(())]);
        let (mut poll, channels) = single_loop(feed, config());
        let mut cycles = channels.cycles(Direction::Departures).clone();

        poll.run_cycle().await;
        let published = cycles.borrow_and_update().clone();
        assert!(!published.is_error());
        assert_eq!(published.records, 2);
        assert_eq!(published.airlines, 2);

        poll.run_cycle().await;
        assert!(cycles.has_changed().unwrap());
        let skipped = cycles.borrow_and_update().clone();
        assert!(skipped.is_error());
        assert_eq!(skipped.direction, Some(Direction::Departures));
        assert_eq!(skipped.error_type.as_deref(), Some("feed_unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loops_poll_both_directions_on_interval() {
        let feed = ScriptedFeed::new(vec![Ok(vec![record("A", 1), record("A", 2)])]);
        let config = PollerConfig::default().with_poll_interval(Duration::from_secs(10));
        let handle = spawn(feed, config);
        let mut departures = handle.channels.departures.clone();
        let mut arrivals = handle.channels.arrivals.clone();

        departures.changed().await.unwrap();
        arrivals.changed().await.unwrap();
        assert_eq!(departures.borrow_and_update().direction, Direction::Departures);
        assert_eq!(arrivals.borrow_and_update().direction, Direction::Arrivals);

        // next cycle only after the interval
        departures.changed().await.unwrap();
        let pair = handle.channels.busiest_hours.borrow().clone();
        assert_eq!(pair.departures.len(), 1);
        assert_eq!(pair.arrivals.len(), 1);

        assert!(handle.is_running());
        handle.shutdown().await;
    }
}
