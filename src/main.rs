//! CLI entry point for the Hamad FIDS watcher.
//!
//! `watch` runs both poll loops and logs every published snapshot, optionally
//! appending snapshots and per-cycle stats (failed cycles included) to per-day
//! CSV files. `once` runs a single cycle for one
//! direction and prints the result as JSON.

use anyhow::{Result, anyhow};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use hamad_fids_watch::{
    config::{PollerConfig, SamplingPolicy},
    fetch::HttpFeed,
    output::{SnapshotRow, append_records, print_json, print_pretty},
    poller::{self, CycleOutcome, PollLoop},
    publish::channels,
    stats::CycleStats,
    types::{BusiestHours, Direction, DirectionSnapshot},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "hamad_fids_watch")]
#[command(about = "Live per-airline rollup of Hamad International departures and arrivals", long_about = None)]
struct Cli {
    #[command(flatten)]
    feed: FeedArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FeedArgs {
    /// Base URL of the FIDS web service
    #[arg(long, global = true, default_value = "https://dohahamadairport.com")]
    base_url: String,

    /// Seconds between polls of each direction
    #[arg(short = 'i', long, global = true, default_value_t = 10)]
    interval_secs: u64,

    /// Maximum number of flights requested per poll
    #[arg(short, long, global = true, default_value_t = 3500)]
    limit: u32,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    /// Extra fetch attempts within a cycle before it is skipped
    #[arg(long, global = true, default_value_t = 0)]
    retries: u32,

    /// Also count each airline's first flight in the busiest-hours histogram
    #[arg(long, global = true, default_value_t = false)]
    sample_first_match: bool,
}

impl FeedArgs {
    fn into_config(self) -> PollerConfig {
        let sampling = if self.sample_first_match {
            SamplingPolicy::AllMatches
        } else {
            SamplingPolicy::SkipFirstMatch
        };

        PollerConfig::default()
            .with_base_url(self.base_url)
            .with_poll_interval(Duration::from_secs(self.interval_secs.max(1)))
            .with_record_limit(self.limit)
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
            .with_retries(self.retries, Duration::from_secs(2))
            .with_sampling(sampling)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Poll departures and arrivals until interrupted
    Watch {
        /// Directory to append per-day CSV snapshots to
        #[arg(short = 'd', long)]
        csv_dir: Option<PathBuf>,

        /// Log snapshots as JSON instead of one line per airline
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run a single cycle for one direction and print it
    Once {
        /// departures or arrivals
        #[arg(value_name = "DIRECTION")]
        direction: Direction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/hamad_fids_watch.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("hamad_fids_watch.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = cli.feed.into_config();

    match cli.command {
        Commands::Watch { csv_dir, json } => watch(config, csv_dir, json).await?,
        Commands::Once { direction } => once(config, direction).await?,
    }

    Ok(())
}

/// Spawns both poll loops and displays whatever they publish until Ctrl+C.
#[tracing::instrument(skip(config), fields(base_url = %config.base_url))]
async fn watch(config: PollerConfig, csv_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let feed = HttpFeed::from_config(&config)?;
    let offset = config.airport.offset();

    info!(
        airport = config.airport.code,
        interval_secs = config.poll_interval.as_secs(),
        limit = config.record_limit,
        "Watching departures and arrivals. Press Ctrl+C to stop."
    );

    let handle = poller::spawn(feed, config);
    let mut departures = handle.channels.departures.clone();
    let mut arrivals = handle.channels.arrivals.clone();
    let mut hours = handle.channels.busiest_hours.clone();
    let mut departure_cycles = handle.channels.departure_cycles.clone();
    let mut arrival_cycles = handle.channels.arrival_cycles.clone();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted, stopping poll loops");
                break;
            }
            Ok(()) = departures.changed() => {
                let snapshot = departures.borrow_and_update().clone();
                show_snapshot(&snapshot, json, csv_dir.as_deref(), offset);
            }
            Ok(()) = arrivals.changed() => {
                let snapshot = arrivals.borrow_and_update().clone();
                show_snapshot(&snapshot, json, csv_dir.as_deref(), offset);
            }
            Ok(()) = hours.changed() => {
                let pair = hours.borrow_and_update().clone();
                show_hours(&pair, json);
            }
            Ok(()) = departure_cycles.changed() => {
                let stats = departure_cycles.borrow_and_update().clone();
                show_cycle(Direction::Departures, &stats, csv_dir.as_deref(), offset);
            }
            Ok(()) = arrival_cycles.changed() => {
                let stats = arrival_cycles.borrow_and_update().clone();
                show_cycle(Direction::Arrivals, &stats, csv_dir.as_deref(), offset);
            }
            else => {
                warn!("All poll loops exited");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn show_snapshot(
    snapshot: &DirectionSnapshot,
    json: bool,
    csv_dir: Option<&Path>,
    offset: chrono::FixedOffset,
) {
    let now = Utc::now();
    let rows = SnapshotRow::from_snapshot(snapshot, now, offset);

    if json {
        if let Err(e) = print_json(snapshot) {
            error!(error = %e, "Failed to serialize snapshot");
        }
    } else {
        print_pretty(snapshot);
        if rows.is_empty() {
            info!(direction = %snapshot.direction, "No flights today");
        }
        for row in &rows {
            info!(
                direction = %row.direction,
                rank = row.rank,
                airline = %row.airline,
                flights = row.flights,
                last_flight = %row.last_flight,
                scheduled = %row.last_scheduled,
                recent_flight = row.recent_flight.as_deref().unwrap_or("-"),
                recent_time = row.recent_operated.as_deref().unwrap_or("N/A"),
                "Airline"
            );
        }
    }

    if let Some(dir) = csv_dir {
        let date = now.with_timezone(&offset).format("%Y-%m-%d");
        let path = dir
            .join(snapshot.direction.path())
            .join(format!("date={date}.csv"));
        if let Err(e) = append_records(&path, &rows) {
            error!(path = %path.display(), error = %e, "Failed to write snapshot CSV");
        }
    }
}

/// Reports one cycle's stats and appends them to `{dir}/{direction}/cycles/`.
fn show_cycle(
    direction: Direction,
    stats: &CycleStats,
    csv_dir: Option<&Path>,
    offset: chrono::FixedOffset,
) {
    if stats.is_error() {
        warn!(
            %direction,
            error_type = stats.error_type.as_deref().unwrap_or("-"),
            error = stats.error_message.as_deref().unwrap_or("-"),
            "Cycle skipped, previous snapshot still shown"
        );
    } else if stats.dropped > 0 {
        warn!(
            %direction,
            dropped = stats.dropped,
            dropped_pct = format!("{:.1}", stats.dropped_pct()),
            "Malformed flights dropped this cycle"
        );
    }

    if let Some(dir) = csv_dir {
        let date = stats.timestamp.with_timezone(&offset).format("%Y-%m-%d");
        let path = dir
            .join(direction.path())
            .join("cycles")
            .join(format!("date={date}.csv"));
        if let Err(e) = append_records(&path, std::slice::from_ref(stats)) {
            error!(path = %path.display(), error = %e, "Failed to write cycle stats CSV");
        }
    }
}

fn show_hours(pair: &BusiestHours, json: bool) {
    if json {
        if let Err(e) = print_json(pair) {
            error!(error = %e, "Failed to serialize busiest hours");
        }
        return;
    }

    for direction in Direction::ALL {
        let ranked = pair.get(direction);
        info!(
            %direction,
            busiest = ?ranked.busiest().map(|h| h.hour),
            ranked = ?ranked.hours(),
            "Busiest hours"
        );
    }
}

/// Runs exactly one cycle for `direction` and prints stats, snapshot and hours.
#[tracing::instrument(skip(config), fields(%direction))]
async fn once(config: PollerConfig, direction: Direction) -> Result<()> {
    let feed = Arc::new(HttpFeed::from_config(&config)?);
    let (departures, arrivals, channels) = channels();
    let publisher = match direction {
        Direction::Departures => departures,
        Direction::Arrivals => arrivals,
    };

    let mut poll = PollLoop::new(feed, publisher, Arc::new(config));
    let stats = match poll.run_cycle().await {
        CycleOutcome::Published(stats) => stats,
        CycleOutcome::Skipped(e) => return Err(anyhow!(e).context("No update this cycle")),
    };

    let result = serde_json::json!({
        "stats": stats,
        "snapshot": *channels.snapshot(direction).borrow(),
        "busiest_hours": channels.busiest_hours.borrow().get(direction),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
