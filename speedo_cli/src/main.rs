use std::{fs::OpenOptions, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use speedo_lib::{DistanceModel, TripState};
use speedo_tracker::{TrackerConfig, TripTracker, source::GpxReplaySource, ticker::IntervalTicker};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
    task::JoinHandle,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod input;
mod render;

use input::{HELP, Input, parse_line};

#[derive(Parser)]
#[command(name = "speedo")]
#[command(about = "Terminal speedometer. Replays a GPX track as the location provider", long_about = None)]
struct Cli {
    /// GPX track to replay
    gpx_file: PathBuf,
    /// `key = value` configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Replay speed multiplier, overrides the config file
    #[arg(long)]
    rate: Option<f64>,
    /// Measure distance on a sphere instead of the WGS84 ellipsoid
    #[arg(long)]
    haversine: bool,
    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_file.as_ref())?;

    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
            TrackerConfig::parse(&text)?
        }
        None => TrackerConfig::default(),
    };
    if let Some(rate) = cli.rate {
        config.replay_rate = rate;
    }
    if cli.haversine {
        config.distance_model = DistanceModel::Haversine;
    }
    config.validate()?;

    let source = GpxReplaySource::open(&cli.gpx_file, &config)?;
    tracing::info!("Replaying {} points from {:?} at {}x", source.len(), cli.gpx_file, config.replay_rate);

    let tracker = TripTracker::new(source, IntervalTicker::new(config.tick_interval), &config);
    let json = cli.json;

    let mut snapshots = tracker.subscribe();
    let printer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let state = *snapshots.borrow_and_update();
            print_state(&state, json);
        }
    });

    let mut notices = tracker.notices();
    let notice_printer = tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => eprintln!("{}", render::render_notice(&notice)),
                Err(RecvError::Lagged(missed)) => tracing::warn!("{} notices skipped", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{HELP}");
    print_state(&tracker.snapshot(), json);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_line(&line) {
            None => continue,
            Some(Err(msg)) => eprintln!("{msg}"),
            Some(Ok(Input::Command(command))) => tracker.command(command),
            Some(Ok(Input::Status)) => print_state(&tracker.snapshot(), json),
            Some(Ok(Input::Help)) => println!("{HELP}"),
            Some(Ok(Input::Quit)) => break,
        }
    }

    let last = stop_after(&tracker, printer).await;
    print_state(&last, json);
    tracing::info!("Exiting");

    notice_printer.abort();

    Ok(())
}

/// Stops the trip once `printer` is gone, so its final snapshot is reported once, by the caller.
async fn stop_after(tracker: &TripTracker, printer: JoinHandle<()>) -> TripState {
    printer.abort();
    let _ = printer.await;

    tracker.stop();
    tracker.snapshot()
}

fn print_state(state: &TripState, json: bool) {
    if json {
        match render::render_json(state) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::error!("Failed to serialize snapshot: {err:?}"),
        }
    } else {
        println!("{}", render::render(state));
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {:?}", dir))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=info,speedo_tracker=info", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use speedo_lib::Phase;
    use speedo_tracker::source::ChannelSource;

    use super::*;

    #[tokio::test]
    async fn final_snapshot_is_not_also_printed_by_the_printer() {
        let (source, _fixes) = ChannelSource::new();
        let tracker = TripTracker::new(source, IntervalTicker::new(Duration::from_secs(60)), &TrackerConfig::default());

        let printed = Arc::new(AtomicUsize::new(0));
        let mut snapshots = tracker.subscribe();
        let counter = printed.clone();
        let printer = tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let _ = snapshots.borrow_and_update();
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tracker.start();
        tokio::task::yield_now().await;
        assert_eq!(printed.load(Ordering::SeqCst), 1);

        let last = stop_after(&tracker, printer).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        assert_eq!(last.phase(), Phase::Stopped);
        assert_eq!(printed.load(Ordering::SeqCst), 1);
    }
}
