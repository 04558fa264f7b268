//! Sortbot: host simulator entry point.
//!
//! Runs a full mission against the simulated track.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  JsonConfigFile   LogEventSink   sim::World (all devices)    │
//! │  (ConfigPort)     (EventSink)    (Platform)                  │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            MissionSequencer (pure logic)               │  │
//! │  │  Steering · Corners · Stations · ObjectHandler         │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use sortbot::adapters::config_file::JsonConfigFile;
use sortbot::adapters::log_sink::LogEventSink;
use sortbot::adapters::sim::World;
use sortbot::app::ports::ConfigPort;
use sortbot::app::sequencer::MissionSequencer;

#[derive(Parser)]
#[command(name = "sortbot")]
#[command(about = "Run a sorting mission on the simulated track")]
#[command(version)]
struct Cli {
    /// Mission configuration (JSON). Defaults are used when omitted.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Stop after this many control ticks (simulation only)
    #[arg(short = 'n', long = "max-ticks")]
    max_ticks: Option<u64>,

    /// Log filter, e.g. "info" or "sortbot=debug"
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();
    info!("sortbot v{} (simulator)", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let port = cli
        .config
        .clone()
        .map_or_else(JsonConfigFile::defaults, |path| JsonConfigFile::new(path));
    let config = port.load().with_context(|| match port.path() {
        Some(p) => format!("loading {}", p.display()),
        None => "validating default configuration".to_owned(),
    })?;

    // ── 3. Simulated robot ────────────────────────────────────
    let (hw, world) = World::demo_track().into_hardware();
    let stop = world.borrow().stop.clone();
    if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
        warn!("Ctrl-C handler not installed ({}); use --max-ticks to end the run", e);
    }

    // ── 4. Mission ────────────────────────────────────────────
    let mut mission =
        MissionSequencer::new(config, hw, LogEventSink::new()).context("building mission")?;
    let report = mission.run(cli.max_ticks);

    let w = world.borrow();
    info!(
        "Report: {} ticks, {} stations, {} picked, {} delivered, {} corners, exit {:?}",
        report.ticks,
        report.stations_visited,
        report.items_picked,
        report.items_delivered,
        report.corners,
        report.exit
    );
    info!(
        "Simulated time {:.1} s, {} item(s) in bins, {} left on track",
        w.now_ms() as f64 / 1000.0,
        w.drops.len(),
        w.items.len()
    );
    Ok(())
}
