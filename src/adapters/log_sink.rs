//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every mission event as one structured
//! line through the `log` facade (console on the host, brick log on the
//! robot).  A file or radio adapter would implement the same trait.

use log::{debug, info};

use crate::app::events::{MissionEvent, TickStatus};
use crate::app::ports::EventSink;

/// Adapter that logs every [`MissionEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn status_text(status: TickStatus) -> &'static str {
    match status {
        TickStatus::Blind => "blind",
        TickStatus::Hunting => "hunting",
        TickStatus::Straight => "straight",
        TickStatus::CountingCorners => "counting corners",
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &MissionEvent) {
        match event {
            MissionEvent::Telemetry(t) => {
                debug!(
                    "TELEM | tick={} | dist={:.0}mm | {:?} refl={} amb={} | prox={}mm | \
                     {} | target={} score={} seen={} | corners={} | held={}",
                    t.tick,
                    t.travelled_mm,
                    t.color,
                    t.reflectance,
                    t.ambient,
                    t.proximity_mm,
                    status_text(t.status),
                    t.target,
                    t.target_score,
                    t.seen.map_or_else(|| "-".into(), |s| s.to_string()),
                    t.corners,
                    t.held.as_ref().map_or("-", |m| m.as_str()),
                );
            }
            MissionEvent::Started { first_target } => {
                info!("START | hunting {}", first_target);
            }
            MissionEvent::PhaseChanged { from, to } => {
                info!("PHASE | {} -> {}", from.name(), to.name());
            }
            MissionEvent::CornerConfirmed { corners } => {
                info!("CORNER | count={}", corners);
            }
            MissionEvent::LapCompleted { station } => {
                info!("LAP | corner count reset at {}", station);
            }
            MissionEvent::ItemPicked(item) => {
                info!(
                    "PICK | {} ({:?} refl={})",
                    item.material, item.source_color, item.source_reflectance
                );
            }
            MissionEvent::StationArrived { station, name } => {
                info!("ARRIVE | {} {}", station, name);
            }
            MissionEvent::ItemDelivered { station, material } => {
                info!("DELIVER | {} -> {}", material, station);
            }
            MissionEvent::ItemKept { station, material } => {
                info!("KEEP | {} not for {}", material, station);
            }
            MissionEvent::TargetAdvanced { from, to } => {
                info!("TARGET | {} -> {}", from, to);
            }
            MissionEvent::Stopped(reason) => {
                info!("STOP | {:?}", reason);
            }
        }
    }
}
