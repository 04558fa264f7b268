//! Outbound mission events.
//!
//! The [`MissionSequencer`](super::sequencer::MissionSequencer) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them, such as logging to the console
//! or recording them in a test.

use crate::config::Label;
use crate::mission::MissionPhase;
use crate::mission::context::{Color, ItemClassification, StationId};

/// Structured events emitted by the mission core.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionEvent {
    /// The handshake finished and the hunt for the first station began.
    Started { first_target: StationId },

    /// Periodic per-tick snapshot.
    Telemetry(TickTelemetry),

    /// The mission moved between lifecycle phases.
    PhaseChanged { from: MissionPhase, to: MissionPhase },

    /// A corner marker was confirmed; carries the lap count so far.
    CornerConfirmed { corners: u32 },

    /// The corner count was reset at the lap station.
    LapCompleted { station: StationId },

    /// An object was picked up and classified.
    ItemPicked(ItemClassification),

    /// The target station was recognised.
    StationArrived { station: StationId, name: Label },

    /// The held item was dropped in this station's bin.
    ItemDelivered { station: StationId, material: Label },

    /// The held item does not belong here and is still carried.
    ItemKept { station: StationId, material: Label },

    /// The hunt moved on to the next station in the sequence.
    TargetAdvanced { from: StationId, to: StationId },

    /// The RUNNING loop ended.
    Stopped(ExitReason),
}

/// Why the RUNNING loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The stop button was pressed.
    StopButton,
    /// A caller-imposed tick limit was reached (host simulation only).
    TickLimit,
}

/// Short status of the tick, for the telemetry log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Line following inside a blind/cooldown window.
    Blind,
    /// Line following while hunting the target.
    Hunting,
    /// Driving straight over the track colour.
    Straight,
    /// Hunting is gated on corners not yet counted.
    CountingCorners,
}

/// A point-in-time snapshot suitable for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct TickTelemetry {
    pub tick: u64,
    pub travelled_mm: f32,
    pub color: Color,
    pub reflectance: u8,
    pub ambient: u8,
    pub proximity_mm: u32,
    pub status: TickStatus,
    pub target: StationId,
    /// First declared station accepting this reading, if any.
    pub seen: Option<StationId>,
    pub target_score: u8,
    pub corners: u32,
    pub held: Option<Label>,
}
