//! Mission blackboard: the per-tick sensor frame and the mutable state the
//! sequencer threads through every component call.
//!
//! `MissionState` is the single struct components read from and write to.
//! It is created when the mission starts, lives for one run, and is dropped
//! at shutdown; nothing here persists across runs.

use serde::{Deserialize, Serialize};

use crate::config::{EMPTY_LABEL, Label};
use crate::control::corner::CorneringState;

// ---------------------------------------------------------------------------
// Sensor vocabulary
// ---------------------------------------------------------------------------

/// Discrete colour reported by a colour/reflectance sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    /// No colour detected (nothing in range, or too dark to classify).
    #[default]
    None,
    Black,
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Brown,
}

/// Identity of a station as declared in the station table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u8);

impl core::fmt::Display for StationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Sensor frame (read once per tick, immutable for the tick)
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of every sensor the decision loop consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorFrame {
    /// Colour seen by the downward-facing line sensor.
    pub color: Color,
    /// Line sensor reflected-light intensity (0–100).
    pub reflectance: u8,
    /// Line sensor ambient-light intensity (0–100).
    pub ambient: u8,
    /// Forward proximity reading (mm).
    pub proximity_mm: u32,
    /// Drive-base odometer since the last reset (mm).
    pub travelled_mm: f32,
    /// Milliseconds since the mission entered RUNNING.
    pub elapsed_ms: u64,
}

// ---------------------------------------------------------------------------
// Held item
// ---------------------------------------------------------------------------

/// Result of classifying the object in the gripper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemClassification {
    /// Material label from the material table, or [`EMPTY_LABEL`].
    pub material: Label,
    /// Colour of the sample that supports the decision.
    pub source_color: Color,
    /// Reflectance of the sample that supports the decision.
    pub source_reflectance: u8,
}

impl ItemClassification {
    /// Classification for "nothing recognisable in the gripper".
    pub fn empty(source_color: Color, source_reflectance: u8) -> Self {
        let mut material = Label::new();
        // EMPTY_LABEL always fits in a Label.
        let _ = material.push_str(EMPTY_LABEL);
        Self {
            material,
            source_color,
            source_reflectance,
        }
    }

    /// True if no material row matched any sample.
    pub fn is_empty(&self) -> bool {
        self.material.as_str() == EMPTY_LABEL
    }
}

// ---------------------------------------------------------------------------
// Suppression window (blind distance + cooldown)
// ---------------------------------------------------------------------------

/// Distance- and time-bounded window after a departure during which no
/// station may be recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SuppressionWindow {
    /// Distance still to cover before stations are hunted again (mm).
    pub blind_distance_remaining_mm: f32,
    /// Time still to wait before stations are hunted again (ms).
    pub cooldown_remaining_ms: u32,
}

impl SuppressionWindow {
    /// Open a fresh window.  Absolute, so setting it twice equals setting it once.
    pub fn set(&mut self, blind_distance_mm: f32, cooldown_ms: u32) {
        self.blind_distance_remaining_mm = blind_distance_mm.max(0.0);
        self.cooldown_remaining_ms = cooldown_ms;
    }

    /// Consume travelled distance and elapsed time.
    pub fn advance(&mut self, distance_mm: f32, elapsed_ms: u32) {
        // Reversing never reopens the window.
        if distance_mm > 0.0 {
            self.blind_distance_remaining_mm = (self.blind_distance_remaining_mm - distance_mm).max(0.0);
        }
        self.cooldown_remaining_ms = self.cooldown_remaining_ms.saturating_sub(elapsed_ms);
    }

    /// True while either bound is still outstanding.
    pub fn is_active(&self) -> bool {
        self.blind_distance_remaining_mm > 0.0 || self.cooldown_remaining_ms > 0
    }
}

// ---------------------------------------------------------------------------
// MissionState
// ---------------------------------------------------------------------------

/// All mutable mission variables, owned by the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionState {
    /// Position in the configured station sequence.
    pub target_index: usize,
    /// Station currently being hunted.
    pub target: StationId,
    /// Blind-distance / cooldown window after the last departure.
    pub window: SuppressionWindow,
    /// Corner counter bookkeeping.
    pub cornering: CorneringState,
    /// Item currently in the gripper, if any.
    pub held_item: Option<ItemClassification>,
    /// Odometer value seen on the previous tick (mm).
    pub last_odometer_mm: f32,
    /// Mission clock value seen on the previous tick (ms).
    pub last_tick_ms: u64,
}

impl MissionState {
    /// Fresh state hunting `first_target`, blind for `initial_blind_mm`.
    pub fn new(first_target: StationId, initial_blind_mm: f32) -> Self {
        let mut window = SuppressionWindow::default();
        window.set(initial_blind_mm, 0);
        Self {
            target_index: 0,
            target: first_target,
            window,
            cornering: CorneringState::default(),
            held_item: None,
            last_odometer_mm: 0.0,
            last_tick_ms: 0,
        }
    }

    /// Feed the frame's odometer and clock into the suppression window.
    pub fn advance_window(&mut self, frame: &SensorFrame) {
        let distance = frame.travelled_mm - self.last_odometer_mm;
        let elapsed = frame.elapsed_ms.saturating_sub(self.last_tick_ms);
        self.window
            .advance(distance, u32::try_from(elapsed).unwrap_or(u32::MAX));
        self.last_odometer_mm = frame.travelled_mm;
        self.last_tick_ms = frame.elapsed_ms;
    }

    /// The odometer was zeroed after reading `odometer_before_mm`: rebase
    /// distance bookkeeping onto the new origin.
    pub fn odometer_reset(&mut self, odometer_before_mm: f32) {
        self.last_odometer_mm = 0.0;
        self.cornering.rebase(odometer_before_mm);
    }

    /// Departure from a station at mission time `elapsed_ms`: open the
    /// suppression window, counting time from now, and rebase on the
    /// freshly zeroed odometer.
    ///
    /// Idempotent when repeated with the zeroed odometer reading.
    pub fn begin_departure(
        &mut self,
        blind_distance_mm: f32,
        cooldown_ms: u32,
        odometer_before_mm: f32,
        elapsed_ms: u64,
    ) {
        self.window.set(blind_distance_mm, cooldown_ms);
        self.last_tick_ms = elapsed_ms;
        self.odometer_reset(odometer_before_mm);
    }

    /// Whether station recognition is currently suppressed.
    pub fn is_suppressed(&self) -> bool {
        self.window.is_active()
    }
}
