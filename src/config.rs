//! Mission configuration
//!
//! All tunable parameters for a sortbot run: steering gains, corner
//! detection, station fingerprints and confidence policy, the material
//! table, and the manipulator geometry.  Loaded once through a
//! [`ConfigPort`](crate::app::ports::ConfigPort) before RUNNING begins and
//! immutable afterwards.
//!
//! Defaults are the values tuned on the competition track.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mission::context::{Color, ItemClassification, StationId};

/// Maximum number of stations in the station table.
pub const MAX_STATIONS: usize = 8;
/// Maximum fingerprint rules per station.
pub const MAX_RULES: usize = 6;
/// Maximum rows in the material table.
pub const MAX_MATERIALS: usize = 8;
/// Maximum accepted colours per material row.
pub const MAX_COLORS: usize = 8;
/// Maximum length of the station visiting sequence.
pub const MAX_SEQUENCE: usize = 16;
/// Capacity of station names and material labels.
pub const LABEL_LEN: usize = 24;

/// Fixed-capacity text used for names and labels.
pub type Label = heapless::String<LABEL_LEN>;

/// Reserved material label for "no row matched any sample".
pub const EMPTY_LABEL: &str = "None";

fn label(s: &str) -> Label {
    let mut l = Label::new();
    for ch in s.chars() {
        if l.push(ch).is_err() {
            break;
        }
    }
    l
}

// ---------------------------------------------------------------------------
// Steering
// ---------------------------------------------------------------------------

/// Proportional line-following parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Reflectance at the line edge (0–100).
    pub threshold: f32,
    /// Forward speed (mm/s).
    pub forward_speed: f32,
    /// Angular rate per reflectance point (deg/s).  Sign selects the edge.
    pub gain: f32,
    /// Colour that forces straight driving (e.g. a solid track patch).
    pub straight_color: Option<Color>,
    /// Control tick period (ms).
    pub tick_ms: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            threshold: 45.0,
            forward_speed: 100.0,
            gain: -1.2, // follow the right edge of the black line
            straight_color: Some(Color::Red),
            tick_ms: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Corners
// ---------------------------------------------------------------------------

/// Corner marker detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerConfig {
    /// Reflectance strictly above this is "white".
    pub white_threshold: u8,
    /// Minimum white run length for a corner (mm).
    pub valid_run_mm: f32,
    /// Distance after a confirmed corner before the next may start (mm).
    pub cooldown_mm: f32,
    /// Startup grace period with no corner counting (ms).
    pub grace_ms: u64,
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self {
            white_threshold: 75,
            valid_run_mm: 50.0,
            cooldown_mm: 200.0,
            grace_ms: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// Station recognition
// ---------------------------------------------------------------------------

/// What happens to a station's score on a tick that does not match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decay {
    /// Subtract this amount, floored at zero.
    Subtract(u8),
    /// Drop straight back to zero (strict debounce).
    Reset,
}

/// Confidence scoring policy shared by all stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Added on a matching tick.
    pub increment: u8,
    /// Applied on a non-matching tick.
    pub decay: Decay,
    /// Scores are clamped to `[0, max_score]`.
    pub max_score: u8,
    /// Arrival fires when the target's score reaches this.
    pub trigger: u8,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            increment: 2,
            decay: Decay::Subtract(2),
            max_score: 10,
            trigger: 6,
        }
    }
}

/// One accepted (colour, reflectance range) combination.
///
/// `color: None` accepts any colour; the reflectance bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRule {
    pub color: Option<Color>,
    pub min_reflectance: u8,
    pub max_reflectance: u8,
}

impl FingerprintRule {
    pub const fn new(color: Option<Color>, min_reflectance: u8, max_reflectance: u8) -> Self {
        Self {
            color,
            min_reflectance,
            max_reflectance,
        }
    }

    pub fn matches(&self, color: Color, reflectance: u8) -> bool {
        let color_ok = self.color.is_none_or(|c| c == color);
        color_ok && (self.min_reflectance..=self.max_reflectance).contains(&reflectance)
    }
}

/// Static description of one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationProfile {
    pub id: StationId,
    pub name: Label,
    /// Any rule matching counts as a fingerprint hit.  Rules may overlap
    /// with other stations' rules.
    pub rules: Vec<FingerprintRule, MAX_RULES>,
    /// Corners that must be counted before this station is hunted.
    #[serde(default)]
    pub min_corners: u32,
    /// Blind distance applied when leaving this station (mm).
    #[serde(default)]
    pub blind_distance_mm: f32,
    /// Cooldown applied when leaving this station (ms).
    #[serde(default)]
    pub cooldown_ms: u32,
}

impl StationProfile {
    pub fn matches(&self, color: Color, reflectance: u8) -> bool {
        self.rules.iter().any(|r| r.matches(color, reflectance))
    }
}

// ---------------------------------------------------------------------------
// Materials
// ---------------------------------------------------------------------------

/// One material row: reflectance range plus accepted colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRow {
    pub label: Label,
    pub min_reflectance: u8,
    pub max_reflectance: u8,
    pub colors: Vec<Color, MAX_COLORS>,
    /// Station whose bin takes this material.
    #[serde(default)]
    pub station: Option<StationId>,
}

impl MaterialRow {
    pub fn matches(&self, color: Color, reflectance: u8) -> bool {
        (self.min_reflectance..=self.max_reflectance).contains(&reflectance)
            && self.colors.contains(&color)
    }
}

/// Material classification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialTable {
    pub rows: Vec<MaterialRow, MAX_MATERIALS>,
    /// Where items with no specific row go (unmatched or empty).
    pub fallback_station: Option<StationId>,
}

impl MaterialTable {
    /// Index of the first declared row accepting this sample.
    pub fn first_match(&self, color: Color, reflectance: u8) -> Option<usize> {
        self.rows.iter().position(|r| r.matches(color, reflectance))
    }

    /// Station where `item` should be delivered, if any.
    pub fn delivery_station(&self, item: &ItemClassification) -> Option<StationId> {
        self.rows
            .iter()
            .find(|r| r.label == item.material)
            .and_then(|r| r.station)
            .or(self.fallback_station)
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        let mut rows = Vec::new();
        let _ = rows.push(MaterialRow {
            label: label("Plastic"),
            min_reflectance: 6,
            max_reflectance: 100,
            colors: Vec::from_slice(&[Color::Black, Color::Brown, Color::Yellow])
                .unwrap_or_default(),
            station: Some(StationId(1)),
        });
        let _ = rows.push(MaterialRow {
            label: label("Paper"),
            min_reflectance: 21,
            max_reflectance: 100,
            colors: Vec::from_slice(&[Color::White, Color::Blue]).unwrap_or_default(),
            station: Some(StationId(2)),
        });
        Self {
            rows,
            fallback_station: Some(StationId(3)),
        }
    }
}

// ---------------------------------------------------------------------------
// Manipulator
// ---------------------------------------------------------------------------

/// How the robot centres an object before grasping it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Creep {
    /// Grasp where the robot stopped.
    None,
    /// Drive straight this far (mm).
    Distance(f32),
    /// Drive at `speed` for `ms`.
    Timed { speed: f32, ms: u32 },
}

/// Pick-up, classification and delivery geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Proximity reading (mm) below which an object is picked up.
    pub pickup_distance_mm: u32,
    pub creep: Creep,
    pub lift_speed: f32,
    /// Lift travel position (raised).
    pub lift_safe_pos: i32,
    /// Lift position at floor level.
    pub lift_down_pos: i32,
    pub grip_speed: f32,
    /// Gripper open position.
    pub grip_open_pos: i32,
    /// Signed speed that closes the gripper.
    pub grip_close_speed: f32,
    /// Duty limit while grasping (0–100).
    pub grip_force: u8,
    /// Duty limit for the gentle resting close and calibration (0–100).
    pub grip_rest_force: u8,
    /// Classification samples per item.
    pub samples: u8,
    pub sample_delay_ms: u32,
    /// Turn towards the bin (deg); reversed on the way back.
    pub drop_turn_deg: f32,
    /// Maximum approach distance towards the bin (mm).
    pub approach_max_mm: f32,
    pub approach_speed: f32,
    /// Proximity reading (mm) at which the bin wall stops the approach.
    pub bin_stop_mm: u32,
    /// Extra creep after the approach stops (ms, 0 = none).
    pub nudge_ms: u32,
    pub release_pause_ms: u32,
    /// Start raising the lift while the gripper opens.
    pub lift_during_release: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            pickup_distance_mm: 50,
            creep: Creep::Distance(30.0),
            lift_speed: 200.0,
            lift_safe_pos: -260,
            lift_down_pos: 0,
            grip_speed: 200.0,
            grip_open_pos: -70,
            grip_close_speed: 200.0,
            grip_force: 72,
            grip_rest_force: 40,
            samples: 5,
            sample_delay_ms: 200,
            drop_turn_deg: 90.0,
            approach_max_mm: 150.0,
            approach_speed: 30.0,
            bin_stop_mm: 30,
            nudge_ms: 0,
            release_pause_ms: 500,
            lift_during_release: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Mission flow
// ---------------------------------------------------------------------------

/// Mission-level flow settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionSettings {
    /// Block in INIT until the start button is pressed and released.
    pub wait_for_start: bool,
    /// Optional splash image shown at startup.
    pub startup_image: Option<Label>,
    /// Straight drive after an arrival to leave the patch (mm).
    pub clear_patch_mm: f32,
    /// Pause after an arrival (ms).
    pub arrival_pause_ms: u32,
    /// Emit a telemetry event every N ticks (0 = never).
    pub telemetry_every_ticks: u32,
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            wait_for_start: true,
            startup_image: Some(label("logo.png")),
            clear_patch_mm: 100.0,
            arrival_pause_ms: 0,
            telemetry_every_ticks: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// MissionConfig
// ---------------------------------------------------------------------------

/// Complete configuration for one mission run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub drive: DriveConfig,
    pub corners: CornerConfig,
    pub confidence: ConfidenceConfig,
    pub stations: Vec<StationProfile, MAX_STATIONS>,
    /// Cyclic visiting order.
    pub sequence: Vec<StationId, MAX_SEQUENCE>,
    /// Blind distance from the start box to the first hunt (mm).
    pub initial_blind_distance_mm: f32,
    /// Arrival here resets the corner count.
    pub lap_station: Option<StationId>,
    pub materials: MaterialTable,
    pub handler: HandlerConfig,
    pub mission: MissionSettings,
}

impl Default for MissionConfig {
    fn default() -> Self {
        let mut stations = Vec::new();
        // Green reads as GREEN, or as BLUE once above the glint level.
        let _ = stations.push(StationProfile {
            id: StationId(1),
            name: label("Green"),
            rules: Vec::from_slice(&[
                FingerprintRule::new(Some(Color::Green), 0, 100),
                FingerprintRule::new(Some(Color::Blue), 18, 100),
            ])
            .unwrap_or_default(),
            min_corners: 1,
            blind_distance_mm: 150.0,
            cooldown_ms: 0,
        });
        // Yellow reads as YELLOW, BROWN, or saturated BLUE.
        let _ = stations.push(StationProfile {
            id: StationId(2),
            name: label("Yellow"),
            rules: Vec::from_slice(&[
                FingerprintRule::new(Some(Color::Yellow), 0, 100),
                FingerprintRule::new(Some(Color::Brown), 0, 100),
                FingerprintRule::new(Some(Color::Blue), 91, 100),
            ])
            .unwrap_or_default(),
            min_corners: 0,
            blind_distance_mm: 200.0,
            cooldown_ms: 0,
        });
        let _ = stations.push(StationProfile {
            id: StationId(3),
            name: label("Orange"),
            rules: Vec::from_slice(&[FingerprintRule::new(Some(Color::Red), 0, 100)])
                .unwrap_or_default(),
            min_corners: 0,
            blind_distance_mm: 150.0,
            cooldown_ms: 0,
        });

        Self {
            drive: DriveConfig::default(),
            corners: CornerConfig::default(),
            confidence: ConfidenceConfig::default(),
            stations,
            sequence: Vec::from_slice(&[StationId(1), StationId(2), StationId(3)])
                .unwrap_or_default(),
            initial_blind_distance_mm: 200.0,
            lap_station: Some(StationId(3)),
            materials: MaterialTable::default(),
            handler: HandlerConfig::default(),
            mission: MissionSettings::default(),
        }
    }
}

impl MissionConfig {
    /// Look up a station profile by id.
    pub fn station(&self, id: StationId) -> Option<&StationProfile> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Reject out-of-range or inconsistent values.  Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.drive;
        if !(0.0..=100.0).contains(&d.threshold) {
            return Err(ConfigError::ValidationFailed("drive.threshold must be in 0..=100"));
        }
        if !d.forward_speed.is_finite() || !d.gain.is_finite() {
            return Err(ConfigError::ValidationFailed("drive speed and gain must be finite"));
        }
        if d.tick_ms == 0 {
            return Err(ConfigError::ValidationFailed("drive.tick_ms must be positive"));
        }

        let c = &self.corners;
        if c.white_threshold > 100 {
            return Err(ConfigError::ValidationFailed("corners.white_threshold must be <= 100"));
        }
        if c.valid_run_mm <= 0.0 || c.cooldown_mm < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "corners.valid_run_mm must be positive and cooldown_mm non-negative",
            ));
        }

        let k = &self.confidence;
        if k.increment == 0 {
            return Err(ConfigError::ValidationFailed("confidence.increment must be positive"));
        }
        if k.trigger == 0 || k.trigger > k.max_score {
            return Err(ConfigError::ValidationFailed(
                "confidence.trigger must be in 1..=max_score",
            ));
        }

        if self.stations.is_empty() {
            return Err(ConfigError::ValidationFailed("station table is empty"));
        }
        for (i, s) in self.stations.iter().enumerate() {
            if s.rules.is_empty() {
                return Err(ConfigError::ValidationFailed("every station needs a fingerprint rule"));
            }
            if s.rules.iter().any(|r| r.min_reflectance > r.max_reflectance) {
                return Err(ConfigError::ValidationFailed("fingerprint rule has min > max"));
            }
            if s.blind_distance_mm < 0.0 {
                return Err(ConfigError::ValidationFailed("station blind distance is negative"));
            }
            if self.stations[..i].iter().any(|o| o.id == s.id) {
                return Err(ConfigError::ValidationFailed("duplicate station id"));
            }
        }

        if self.sequence.is_empty() {
            return Err(ConfigError::ValidationFailed("sequence is empty"));
        }
        if self.sequence.iter().any(|id| self.station(*id).is_none()) {
            return Err(ConfigError::ValidationFailed("sequence names an undeclared station"));
        }
        if self.lap_station.is_some_and(|id| self.station(id).is_none()) {
            return Err(ConfigError::ValidationFailed("lap_station is not declared"));
        }
        if self.initial_blind_distance_mm < 0.0 {
            return Err(ConfigError::ValidationFailed("initial blind distance is negative"));
        }

        let m = &self.materials;
        if m.rows.iter().any(|r| r.min_reflectance > r.max_reflectance) {
            return Err(ConfigError::ValidationFailed("material row has min > max"));
        }
        if m
            .rows
            .iter()
            .filter_map(|r| r.station)
            .chain(m.fallback_station)
            .any(|id| self.station(id).is_none())
        {
            return Err(ConfigError::ValidationFailed("material maps to an undeclared station"));
        }

        let h = &self.handler;
        if h.samples == 0 {
            return Err(ConfigError::ValidationFailed("handler.samples must be at least 1"));
        }
        if h.grip_force > 100 || h.grip_rest_force > 100 {
            return Err(ConfigError::ValidationFailed("gripper duty limits must be <= 100"));
        }
        if h.approach_max_mm <= 0.0 || h.approach_speed <= 0.0 {
            return Err(ConfigError::ValidationFailed("bin approach distance and speed must be positive"));
        }
        if self.mission.clear_patch_mm < 0.0 {
            return Err(ConfigError::ValidationFailed("mission.clear_patch_mm is negative"));
        }

        Ok(())
    }
}
