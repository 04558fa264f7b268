//! Port traits: the hexagonal boundary between mission logic and the robot.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MissionSequencer (domain)
//! ```
//!
//! One trait per device capability.  Driven adapters (a real brick, the
//! host simulator, test mocks) implement them; the domain core consumes them
//! through a [`Platform`] bundle so it never touches hardware directly.
//!
//! ## Contract notes
//!
//! - Blocking calls (`straight`, `turn`, `run_to_target`,
//!   `run_until_stalled`) return only when the motion has finished.
//! - Ports are infallible.  Hardware actions are assumed to succeed; a grasp
//!   that never stalls simply ends when the commanded motion ends.
//! - Feedback calls are fire-and-forget.

use embedded_hal::delay::DelayNs;

use crate::config::MissionConfig;
use crate::error::{AssetError, ConfigError};
use crate::mission::context::Color;

use super::events::MissionEvent;

// ───────────────────────────────────────────────────────────────
// Motion ports (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Differential drive base with an odometer.
pub trait DriveBase {
    /// Drive continuously at `linear` mm/s while turning at `angular` deg/s.
    fn drive(&mut self, linear: f32, angular: f32);

    /// Stop the wheels.
    fn stop(&mut self);

    /// Drive straight `distance_mm` (negative reverses).  Blocking.
    fn straight(&mut self, distance_mm: f32);

    /// Turn in place by `angle_deg`.  Blocking.
    fn turn(&mut self, angle_deg: f32);

    /// Zero the odometer.
    fn reset(&mut self);

    /// Distance travelled since the last reset (mm).
    fn distance(&self) -> f32;
}

/// Position-controlled motor driving the lift or the gripper.
pub trait LinearActuator {
    /// Move to `position` at `speed`.  Blocking.
    fn run_to_target(&mut self, speed: f32, position: i32);

    /// Start moving to `position` without waiting.
    ///
    /// Actuators without a non-blocking API fall back to the blocking move.
    fn start_to_target(&mut self, speed: f32, position: i32) {
        self.run_to_target(speed, position);
    }

    /// Run at `speed` until the motor stalls under `force_limit` duty
    /// (0–100), then hold.  Returns the final position.  Blocking.
    fn run_until_stalled(&mut self, speed: f32, force_limit: u8) -> i32;

    /// Redefine the current position as `position`.
    fn reset_position(&mut self, position: i32);
}

// ───────────────────────────────────────────────────────────────
// Sensor ports (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Colour + reflected/ambient light sensor.
pub trait ColorReflectanceSensor {
    fn color(&mut self) -> Color;

    /// Reflected light intensity (0–100).
    fn reflection(&mut self) -> u8;

    /// Ambient light intensity (0–100).
    fn ambient(&mut self) -> u8;
}

/// Forward-facing range sensor.
pub trait ProximitySensor {
    /// Distance to the nearest obstacle (mm).
    fn distance_mm(&mut self) -> u32;
}

/// Physical buttons the mission reads.  Centre starts and stops a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Center,
}

/// Button polling.
pub trait UserInput {
    fn is_pressed(&mut self, button: Button) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Operator feedback (domain → speaker / light / screen)
// ───────────────────────────────────────────────────────────────

/// Status light colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Red,
    Orange,
    Yellow,
    Green,
}

/// Speech, beeps, status light and screen.
pub trait Feedback {
    fn announce(&mut self, text: &str);

    fn beep(&mut self);

    fn set_indicator(&mut self, indicator: Indicator);

    /// Show a named image on the screen.
    fn show_image(&mut self, _name: &str) -> Result<(), AssetError> {
        Err(AssetError::Unsupported)
    }
}

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic mission clock plus blocking delays.
pub trait MissionClock: DelayNs {
    /// Milliseconds since an arbitrary fixed origin (monotonic).
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Platform bundle
// ───────────────────────────────────────────────────────────────

/// Type-level description of one robot: which adapter implements each port.
pub trait Platform {
    type Drive: DriveBase;
    type Actuator: LinearActuator;
    type Sensor: ColorReflectanceSensor;
    type Range: ProximitySensor;
    type Input: UserInput;
    type Signal: Feedback;
    type Clock: MissionClock;
}

/// Every device the mission controller commands, owned in one place.
///
/// Fields are public so the sequencer can borrow two devices at once
/// (e.g. drive base and proximity sensor during the bin approach).
pub struct Hardware<P: Platform> {
    pub drive: P::Drive,
    pub lift: P::Actuator,
    pub gripper: P::Actuator,
    /// Downward-facing sensor that follows the line and reads stations.
    pub line_sensor: P::Sensor,
    /// Sensor inside the gripper that reads the held object.
    pub item_sensor: P::Sensor,
    pub proximity: P::Range,
    pub input: P::Input,
    pub feedback: P::Signal,
    pub clock: P::Clock,
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`MissionEvent`]s through this port.
/// Adapters decide where they go (serial log, file, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &MissionEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads the mission configuration before RUNNING.
///
/// Implementations MUST run [`MissionConfig::validate`] and surface
/// [`ConfigError::ValidationFailed`] rather than clamping bad values.
pub trait ConfigPort {
    fn load(&self) -> Result<MissionConfig, ConfigError>;
}
