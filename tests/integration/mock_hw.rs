//! Mock robot for integration tests.
//!
//! Every device shares one [`Rig`], which records each command in call
//! order so tests can assert on the full history.  Sensor readings are plain
//! fields that tests set between ticks.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use sortbot::app::events::MissionEvent;
use sortbot::app::ports::{
    Button, ColorReflectanceSensor, DriveBase, EventSink, Feedback, Hardware, Indicator,
    LinearActuator, MissionClock, Platform, ProximitySensor, UserInput,
};
use sortbot::config::MissionConfig;
use sortbot::error::AssetError;
use sortbot::mission::context::Color;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    Lift,
    Gripper,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Drive { linear: f32, angular: f32 },
    Stop,
    Straight(f32),
    Turn(f32),
    ResetOdometer,
    RunTo { joint: Joint, pos: i32 },
    StartTo { joint: Joint, pos: i32 },
    Stall { joint: Joint, closing: bool, force: u8 },
    ResetPosition { joint: Joint, pos: i32 },
    Announce(String),
    Beep,
    Indicator(Indicator),
    ShowImage(String),
}

// ── Shared rig ────────────────────────────────────────────────

pub struct Rig {
    pub calls: Vec<Call>,
    /// Line sensor reading returned until changed.
    pub floor: (Color, u8),
    pub ambient: u8,
    pub proximity_mm: u32,
    /// Samples returned by the gripper sensor, one per reflection read.
    pub item_samples: VecDeque<(Color, u8)>,
    pub odometer_mm: f32,
    /// Odometer advance per continuous `drive` call (one tick of travel).
    pub step_mm: f32,
    pub now_ms: u64,
    /// Centre button reads pressed inside these `[from, to)` windows (ms).
    pub press_windows: Vec<(u64, u64)>,
    /// Centre button reads pressed from this time on (ms).
    pub stop_at_ms: Option<u64>,
    pub has_image: bool,
    /// Make the next line sensor read panic.
    pub panic_on_read: bool,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            floor: (Color::Black, 45),
            ambient: 5,
            proximity_mm: 2550,
            item_samples: VecDeque::new(),
            odometer_mm: 0.0,
            step_mm: 1.0,
            now_ms: 0,
            press_windows: Vec::new(),
            stop_at_ms: None,
            has_image: false,
            panic_on_read: false,
        }
    }

    /// Queue `n` identical gripper-sensor samples.
    pub fn hold(&mut self, color: Color, reflectance: u8, n: usize) {
        for _ in 0..n {
            self.item_samples.push_back((color, reflectance));
        }
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    pub fn said(&self, text: &str) -> bool {
        self.calls
            .iter()
            .any(|c| matches!(c, Call::Announce(t) if t == text))
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedRig = Rc<RefCell<Rig>>;

// ── Platform ──────────────────────────────────────────────────

pub struct MockPlatform;

impl Platform for MockPlatform {
    type Drive = MockDrive;
    type Actuator = MockActuator;
    type Sensor = MockColorSensor;
    type Range = MockRange;
    type Input = MockButtons;
    type Signal = MockFeedback;
    type Clock = MockClock;
}

/// Build a mock robot and the handle tests use to script and inspect it.
pub fn mock_robot() -> (Hardware<MockPlatform>, SharedRig) {
    let rig = Rc::new(RefCell::new(Rig::new()));
    let hw = Hardware {
        drive: MockDrive(rig.clone()),
        lift: MockActuator(rig.clone(), Joint::Lift),
        gripper: MockActuator(rig.clone(), Joint::Gripper),
        line_sensor: MockColorSensor(rig.clone(), false),
        item_sensor: MockColorSensor(rig.clone(), true),
        proximity: MockRange(rig.clone()),
        input: MockButtons(rig.clone()),
        feedback: MockFeedback(rig.clone()),
        clock: MockClock(rig.clone()),
    };
    (hw, rig)
}

/// Default mission with the start button wait disabled.
pub fn quick_config() -> MissionConfig {
    let mut cfg = MissionConfig::default();
    cfg.mission.wait_for_start = false;
    cfg.mission.telemetry_every_ticks = 0;
    cfg
}

// ── Devices ───────────────────────────────────────────────────

pub struct MockDrive(SharedRig);

impl DriveBase for MockDrive {
    fn drive(&mut self, linear: f32, angular: f32) {
        let mut r = self.0.borrow_mut();
        r.odometer_mm += r.step_mm;
        r.calls.push(Call::Drive { linear, angular });
    }

    fn stop(&mut self) {
        self.0.borrow_mut().calls.push(Call::Stop);
    }

    fn straight(&mut self, distance_mm: f32) {
        let mut r = self.0.borrow_mut();
        r.odometer_mm += distance_mm;
        r.calls.push(Call::Straight(distance_mm));
    }

    fn turn(&mut self, angle_deg: f32) {
        self.0.borrow_mut().calls.push(Call::Turn(angle_deg));
    }

    fn reset(&mut self) {
        let mut r = self.0.borrow_mut();
        r.odometer_mm = 0.0;
        r.calls.push(Call::ResetOdometer);
    }

    fn distance(&self) -> f32 {
        self.0.borrow().odometer_mm
    }
}

pub struct MockActuator(SharedRig, Joint);

impl LinearActuator for MockActuator {
    fn run_to_target(&mut self, _speed: f32, position: i32) {
        self.0.borrow_mut().calls.push(Call::RunTo {
            joint: self.1,
            pos: position,
        });
    }

    fn start_to_target(&mut self, _speed: f32, position: i32) {
        self.0.borrow_mut().calls.push(Call::StartTo {
            joint: self.1,
            pos: position,
        });
    }

    fn run_until_stalled(&mut self, speed: f32, force_limit: u8) -> i32 {
        self.0.borrow_mut().calls.push(Call::Stall {
            joint: self.1,
            closing: speed > 0.0,
            force: force_limit,
        });
        0
    }

    fn reset_position(&mut self, position: i32) {
        self.0.borrow_mut().calls.push(Call::ResetPosition {
            joint: self.1,
            pos: position,
        });
    }
}

/// Line sensor (`false`) or gripper sensor (`true`).
pub struct MockColorSensor(SharedRig, bool);

impl ColorReflectanceSensor for MockColorSensor {
    fn color(&mut self) -> Color {
        if self.1 {
            return self
                .0
                .borrow()
                .item_samples
                .front()
                .map_or(Color::None, |s| s.0);
        }
        if self.0.borrow().panic_on_read {
            panic!("line sensor unplugged");
        }
        self.0.borrow().floor.0
    }

    fn reflection(&mut self) -> u8 {
        if self.1 {
            return self
                .0
                .borrow_mut()
                .item_samples
                .pop_front()
                .map_or(0, |s| s.1);
        }
        self.0.borrow().floor.1
    }

    fn ambient(&mut self) -> u8 {
        self.0.borrow().ambient
    }
}

pub struct MockRange(SharedRig);

impl ProximitySensor for MockRange {
    fn distance_mm(&mut self) -> u32 {
        self.0.borrow().proximity_mm
    }
}

pub struct MockButtons(SharedRig);

impl UserInput for MockButtons {
    fn is_pressed(&mut self, _button: Button) -> bool {
        let r = self.0.borrow();
        r.stop_at_ms.is_some_and(|t| r.now_ms >= t)
            || r
                .press_windows
                .iter()
                .any(|&(from, to)| (from..to).contains(&r.now_ms))
    }
}

pub struct MockFeedback(SharedRig);

impl Feedback for MockFeedback {
    fn announce(&mut self, text: &str) {
        self.0.borrow_mut().calls.push(Call::Announce(text.to_owned()));
    }

    fn beep(&mut self) {
        self.0.borrow_mut().calls.push(Call::Beep);
    }

    fn set_indicator(&mut self, indicator: Indicator) {
        self.0.borrow_mut().calls.push(Call::Indicator(indicator));
    }

    fn show_image(&mut self, name: &str) -> Result<(), AssetError> {
        let mut r = self.0.borrow_mut();
        r.calls.push(Call::ShowImage(name.to_owned()));
        if r.has_image {
            Ok(())
        } else {
            Err(AssetError::NotFound)
        }
    }
}

pub struct MockClock(SharedRig);

impl DelayNs for MockClock {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now_ms += u64::from(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().now_ms += u64::from(ms);
    }
}

impl MissionClock for MockClock {
    fn now_ms(&self) -> u64 {
        self.0.borrow().now_ms
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<MissionEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&MissionEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &MissionEvent) {
        self.events.push(event.clone());
    }
}
