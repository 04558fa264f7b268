//! Host simulation of the sorting robot.
//!
//! One [`World`] holds the whole physical state: a looped track with floor
//! patches, loose objects, bins beside the track, and the robot's pose,
//! odometer, arm positions and clock.  Every port adapter below holds a
//! shared handle to it, so driving, waiting and sensing stay consistent.
//!
//! The model is deliberately coarse:
//!
//! - The robot always stays on the line; angular rate is ignored.
//! - Time only advances through [`SimClock`] delays and blocking motions.
//! - A non-zero heading means the robot has turned off the line towards a
//!   bin; driving then moves it towards the bin wall instead of along the
//!   track.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::app::ports::{
    Button, ColorReflectanceSensor, DriveBase, Feedback, Hardware, Indicator, LinearActuator,
    MissionClock, Platform, ProximitySensor, UserInput,
};
use crate::error::AssetError;
use crate::mission::context::Color;

/// Reflectance at the edge of the black line.
const LINE_EDGE_REFLECTANCE: u8 = 45;
/// Range reported when nothing is in front of the robot (mm).
const OPEN_RANGE_MM: u32 = 2550;
/// Objects closer than this (mm) are caught by a closing gripper.
const GRASP_REACH_MM: f32 = 60.0;
/// Speed used for blocking straight moves (mm/s).
const STRAIGHT_SPEED: f32 = 100.0;
/// Turn rate used for blocking turns (deg/s).
const TURN_RATE: f32 = 90.0;
/// How long the simulated operator holds the start button (ms).
const START_PRESS_MS: u64 = 200;
/// Gripper position at its open mechanical stop.
const GRIPPER_OPEN_STOP: i32 = -90;

// ───────────────────────────────────────────────────────────────
// World model
// ───────────────────────────────────────────────────────────────

/// A coloured stretch of floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patch {
    pub start_mm: f32,
    pub end_mm: f32,
    pub color: Color,
    pub reflectance: u8,
}

/// An object lying on the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub position_mm: f32,
    pub color: Color,
    pub reflectance: u8,
}

/// An object dropped into a bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    /// Track position where the robot turned off to the bin.
    pub track_mm: f32,
    pub item: Item,
}

/// Complete simulated state.
#[derive(Debug)]
pub struct World {
    /// Track loop length (mm).
    pub lap_mm: f32,
    pub patches: Vec<Patch>,
    pub items: Vec<Item>,
    /// Distance from the line to the bin wall (mm).
    pub bin_offset_mm: f32,

    /// Position along the loop (mm, wraps at `lap_mm`).
    pub position_mm: f32,
    /// Distance towards the bin after turning off the line (mm).
    pub offset_mm: f32,
    pub heading_deg: f32,
    pub odometer_mm: f32,
    /// Commanded continuous speed (mm/s).
    pub speed: f32,

    pub lift_pos: i32,
    pub gripper_pos: i32,
    pub held: Option<Item>,
    pub drops: Vec<Delivery>,

    pub now_us: u64,
    /// An operator is waiting to press the start button.
    pub start_pending: bool,
    start_pressed_at_ms: Option<u64>,
    /// Set from outside (e.g. Ctrl-C) to press the stop button.
    pub stop: Arc<AtomicBool>,
    /// Last status light colour, `None` until first set.
    pub indicator: Option<Indicator>,
    pub spoken: Vec<String>,
    pub beeps: u32,
}

impl World {
    pub fn new(lap_mm: f32) -> Self {
        Self {
            lap_mm,
            patches: Vec::new(),
            items: Vec::new(),
            bin_offset_mm: 120.0,
            position_mm: 0.0,
            offset_mm: 0.0,
            heading_deg: 0.0,
            odometer_mm: 0.0,
            speed: 0.0,
            lift_pos: 0,
            gripper_pos: 0,
            held: None,
            drops: Vec::new(),
            now_us: 0,
            start_pending: true,
            start_pressed_at_ms: None,
            stop: Arc::new(AtomicBool::new(false)),
            indicator: None,
            spoken: Vec::new(),
            beeps: 0,
        }
    }

    /// A 4 m loop with the three default stations, two corner markers and
    /// two objects.
    pub fn demo_track() -> Self {
        let mut w = Self::new(4000.0);
        let patch = |start_mm: f32, len: f32, color, reflectance| Patch {
            start_mm,
            end_mm: start_mm + len,
            color,
            reflectance,
        };
        w.patches = vec![
            patch(700.0, 80.0, Color::White, 90),
            patch(1100.0, 60.0, Color::Green, 22),
            patch(1900.0, 60.0, Color::Yellow, 60),
            patch(2400.0, 80.0, Color::White, 90),
            patch(3000.0, 80.0, Color::Red, 98),
        ];
        w.items = vec![
            Item {
                position_mm: 400.0,
                color: Color::Black,
                reflectance: 12,
            },
            Item {
                position_mm: 1500.0,
                color: Color::White,
                reflectance: 40,
            },
        ];
        w
    }

    pub fn now_ms(&self) -> u64 {
        self.now_us / 1000
    }

    fn wrap(&self, mm: f32) -> f32 {
        mm.rem_euclid(self.lap_mm)
    }

    /// Floor under the line sensor.
    pub fn floor(&self) -> (Color, u8) {
        if self.heading_deg.abs() > f32::EPSILON {
            return (Color::White, 80);
        }
        let pos = self.wrap(self.position_mm);
        self.patches
            .iter()
            .find(|p| (p.start_mm..p.end_mm).contains(&pos))
            .map_or((Color::Black, LINE_EDGE_REFLECTANCE), |p| {
                (p.color, p.reflectance)
            })
    }

    /// Distance to the nearest item ahead on the track, if any.
    fn nearest_item_ahead(&self) -> Option<(usize, f32)> {
        let pos = self.wrap(self.position_mm);
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (i, self.wrap(item.position_mm - pos)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Forward range reading.
    pub fn range(&self) -> u32 {
        if self.heading_deg.abs() > f32::EPSILON {
            return (self.bin_offset_mm - self.offset_mm).max(0.0) as u32;
        }
        match self.nearest_item_ahead() {
            Some((_, gap)) if gap < OPEN_RANGE_MM as f32 => gap as u32,
            _ => OPEN_RANGE_MM,
        }
    }

    /// Move by `mm` along the current heading.
    fn travel(&mut self, mm: f32) {
        if self.heading_deg.abs() > f32::EPSILON {
            self.offset_mm = (self.offset_mm + mm).max(0.0);
        } else {
            self.position_mm = self.wrap(self.position_mm + mm);
        }
        self.odometer_mm += mm;
    }

    fn advance_time_us(&mut self, us: u64) {
        let secs = us as f32 / 1_000_000.0;
        let speed = self.speed;
        if speed != 0.0 {
            self.travel(speed * secs);
        }
        self.now_us += us;
    }

    fn spend_motion(&mut self, secs: f32) {
        self.now_us += (secs.abs() * 1_000_000.0) as u64;
    }

    fn grasp(&mut self) {
        if self.held.is_some() {
            return;
        }
        if let Some((i, gap)) = self.nearest_item_ahead() {
            if gap <= GRASP_REACH_MM {
                let item = self.items.remove(i);
                debug!("sim: grasped {:?} at {:.0} mm", item.color, item.position_mm);
                self.held = Some(item);
            }
        }
    }

    fn release(&mut self) {
        if let Some(item) = self.held.take() {
            if self.heading_deg.abs() > f32::EPSILON {
                self.drops.push(Delivery {
                    track_mm: self.position_mm,
                    item,
                });
            } else {
                // Dropped on the line: it lies in front of the robot again.
                self.items.push(Item {
                    position_mm: self.wrap(self.position_mm + 20.0),
                    ..item
                });
            }
        }
    }

    /// Wrap the world in the port adapters.
    pub fn into_hardware(self) -> (Hardware<SimPlatform>, Rc<RefCell<World>>) {
        let world = Rc::new(RefCell::new(self));
        let hw = Hardware {
            drive: SimDrive(world.clone()),
            lift: SimActuator {
                world: world.clone(),
                joint: Joint::Lift,
            },
            gripper: SimActuator {
                world: world.clone(),
                joint: Joint::Gripper,
            },
            line_sensor: SimColorSensor {
                world: world.clone(),
                mount: Mount::Line,
            },
            item_sensor: SimColorSensor {
                world: world.clone(),
                mount: Mount::Gripper,
            },
            proximity: SimRange(world.clone()),
            input: SimButtons(world.clone()),
            feedback: SimFeedback(world.clone()),
            clock: SimClock(world.clone()),
        };
        (hw, world)
    }
}

type Shared = Rc<RefCell<World>>;

// ───────────────────────────────────────────────────────────────
// Port adapters
// ───────────────────────────────────────────────────────────────

/// Marker type binding the simulated adapters together.
pub struct SimPlatform;

impl Platform for SimPlatform {
    type Drive = SimDrive;
    type Actuator = SimActuator;
    type Sensor = SimColorSensor;
    type Range = SimRange;
    type Input = SimButtons;
    type Signal = SimFeedback;
    type Clock = SimClock;
}

pub struct SimDrive(Shared);

impl DriveBase for SimDrive {
    fn drive(&mut self, linear: f32, _angular: f32) {
        self.0.borrow_mut().speed = linear;
    }

    fn stop(&mut self) {
        self.0.borrow_mut().speed = 0.0;
    }

    fn straight(&mut self, distance_mm: f32) {
        let mut w = self.0.borrow_mut();
        w.speed = 0.0;
        w.travel(distance_mm);
        w.spend_motion(distance_mm / STRAIGHT_SPEED);
    }

    fn turn(&mut self, angle_deg: f32) {
        let mut w = self.0.borrow_mut();
        w.speed = 0.0;
        w.heading_deg += angle_deg;
        if w.heading_deg.abs() <= f32::EPSILON {
            w.heading_deg = 0.0;
            w.offset_mm = 0.0;
        }
        w.spend_motion(angle_deg / TURN_RATE);
    }

    fn reset(&mut self) {
        self.0.borrow_mut().odometer_mm = 0.0;
    }

    fn distance(&self) -> f32 {
        self.0.borrow().odometer_mm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joint {
    Lift,
    Gripper,
}

pub struct SimActuator {
    world: Shared,
    joint: Joint,
}

impl SimActuator {
    fn position_mut(w: &mut World, joint: Joint) -> &mut i32 {
        match joint {
            Joint::Lift => &mut w.lift_pos,
            Joint::Gripper => &mut w.gripper_pos,
        }
    }
}

impl LinearActuator for SimActuator {
    fn run_to_target(&mut self, speed: f32, position: i32) {
        let mut w = self.world.borrow_mut();
        let pos = Self::position_mut(&mut w, self.joint);
        let travel = (position - *pos) as f32;
        *pos = position;
        if self.joint == Joint::Gripper && travel < 0.0 {
            w.release();
        }
        if speed != 0.0 {
            w.spend_motion(travel / speed);
        }
    }

    fn start_to_target(&mut self, _speed: f32, position: i32) {
        // Completes in the background: no time is spent here.
        let mut w = self.world.borrow_mut();
        *Self::position_mut(&mut w, self.joint) = position;
    }

    fn run_until_stalled(&mut self, speed: f32, _force_limit: u8) -> i32 {
        let mut w = self.world.borrow_mut();
        let end = match (self.joint, speed >= 0.0) {
            (Joint::Gripper, true) => {
                w.grasp();
                if w.held.is_some() { -20 } else { 0 }
            }
            (Joint::Gripper, false) => {
                w.release();
                GRIPPER_OPEN_STOP
            }
            (Joint::Lift, true) => 0,
            (Joint::Lift, false) => -300,
        };
        w.spend_motion(0.5);
        *Self::position_mut(&mut w, self.joint) = end;
        end
    }

    fn reset_position(&mut self, position: i32) {
        let mut w = self.world.borrow_mut();
        *Self::position_mut(&mut w, self.joint) = position;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mount {
    Line,
    Gripper,
}

pub struct SimColorSensor {
    world: Shared,
    mount: Mount,
}

impl SimColorSensor {
    fn read(&self) -> (Color, u8) {
        let w = self.world.borrow();
        match self.mount {
            Mount::Line => w.floor(),
            Mount::Gripper => w
                .held
                .map_or((Color::None, 0), |item| (item.color, item.reflectance)),
        }
    }
}

impl ColorReflectanceSensor for SimColorSensor {
    fn color(&mut self) -> Color {
        self.read().0
    }

    fn reflection(&mut self) -> u8 {
        self.read().1
    }

    fn ambient(&mut self) -> u8 {
        8
    }
}

pub struct SimRange(Shared);

impl ProximitySensor for SimRange {
    fn distance_mm(&mut self) -> u32 {
        self.0.borrow().range()
    }
}

pub struct SimButtons(Shared);

impl UserInput for SimButtons {
    fn is_pressed(&mut self, _button: Button) -> bool {
        let mut w = self.0.borrow_mut();
        if w.stop.load(Ordering::Relaxed) {
            return true;
        }
        if !w.start_pending {
            return false;
        }
        // The operator presses on the first poll and releases a moment later.
        let now = w.now_ms();
        let pressed_at = *w.start_pressed_at_ms.get_or_insert(now);
        if now - pressed_at < START_PRESS_MS {
            return true;
        }
        w.start_pending = false;
        false
    }
}

pub struct SimFeedback(Shared);

impl Feedback for SimFeedback {
    fn announce(&mut self, text: &str) {
        info!("SAY | {}", text);
        self.0.borrow_mut().spoken.push(text.to_owned());
    }

    fn beep(&mut self) {
        debug!("BEEP");
        self.0.borrow_mut().beeps += 1;
    }

    fn set_indicator(&mut self, indicator: Indicator) {
        debug!("LIGHT | {:?}", indicator);
        self.0.borrow_mut().indicator = Some(indicator);
    }

    fn show_image(&mut self, _name: &str) -> Result<(), AssetError> {
        Err(AssetError::NotFound)
    }
}

pub struct SimClock(Shared);

impl DelayNs for SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().advance_time_us(u64::from(ns / 1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.0.borrow_mut().advance_time_us(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().advance_time_us(u64::from(ms) * 1000);
    }
}

impl MissionClock for SimClock {
    fn now_ms(&self) -> u64 {
        self.0.borrow().now_ms()
    }
}
