//! Mission sequencer: the hexagonal core.
//!
//! [`MissionSequencer`] owns the mission state and every decision component.
//! All I/O flows through the [`Hardware`] bundle and the [`EventSink`] port,
//! so the whole mission runs unchanged against a real robot, the host
//! simulator, or scripted mocks.
//!
//! ```text
//!  Sensors ──▶ ┌──────────────────────────────────────┐ ──▶ EventSink
//!              │           MissionSequencer           │
//!  Motors  ◀── │ Steering · Corners · Stations · Arm  │
//!              └──────────────────────────────────────┘
//! ```
//!
//! ## Tick order
//!
//! 1. Read one [`SensorFrame`] and feed the suppression window.
//! 2. Object in range and nothing held: pick up, classify, rebase the
//!    odometer, end the tick.
//! 3. Compute steering and update the corner counter.
//! 4. Window closed and enough corners: check the target station.  On
//!    arrival handle delivery, advance the target, open a new window.
//! 5. Otherwise issue the steering command.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::{Label, MissionConfig};
use crate::control::corner::CornerCounter;
use crate::control::steering::SteeringController;
use crate::error::ConfigError;
use crate::handler::ObjectHandler;
use crate::mission::context::{MissionState, SensorFrame, StationId};
use crate::mission::{MissionPhase, PhaseTracker};
use crate::station::StationClassifier;

use super::events::{ExitReason, MissionEvent, TickStatus, TickTelemetry};
use super::ports::{
    Button, ColorReflectanceSensor, DriveBase, EventSink, Feedback, Hardware, Indicator,
    MissionClock, Platform, ProximitySensor, UserInput,
};

/// Start button poll period during the handshake (ms).
const BUTTON_POLL_MS: u32 = 20;

// ───────────────────────────────────────────────────────────────
// Outcomes
// ───────────────────────────────────────────────────────────────

/// What one RUNNING tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// An object was picked up; steering was skipped.
    PickedUp,
    /// The target station was reached and handled.
    Arrived { station: StationId, delivered: bool },
    /// The steering command was issued.
    Steered(TickStatus),
}

/// Summary of one mission run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionReport {
    pub ticks: u64,
    pub stations_visited: u32,
    pub items_picked: u32,
    pub items_delivered: u32,
    /// Corners confirmed over the whole run (not reset at lap boundaries).
    pub corners: u32,
    pub exit: Option<ExitReason>,
}

// ───────────────────────────────────────────────────────────────
// MissionSequencer
// ───────────────────────────────────────────────────────────────

/// Top-level mission state machine.
pub struct MissionSequencer<P: Platform, S: EventSink> {
    hw: Hardware<P>,
    sink: S,
    config: MissionConfig,
    steering: SteeringController,
    corners: CornerCounter,
    stations: StationClassifier,
    handler: ObjectHandler,
    phase: PhaseTracker,
    state: MissionState,
    /// Mission clock value when RUNNING was entered.
    start_ms: u64,
    report: MissionReport,
    shut_down: bool,
}

impl<P: Platform, S: EventSink> MissionSequencer<P, S> {
    /// Build the sequencer.  The configuration is validated here; nothing
    /// moves until [`initialize`](Self::initialize) or [`run`](Self::run).
    pub fn new(config: MissionConfig, hw: Hardware<P>, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let first = config
            .sequence
            .first()
            .copied()
            .ok_or(ConfigError::ValidationFailed("sequence is empty"))?;

        Ok(Self {
            steering: SteeringController::new(&config.drive),
            corners: CornerCounter::new(&config.corners),
            stations: StationClassifier::new(&config.stations, &config.confidence),
            handler: ObjectHandler::new(&config.handler, &config.materials, config.drive.tick_ms),
            phase: PhaseTracker::new(),
            state: MissionState::new(first, config.initial_blind_distance_mm),
            start_ms: 0,
            report: MissionReport::default(),
            shut_down: false,
            hw,
            sink,
            config,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Hardware-ready handshake, then enter RUNNING.
    ///
    /// No-op outside INIT.
    pub fn initialize(&mut self) {
        if self.phase.current() != MissionPhase::Init {
            return;
        }

        if let Some(image) = &self.config.mission.startup_image {
            if let Err(e) = self.hw.feedback.show_image(image) {
                warn!("Startup image '{image}' skipped: {e}");
            }
        }
        self.hw.feedback.set_indicator(Indicator::Orange);
        self.hw.feedback.announce("System start");

        self.handler.prepare(&mut self.hw);

        self.hw.feedback.set_indicator(Indicator::Yellow);
        if self.config.mission.wait_for_start {
            self.hw.feedback.announce("Press center to start");
            self.wait_for_start_button();
        }
        self.hw.feedback.set_indicator(Indicator::Green);
        self.hw.feedback.announce("Ready");

        self.hw.drive.reset();
        self.start_ms = self.hw.clock.now_ms();
        self.state = MissionState::new(self.state.target, self.config.initial_blind_distance_mm);
        self.stations.reset_all();

        self.enter(MissionPhase::Running);
        self.sink.emit(&MissionEvent::Started {
            first_target: self.state.target,
        });
        info!("Mission running, hunting {}", self.state.target);
    }

    /// Block until the start button is pressed and then released.
    fn wait_for_start_button(&mut self) {
        while !self.hw.input.is_pressed(Button::Center) {
            self.hw.clock.delay_ms(BUTTON_POLL_MS);
        }
        while self.hw.input.is_pressed(Button::Center) {
            self.hw.clock.delay_ms(BUTTON_POLL_MS);
        }
    }

    /// Run the whole mission: handshake, tick loop, shutdown.
    ///
    /// The loop ends when the stop button is pressed, or after `max_ticks`
    /// ticks if a limit is given.  The shutdown sequence runs on every exit
    /// path, including a panic inside a tick.
    pub fn run(&mut self, max_ticks: Option<u64>) -> MissionReport {
        let guard = ShutdownGuard { seq: self };
        guard.seq.initialize();

        let reason = loop {
            if guard.seq.hw.input.is_pressed(Button::Center) {
                break ExitReason::StopButton;
            }
            if max_ticks.is_some_and(|max| guard.seq.report.ticks >= max) {
                break ExitReason::TickLimit;
            }
            guard.seq.tick();
            let period = guard.seq.config.drive.tick_ms;
            guard.seq.hw.clock.delay_ms(period);
        };

        guard.seq.report.exit = Some(reason);
        guard.seq.sink.emit(&MissionEvent::Stopped(reason));
        info!("Mission loop exited: {reason:?}");
        drop(guard);

        self.report.clone()
    }

    /// Stop, stow the arm, confirm audibly.  Runs at most once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.enter(MissionPhase::ShuttingDown);

        self.hw.feedback.set_indicator(Indicator::Red);
        self.hw.drive.stop();
        self.hw.feedback.announce("Shutdown");
        self.handler.park(&mut self.hw);
        self.hw.feedback.beep();
        info!(
            "Shutdown complete: {} ticks, {} stations, {} picked, {} delivered",
            self.report.ticks,
            self.report.stations_visited,
            self.report.items_picked,
            self.report.items_delivered
        );
    }

    fn enter(&mut self, next: MissionPhase) {
        if let Some(from) = self.phase.transition(next) {
            self.sink.emit(&MissionEvent::PhaseChanged { from, to: next });
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one RUNNING control tick.
    pub fn tick(&mut self) -> TickOutcome {
        self.phase.tick();
        self.report.ticks += 1;

        let frame = self.read_frame();
        self.state.advance_window(&frame);

        // 1. Pick-up preempts everything else this tick.
        if self.state.held_item.is_none()
            && frame.proximity_mm < self.config.handler.pickup_distance_mm
        {
            self.pick_up();
            return TickOutcome::PickedUp;
        }

        // 2. Steering and lap progress.
        let cmd = self.steering.steer(&frame);
        let target = self.state.target;
        let min_corners = self
            .config
            .station(target)
            .map_or(0, |profile| profile.min_corners);

        if self.corners.update(
            &mut self.state.cornering,
            frame.reflectance,
            frame.travelled_mm,
            frame.elapsed_ms,
            min_corners > 0,
        ) {
            self.report.corners += 1;
            self.hw.feedback.beep();
            self.sink.emit(&MissionEvent::CornerConfirmed {
                corners: self.state.cornering.corners_passed,
            });
        }

        // 3. Station check against the target only.
        let status = if self.state.is_suppressed() {
            TickStatus::Blind
        } else if self.state.cornering.corners_passed < min_corners {
            TickStatus::CountingCorners
        } else if self.config.drive.straight_color == Some(frame.color) {
            TickStatus::Straight
        } else {
            TickStatus::Hunting
        };

        let hunting = matches!(status, TickStatus::Hunting | TickStatus::Straight);
        if hunting && self.stations.update_and_check(&frame, target) {
            self.hw.drive.stop();
            let delivered = self.arrive(target);
            return TickOutcome::Arrived {
                station: target,
                delivered,
            };
        }

        // 4. Follow the line.
        self.hw.drive.drive(cmd.linear, cmd.angular);
        self.maybe_emit_telemetry(&frame, status);
        TickOutcome::Steered(status)
    }

    fn read_frame(&mut self) -> SensorFrame {
        let now = self.hw.clock.now_ms();
        SensorFrame {
            color: self.hw.line_sensor.color(),
            reflectance: self.hw.line_sensor.reflection(),
            ambient: self.hw.line_sensor.ambient(),
            proximity_mm: self.hw.proximity.distance_mm(),
            travelled_mm: self.hw.drive.distance(),
            elapsed_ms: now.saturating_sub(self.start_ms),
        }
    }

    fn pick_up(&mut self) {
        info!("Object in range, picking up");
        self.hw.feedback.announce("Object");
        self.handler.pick_up(&mut self.hw);
        let item = self.handler.classify(&mut self.hw);
        self.hw.feedback.announce(&item.material);

        self.sink.emit(&MissionEvent::ItemPicked(item.clone()));
        self.state.held_item = Some(item);
        self.report.items_picked += 1;

        // Picking up is not reaching a station: rebase distance only.
        let before = self.hw.drive.distance();
        self.hw.drive.reset();
        self.state.odometer_reset(before);
    }

    /// Arrival handling for `station`.  Returns whether an item was delivered.
    fn arrive(&mut self, station: StationId) -> bool {
        let (name, blind_mm, cooldown_ms) = match self.config.station(station) {
            Some(p) => (p.name.clone(), p.blind_distance_mm, p.cooldown_ms),
            None => (Label::new(), 0.0, 0),
        };
        info!("Arrived at {station} ({name})");
        self.hw.feedback.announce(&name);
        self.report.stations_visited += 1;
        self.sink.emit(&MissionEvent::StationArrived {
            station,
            name,
        });

        let mut delivered = false;
        if let Some(item) = &self.state.held_item {
            let material = item.material.clone();
            if self.config.materials.delivery_station(item) == Some(station) {
                self.handler.deliver(&mut self.hw);
                self.state.held_item = None;
                self.report.items_delivered += 1;
                delivered = true;
                self.sink
                    .emit(&MissionEvent::ItemDelivered { station, material });
            } else {
                self.hw.feedback.beep();
                self.sink.emit(&MissionEvent::ItemKept { station, material });
            }
        }

        if self.config.lap_station == Some(station) {
            self.state.cornering.reset_count();
            self.sink.emit(&MissionEvent::LapCompleted { station });
        }

        let next_index = (self.state.target_index + 1) % self.config.sequence.len();
        let next = self.config.sequence[next_index];
        self.state.target_index = next_index;
        self.state.target = next;
        self.sink.emit(&MissionEvent::TargetAdvanced {
            from: station,
            to: next,
        });
        debug!("Next target {next} (blind {blind_mm} mm, cooldown {cooldown_ms} ms)");

        let clear = self.config.mission.clear_patch_mm;
        if clear > 0.0 {
            self.hw.drive.straight(clear);
        }
        let pause = self.config.mission.arrival_pause_ms;
        if pause > 0 {
            self.hw.clock.delay_ms(pause);
        }

        self.depart(blind_mm, cooldown_ms);
        delivered
    }

    /// Reset the odometer and open a fresh suppression window, timed from
    /// now.
    ///
    /// Idempotent: calling it twice without an intervening tick leaves the
    /// same state as calling it once.
    pub fn depart(&mut self, blind_distance_mm: f32, cooldown_ms: u32) {
        let before = self.hw.drive.distance();
        let elapsed = self.hw.clock.now_ms().saturating_sub(self.start_ms);
        self.hw.drive.reset();
        self.stations.reset_all();
        self.state
            .begin_departure(blind_distance_mm, cooldown_ms, before, elapsed);
    }

    fn maybe_emit_telemetry(&mut self, frame: &SensorFrame, status: TickStatus) {
        let every = u64::from(self.config.mission.telemetry_every_ticks);
        if every == 0 || self.report.ticks % every != 0 {
            return;
        }
        let target = self.state.target;
        let telemetry = TickTelemetry {
            tick: self.report.ticks,
            travelled_mm: frame.travelled_mm,
            color: frame.color,
            reflectance: frame.reflectance,
            ambient: frame.ambient,
            proximity_mm: frame.proximity_mm,
            status,
            target,
            seen: self.stations.identify(frame.color, frame.reflectance),
            target_score: self.stations.score(target).unwrap_or(0),
            corners: self.state.cornering.corners_passed,
            held: self.state.held_item.as_ref().map(|i| i.material.clone()),
        };
        self.sink.emit(&MissionEvent::Telemetry(telemetry));
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> MissionPhase {
        self.phase.current()
    }

    pub fn state(&self) -> &MissionState {
        &self.state
    }

    pub fn report(&self) -> &MissionReport {
        &self.report
    }

    pub fn classifier(&self) -> &StationClassifier {
        &self.stations
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

// ───────────────────────────────────────────────────────────────
// Shutdown guard
// ───────────────────────────────────────────────────────────────

/// Runs [`MissionSequencer::shutdown`] when dropped: normal exit, early
/// return, or unwinding panic.
struct ShutdownGuard<'a, P: Platform, S: EventSink> {
    seq: &'a mut MissionSequencer<P, S>,
}

impl<P: Platform, S: EventSink> Drop for ShutdownGuard<'_, P, S> {
    fn drop(&mut self) {
        self.seq.shutdown();
    }
}
