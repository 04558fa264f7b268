//! Corner marker counting.
//!
//! A corner is a sustained bright patch on the floor.  The counter runs a
//! two-state machine over (reflectance, odometer, mission clock):
//!
//! ```text
//!  IDLE_WAITING_WHITE ──[white && past cooldown]──▶ IN_WHITE_RUN
//!          ▲                                            │
//!          ├──────────[dark before valid length]────────┤
//!          └──────[run >= valid length: count it]───────┘
//! ```
//!
//! The bookkeeping lives in [`CorneringState`] inside the mission state;
//! [`CornerCounter`] holds only the static thresholds.

use crate::config::CornerConfig;

/// Phase of the white-run detector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CornerPhase {
    #[default]
    IdleWaitingWhite,
    /// A white run started at this odometer reading (mm).
    InWhiteRun { start_mm: f32 },
}

/// Corner bookkeeping carried in [`MissionState`](crate::mission::context::MissionState).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CorneringState {
    pub phase: CornerPhase,
    /// Odometer reading at the last confirmed corner, if any since the
    /// last odometer reset.
    pub last_corner_finish_mm: Option<f32>,
    /// Corners confirmed in the current lap.
    pub corners_passed: u32,
}

impl CorneringState {
    /// True while a candidate white run is being measured.
    pub fn in_white_run(&self) -> bool {
        matches!(self.phase, CornerPhase::InWhiteRun { .. })
    }

    /// The odometer was zeroed after reading `odometer_before_mm`.  Shift
    /// the run start and the cooldown anchor onto the new origin so a run
    /// in progress and the cooldown both carry over.  The count is kept.
    pub fn rebase(&mut self, odometer_before_mm: f32) {
        if let CornerPhase::InWhiteRun { start_mm } = self.phase {
            self.phase = CornerPhase::InWhiteRun {
                start_mm: start_mm - odometer_before_mm,
            };
        }
        self.last_corner_finish_mm = self
            .last_corner_finish_mm
            .map(|last| last - odometer_before_mm);
    }

    /// Start a new lap.
    pub fn reset_count(&mut self) {
        self.corners_passed = 0;
    }
}

/// Corner detector thresholds.
pub struct CornerCounter {
    white_threshold: u8,
    valid_run_mm: f32,
    cooldown_mm: f32,
    grace_ms: u64,
}

impl CornerCounter {
    pub fn new(config: &CornerConfig) -> Self {
        Self {
            white_threshold: config.white_threshold,
            valid_run_mm: config.valid_run_mm,
            cooldown_mm: config.cooldown_mm,
            grace_ms: config.grace_ms,
        }
    }

    /// Feed one tick.  `relevant` is false while the current target does
    /// not care about lap progress.  Returns `true` on the tick a corner is
    /// confirmed.
    pub fn update(
        &self,
        state: &mut CorneringState,
        reflectance: u8,
        travelled_mm: f32,
        elapsed_ms: u64,
        relevant: bool,
    ) -> bool {
        if !relevant || elapsed_ms <= self.grace_ms {
            return false;
        }

        let white = reflectance > self.white_threshold;

        let start_mm = match state.phase {
            CornerPhase::IdleWaitingWhite => {
                let past_cooldown = state
                    .last_corner_finish_mm
                    .is_none_or(|last| travelled_mm - last > self.cooldown_mm);
                if !(white && past_cooldown) {
                    return false;
                }
                state.phase = CornerPhase::InWhiteRun {
                    start_mm: travelled_mm,
                };
                travelled_mm
            }
            CornerPhase::InWhiteRun { start_mm } => {
                if !white {
                    // Too short: noise, not a corner.
                    state.phase = CornerPhase::IdleWaitingWhite;
                    return false;
                }
                start_mm
            }
        };

        if travelled_mm - start_mm >= self.valid_run_mm {
            state.corners_passed += 1;
            state.last_corner_finish_mm = Some(travelled_mm);
            state.phase = CornerPhase::IdleWaitingWhite;
            return true;
        }
        false
    }
}
