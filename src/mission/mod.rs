//! Mission lifecycle phases.
//!
//! ```text
//!  INIT ──[handshake done]──▶ RUNNING ──[stop / fault]──▶ SHUTTING_DOWN
//!    │                                                        ▲
//!    └────────────────────[early exit]────────────────────────┘
//! ```
//!
//! RUNNING is driven tick by tick by the
//! [`MissionSequencer`](crate::app::sequencer::MissionSequencer); this module
//! only tracks which phase the mission is in, how long it has been there, and
//! rejects transitions out of the terminal phase.

pub mod context;

use log::{info, warn};

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Lifecycle phase of one mission run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MissionPhase {
    Init = 0,
    Running = 1,
    ShuttingDown = 2,
}

impl MissionPhase {
    /// Human-readable name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::Running => "Running",
            Self::ShuttingDown => "ShuttingDown",
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Running) | (Self::Init | Self::Running, Self::ShuttingDown)
        )
    }

    /// SHUTTING_DOWN is terminal.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ShuttingDown)
    }
}

// ---------------------------------------------------------------------------
// Phase tracker
// ---------------------------------------------------------------------------

/// Current phase plus tick bookkeeping.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: MissionPhase,
    /// Monotonic tick counter.
    tick_count: u64,
    /// Tick at which the current phase was entered.
    phase_entry_tick: u64,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: MissionPhase::Init,
            tick_count: 0,
            phase_entry_tick: 0,
        }
    }

    /// Count one control tick.
    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    /// Move to `next`.  Returns the previous phase on success, `None` if
    /// the move is illegal (already there, or leaving the terminal phase).
    pub fn transition(&mut self, next: MissionPhase) -> Option<MissionPhase> {
        if !self.current.can_transition_to(next) {
            if self.current != next {
                warn!(
                    "Mission phase: rejected {} -> {}",
                    self.current.name(),
                    next.name()
                );
            }
            return None;
        }
        info!(
            "Mission phase: {} -> {}",
            self.current.name(),
            next.name()
        );
        let prev = self.current;
        self.current = next;
        self.phase_entry_tick = self.tick_count;
        Some(prev)
    }

    pub fn current(&self) -> MissionPhase {
        self.current
    }

    /// Ticks spent in the current phase.
    pub fn ticks_in_phase(&self) -> u64 {
        self.tick_count - self.phase_entry_tick
    }
}
