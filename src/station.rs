//! Station recognition with confidence scoring.
//!
//! Every tick the classifier runs each station's fingerprint over the line
//! sensor reading and moves that station's score up or down.  Only the
//! station currently being hunted can trigger an arrival; the other scores
//! are kept as competing hypotheses for telemetry.
//!
//! ## Score lifecycle
//!
//! 1. A matching tick adds `increment`, capped at `max_score`.
//! 2. A missing tick applies the decay policy, floored at zero.
//! 3. When the target's score reaches `trigger`, every score drops to zero
//!    and the caller handles the arrival.
//!
//! Fingerprints are allowed to overlap between stations.  The arrival path
//! tests only the target's own fingerprint, so an ambiguous reading still
//! counts for whichever station is being hunted.

use heapless::Vec;
use log::debug;

use crate::config::{ConfidenceConfig, Decay, MAX_STATIONS, StationProfile};
use crate::mission::context::{Color, SensorFrame, StationId};

/// Bounded evidence counter for one station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationConfidence {
    pub station: StationId,
    pub score: u8,
}

/// Scoring policy, copied out of the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorePolicy {
    pub increment: u8,
    pub decay: Decay,
    pub max_score: u8,
    pub trigger: u8,
}

impl From<&ConfidenceConfig> for ScorePolicy {
    fn from(c: &ConfidenceConfig) -> Self {
        Self {
            increment: c.increment,
            decay: c.decay,
            max_score: c.max_score,
            trigger: c.trigger,
        }
    }
}

impl ScorePolicy {
    /// Next score after one tick.  Always within `[0, max_score]`.
    pub fn apply(&self, score: u8, matched: bool) -> u8 {
        let next = if matched {
            score.saturating_add(self.increment)
        } else {
            match self.decay {
                Decay::Subtract(n) => score.saturating_sub(n),
                Decay::Reset => 0,
            }
        };
        next.min(self.max_score)
    }
}

/// Multi-hypothesis station classifier.
pub struct StationClassifier {
    profiles: Vec<StationProfile, MAX_STATIONS>,
    scores: Vec<StationConfidence, MAX_STATIONS>,
    policy: ScorePolicy,
}

impl StationClassifier {
    pub fn new(profiles: &[StationProfile], confidence: &ConfidenceConfig) -> Self {
        let mut kept = Vec::new();
        let mut scores = Vec::new();
        for p in profiles.iter().take(MAX_STATIONS) {
            let _ = kept.push(p.clone());
            let _ = scores.push(StationConfidence {
                station: p.id,
                score: 0,
            });
        }
        Self {
            profiles: kept,
            scores,
            policy: ScorePolicy::from(confidence),
        }
    }

    /// Does `profile`'s fingerprint accept this frame?
    pub fn evaluate(frame: &SensorFrame, profile: &StationProfile) -> bool {
        profile.matches(frame.color, frame.reflectance)
    }

    /// First declared station whose fingerprint accepts the reading.
    pub fn identify(&self, color: Color, reflectance: u8) -> Option<StationId> {
        self.profiles
            .iter()
            .find(|p| p.matches(color, reflectance))
            .map(|p| p.id)
    }

    /// Update every score from this frame.
    pub fn update(&mut self, frame: &SensorFrame) {
        for (profile, conf) in self.profiles.iter().zip(self.scores.iter_mut()) {
            let matched = Self::evaluate(frame, profile);
            conf.score = self.policy.apply(conf.score, matched);
        }
    }

    /// Update every score and report whether `target` has now arrived.
    /// An arrival clears all scores.
    pub fn update_and_check(&mut self, frame: &SensorFrame, target: StationId) -> bool {
        self.update(frame);
        let score = self.score(target).unwrap_or(0);
        debug!(
            "station {} score={} ({:?} refl={})",
            target, score, frame.color, frame.reflectance
        );
        if score >= self.policy.trigger {
            self.reset_all();
            return true;
        }
        false
    }

    /// Current score for `station`.
    pub fn score(&self, station: StationId) -> Option<u8> {
        self.scores
            .iter()
            .find(|c| c.station == station)
            .map(|c| c.score)
    }

    /// All scores in declaration order.
    pub fn scores(&self) -> &[StationConfidence] {
        &self.scores
    }

    /// Drop every score to zero.
    pub fn reset_all(&mut self) {
        for c in &mut self.scores {
            c.score = 0;
        }
    }
}
