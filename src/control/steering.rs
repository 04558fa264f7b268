//! Proportional line-following steering
//!
//! One reflectance reading in, one differential drive command out.
//! No integral or derivative terms: the edge of the line is tracked by
//! `angular = (reflectance - threshold) * gain`.

use crate::config::DriveConfig;
use crate::mission::context::{Color, SensorFrame};

/// Linear speed (mm/s) plus angular rate (deg/s) for the drive base.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveCommand {
    pub linear: f32,
    pub angular: f32,
}

/// Pure steering law.
pub fn compute_drive(reflectance: f32, forward_speed: f32, threshold: f32, gain: f32) -> DriveCommand {
    DriveCommand {
        linear: forward_speed,
        angular: (reflectance - threshold) * gain,
    }
}

/// Steering controller
pub struct SteeringController {
    threshold: f32,
    forward_speed: f32,
    gain: f32,
    straight_color: Option<Color>,
}

impl SteeringController {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            threshold: config.threshold,
            forward_speed: config.forward_speed,
            gain: config.gain,
            straight_color: config.straight_color,
        }
    }

    /// Compute the drive command for this tick's frame.
    pub fn steer(&self, frame: &SensorFrame) -> DriveCommand {
        // Solid track colour: hold the heading.
        if self.straight_color == Some(frame.color) {
            return DriveCommand {
                linear: self.forward_speed,
                angular: 0.0,
            };
        }
        compute_drive(
            f32::from(frame.reflectance),
            self.forward_speed,
            self.threshold,
            self.gain,
        )
    }
}
