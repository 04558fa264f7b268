//! Object handling: pick-up, material classification, bin delivery.
//!
//! Every sequence here is blocking.  While one runs, the control tick is
//! stalled; the only overlap allowed is starting the lift move before the
//! gripper opens during delivery.
//!
//! ```text
//!  pick_up:  stop ─▶ creep ─▶ open ─▶ lift down ─▶ grasp (stall) ─▶ lift safe
//!  deliver:  stop ─▶ turn ─▶ approach bin ─▶ [nudge] ─▶ release ─▶ reverse
//!            ─▶ turn back ─▶ gentle close
//! ```
//!
//! None of these sequences read back success.  A grasp that never stalls
//! ends when the commanded motion ends.

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::app::ports::{
    ColorReflectanceSensor, DriveBase, Hardware, LinearActuator, Platform, ProximitySensor,
};
use crate::config::{Creep, HandlerConfig, MAX_MATERIALS, MaterialTable};
use crate::mission::context::{Color, ItemClassification};

/// Pick-up, classify and deliver, parameterised by the manipulator geometry.
pub struct ObjectHandler {
    cfg: HandlerConfig,
    materials: MaterialTable,
    /// Poll period while approaching the bin (ms).
    poll_ms: u32,
}

impl ObjectHandler {
    pub fn new(cfg: &HandlerConfig, materials: &MaterialTable, poll_ms: u32) -> Self {
        Self {
            cfg: cfg.clone(),
            materials: materials.clone(),
            poll_ms: poll_ms.max(1),
        }
    }

    // ── Startup ───────────────────────────────────────────────

    /// Zero the lift at floor level, raise it to travel height, then
    /// calibrate the gripper between its two mechanical stops.
    pub fn prepare<P: Platform>(&self, hw: &mut Hardware<P>) {
        let c = &self.cfg;
        hw.lift.reset_position(c.lift_down_pos);
        hw.lift.run_to_target(c.lift_speed, c.lift_safe_pos);

        hw.gripper.run_until_stalled(-c.grip_close_speed, c.grip_rest_force);
        hw.gripper.run_until_stalled(c.grip_close_speed, c.grip_rest_force);
        hw.gripper.reset_position(0);
        debug!("Arm calibrated (lift at {}, gripper zeroed)", c.lift_safe_pos);
    }

    // ── Pick-up ───────────────────────────────────────────────

    /// Grasp the object in front of the robot and raise it.
    pub fn pick_up<P: Platform>(&self, hw: &mut Hardware<P>) {
        let c = &self.cfg;
        hw.drive.stop();

        match c.creep {
            Creep::None => {}
            Creep::Distance(mm) => hw.drive.straight(mm),
            Creep::Timed { speed, ms } => {
                hw.drive.drive(speed, 0.0);
                hw.clock.delay_ms(ms);
                hw.drive.stop();
            }
        }

        hw.gripper.run_to_target(c.grip_speed, c.grip_open_pos);
        hw.lift.run_to_target(c.lift_speed, c.lift_down_pos);
        let held_at = hw.gripper.run_until_stalled(c.grip_close_speed, c.grip_force);
        hw.lift.run_to_target(c.lift_speed, c.lift_safe_pos);
        debug!("Object grasped (gripper at {held_at})");
    }

    // ── Classification ────────────────────────────────────────

    /// Sample the held object and resolve its material by majority vote.
    ///
    /// Each sample votes for the first material row that accepts it.  The
    /// row with the most votes wins; ties go to the earlier row.  No votes
    /// at all yields the reserved empty label.
    pub fn classify<P: Platform>(&self, hw: &mut Hardware<P>) -> ItemClassification {
        let samples = self.cfg.samples.max(1);
        let mut votes = [0u8; MAX_MATERIALS];
        // Most recent sample supporting each row.
        let mut support: [Option<(Color, u8)>; MAX_MATERIALS] = [None; MAX_MATERIALS];
        let mut last = (Color::None, 0u8);

        for i in 0..samples {
            let color = hw.item_sensor.color();
            let reflectance = hw.item_sensor.reflection();
            last = (color, reflectance);
            if let Some(row) = self.materials.first_match(color, reflectance) {
                votes[row] += 1;
                support[row] = Some((color, reflectance));
            }
            debug!("sample {i}: {color:?} refl={reflectance}");
            if i + 1 < samples {
                hw.clock.delay_ms(self.cfg.sample_delay_ms);
            }
        }

        let mut winner: Option<usize> = None;
        for (row, &n) in votes.iter().enumerate().take(self.materials.rows.len()) {
            if n > 0 && winner.is_none_or(|w| n > votes[w]) {
                winner = Some(row);
            }
        }

        let item = match winner.and_then(|row| Some((row, support[row]?))) {
            Some((row, (color, reflectance))) => ItemClassification {
                material: self.materials.rows[row].label.clone(),
                source_color: color,
                source_reflectance: reflectance,
            },
            None => ItemClassification::empty(last.0, last.1),
        };
        info!(
            "Classified item as {} ({:?} refl={})",
            item.material, item.source_color, item.source_reflectance
        );
        item
    }

    // ── Delivery ──────────────────────────────────────────────

    /// Drop the held object in the bin beside the current station and
    /// return to the line.
    pub fn deliver<P: Platform>(&self, hw: &mut Hardware<P>) {
        let c = &self.cfg;
        hw.drive.stop();
        hw.drive.turn(c.drop_turn_deg);

        let start = hw.drive.distance();
        loop {
            let advanced = hw.drive.distance() - start;
            if advanced >= c.approach_max_mm || hw.proximity.distance_mm() <= c.bin_stop_mm {
                break;
            }
            hw.drive.drive(c.approach_speed, 0.0);
            hw.clock.delay_ms(self.poll_ms);
        }
        hw.drive.stop();

        if c.nudge_ms > 0 {
            hw.drive.drive(c.approach_speed, 0.0);
            hw.clock.delay_ms(c.nudge_ms);
            hw.drive.stop();
        }
        let advanced = hw.drive.distance() - start;

        if c.lift_during_release {
            hw.lift.start_to_target(c.lift_speed, c.lift_safe_pos);
        }
        hw.gripper.run_to_target(c.grip_speed, c.grip_open_pos);
        hw.clock.delay_ms(c.release_pause_ms);

        hw.drive.straight(-advanced);
        hw.drive.turn(-c.drop_turn_deg);
        hw.gripper.run_until_stalled(c.grip_close_speed, c.grip_rest_force);
        debug!("Delivery done (approached {advanced:.0} mm)");
    }

    // ── Shutdown ──────────────────────────────────────────────

    /// Close the gripper and lower the lift for transport.
    pub fn park<P: Platform>(&self, hw: &mut Hardware<P>) {
        let c = &self.cfg;
        hw.gripper.run_until_stalled(c.grip_close_speed, c.grip_force);
        hw.lift.run_to_target(c.lift_speed, c.lift_down_pos);
    }
}
