//! ObjectHandler integration tests against the mock robot.

use sortbot::config::{Creep, HandlerConfig, MaterialTable};
use sortbot::handler::ObjectHandler;
use sortbot::mission::context::Color;

use crate::mock_hw::{Call, Joint, mock_robot};

fn handler(cfg: &HandlerConfig) -> ObjectHandler {
    ObjectHandler::new(cfg, &MaterialTable::default(), 10)
}

#[test]
fn majority_vote_picks_most_supported_row() {
    let (mut hw, rig) = mock_robot();
    {
        let mut r = rig.borrow_mut();
        r.hold(Color::Black, 12, 1);
        r.hold(Color::White, 40, 1);
        r.hold(Color::White, 41, 1);
        r.hold(Color::Black, 12, 1);
        r.hold(Color::White, 44, 1);
    }
    let item = handler(&HandlerConfig::default()).classify(&mut hw);
    assert_eq!(item.material.as_str(), "Paper");
    // Source is the last sample that voted for the winner.
    assert_eq!(item.source_color, Color::White);
    assert_eq!(item.source_reflectance, 44);
}

#[test]
fn tied_vote_goes_to_first_declared_row() {
    let (mut hw, rig) = mock_robot();
    {
        let mut r = rig.borrow_mut();
        r.hold(Color::White, 40, 1);
        r.hold(Color::Brown, 30, 1);
        r.hold(Color::White, 40, 1);
        r.hold(Color::Brown, 30, 1);
    }
    let cfg = HandlerConfig {
        samples: 4,
        ..HandlerConfig::default()
    };
    let item = handler(&cfg).classify(&mut hw);
    assert_eq!(item.material.as_str(), "Plastic");
    assert_eq!(item.source_color, Color::Brown);
}

#[test]
fn one_good_sample_is_enough() {
    let (mut hw, rig) = mock_robot();
    {
        let mut r = rig.borrow_mut();
        r.hold(Color::None, 0, 4);
        r.hold(Color::Yellow, 33, 1);
    }
    let item = handler(&HandlerConfig::default()).classify(&mut hw);
    assert_eq!(item.material.as_str(), "Plastic");
}

#[test]
fn samples_are_spaced_by_the_sample_delay() {
    let (mut hw, rig) = mock_robot();
    rig.borrow_mut().hold(Color::Black, 12, 5);
    handler(&HandlerConfig::default()).classify(&mut hw);
    // Five samples, four gaps of 200 ms.
    assert_eq!(rig.borrow().now_ms, 800);
    assert!(rig.borrow().item_samples.is_empty());
}

#[test]
fn timed_creep_drives_then_stops() {
    let (mut hw, rig) = mock_robot();
    let cfg = HandlerConfig {
        creep: Creep::Timed {
            speed: 30.0,
            ms: 1000,
        },
        ..HandlerConfig::default()
    };
    handler(&cfg).pick_up(&mut hw);
    let r = rig.borrow();
    assert_eq!(r.calls[0], Call::Stop);
    assert_eq!(
        r.calls[1],
        Call::Drive {
            linear: 30.0,
            angular: 0.0
        }
    );
    assert_eq!(r.calls[2], Call::Stop);
    assert_eq!(r.now_ms, 1000);
    assert_eq!(r.count(|c| matches!(c, Call::Straight(_))), 0);
}

#[test]
fn no_creep_grasps_in_place() {
    let (mut hw, rig) = mock_robot();
    let cfg = HandlerConfig {
        creep: Creep::None,
        ..HandlerConfig::default()
    };
    handler(&cfg).pick_up(&mut hw);
    let r = rig.borrow();
    assert_eq!(r.calls[0], Call::Stop);
    assert_eq!(
        r.calls[1],
        Call::RunTo {
            joint: Joint::Gripper,
            pos: -70
        }
    );
}

#[test]
fn nudge_extends_the_approach_and_the_reverse() {
    let (mut hw, rig) = mock_robot();
    {
        let mut r = rig.borrow_mut();
        r.proximity_mm = 100;
        r.step_mm = 10.0;
    }
    let cfg = HandlerConfig {
        nudge_ms: 3000,
        ..HandlerConfig::default()
    };
    handler(&cfg).deliver(&mut hw);

    let r = rig.borrow();
    // 15 approach steps of 10 mm up to the 150 mm limit, then one nudge.
    assert_eq!(r.count(|c| matches!(c, Call::Drive { .. })), 16);
    assert!(r.position(&Call::Straight(-160.0)).is_some());
}

#[test]
fn release_without_concurrent_lift() {
    let (mut hw, rig) = mock_robot();
    rig.borrow_mut().proximity_mm = 10;
    let cfg = HandlerConfig {
        lift_during_release: false,
        ..HandlerConfig::default()
    };
    handler(&cfg).deliver(&mut hw);
    let r = rig.borrow();
    assert_eq!(r.count(|c| matches!(c, Call::StartTo { .. })), 0);
    assert_eq!(r.now_ms, 500);
}

#[test]
fn park_closes_then_lowers() {
    let (mut hw, rig) = mock_robot();
    handler(&HandlerConfig::default()).park(&mut hw);
    let r = rig.borrow();
    assert_eq!(
        r.calls,
        vec![
            Call::Stall {
                joint: Joint::Gripper,
                closing: true,
                force: 72
            },
            Call::RunTo {
                joint: Joint::Lift,
                pos: 0
            },
        ]
    );
}
