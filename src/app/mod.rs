//! Application core: mission logic behind port traits.
//!
//! The sequencer decides, the ports act.  All interaction with the robot
//! happens through the traits in [`ports`], so this layer runs unchanged
//! against real hardware, the host simulator, or scripted mocks.

pub mod events;
pub mod ports;
pub mod sequencer;
