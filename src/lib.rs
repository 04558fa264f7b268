//! Sortbot mission controller library.
//!
//! Line following, corner counting, station recognition and object
//! sorting for a small autonomous ground robot.  Device access goes through
//! the port traits in [`app::ports`]; everything else is pure logic and is
//! exercised directly by the integration tests.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod handler;
pub mod mission;
pub mod station;
