//! Per-tick control laws: line steering and corner counting.

pub mod corner;
pub mod steering;
