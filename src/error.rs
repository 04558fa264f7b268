//! Error types for the sortbot mission controller.
//!
//! The control loop itself is tolerance-based: sensor noise is absorbed by
//! confidence scoring and majority votes, and hardware actions are assumed to
//! succeed.  The only fallible edges are loading configuration before the
//! mission starts and loading optional assets (the startup image).  Both get a
//! small `Copy` enum so callers handle every variant explicitly.

use core::fmt;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from loading or validating a [`MissionConfig`](crate::config::MissionConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found at the requested location.
    NotFound,
    /// The backing store could not be read.
    Io,
    /// The stored config is not valid JSON or does not fit the schema
    /// (including fixed-capacity tables that overflow).
    Parse,
    /// A field failed range or consistency validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Io => write!(f, "config I/O error"),
            Self::Parse => write!(f, "config could not be parsed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Asset errors
// ---------------------------------------------------------------------------

/// Errors from loading an optional display asset.
///
/// Callers treat every variant as "skip and continue".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetError {
    /// The named asset does not exist on the device.
    NotFound,
    /// The device has no display or cannot render this asset.
    Unsupported,
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "asset not found"),
            Self::Unsupported => write!(f, "asset unsupported"),
        }
    }
}

impl std::error::Error for AssetError {}
