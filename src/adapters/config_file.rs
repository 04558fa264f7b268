//! JSON file configuration adapter.
//!
//! Implements [`ConfigPort`] over an optional JSON file.  Missing sections
//! fall back to the tuned defaults (every config struct is
//! `#[serde(default)]`); with no path at all the defaults are used as-is.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::MissionConfig;
use crate::error::ConfigError;

/// Loads a [`MissionConfig`] from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct JsonConfigFile {
    path: Option<PathBuf>,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Adapter that always yields the default configuration.
    pub fn defaults() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Parse and validate a JSON document.
    pub fn parse(json: &str) -> Result<MissionConfig, ConfigError> {
        let cfg: MissionConfig = serde_json::from_str(json).map_err(|_| ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<MissionConfig, ConfigError> {
        let Some(path) = &self.path else {
            info!("JsonConfigFile: no path given, using defaults");
            let cfg = MissionConfig::default();
            cfg.validate()?;
            return Ok(cfg);
        };

        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::Io,
        })?;
        let cfg = Self::parse(&text)?;
        info!("JsonConfigFile: loaded {}", path.display());
        Ok(cfg)
    }
}
