//! Battle configuration.
//!
//! Configuration is plain data so the engine itself stays free of IO; the
//! file helpers here only read text and hand it to RON.
//!
//! # Example RON
//!
//! ```ron
//! BattleConfig(
//!     occupancy: shared,
//!     start_time: 0,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::occupancy::OccupancyPolicy;

/// Settings fixed for the lifetime of a battlefield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// How many units may share a tile.
    pub occupancy: OccupancyPolicy,
    /// Simulation time before the first tick. Every tick must exceed it.
    pub start_time: i64,
}

impl BattleConfig {
    /// Builder method to set the occupancy policy.
    #[must_use]
    pub const fn with_occupancy(mut self, occupancy: OccupancyPolicy) -> Self {
        self.occupancy = occupancy;
        self
    }

    /// Parse a configuration from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::ConfigParseError`] if the text is not a valid
    /// configuration.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| BattleError::ConfigParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a configuration from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::ConfigParseError`] if the file cannot be read
    /// or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| BattleError::ConfigParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&text).map_err(|e| BattleError::ConfigParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
