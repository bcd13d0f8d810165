//! Tile occupancy policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How many units may stand on one tile at the same time.
///
/// The policy is a battlefield-wide switch consulted when units are placed
/// (spawn, move) and when an attack resolves on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyPolicy {
    /// At most one unit per tile.
    #[default]
    Exclusive,
    /// Any number of units per tile; attacks hit all of them.
    Shared,
}

impl OccupancyPolicy {
    /// Whether a unit may be placed on a tile that already holds others.
    #[must_use]
    pub const fn allows_stacking(self) -> bool {
        matches!(self, Self::Shared)
    }

    /// Policy name as used in config files and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exclusive => "exclusive",
            Self::Shared => "shared",
        }
    }
}

impl fmt::Display for OccupancyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OccupancyPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exclusive" => Ok(Self::Exclusive),
            "shared" => Ok(Self::Shared),
            other => Err(format!("unknown occupancy policy '{other}'")),
        }
    }
}
