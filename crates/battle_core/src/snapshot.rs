//! Battlefield snapshots.
//!
//! A snapshot lists every living unit ordered by tile (row-major) and then by
//! id. The text form is one line per unit followed by a separator:
//!
//! ```text
//! a footman (1, 2) 20
//! b footman (1, 3) 19
//! ---
//! ```
//!
//! Rows and columns are printed 1-based.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Coord;
use crate::unit::{Unit, UnitId};
use crate::unit_kind::UnitKind;

/// Line printed after every snapshot.
pub const SNAPSHOT_SEPARATOR: &str = "---";

/// One unit's entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Unit id.
    pub id: UnitId,
    /// Archetype.
    pub kind: UnitKind,
    /// Zero-based actual position.
    pub position: Coord,
    /// Current health.
    pub hp: i64,
}

impl From<&Unit> for UnitSnapshot {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id().clone(),
            kind: unit.kind(),
            position: unit.position(),
            hp: unit.hp(),
        }
    }
}

impl fmt::Display for UnitSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (row, col) = self.position.to_one_based();
        write!(f, "{} {} ({row}, {col}) {}", self.id, self.kind, self.hp)
    }
}

/// All living units at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time when the snapshot was taken.
    pub time: i64,
    /// Units ordered by position, then id.
    pub units: Vec<UnitSnapshot>,
}

impl Snapshot {
    /// Build a snapshot, sorting units into output order.
    #[must_use]
    pub fn new(time: i64, mut units: Vec<UnitSnapshot>) -> Self {
        units.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        Self { time, units }
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&UnitSnapshot> {
        self.units.iter().find(|u| u.id.as_str() == id)
    }

    /// Serialize as a single JSON line.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"error":"failed to serialize snapshot: {e}"}}"#)
        })
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for unit in &self.units {
            writeln!(f, "{unit}")?;
        }
        writeln!(f, "{SNAPSHOT_SEPARATOR}")
    }
}
