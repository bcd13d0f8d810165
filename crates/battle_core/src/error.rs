//! Error types for the battle engine.
//!
//! User-intent mistakes (unknown ids, bad coordinates, taken tiles) are not
//! errors at all: the engine ignores them and reports a no-op outcome. Only
//! sequencing violations and broken engine invariants surface here.

use thiserror::Error;

use crate::geometry::Coord;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for the battle engine.
#[derive(Debug, Error)]
pub enum BattleError {
    /// A spawn named an archetype that is not in the catalog.
    #[error("Unsupported unit kind: {0}")]
    UnsupportedKind(String),

    /// A tick did not move time strictly forward.
    #[error("Non-increasing tick time: current {current}, requested {requested}")]
    NonIncreasingTime {
        /// Simulation time before the tick.
        current: i64,
        /// Time the tick asked for.
        requested: i64,
    },

    /// A unit holds more effects of one kind than its cap allows.
    #[error("Overflow of active effects of kind {kind} on unit {unit}: cap {cap}")]
    EffectCapExceeded {
        /// Owning unit.
        unit: String,
        /// Effect kind name.
        kind: &'static str,
        /// Per-kind cap.
        cap: usize,
    },

    /// Tried to place a second unit on an exclusive tile.
    #[error("Tile {0} is already occupied")]
    TileOccupied(Coord),

    /// Tried to read the occupant of an empty tile.
    #[error("Tile {0} is empty")]
    EmptyTile(Coord),

    /// A unit was expected on a tile but is not there.
    #[error("Unit {unit} is not on tile {coord}")]
    UnitNotOnTile {
        /// The missing unit.
        unit: String,
        /// The tile that was searched.
        coord: Coord,
    },

    /// Explicit removal of a unit that is not alive.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// Registry and grid disagree.
    #[error("Invalid battlefield state: {0}")]
    InvalidState(String),

    /// Height data did not match the declared dimensions.
    #[error("Height grid expects {expected} values, got {actual}")]
    GridSizeMismatch {
        /// `rows * cols`.
        expected: usize,
        /// Values supplied.
        actual: usize,
    },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParseError {
        /// Path of the offending file.
        path: String,
        /// Parser message.
        message: String,
    },
}

impl BattleError {
    /// Whether this error is a sequencing violation of the command stream
    /// rather than an engine defect.
    #[must_use]
    pub const fn is_sequencing(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedKind(_) | Self::NonIncreasingTime { .. }
        )
    }
}
