//! # Battle Core
//!
//! Deterministic engine for a turn-scripted skirmish on a height grid.
//!
//! This crate contains **only** deterministic logic:
//! - No IO beyond reading an optional configuration file
//! - No randomness
//! - No floating-point math
//!
//! Given the same grid and the same command stream, two runs always end in
//! the same state, which is what [`battlefield::BattleField::state_hash`]
//! checks.
//!
//! ## Crate Structure
//!
//! - [`geometry`] - Integer coordinates and direction vectors
//! - [`grid`] - Height grid and per-tile occupancy
//! - [`occupancy`] - Exclusive or shared tile policy
//! - [`unit_kind`] - Archetype catalog and direction sets
//! - [`effects`] - Timed status effects
//! - [`unit`] - Unit state
//! - [`pathfinding`] - Bounded reachability search
//! - [`battlefield`] - The engine: spawn, move, attack, tick, snapshot
//! - [`command`] - Typed command stream
//! - [`snapshot`] - State snapshots and their text form

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battlefield;
pub mod command;
pub mod config;
pub mod effects;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod occupancy;
pub mod pathfinding;
pub mod snapshot;
pub mod unit;
pub mod unit_kind;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battlefield::{
        AttackOutcome, BattleField, CommandOutcome, MoveFailure, MoveOutcome, SpawnOutcome,
        SpawnParams, SpawnRejection, TickEvents, UnitStore,
    };
    pub use crate::command::{Batch, Command};
    pub use crate::config::BattleConfig;
    pub use crate::effects::{Effect, EffectDuration, EffectKind};
    pub use crate::error::{BattleError, Result};
    pub use crate::geometry::Coord;
    pub use crate::grid::{HeightGrid, Tile};
    pub use crate::occupancy::OccupancyPolicy;
    pub use crate::pathfinding::{is_reachable, steps_to, ReachQuery};
    pub use crate::snapshot::{Snapshot, UnitSnapshot, SNAPSHOT_SEPARATOR};
    pub use crate::unit::{Unit, UnitId};
    pub use crate::unit_kind::{ArchetypeStats, DirectionSet, UnitKind};
}
