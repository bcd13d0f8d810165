//! Unit archetype catalog.
//!
//! This module is the single source of truth for unit kinds:
//! - [`UnitKind`]: closed set of archetypes, selected by name at spawn
//! - [`ArchetypeStats`]: immutable base stats per archetype
//! - [`DirectionSet`]: named direction vectors used for moving and attacking
//!
//! # Example
//!
//! ```
//! use battle_core::unit_kind::UnitKind;
//!
//! let kind: UnitKind = "knight".parse().unwrap();
//! assert_eq!(kind.stats().hp, 50);
//! assert_eq!(kind.name(), "knight");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BattleError;
use crate::geometry::Coord;

/// Attack distance meaning "until the edge of the grid".
pub const UNLIMITED_DISTANCE: u32 = u32::MAX;

/// Height range meaning "any height difference".
pub const UNLIMITED_HEIGHT_RANGE: i64 = i64::MAX;

/// Base statistics shared by every unit of one archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchetypeStats {
    /// Starting (and maximum) health.
    pub hp: i64,
    /// Movement budget: maximum number of steps per move.
    pub max_move: u32,
    /// Largest height difference a single step may climb or descend.
    pub max_step: i64,
    /// Damage dealt by an attack on level ground.
    pub attack_damage: i64,
    /// How many tiles along the attack direction are probed.
    pub attack_distance: u32,
    /// Largest height difference at which an attack still lands.
    pub attack_height_range: i64,
}

/// Closed set of unit archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Cheap melee infantry.
    Footman,
    /// Heavy melee unit with a long move.
    Knight,
    /// Ranged unit that fires along a line until it hits something.
    Rifleman,
}

impl UnitKind {
    /// Every archetype, in catalog order.
    pub const ALL: [Self; 3] = [Self::Footman, Self::Knight, Self::Rifleman];

    /// Base stats for this archetype.
    #[must_use]
    pub const fn stats(self) -> ArchetypeStats {
        match self {
            Self::Footman => ArchetypeStats {
                hp: 20,
                max_move: 1,
                max_step: 1,
                attack_damage: 1,
                attack_distance: 1,
                attack_height_range: 0,
            },
            Self::Knight => ArchetypeStats {
                hp: 50,
                max_move: 5,
                max_step: 1,
                attack_damage: 5,
                attack_distance: 1,
                attack_height_range: 1,
            },
            Self::Rifleman => ArchetypeStats {
                hp: 10,
                max_move: 2,
                max_step: 2,
                attack_damage: 3,
                attack_distance: UNLIMITED_DISTANCE,
                attack_height_range: UNLIMITED_HEIGHT_RANGE,
            },
        }
    }

    /// Name used in scripts and snapshots.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Footman => "footman",
            Self::Knight => "knight",
            Self::Rifleman => "rifleman",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UnitKind {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| BattleError::UnsupportedKind(s.to_string()))
    }
}

/// Named direction vectors.
///
/// Iteration is in name order, so anything that walks the set (the
/// reachability search, for one) visits directions deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionSet(BTreeMap<String, Coord>);

impl DirectionSet {
    /// The four cardinal directions: `up`, `down`, `left`, `right`.
    #[must_use]
    pub fn cardinal() -> Self {
        [
            ("up", Coord::UP),
            ("down", Coord::DOWN),
            ("left", Coord::LEFT),
            ("right", Coord::RIGHT),
        ]
        .into_iter()
        .collect()
    }

    /// An empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Look up a direction by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Coord> {
        self.0.get(name).copied()
    }

    /// Add or replace a named direction.
    pub fn insert(&mut self, name: impl Into<String>, vector: Coord) -> Option<Coord> {
        self.0.insert(name.into(), vector)
    }

    /// Direction vectors in name order.
    pub fn vectors(&self) -> impl Iterator<Item = Coord> + '_ {
        self.0.values().copied()
    }

    /// Named directions in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Coord)> {
        self.0.iter().map(|(name, v)| (name.as_str(), *v))
    }

    /// Number of directions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no directions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DirectionSet {
    fn default() -> Self {
        Self::cardinal()
    }
}

impl<S: Into<String>> FromIterator<(S, Coord)> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = (S, Coord)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }
}
