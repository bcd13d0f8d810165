//! Units and their identities.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effects::{Effect, EffectKind};
use crate::error::{BattleError, Result};
use crate::geometry::Coord;
use crate::unit_kind::{DirectionSet, UnitKind};

/// Identifier of a living unit.
///
/// Only non-empty, all-lowercase ASCII alphabetic names are valid. Ids are
/// unique among living units; a dead unit's id may be spawned again.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitId(String);

impl UnitId {
    /// Validate a name as a unit id.
    ///
    /// # Example
    ///
    /// ```
    /// use battle_core::unit::UnitId;
    ///
    /// assert!(UnitId::parse("scout").is_some());
    /// assert!(UnitId::parse("Scout").is_none());
    /// assert!(UnitId::parse("a1").is_none());
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::is_valid(name).then(|| Self(name.to_string()))
    }

    /// Whether `name` is acceptable as a unit id.
    #[must_use]
    pub fn is_valid(name: &str) -> bool {
        !name.is_empty() && name.bytes().all(|b| b.is_ascii_lowercase())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UnitId {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(format!("invalid unit id '{value}'"))
        }
    }
}

impl From<UnitId> for String {
    fn from(id: UnitId) -> Self {
        id.0
    }
}

/// A unit on the battlefield.
///
/// Health never exceeds `max_hp`. A unit whose health drops to zero or below
/// is removed by the engine within the same attack or tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    kind: UnitKind,
    /// Where the unit actually stands.
    position: Coord,
    /// Last target the unit was ordered to, reached or not.
    intended_position: Coord,
    hp: i64,
    max_hp: i64,
    max_move: u32,
    max_step: i64,
    attack_damage: i64,
    attack_distance: u32,
    attack_height_range: i64,
    move_directions: DirectionSet,
    attack_directions: DirectionSet,
    effects: Vec<Effect>,
}

impl Unit {
    /// Create a unit of `kind` at full health with cardinal direction sets.
    #[must_use]
    pub fn new(id: UnitId, kind: UnitKind, position: Coord) -> Self {
        let stats = kind.stats();
        Self {
            id,
            kind,
            position,
            intended_position: position,
            hp: stats.hp,
            max_hp: stats.hp,
            max_move: stats.max_move,
            max_step: stats.max_step,
            attack_damage: stats.attack_damage,
            attack_distance: stats.attack_distance,
            attack_height_range: stats.attack_height_range,
            move_directions: DirectionSet::cardinal(),
            attack_directions: DirectionSet::cardinal(),
            effects: Vec::new(),
        }
    }

    /// Builder method to replace the move direction set.
    #[must_use]
    pub fn with_move_directions(mut self, directions: DirectionSet) -> Self {
        self.move_directions = directions;
        self
    }

    /// Builder method to replace the attack direction set.
    #[must_use]
    pub fn with_attack_directions(mut self, directions: DirectionSet) -> Self {
        self.attack_directions = directions;
        self
    }

    /// Unit id.
    #[must_use]
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    /// Archetype.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Actual position.
    #[must_use]
    pub const fn position(&self) -> Coord {
        self.position
    }

    /// Target of the most recent move order, whether or not it was reached.
    #[must_use]
    pub const fn intended_position(&self) -> Coord {
        self.intended_position
    }

    /// Current health.
    #[must_use]
    pub const fn hp(&self) -> i64 {
        self.hp
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_hp(&self) -> i64 {
        self.max_hp
    }

    /// Movement budget in steps.
    #[must_use]
    pub const fn max_move(&self) -> u32 {
        self.max_move
    }

    /// Largest height change per step.
    #[must_use]
    pub const fn max_step(&self) -> i64 {
        self.max_step
    }

    /// Base attack damage.
    #[must_use]
    pub const fn attack_damage(&self) -> i64 {
        self.attack_damage
    }

    /// Number of tiles probed by an attack.
    #[must_use]
    pub const fn attack_distance(&self) -> u32 {
        self.attack_distance
    }

    /// Largest height difference at which an attack lands.
    #[must_use]
    pub const fn attack_height_range(&self) -> i64 {
        self.attack_height_range
    }

    /// Directions the unit may step in.
    #[must_use]
    pub fn move_directions(&self) -> &DirectionSet {
        &self.move_directions
    }

    /// Directions the unit may attack in.
    #[must_use]
    pub fn attack_directions(&self) -> &DirectionSet {
        &self.attack_directions
    }

    /// Active effects, oldest first.
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Whether the unit is still standing.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Lose `amount` health.
    pub fn take_damage(&mut self, amount: i64) {
        self.hp = self.hp.saturating_sub(amount);
    }

    pub(crate) fn set_intended_position(&mut self, target: Coord) {
        self.intended_position = target;
    }

    pub(crate) fn relocate(&mut self, target: Coord) {
        self.position = target;
        self.intended_position = target;
    }

    /// Number of active effects of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::EffectCapExceeded`] if the unit somehow holds
    /// more than the cap.
    pub fn effect_count(&self, kind: EffectKind) -> Result<usize> {
        let count = self.effects.iter().filter(|e| e.kind == kind).count();
        if count > kind.cap() {
            return Err(self.cap_error(kind));
        }
        Ok(count)
    }

    /// Whether another effect of `kind` would exceed the cap.
    ///
    /// # Errors
    ///
    /// Same as [`effect_count`](Self::effect_count).
    pub fn is_effect_full(&self, kind: EffectKind) -> Result<bool> {
        Ok(self.effect_count(kind)? >= kind.cap())
    }

    /// Attach an effect.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::EffectCapExceeded`] if the unit is already at
    /// the cap for this kind.
    pub fn add_effect(&mut self, effect: Effect) -> Result<()> {
        if self.is_effect_full(effect.kind)? {
            return Err(self.cap_error(effect.kind));
        }
        self.effects.push(effect);
        Ok(())
    }

    /// Apply every active effect for `elapsed` time units, in order.
    pub fn apply_effects(&mut self, elapsed: i64) {
        for effect in &mut self.effects {
            self.hp = effect.apply(self.hp, elapsed);
        }
        self.hp = self.hp.min(self.max_hp);
    }

    /// Drop effects whose lifetime has run out.
    pub fn purge_expired_effects(&mut self) {
        self.effects.retain(|e| !e.is_expired());
    }

    fn cap_error(&self, kind: EffectKind) -> BattleError {
        BattleError::EffectCapExceeded {
            unit: self.id.to_string(),
            kind: kind.name(),
            cap: kind.cap(),
        }
    }
}
