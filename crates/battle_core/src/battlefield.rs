//! The battlefield: grid, unit registry, clock and the commands that mutate
//! them.
//!
//! Every command runs to completion before the next one starts. User-intent
//! mistakes (bad ids, off-grid tiles, occupied targets, unknown directions)
//! are silent no-ops reported through outcome values and `debug!` events.
//! Only an unsupported archetype name, a non-increasing tick and internal
//! invariant violations are returned as errors.
//!
//! # Per-Tick Order
//!
//! [`BattleField::tick`] visits units in spawn order:
//!
//! 1. Apply every active effect for the elapsed interval
//! 2. Remove the unit if its health dropped to zero or below
//! 3. Otherwise purge effects whose duration ran out
//!
//! and then advances the clock.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::{Batch, Command};
use crate::config::BattleConfig;
use crate::effects::{Effect, EffectKind};
use crate::error::{BattleError, Result};
use crate::geometry::Coord;
use crate::grid::HeightGrid;
use crate::occupancy::OccupancyPolicy;
use crate::pathfinding::{steps_to, ReachQuery};
use crate::snapshot::{Snapshot, UnitSnapshot};
use crate::unit::{Unit, UnitId};
use crate::unit_kind::{DirectionSet, UnitKind};

/// Registry of living units.
///
/// Lookup goes through a `HashMap`; iteration follows spawn order so ticks
/// and hashes are deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitStore {
    units: HashMap<UnitId, Unit>,
    order: Vec<UnitId>,
}

impl UnitStore {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, unit: Unit) {
        let id = unit.id().clone();
        self.order.push(id.clone());
        self.units.insert(id, unit);
    }

    fn remove(&mut self, id: &str) -> Option<Unit> {
        let unit = self.units.remove(id)?;
        self.order.retain(|o| o.as_str() != id);
        Some(unit)
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    /// Whether a living unit has this id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    /// Number of living units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Ids in spawn order.
    #[must_use]
    pub fn ids(&self) -> &[UnitId] {
        &self.order
    }

    /// Units in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.order.iter().filter_map(|id| self.units.get(id))
    }

    /// Current coordinate of every unit, in spawn order.
    pub fn coordinates(&self) -> impl Iterator<Item = (&UnitId, Coord)> {
        self.iter().map(|u| (u.id(), u.position()))
    }
}

/// Why a spawn did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnRejection {
    /// The id is empty or not lowercase ASCII letters.
    InvalidId,
    /// The tile is off the grid.
    OutOfBounds,
    /// The tile already holds a unit, under either policy.
    TileOccupied,
    /// A living unit already has this id.
    DuplicateId,
}

impl SpawnRejection {
    /// Short reason used in log events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidId => "invalid_id",
            Self::OutOfBounds => "out_of_bounds",
            Self::TileOccupied => "tile_occupied",
            Self::DuplicateId => "duplicate_id",
        }
    }
}

/// Result of a spawn command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// The unit now stands on the tile.
    Spawned(UnitId),
    /// Nothing changed.
    Ignored(SpawnRejection),
}

/// Why a move did not relocate the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveFailure {
    /// The target is off the grid.
    OutOfBounds,
    /// Another unit blocks the target tile.
    TargetOccupied,
    /// No legal walk fits the unit's budget and step limit.
    Unreachable,
}

impl MoveFailure {
    /// Short reason used in log events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutOfBounds => "out_of_bounds",
            Self::TargetOccupied => "target_occupied",
            Self::Unreachable => "unreachable",
        }
    }
}

/// Result of a move command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No living unit has the id.
    UnknownUnit,
    /// The unit walked to the target in `steps` steps.
    Moved {
        /// Length of the shortest legal walk.
        steps: u32,
    },
    /// The unit stayed put.
    Failed {
        /// Why the move failed.
        reason: MoveFailure,
        /// Whether a damage-over-time penalty was attached.
        penalized: bool,
    },
}

/// Result of an attack command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackOutcome {
    /// No living unit has the id.
    UnknownUnit,
    /// The attacker has no attack direction with this name.
    UnknownDirection,
    /// The probe left the grid or ran out of reach without finding anyone.
    NoTarget,
    /// The first occupied tile was too far above or below the attacker.
    HeightOutOfRange {
        /// The occupied tile that stopped the probe.
        tile: Coord,
    },
    /// Damage was dealt.
    Hit {
        /// The tile that was struck.
        tile: Coord,
        /// Damage dealt to each occupant.
        damage: i64,
        /// Units that took the hit.
        victims: Vec<UnitId>,
        /// Victims removed because their health reached zero.
        killed: Vec<UnitId>,
    },
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Time elapsed since the previous tick.
    pub elapsed: i64,
    /// Units removed because effects took their last health.
    pub deaths: Vec<UnitId>,
}

/// Result of a single typed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Spawn result.
    Spawn(SpawnOutcome),
    /// Move result.
    Move(MoveOutcome),
    /// Attack result.
    Attack(AttackOutcome),
    /// Snapshot produced by a state query.
    State(Snapshot),
}

/// Spawn request with optional per-unit direction overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnParams {
    /// Archetype name, resolved only after every no-op check passes.
    pub kind: String,
    /// Requested unit id.
    pub id: String,
    /// Zero-based tile.
    pub at: Coord,
    /// Replacement move direction set.
    pub move_directions: Option<DirectionSet>,
    /// Replacement attack direction set.
    pub attack_directions: Option<DirectionSet>,
}

impl SpawnParams {
    /// Spawn request using the archetype's default directions.
    #[must_use]
    pub fn new(kind: impl Into<String>, id: impl Into<String>, at: Coord) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            at,
            move_directions: None,
            attack_directions: None,
        }
    }

    /// Builder method to override the move directions.
    #[must_use]
    pub fn with_move_directions(mut self, directions: DirectionSet) -> Self {
        self.move_directions = Some(directions);
        self
    }

    /// Builder method to override the attack directions.
    #[must_use]
    pub fn with_attack_directions(mut self, directions: DirectionSet) -> Self {
        self.attack_directions = Some(directions);
        self
    }
}

/// Authoritative battle state.
#[derive(Debug, Clone)]
pub struct BattleField {
    grid: HeightGrid,
    units: UnitStore,
    time: i64,
    policy: OccupancyPolicy,
}

impl BattleField {
    /// Create an empty battlefield over `grid`.
    #[must_use]
    pub fn new(grid: HeightGrid, config: BattleConfig) -> Self {
        Self {
            grid,
            units: UnitStore::new(),
            time: config.start_time,
            policy: config.occupancy,
        }
    }

    /// Build a battlefield straight from header values.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::GridSizeMismatch`] if `heights` does not hold
    /// `rows * cols` values.
    pub fn from_heights(
        rows: usize,
        cols: usize,
        heights: Vec<i32>,
        config: BattleConfig,
    ) -> Result<Self> {
        Ok(Self::new(HeightGrid::new(rows, cols, heights)?, config))
    }

    /// Current simulation time.
    #[must_use]
    pub const fn time(&self) -> i64 {
        self.time
    }

    /// The height grid with occupancy.
    #[must_use]
    pub const fn grid(&self) -> &HeightGrid {
        &self.grid
    }

    /// Active occupancy policy.
    #[must_use]
    pub const fn policy(&self) -> OccupancyPolicy {
        self.policy
    }

    /// The unit registry.
    #[must_use]
    pub const fn units(&self) -> &UnitStore {
        &self.units
    }

    /// A living unit by id.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Spawn a unit with default directions.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnsupportedKind`] if every no-op check passes
    /// but `kind` names no archetype.
    pub fn spawn(&mut self, kind: &str, id: &str, at: Coord) -> Result<SpawnOutcome> {
        self.spawn_with(SpawnParams::new(kind, id, at))
    }

    /// Spawn a unit, optionally overriding its direction sets.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnsupportedKind`] for an unknown archetype
    /// name. Placement errors indicate a broken invariant.
    pub fn spawn_with(&mut self, params: SpawnParams) -> Result<SpawnOutcome> {
        let Some(id) = UnitId::parse(&params.id) else {
            return Ok(self.reject_spawn(&params, SpawnRejection::InvalidId));
        };
        let Some(tile) = self.grid.tile(params.at) else {
            return Ok(self.reject_spawn(&params, SpawnRejection::OutOfBounds));
        };
        if !tile.is_empty() {
            return Ok(self.reject_spawn(&params, SpawnRejection::TileOccupied));
        }
        if self.units.contains(id.as_str()) {
            return Ok(self.reject_spawn(&params, SpawnRejection::DuplicateId));
        }

        let kind: UnitKind = params.kind.parse()?;

        let mut unit = Unit::new(id.clone(), kind, params.at);
        if let Some(directions) = params.move_directions {
            unit = unit.with_move_directions(directions);
        }
        if let Some(directions) = params.attack_directions {
            unit = unit.with_attack_directions(directions);
        }

        self.grid.place(id.clone(), params.at, self.policy)?;
        self.units.insert(unit);
        debug!(unit = %id, %kind, at = %params.at, "unit spawned");

        self.validate()?;
        Ok(SpawnOutcome::Spawned(id))
    }

    fn reject_spawn(&self, params: &SpawnParams, reason: SpawnRejection) -> SpawnOutcome {
        debug!(
            unit = %params.id,
            at = %params.at,
            reason = reason.as_str(),
            "spawn ignored"
        );
        SpawnOutcome::Ignored(reason)
    }

    /// Order a unit to walk to `target`.
    ///
    /// The unit's intended position becomes `target` whether or not the walk
    /// succeeds. A failed walk attaches a damage-over-time penalty unless the
    /// unit already carries one.
    ///
    /// # Errors
    ///
    /// Only invariant violations are reported.
    pub fn move_unit(&mut self, id: &str, target: Coord) -> Result<MoveOutcome> {
        let Some(unit) = self.units.get(id) else {
            debug!(unit = id, reason = "unknown_unit", "move ignored");
            return Ok(MoveOutcome::UnknownUnit);
        };
        let origin = unit.position();
        let feasibility = self.check_move(unit, target);

        let outcome = match feasibility {
            Ok(steps) => {
                let taken = self.grid.take(id, origin)?;
                self.grid.place(taken, target, self.policy)?;
                if let Some(unit) = self.units.get_mut(id) {
                    unit.relocate(target);
                }
                debug!(unit = id, from = %origin, to = %target, steps, "unit moved");
                MoveOutcome::Moved { steps }
            }
            Err(reason) => {
                let unit = self
                    .units
                    .get_mut(id)
                    .ok_or_else(|| BattleError::UnknownUnit(id.to_string()))?;
                unit.set_intended_position(target);
                let penalized = !unit.is_effect_full(EffectKind::DamageOverTime)?;
                if penalized {
                    unit.add_effect(Effect::damage_over_time())?;
                }
                debug!(
                    unit = id,
                    to = %target,
                    reason = reason.as_str(),
                    penalized,
                    "move failed"
                );
                MoveOutcome::Failed { reason, penalized }
            }
        };

        self.validate()?;
        Ok(outcome)
    }

    fn check_move(&self, unit: &Unit, target: Coord) -> std::result::Result<u32, MoveFailure> {
        let tile = self.grid.tile(target).ok_or(MoveFailure::OutOfBounds)?;
        let id = unit.id().as_str();
        let passable = tile.is_empty()
            || match self.policy {
                OccupancyPolicy::Exclusive => tile.holds_only(id),
                OccupancyPolicy::Shared => tile.contains(id),
            };
        if !passable {
            return Err(MoveFailure::TargetOccupied);
        }

        let query = ReachQuery {
            origin: unit.position(),
            target,
            budget: unit.max_move(),
            max_step: unit.max_step(),
            directions: unit.move_directions(),
        };
        steps_to(&self.grid, &query).ok_or(MoveFailure::Unreachable)
    }

    /// Attack along the named direction.
    ///
    /// Probes `position + direction * k` for `k` in `1..=attack_distance`,
    /// skipping empty tiles, and strikes the first occupied one.
    ///
    /// # Errors
    ///
    /// Only invariant violations are reported.
    pub fn attack(&mut self, id: &str, direction: &str) -> Result<AttackOutcome> {
        let Some(attacker) = self.units.get(id) else {
            debug!(unit = id, reason = "unknown_unit", "attack ignored");
            return Ok(AttackOutcome::UnknownUnit);
        };
        let Some(vector) = attacker.attack_directions().get(direction) else {
            debug!(unit = id, direction, reason = "unknown_direction", "attack ignored");
            return Ok(AttackOutcome::UnknownDirection);
        };

        let origin = attacker.position();
        let damage_base = attacker.attack_damage();
        let height_range = attacker.attack_height_range();

        for reach in 1..=attacker.attack_distance() {
            let Ok(k) = i32::try_from(reach) else { break };
            let probe = origin + vector * k;
            let Some(tile) = self.grid.tile(probe) else {
                break;
            };
            if tile.is_empty() {
                continue;
            }

            let diff = self
                .grid
                .height_diff(origin, probe)
                .ok_or_else(|| BattleError::InvalidState(format!("attacker {id} off the grid")))?;
            if diff.abs() > height_range {
                debug!(unit = id, tile = %probe, diff, "attack out of height range");
                return Ok(AttackOutcome::HeightOutOfRange { tile: probe });
            }

            let damage = damage_base.saturating_add(diff).max(0);
            let victims = self.victims_at(probe)?;
            return self.strike(id, probe, damage, victims);
        }

        debug!(unit = id, direction, "attack found no target");
        Ok(AttackOutcome::NoTarget)
    }

    fn victims_at(&self, tile: Coord) -> Result<Vec<UnitId>> {
        let occupants = self
            .grid
            .tile(tile)
            .ok_or_else(|| BattleError::InvalidState(format!("tile {tile} is off the grid")))?;
        Ok(match self.policy {
            OccupancyPolicy::Exclusive => vec![occupants.sole_occupant(tile)?.clone()],
            OccupancyPolicy::Shared => occupants.occupants().to_vec(),
        })
    }

    fn strike(
        &mut self,
        attacker: &str,
        tile: Coord,
        damage: i64,
        victims: Vec<UnitId>,
    ) -> Result<AttackOutcome> {
        let mut killed = Vec::new();
        for victim in &victims {
            let unit = self
                .units
                .get_mut(victim.as_str())
                .ok_or_else(|| BattleError::UnknownUnit(victim.to_string()))?;
            unit.take_damage(damage);
            debug!(unit = attacker, target = %victim, damage, hp = unit.hp(), "attack hit");
            if !unit.is_alive() {
                self.remove_unit(victim.as_str())?;
                debug!(unit = %victim, "unit killed");
                killed.push(victim.clone());
            }
        }

        self.validate()?;
        Ok(AttackOutcome::Hit {
            tile,
            damage,
            victims,
            killed,
        })
    }

    /// Advance the clock to `new_time`, applying effects for the interval.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NonIncreasingTime`] if `new_time` is not later
    /// than the current time; nothing is mutated in that case.
    pub fn tick(&mut self, new_time: i64) -> Result<TickEvents> {
        if new_time <= self.time {
            return Err(BattleError::NonIncreasingTime {
                current: self.time,
                requested: new_time,
            });
        }

        let elapsed = new_time.saturating_sub(self.time);
        let mut events = TickEvents {
            elapsed,
            deaths: Vec::new(),
        };

        // Removals during the pass must not disturb iteration.
        let ids = self.units.ids().to_vec();
        for id in ids {
            let Some(unit) = self.units.get_mut(id.as_str()) else {
                continue;
            };
            unit.apply_effects(elapsed);
            if unit.is_alive() {
                unit.purge_expired_effects();
                continue;
            }
            self.remove_unit(id.as_str())?;
            debug!(unit = %id, "unit died from effects");
            events.deaths.push(id);
        }

        self.time = new_time;
        self.validate()?;
        Ok(events)
    }

    /// Remove a living unit from the grid and the registry.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnit`] if no living unit has the id.
    pub fn remove_unit(&mut self, id: &str) -> Result<Unit> {
        let position = self
            .units
            .get(id)
            .map(Unit::position)
            .ok_or_else(|| BattleError::UnknownUnit(id.to_string()))?;
        self.grid.take(id, position)?;
        self.units
            .remove(id)
            .ok_or_else(|| BattleError::UnknownUnit(id.to_string()))
    }

    /// Snapshot of every living unit.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.time, self.units.iter().map(UnitSnapshot::from).collect())
    }

    /// Run one typed command.
    ///
    /// # Errors
    ///
    /// Propagates fatal errors from the command.
    pub fn execute(&mut self, command: &Command) -> Result<CommandOutcome> {
        Ok(match command {
            Command::Spawn { kind, id, at } => CommandOutcome::Spawn(self.spawn(kind, id, *at)?),
            Command::Move { id, to } => CommandOutcome::Move(self.move_unit(id, *to)?),
            Command::Attack { id, direction } => {
                CommandOutcome::Attack(self.attack(id, direction)?)
            }
            Command::State => CommandOutcome::State(self.snapshot()),
        })
    }

    /// Tick to the batch time, then run its commands in order.
    ///
    /// Returns the snapshots produced by `state` commands.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error; earlier commands of the batch keep
    /// their effect.
    pub fn run_batch(&mut self, batch: &Batch) -> Result<Vec<Snapshot>> {
        self.tick(batch.time)?;
        let mut snapshots = Vec::new();
        for command in &batch.commands {
            if let CommandOutcome::State(snapshot) = self.execute(command)? {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }

    /// Deterministic hash of time and every living unit.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.time.hash(&mut hasher);
        self.policy.hash(&mut hasher);

        let mut ids: Vec<&UnitId> = self.units.ids().iter().collect();
        ids.sort();
        ids.len().hash(&mut hasher);

        for id in ids {
            if let Some(unit) = self.units.get(id.as_str()) {
                id.hash(&mut hasher);
                unit.kind().hash(&mut hasher);
                unit.position().hash(&mut hasher);
                unit.intended_position().hash(&mut hasher);
                unit.hp().hash(&mut hasher);
                unit.effects().hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Check that the registry, the grid and every unit agree.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] or
    /// [`BattleError::EffectCapExceeded`] describing the first violation.
    pub fn check_invariants(&self) -> Result<()> {
        let mut placed = 0usize;
        for (coord, tile) in self.grid.tiles() {
            if tile.occupants().len() > 1 && !self.policy.allows_stacking() {
                return Err(BattleError::InvalidState(format!(
                    "exclusive tile {coord} holds {} units",
                    tile.occupants().len()
                )));
            }
            for occupant in tile.occupants() {
                let unit = self.units.get(occupant.as_str()).ok_or_else(|| {
                    BattleError::InvalidState(format!("tile {coord} lists unknown unit {occupant}"))
                })?;
                if unit.position() != coord {
                    return Err(BattleError::InvalidState(format!(
                        "unit {occupant} listed on {coord} but stands on {}",
                        unit.position()
                    )));
                }
                placed += 1;
            }
        }
        if placed != self.units.len() || self.units.ids().len() != self.units.len() {
            return Err(BattleError::InvalidState(format!(
                "{placed} placements for {} registered units",
                self.units.len()
            )));
        }

        for unit in self.units.iter() {
            if unit.hp() > unit.max_hp() || !unit.is_alive() {
                return Err(BattleError::InvalidState(format!(
                    "unit {} has hp {} of {}",
                    unit.id(),
                    unit.hp(),
                    unit.max_hp()
                )));
            }
            unit.effect_count(EffectKind::DamageOverTime)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if cfg!(feature = "debug-validation") {
            self.check_invariants()
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(rows: usize, cols: usize, heights: Vec<i32>) -> BattleField {
        BattleField::from_heights(rows, cols, heights, BattleConfig::default()).unwrap()
    }

    fn shared(rows: usize, cols: usize) -> BattleField {
        BattleField::new(
            HeightGrid::flat(rows, cols),
            BattleConfig::default().with_occupancy(OccupancyPolicy::Shared),
        )
    }

    fn spawned(outcome: SpawnOutcome) -> bool {
        matches!(outcome, SpawnOutcome::Spawned(_))
    }

    #[test]
    fn test_spawn_creates_full_health_unit() {
        let mut bf = field(2, 2, vec![0; 4]);
        assert!(spawned(bf.spawn("knight", "k", Coord::new(1, 0)).unwrap()));

        let unit = bf.unit("k").unwrap();
        assert_eq!(unit.kind(), UnitKind::Knight);
        assert_eq!(unit.hp(), 50);
        assert_eq!(unit.position(), Coord::new(1, 0));
        assert!(bf.grid().tile(Coord::new(1, 0)).unwrap().holds_only("k"));
        assert_eq!(bf.snapshot().to_string(), "k knight (2, 1) 50\n---\n");
    }

    #[test]
    fn test_spawn_noops_leave_state_identical() {
        let mut bf = field(2, 2, vec![0; 4]);
        bf.spawn("footman", "a", Coord::new(0, 0)).unwrap();
        let before = bf.snapshot().to_string();
        let hash = bf.state_hash();

        let cases = [
            ("footman", "b", Coord::new(0, 0), SpawnRejection::TileOccupied),
            ("footman", "a", Coord::new(1, 1), SpawnRejection::DuplicateId),
            ("footman", "B", Coord::new(1, 1), SpawnRejection::InvalidId),
            ("footman", "b2", Coord::new(1, 1), SpawnRejection::InvalidId),
            ("footman", "", Coord::new(1, 1), SpawnRejection::InvalidId),
            ("footman", "b", Coord::new(2, 0), SpawnRejection::OutOfBounds),
            ("footman", "b", Coord::new(0, -1), SpawnRejection::OutOfBounds),
        ];
        for (kind, id, at, reason) in cases {
            assert_eq!(
                bf.spawn(kind, id, at).unwrap(),
                SpawnOutcome::Ignored(reason),
                "spawn {id} at {at}"
            );
        }

        assert_eq!(bf.snapshot().to_string(), before);
        assert_eq!(bf.state_hash(), hash);
    }

    #[test]
    fn test_unknown_kind_is_fatal_only_after_noop_checks() {
        let mut bf = field(1, 2, vec![0, 0]);
        let err = bf.spawn("dragon", "d", Coord::new(0, 0)).unwrap_err();
        assert!(matches!(err, BattleError::UnsupportedKind(ref k) if k == "dragon"));
        assert!(err.is_sequencing());
        assert!(bf.units().is_empty());

        // An off-grid spawn is ignored before the kind is looked at.
        assert_eq!(
            bf.spawn("dragon", "d", Coord::new(5, 5)).unwrap(),
            SpawnOutcome::Ignored(SpawnRejection::OutOfBounds)
        );
    }

    #[test]
    fn test_spawn_with_direction_overrides() {
        let mut bf = field(1, 3, vec![0; 3]);
        let diagonal: DirectionSet = [("skip", Coord::new(0, 2))].into_iter().collect();
        let params = SpawnParams::new("footman", "a", Coord::new(0, 0))
            .with_move_directions(diagonal.clone())
            .with_attack_directions(diagonal);
        assert!(spawned(bf.spawn_with(params).unwrap()));

        let unit = bf.unit("a").unwrap();
        assert_eq!(unit.move_directions().get("skip"), Some(Coord::new(0, 2)));
        assert_eq!(unit.attack_directions().get("right"), None);
    }

    #[test]
    fn test_move_success_relocates() {
        let mut bf = field(1, 3, vec![0; 3]);
        bf.spawn("footman", "a", Coord::new(0, 0)).unwrap();

        let outcome = bf.move_unit("a", Coord::new(0, 1)).unwrap();
        assert_eq!(outcome, MoveOutcome::Moved { steps: 1 });

        let unit = bf.unit("a").unwrap();
        assert_eq!(unit.position(), Coord::new(0, 1));
        assert_eq!(unit.intended_position(), Coord::new(0, 1));
        assert!(unit.effects().is_empty());
        assert!(bf.grid().is_vacant(Coord::new(0, 0)));
        assert!(bf.grid().tile(Coord::new(0, 1)).unwrap().holds_only("a"));
    }

    #[test]
    fn test_move_to_own_tile_succeeds() {
        let mut bf = field(1, 2, vec![0, 0]);
        bf.spawn("footman", "a", Coord::new(0, 0)).unwrap();
        assert_eq!(
            bf.move_unit("a", Coord::new(0, 0)).unwrap(),
            MoveOutcome::Moved { steps: 0 }
        );
    }

    #[test]
    fn test_failed_move_keeps_position_and_penalizes_once() {
        let mut bf = field(1, 4, vec![0; 4]);
        bf.spawn("footman", "a", Coord::new(0, 0)).unwrap();

        // Footmen walk one step, so two tiles away is out of budget.
        for attempt in 0..3 {
            let outcome = bf.move_unit("a", Coord::new(0, 2)).unwrap();
            assert_eq!(
                outcome,
                MoveOutcome::Failed {
                    reason: MoveFailure::Unreachable,
                    penalized: attempt == 0,
                }
            );
        }

        let unit = bf.unit("a").unwrap();
        assert_eq!(unit.position(), Coord::new(0, 0));
        assert_eq!(unit.intended_position(), Coord::new(0, 2));
        assert_eq!(unit.effects().len(), 1);
        assert!(bf.grid().tile(Coord::new(0, 0)).unwrap().holds_only("a"));
    }

    #[test]
    fn test_move_failure_reasons() {
        let mut bf = field(2, 2, vec![0, 5, 0, 0]);
        bf.spawn("footman", "a", Coord::new(0, 0)).unwrap();
        bf.spawn("footman", "b", Coord::new(1, 0)).unwrap();

        let fail = |outcome: MoveOutcome| match outcome {
            MoveOutcome::Failed { reason, .. } => Some(reason),
            _ => None,
        };
        assert_eq!(
            fail(bf.move_unit("a", Coord::new(0, 2)).unwrap()),
            Some(MoveFailure::OutOfBounds)
        );
        assert_eq!(
            fail(bf.move_unit("a", Coord::new(1, 0)).unwrap()),
            Some(MoveFailure::TargetOccupied)
        );
        // Height 5 is beyond a footman's step of 1.
        assert_eq!(
            fail(bf.move_unit("a", Coord::new(0, 1)).unwrap()),
            Some(MoveFailure::Unreachable)
        );
        assert_eq!(
            bf.move_unit("ghost", Coord::new(1, 1)).unwrap(),
            MoveOutcome::UnknownUnit
        );
    }

    #[test]
    fn test_attack_damage_uses_height_difference() {
        // Knight: dmg 5, height range 1.
        let mut bf = field(1, 2, vec![1, 0]);
        bf.spawn("knight", "k", Coord::new(0, 0)).unwrap();
        bf.spawn("footman", "f", Coord::new(0, 1)).unwrap();

        let outcome = bf.attack("k", "right").unwrap();
        let AttackOutcome::Hit { damage, victims, killed, .. } = outcome else {
            panic!("expected hit, got {outcome:?}");
        };
        assert_eq!(damage, 6);
        assert_eq!(victims.len(), 1);
        assert!(killed.is_empty());
        assert_eq!(bf.unit("f").unwrap().hp(), 14);

        // Striking far uphill clamps at zero: 3 + (0 - 5) < 0.
        let mut bf = field(1, 2, vec![0, 5]);
        bf.spawn("rifleman", "r", Coord::new(0, 0)).unwrap();
        bf.spawn("footman", "f", Coord::new(0, 1)).unwrap();
        let outcome = bf.attack("r", "right").unwrap();
        assert!(matches!(outcome, AttackOutcome::Hit { damage: 0, .. }));
        assert_eq!(bf.unit("f").unwrap().hp(), 20);
    }

    #[test]
    fn test_attack_height_range_stops_probe() {
        // A footman cannot strike even one level up.
        let mut bf = field(1, 4, vec![0, 0, 1, 0]);
        bf.spawn("footman", "a", Coord::new(0, 1)).unwrap();
        bf.spawn("footman", "b", Coord::new(0, 2)).unwrap();
        assert_eq!(
            bf.attack("a", "right").unwrap(),
            AttackOutcome::HeightOutOfRange {
                tile: Coord::new(0, 2)
            }
        );
        assert_eq!(bf.unit("b").unwrap().hp(), 20);
    }

    #[test]
    fn test_attack_skips_empty_tiles_and_stops_at_edge() {
        let mut bf = field(1, 5, vec![0; 5]);
        bf.spawn("rifleman", "r", Coord::new(0, 0)).unwrap();
        bf.spawn("footman", "f", Coord::new(0, 4)).unwrap();

        assert!(matches!(
            bf.attack("r", "right").unwrap(),
            AttackOutcome::Hit { damage: 3, .. }
        ));
        assert_eq!(bf.unit("f").unwrap().hp(), 17);

        assert_eq!(bf.attack("r", "left").unwrap(), AttackOutcome::NoTarget);
        assert_eq!(bf.attack("r", "sideways").unwrap(), AttackOutcome::UnknownDirection);
        assert_eq!(bf.attack("nobody", "left").unwrap(), AttackOutcome::UnknownUnit);
    }

    #[test]
    fn test_attack_distance_limits_reach() {
        let mut bf = field(1, 3, vec![0; 3]);
        bf.spawn("footman", "a", Coord::new(0, 0)).unwrap();
        bf.spawn("footman", "b", Coord::new(0, 2)).unwrap();
        assert_eq!(bf.attack("a", "right").unwrap(), AttackOutcome::NoTarget);
        assert_eq!(bf.unit("b").unwrap().hp(), 20);
    }

    #[test]
    fn test_lethal_attack_removes_target() {
        let mut bf = field(1, 2, vec![0, 0]);
        bf.spawn("rifleman", "r", Coord::new(0, 0)).unwrap();
        bf.spawn("rifleman", "s", Coord::new(0, 1)).unwrap();

        for _ in 0..3 {
            bf.attack("r", "right").unwrap();
        }
        assert_eq!(bf.unit("s").unwrap().hp(), 1);

        let outcome = bf.attack("r", "right").unwrap();
        let AttackOutcome::Hit { killed, .. } = outcome else {
            panic!("expected hit");
        };
        assert_eq!(killed.len(), 1);
        assert!(bf.unit("s").is_none());
        assert!(bf.grid().is_vacant(Coord::new(0, 1)));
        assert_eq!(bf.snapshot().to_string(), "r rifleman (1, 1) 10\n---\n");

        // The id is free again.
        assert!(spawned(bf.spawn("footman", "s", Coord::new(0, 1)).unwrap()));
    }

    #[test]
    fn test_shared_policy_spawn_onto_occupied_tile_is_noop() {
        let mut bf = shared(1, 2);
        bf.spawn("footman", "a", Coord::new(0, 0)).unwrap();
        let before = bf.snapshot().to_string();
        let hash = bf.state_hash();

        assert_eq!(
            bf.spawn("footman", "b", Coord::new(0, 0)).unwrap(),
            SpawnOutcome::Ignored(SpawnRejection::TileOccupied)
        );
        assert_eq!(bf.snapshot().to_string(), before);
        assert_eq!(bf.state_hash(), hash);
    }

    #[test]
    fn test_shared_policy_attack_hits_every_occupant() {
        let mut bf = shared(1, 3);
        bf.spawn("rifleman", "r", Coord::new(0, 0)).unwrap();
        bf.spawn("footman", "b", Coord::new(0, 1)).unwrap();
        bf.spawn("footman", "a", Coord::new(0, 2)).unwrap();

        // Stack `a` onto `b`'s tile directly.
        let id = bf.grid.take("a", Coord::new(0, 2)).unwrap();
        bf.grid.place(id, Coord::new(0, 1), bf.policy).unwrap();
        bf.units.get_mut("a").unwrap().relocate(Coord::new(0, 1));
        bf.check_invariants().unwrap();

        let outcome = bf.attack("r", "right").unwrap();
        let AttackOutcome::Hit { victims, .. } = outcome else {
            panic!("expected hit");
        };
        let names: Vec<_> = victims.iter().map(UnitId::as_str).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(
            bf.snapshot().to_string(),
            "r rifleman (1, 1) 10\na footman (1, 2) 17\nb footman (1, 2) 17\n---\n"
        );
    }

    #[test]
    fn test_shared_policy_still_blocks_foreign_targets() {
        let mut bf = shared(1, 2);
        bf.spawn("footman", "a", Coord::new(0, 0)).unwrap();
        bf.spawn("footman", "b", Coord::new(0, 1)).unwrap();
        assert!(matches!(
            bf.move_unit("a", Coord::new(0, 1)).unwrap(),
            MoveOutcome::Failed {
                reason: MoveFailure::TargetOccupied,
                ..
            }
        ));
    }

    #[test]
    fn test_tick_rejects_non_increasing_time() {
        let mut bf = field(1, 1, vec![0]);
        bf.tick(3).unwrap();
        let hash = bf.state_hash();

        for t in [3, 2, -1] {
            let err = bf.tick(t).unwrap_err();
            assert!(matches!(
                err,
                BattleError::NonIncreasingTime {
                    current: 3,
                    requested
                } if requested == t
            ));
            assert!(err.is_sequencing());
        }
        assert_eq!(bf.time(), 3);
        assert_eq!(bf.state_hash(), hash);
    }

    #[test]
    fn test_tick_applies_penalty_for_elapsed_time() {
        let mut bf = field(1, 3, vec![0; 3]);
        bf.spawn("footman", "a", Coord::new(0, 0)).unwrap();
        bf.move_unit("a", Coord::new(0, 2)).unwrap();

        let events = bf.tick(5).unwrap();
        assert_eq!(events.elapsed, 5);
        assert_eq!(bf.unit("a").unwrap().hp(), 15);

        bf.tick(6).unwrap();
        assert_eq!(bf.unit("a").unwrap().hp(), 14);
        // Unbounded penalties are never purged.
        assert_eq!(bf.unit("a").unwrap().effects().len(), 1);
    }

    #[test]
    fn test_tick_linear_in_elapsed_time() {
        let mut once = field(1, 3, vec![0; 3]);
        once.spawn("knight", "k", Coord::new(0, 0)).unwrap();
        once.move_unit("k", Coord::new(5, 5)).unwrap();
        let mut stepped = once.clone();

        once.tick(5).unwrap();
        for t in 1..=5 {
            stepped.tick(t).unwrap();
        }
        assert_eq!(once.unit("k").unwrap().hp(), 45);
        assert_eq!(once.state_hash(), stepped.state_hash());
    }

    #[test]
    fn test_tick_removes_units_killed_by_effects() {
        let mut bf = field(1, 3, vec![0; 3]);
        bf.spawn("rifleman", "r", Coord::new(0, 0)).unwrap();
        bf.spawn("footman", "f", Coord::new(0, 2)).unwrap();
        bf.move_unit("r", Coord::new(9, 9)).unwrap();

        let events = bf.tick(10).unwrap();
        assert_eq!(events.deaths.len(), 1);
        assert_eq!(events.deaths[0].as_str(), "r");
        assert!(bf.unit("r").is_none());
        assert!(bf.grid().is_vacant(Coord::new(0, 0)));
        assert_eq!(bf.snapshot().to_string(), "f footman (1, 3) 20\n---\n");
    }

    #[test]
    fn test_remove_unit() {
        let mut bf = field(1, 2, vec![0, 0]);
        bf.spawn("footman", "a", Coord::new(0, 1)).unwrap();

        let unit = bf.remove_unit("a").unwrap();
        assert_eq!(unit.id().as_str(), "a");
        assert!(bf.units().is_empty());
        assert!(bf.grid().is_vacant(Coord::new(0, 1)));

        assert!(matches!(bf.remove_unit("a"), Err(BattleError::UnknownUnit(_))));
    }

    #[test]
    fn test_tick_and_registry_follow_spawn_order() {
        let mut bf = field(1, 3, vec![0; 3]);
        bf.spawn("footman", "c", Coord::new(0, 0)).unwrap();
        bf.spawn("footman", "a", Coord::new(0, 2)).unwrap();
        bf.spawn("footman", "b", Coord::new(0, 1)).unwrap();

        let order: Vec<_> = bf.units().ids().iter().map(UnitId::as_str).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        let coords: Vec<_> = bf.units().coordinates().map(|(_, c)| c).collect();
        assert_eq!(coords, vec![Coord::new(0, 0), Coord::new(0, 2), Coord::new(0, 1)]);
    }

    #[test]
    fn test_end_to_end_duel() {
        let mut bf = field(1, 3, vec![0, 0, 0]);
        bf.spawn("footman", "a", Coord::from_one_based(1, 1)).unwrap();
        bf.spawn("footman", "b", Coord::from_one_based(1, 3)).unwrap();

        bf.tick(1).unwrap();
        assert_eq!(bf.attack("a", "right").unwrap(), AttackOutcome::NoTarget);
        assert_eq!(
            bf.move_unit("a", Coord::from_one_based(1, 2)).unwrap(),
            MoveOutcome::Moved { steps: 1 }
        );

        bf.tick(2).unwrap();
        assert!(matches!(
            bf.attack("a", "right").unwrap(),
            AttackOutcome::Hit { damage: 1, .. }
        ));
        assert_eq!(
            bf.snapshot().to_string(),
            "a footman (1, 2) 20\nb footman (1, 3) 19\n---\n"
        );
        bf.check_invariants().unwrap();
    }

    #[test]
    fn test_run_batch_ticks_before_commands() {
        let mut bf = field(1, 2, vec![0, 0]);
        let batch = Batch::new(1)
            .with(Command::Spawn {
                kind: "footman".into(),
                id: "a".into(),
                at: Coord::new(0, 0),
            })
            .with(Command::State)
            .with(Command::Move {
                id: "a".into(),
                to: Coord::new(0, 1),
            })
            .with(Command::State);

        let snapshots = bf.run_batch(&batch).unwrap();
        assert_eq!(bf.time(), 1);
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].to_string(), "a footman (1, 1) 20\n---\n");
        assert_eq!(snapshots[1].to_string(), "a footman (1, 2) 20\n---\n");

        assert!(bf.run_batch(&Batch::new(1)).is_err());
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut a = field(1, 2, vec![0, 0]);
        let mut b = field(1, 2, vec![0, 0]);
        assert_eq!(a.state_hash(), b.state_hash());

        a.spawn("footman", "x", Coord::new(0, 0)).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());

        b.spawn("footman", "x", Coord::new(0, 0)).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());

        // A failed move only changes intended position and effects.
        a.move_unit("x", Coord::new(3, 3)).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
