//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the battle engine produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A judged battle must replay bit-for-bit. Sources of non-determinism
//! include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The engine iterates units in spawn order and hashes them sorted by id.
//!
//! - **Search order**: the reachability search must not depend on anything
//!   but the grid, the query and the direction set.
//!
//! - **Snapshot order**: units are always listed by tile, then id.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use battle_core::battlefield::BattleField;
use battle_core::command::Batch;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps applied per run.
    pub steps: usize,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs agreed, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to apply step `i`
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: usize,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, usize),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for i in 0..steps {
            step(&mut state, i);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// A battlefield replaying batches until the first fatal error.
#[derive(Debug, Clone)]
pub struct Replay {
    /// Current battlefield.
    pub field: BattleField,
    /// Index of the batch that failed, if any.
    pub aborted_at: Option<usize>,
}

impl Replay {
    /// Start a replay.
    #[must_use]
    pub fn new(field: BattleField) -> Self {
        Self {
            field,
            aborted_at: None,
        }
    }

    /// Apply batch `index`. Does nothing once the replay has aborted.
    pub fn apply(&mut self, index: usize, batch: &Batch) {
        if self.aborted_at.is_some() {
            return;
        }
        if let Err(e) = self.field.run_batch(batch) {
            tracing::debug!(index, error = %e, "replay aborted");
            self.aborted_at = Some(index);
        }
    }
}

/// Replay `batches` on fresh battlefields `runs` times and compare hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, batches: &[Batch], runs: usize) -> DeterminismResult
where
    F: Fn() -> BattleField,
{
    verify_determinism(
        runs,
        batches.len(),
        || Replay::new(setup_fn()),
        |replay, i| replay.apply(i, &batches[i]),
        |replay| replay.field.state_hash(),
    )
}

/// Replay on N threads at once and collect final hashes.
///
/// Uses scoped threads so the setup function needs no `'static` bound.
pub fn run_parallel_battles<F>(setup_fn: F, batches: &[Batch], num_runs: usize) -> Vec<u64>
where
    F: Fn() -> BattleField + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| {
                s.spawn(|| {
                    let mut replay = Replay::new(setup_fn());
                    for (i, batch) in batches.iter().enumerate() {
                        replay.apply(i, batch);
                    }
                    replay.field.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Compare two replays batch by batch, finding the first divergence.
///
/// # Returns
///
/// `None` if the replays agree throughout, `Some(i)` if they differ after
/// batch `i` (`0` meaning the initial state).
pub fn find_first_divergence<F>(setup_fn: F, batches: &[Batch]) -> Option<usize>
where
    F: Fn() -> BattleField,
{
    let mut first = Replay::new(setup_fn());
    let mut second = Replay::new(setup_fn());

    if first.field.state_hash() != second.field.state_hash() {
        return Some(0);
    }

    for (i, batch) in batches.iter().enumerate() {
        first.apply(i, batch);
        second.apply(i, batch);

        if first.field.state_hash() != second.field.state_hash() {
            tracing::debug!(batch = i, "replays diverged");
            return Some(i + 1);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but reproducible grids, direction sets
/// and command streams.
pub mod strategies {
    use battle_core::command::{Batch, Command};
    use battle_core::geometry::Coord;
    use battle_core::grid::HeightGrid;
    use battle_core::unit_kind::{DirectionSet, UnitKind};
    use proptest::prelude::*;

    /// Ids used by generated commands. The last one is invalid.
    pub const UNIT_NAMES: [&str; 5] = ["a", "b", "c", "d", "Bad"];

    /// Generate grid dimensions and row-major heights in `0..4`.
    pub fn arb_heights(max_side: usize) -> impl Strategy<Value = (usize, usize, Vec<i32>)> {
        (1..=max_side, 1..=max_side).prop_flat_map(|(rows, cols)| {
            proptest::collection::vec(0i32..4, rows * cols)
                .prop_map(move |heights| (rows, cols, heights))
        })
    }

    /// Generate a height grid up to `max_side` on each side.
    pub fn arb_grid(max_side: usize) -> impl Strategy<Value = HeightGrid> {
        arb_heights(max_side).prop_map(|(rows, cols, heights)| {
            HeightGrid::new(rows, cols, heights).expect("generated heights match dimensions")
        })
    }

    /// Generate a short direction vector, zero excluded.
    pub fn arb_direction() -> impl Strategy<Value = Coord> {
        (-2i32..=2, -2i32..=2)
            .prop_filter("zero vector", |&(r, c)| r != 0 || c != 0)
            .prop_map(|(r, c)| Coord::new(r, c))
    }

    /// Generate a set of one to four named directions.
    pub fn arb_direction_set() -> impl Strategy<Value = DirectionSet> {
        prop_oneof![
            Just(DirectionSet::cardinal()),
            proptest::collection::vec(arb_direction(), 1..=4).prop_map(|dirs| {
                dirs.into_iter()
                    .enumerate()
                    .map(|(i, d)| (format!("dir{i}"), d))
                    .collect::<DirectionSet>()
            }),
        ]
    }

    /// Generate a coordinate that may fall one tile outside the grid.
    pub fn arb_coord(rows: usize, cols: usize) -> impl Strategy<Value = Coord> {
        let rows = i32::try_from(rows).unwrap_or(i32::MAX);
        let cols = i32::try_from(cols).unwrap_or(i32::MAX);
        (-1..=rows, -1..=cols).prop_map(|(r, c)| Coord::new(r, c))
    }

    /// Generate an archetype name.
    pub fn arb_kind_name() -> impl Strategy<Value = String> {
        proptest::sample::select(UnitKind::ALL.to_vec()).prop_map(|k| k.name().to_string())
    }

    /// Generate an id from [`UNIT_NAMES`].
    pub fn arb_unit_name() -> impl Strategy<Value = String> {
        proptest::sample::select(UNIT_NAMES.to_vec()).prop_map(str::to_string)
    }

    /// Generate any command against a `rows × cols` grid.
    pub fn arb_command(rows: usize, cols: usize) -> impl Strategy<Value = Command> {
        let direction = proptest::sample::select(vec!["up", "down", "left", "right", "nowhere"]);
        prop_oneof![
            (arb_kind_name(), arb_unit_name(), arb_coord(rows, cols))
                .prop_map(|(kind, id, at)| Command::Spawn { kind, id, at }),
            (arb_unit_name(), arb_coord(rows, cols)).prop_map(|(id, to)| Command::Move { id, to }),
            (arb_unit_name(), direction).prop_map(|(id, d)| Command::Attack {
                id,
                direction: d.to_string(),
            }),
            Just(Command::State),
        ]
    }

    /// Generate batches with strictly increasing times.
    pub fn arb_batches(
        rows: usize,
        cols: usize,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<Batch>> {
        proptest::collection::vec(
            (1i64..4, proptest::collection::vec(arb_command(rows, cols), 0..4)),
            0..max_len,
        )
        .prop_map(|steps| {
            let mut time = 0;
            steps
                .into_iter()
                .map(|(gap, commands)| {
                    time += gap;
                    Batch { time, commands }
                })
                .collect()
        })
    }
}
