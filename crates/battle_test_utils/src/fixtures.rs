//! Test fixtures and helpers.
//!
//! Pre-built battlefields and scripts for consistent testing.

use std::fmt::Write as _;

use battle_core::prelude::*;

/// The two-footman duel on a 1×3 strip.
///
/// `a` closes the gap and hits `b` once, so the only snapshot is
/// [`DUEL_EXPECTED`].
pub const DUEL_SCRIPT: &str = "\
1 3
0 0 0
1 spawn footman a 1 1; spawn footman b 1 3
2 attack a right; move a 1 2
3 attack a right; state
";

/// Output of [`DUEL_SCRIPT`].
pub const DUEL_EXPECTED: &str = "a footman (1, 2) 20\nb footman (1, 3) 19\n---\n";

/// An empty battlefield with the default configuration.
///
/// # Panics
///
/// Panics if `heights` does not hold `rows * cols` values.
#[must_use]
pub fn field(rows: usize, cols: usize, heights: Vec<i32>) -> BattleField {
    BattleField::from_heights(rows, cols, heights, BattleConfig::default())
        .expect("fixture heights must match dimensions")
}

/// An empty flat battlefield.
#[must_use]
pub fn flat_field(rows: usize, cols: usize) -> BattleField {
    BattleField::new(HeightGrid::flat(rows, cols), BattleConfig::default())
}

/// An empty flat battlefield under the shared occupancy policy.
#[must_use]
pub fn shared_field(rows: usize, cols: usize) -> BattleField {
    BattleField::new(
        HeightGrid::flat(rows, cols),
        BattleConfig::default().with_occupancy(OccupancyPolicy::Shared),
    )
}

/// Spawn a unit and panic unless it lands.
///
/// # Panics
///
/// Panics if the spawn is ignored or fails.
pub fn spawn(field: &mut BattleField, kind: &str, id: &str, at: Coord) {
    let outcome = field.spawn(kind, id, at).expect("fixture spawn failed");
    assert!(
        matches!(outcome, SpawnOutcome::Spawned(_)),
        "fixture spawn of {id} at {at} was ignored: {outcome:?}"
    );
}

/// Builds script text line by line.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    rows: usize,
    cols: usize,
    heights: Vec<i32>,
    lines: Vec<String>,
}

impl ScriptBuilder {
    /// Start a script over a flat grid.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            heights: vec![0; rows * cols],
            lines: Vec::new(),
        }
    }

    /// Replace the heights, row-major.
    #[must_use]
    pub fn with_heights(mut self, heights: Vec<i32>) -> Self {
        self.heights = heights;
        self
    }

    /// Append a line: a tick time followed by `;`-separated commands.
    #[must_use]
    pub fn line(mut self, time: i64, commands: &str) -> Self {
        self.lines.push(format!("{time} {commands}"));
        self
    }

    /// Append raw text as its own line.
    #[must_use]
    pub fn raw(mut self, text: &str) -> Self {
        self.lines.push(text.to_string());
        self
    }

    /// Render the script.
    #[must_use]
    pub fn build(&self) -> String {
        let mut out = format!("{} {}\n", self.rows, self.cols);
        for row in self.heights.chunks(self.cols.max(1)) {
            let row: Vec<String> = row.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "{}", row.join(" "));
        }
        for line in &self.lines {
            let _ = writeln!(out, "{line}");
        }
        out
    }
}
