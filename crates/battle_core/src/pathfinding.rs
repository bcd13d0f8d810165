//! Bounded breadth-first reachability search.
//!
//! Answers whether a unit can walk from one tile to another within a step
//! budget. A step follows one of the unit's named direction vectors and is
//! legal when the next tile is on the grid, empty, and no more than
//! `max_step` higher or lower than the tile it leaves.
//!
//! All edges cost one step, so the first time a tile is enqueued is also the
//! shortest way to reach it; tiles are marked visited on enqueue. Worst case
//! is `O(rows * cols * directions)`.

use std::collections::VecDeque;

use crate::geometry::Coord;
use crate::grid::HeightGrid;
use crate::unit_kind::DirectionSet;

/// Parameters of one reachability question.
#[derive(Debug, Clone, Copy)]
pub struct ReachQuery<'a> {
    /// Where the walk starts. Its own occupant never blocks the search.
    pub origin: Coord,
    /// Where the walk must end.
    pub target: Coord,
    /// Maximum number of steps.
    pub budget: u32,
    /// Maximum absolute height change per step.
    pub max_step: i64,
    /// Allowed step vectors.
    pub directions: &'a DirectionSet,
}

/// Length of a shortest legal walk from `origin` to `target`, if one exists
/// within the budget.
///
/// The origin must lie on the grid; an off-grid origin yields `None`.
#[must_use]
pub fn steps_to(grid: &HeightGrid, query: &ReachQuery<'_>) -> Option<u32> {
    if !grid.is_inside(query.origin) {
        return None;
    }
    if query.origin == query.target {
        return Some(0);
    }
    if !grid.is_inside(query.target) {
        return None;
    }

    let mut visited = VisitedSet::new(grid.rows(), grid.cols());
    let mut queue = VecDeque::new();

    visited.insert(query.origin);
    queue.push_back((query.origin, 0u32));

    let mut explored = 0usize;
    while let Some((current, distance)) = queue.pop_front() {
        explored += 1;

        if current == query.target {
            tracing::trace!(explored, distance, "reachability search hit target");
            return Some(distance);
        }

        if distance >= query.budget {
            continue;
        }

        for direction in query.directions.vectors() {
            let next = current + direction;

            if !grid.is_vacant(next) || visited.contains(next) {
                continue;
            }

            let Some(delta) = grid.height_diff(current, next) else {
                continue;
            };
            if delta.abs() > query.max_step {
                continue;
            }

            visited.insert(next);
            queue.push_back((next, distance + 1));
        }
    }

    tracing::trace!(explored, "reachability search exhausted");
    None
}

/// Whether `target` can be reached from `origin` within the budget.
#[must_use]
pub fn is_reachable(grid: &HeightGrid, query: &ReachQuery<'_>) -> bool {
    steps_to(grid, query).is_some()
}

/// Dense visited flags over the grid.
struct VisitedSet {
    cols: usize,
    rows: usize,
    flags: Vec<bool>,
}

impl VisitedSet {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            rows,
            flags: vec![false; rows.saturating_mul(cols)],
        }
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        let row = usize::try_from(coord.row).ok()?;
        let col = usize::try_from(coord.col).ok()?;
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    fn contains(&self, coord: Coord) -> bool {
        self.index(coord).is_some_and(|i| self.flags[i])
    }

    fn insert(&mut self, coord: Coord) {
        if let Some(i) = self.index(coord) {
            self.flags[i] = true;
        }
    }
}
