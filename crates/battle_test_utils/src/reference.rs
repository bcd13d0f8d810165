//! Exhaustive reference for the reachability search.
//!
//! Enumerates every simple walk from the origin up to the step budget and
//! keeps the shortest one that ends on the target. Exponential in the
//! budget, so only suitable for small grids and budgets.

use battle_core::geometry::Coord;
use battle_core::grid::HeightGrid;
use battle_core::pathfinding::ReachQuery;

/// Shortest legal walk length found by brute force.
#[must_use]
pub fn exhaustive_steps(grid: &HeightGrid, query: &ReachQuery<'_>) -> Option<u32> {
    if !grid.is_inside(query.origin) {
        return None;
    }
    if query.origin == query.target {
        return Some(0);
    }

    let mut path = vec![query.origin];
    let mut best = None;
    walk(grid, query, &mut path, &mut best);
    best
}

/// Whether any legal walk reaches the target.
#[must_use]
pub fn exhaustive_reachable(grid: &HeightGrid, query: &ReachQuery<'_>) -> bool {
    exhaustive_steps(grid, query).is_some()
}

fn walk(grid: &HeightGrid, query: &ReachQuery<'_>, path: &mut Vec<Coord>, best: &mut Option<u32>) {
    let steps = u32::try_from(path.len() - 1).unwrap_or(u32::MAX);
    let Some(&current) = path.last() else {
        return;
    };

    if current == query.target {
        *best = Some(best.map_or(steps, |b| b.min(steps)));
        return;
    }
    if steps >= query.budget {
        return;
    }

    for direction in query.directions.vectors() {
        let next = current + direction;
        if !grid.is_vacant(next) || path.contains(&next) {
            continue;
        }
        let Some(delta) = grid.height_diff(current, next) else {
            continue;
        };
        if delta.abs() > query.max_step {
            continue;
        }
        path.push(next);
        walk(grid, query, path, best);
        path.pop();
    }
}
