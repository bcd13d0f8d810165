//! Integer grid geometry.
//!
//! Coordinates are `(row, col)` pairs, zero based. Direction vectors share the
//! same type so that a probe at distance `k` is simply `origin + dir * k`.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign};

use serde::{Deserialize, Serialize};

/// A grid position or direction vector.
///
/// Ordering is row-major (row first, then column), which is the order used
/// by battlefield snapshots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Coord {
    /// Row index (grows downward).
    pub row: i32,
    /// Column index (grows rightward).
    pub col: i32,
}

impl Coord {
    /// One row up.
    pub const UP: Self = Self { row: -1, col: 0 };
    /// One row down.
    pub const DOWN: Self = Self { row: 1, col: 0 };
    /// One column left.
    pub const LEFT: Self = Self { row: 0, col: -1 };
    /// One column right.
    pub const RIGHT: Self = Self { row: 0, col: 1 };

    /// Create a coordinate.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Convert 1-based script coordinates to a 0-based coordinate.
    #[must_use]
    pub const fn from_one_based(x: i32, y: i32) -> Self {
        Self {
            row: x.saturating_sub(1),
            col: y.saturating_sub(1),
        }
    }

    /// Row and column as 1-based values, the form snapshots print.
    #[must_use]
    pub const fn to_one_based(self) -> (i64, i64) {
        (self.row as i64 + 1, self.col as i64 + 1)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// Arithmetic saturates: any saturated value lies far outside every grid, so
// bounds checks reject it instead of the process overflowing.

impl Add for Coord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            row: self.row.saturating_add(rhs.row),
            col: self.col.saturating_add(rhs.col),
        }
    }
}

impl AddAssign for Coord {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<i32> for Coord {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self::Output {
        Self {
            row: self.row.saturating_mul(rhs),
            col: self.col.saturating_mul(rhs),
        }
    }
}

impl MulAssign<i32> for Coord {
    fn mul_assign(&mut self, rhs: i32) {
        *self = *self * rhs;
    }
}
