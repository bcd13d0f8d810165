//! Height grid and tiles.
//!
//! The grid is built once from `rows × cols` elevations in row-major order
//! and never reshaped. Tiles keep their height for the whole battle; only
//! their occupancy changes. Tiles hold unit ids, never the units themselves:
//! units live in the battlefield's id-indexed store.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::geometry::Coord;
use crate::occupancy::OccupancyPolicy;
use crate::unit::UnitId;

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    height: i32,
    /// Occupants in arrival order.
    occupants: Vec<UnitId>,
}

impl Tile {
    /// Create an empty tile.
    #[must_use]
    pub const fn new(height: i32) -> Self {
        Self {
            height,
            occupants: Vec::new(),
        }
    }

    /// Elevation of the tile.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Whether nobody stands here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    /// Units standing here, in arrival order.
    #[must_use]
    pub fn occupants(&self) -> &[UnitId] {
        &self.occupants
    }

    /// Whether `id` stands here.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.occupants.iter().any(|o| o.as_str() == id)
    }

    /// Whether `id` is the only unit here.
    #[must_use]
    pub fn holds_only(&self, id: &str) -> bool {
        matches!(self.occupants.as_slice(), [only] if only.as_str() == id)
    }

    /// The single occupant of an exclusive tile.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::EmptyTile`] if nobody stands here.
    pub fn sole_occupant(&self, coord: Coord) -> Result<&UnitId> {
        self.occupants.first().ok_or(BattleError::EmptyTile(coord))
    }

    /// Put a unit on the tile.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::TileOccupied`] when an exclusive tile is
    /// already taken, and [`BattleError::InvalidState`] if the unit is
    /// already here.
    pub fn add(&mut self, id: UnitId, policy: OccupancyPolicy, coord: Coord) -> Result<()> {
        if self.contains(id.as_str()) {
            return Err(BattleError::InvalidState(format!(
                "unit {id} placed twice on tile {coord}"
            )));
        }
        if !self.is_empty() && !policy.allows_stacking() {
            return Err(BattleError::TileOccupied(coord));
        }
        self.occupants.push(id);
        Ok(())
    }

    /// Take a unit off the tile.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnitNotOnTile`] if the unit is not here.
    pub fn remove(&mut self, id: &str, coord: Coord) -> Result<UnitId> {
        let index = self
            .occupants
            .iter()
            .position(|o| o.as_str() == id)
            .ok_or_else(|| BattleError::UnitNotOnTile {
                unit: id.to_string(),
                coord,
            })?;
        Ok(self.occupants.remove(index))
    }
}

/// The battlefield's immutable height map with per-tile occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightGrid {
    rows: usize,
    cols: usize,
    /// Tiles in row-major order.
    tiles: Vec<Tile>,
}

impl HeightGrid {
    /// Build a grid from `rows * cols` heights in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::GridSizeMismatch`] if the number of heights
    /// does not match the dimensions.
    pub fn new(rows: usize, cols: usize, heights: Vec<i32>) -> Result<Self> {
        let expected = rows.saturating_mul(cols);
        if heights.len() != expected {
            return Err(BattleError::GridSizeMismatch {
                expected,
                actual: heights.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            tiles: heights.into_iter().map(Tile::new).collect(),
        })
    }

    /// A grid with every tile at height zero.
    #[must_use]
    pub fn flat(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            tiles: vec![Tile::new(0); rows.saturating_mul(cols)],
        }
    }

    /// Number of rows (M).
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (N).
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Whether `coord` lies on the grid.
    #[must_use]
    pub fn is_inside(&self, coord: Coord) -> bool {
        self.index(coord).is_some()
    }

    #[inline]
    fn index(&self, coord: Coord) -> Option<usize> {
        let row = usize::try_from(coord.row).ok()?;
        let col = usize::try_from(coord.col).ok()?;
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    /// The tile at `coord`, if on the grid.
    #[must_use]
    pub fn tile(&self, coord: Coord) -> Option<&Tile> {
        self.index(coord).map(|i| &self.tiles[i])
    }

    /// Mutable tile access, if on the grid.
    pub(crate) fn tile_mut(&mut self, coord: Coord) -> Option<&mut Tile> {
        self.index(coord).map(move |i| &mut self.tiles[i])
    }

    /// Elevation at `coord`, if on the grid.
    #[must_use]
    pub fn height(&self, coord: Coord) -> Option<i32> {
        self.tile(coord).map(Tile::height)
    }

    /// `height(from) - height(to)`, positive when `from` is higher.
    #[must_use]
    pub fn height_diff(&self, from: Coord, to: Coord) -> Option<i64> {
        Some(i64::from(self.height(from)?) - i64::from(self.height(to)?))
    }

    /// Whether `coord` is on the grid and nobody stands there.
    #[must_use]
    pub fn is_vacant(&self, coord: Coord) -> bool {
        self.tile(coord).is_some_and(Tile::is_empty)
    }

    /// Place a unit on a tile under `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] for an off-grid coordinate, or
    /// whatever [`Tile::add`] reports.
    pub(crate) fn place(&mut self, id: UnitId, coord: Coord, policy: OccupancyPolicy) -> Result<()> {
        self.tile_mut(coord)
            .ok_or_else(|| BattleError::InvalidState(format!("tile {coord} is off the grid")))?
            .add(id, policy, coord)
    }

    /// Take a unit off a tile.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnitNotOnTile`] if the unit is not there.
    pub(crate) fn take(&mut self, id: &str, coord: Coord) -> Result<UnitId> {
        self.tile_mut(coord)
            .ok_or_else(|| BattleError::UnitNotOnTile {
                unit: id.to_string(),
                coord,
            })?
            .remove(id, coord)
    }

    /// All tiles with their coordinates in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (Coord, &Tile)> {
        let cols = self.cols.max(1);
        self.tiles.iter().enumerate().map(move |(i, tile)| {
            // Grid dimensions come from i32-addressable input.
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let coord = Coord::new((i / cols) as i32, (i % cols) as i32);
            (coord, tile)
        })
    }
}
