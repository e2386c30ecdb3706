//! Grid addressing: linear cell indices, grid coordinates and world positions.
//!
//! Cells are stored x-major: `index = (x * size_y + y) * size_z + z`, with
//! `z` collapsing to a single layer on 2D maps. Coordinates come in two
//! flavours:
//! - *relative*: zero-based, `[0, size)` per axis
//! - *absolute*: offset by the grid origin, `[origin, origin + size)`
//!
//! Every lookup that would leave the grid yields [`CellIndex::NONE`] instead
//! of wrapping or panicking.

use serde::{Deserialize, Serialize};

use crate::error::{AudibilityError, Result};

/// Identifies one grid (tilemap) managed by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridId(pub u32);

/// Integer cell coordinate (relative or absolute depending on context).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        GridCoord { x, y, z }
    }

    pub const fn flat(x: i32, y: i32) -> Self {
        GridCoord { x, y, z: 0 }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        GridCoord::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Component-wise difference, `None` on overflow.
    #[inline]
    fn minus(self, other: GridCoord) -> Option<Self> {
        Some(GridCoord::new(
            self.x.checked_sub(other.x)?,
            self.y.checked_sub(other.y)?,
            self.z.checked_sub(other.z)?,
        ))
    }

    #[inline]
    fn plus(self, other: GridCoord) -> Option<Self> {
        Some(GridCoord::new(
            self.x.checked_add(other.x)?,
            self.y.checked_add(other.y)?,
            self.z.checked_add(other.z)?,
        ))
    }
}

/// Point in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        WorldPoint { x, y, z }
    }

    pub const fn flat(x: f32, y: f32) -> Self {
        WorldPoint { x, y, z: 0.0 }
    }

    #[inline]
    pub fn distance(self, other: WorldPoint) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Linear index into a grid's cell array.
///
/// [`CellIndex::NONE`] (`-1`) marks "no cell"; check before dereferencing.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellIndex(i32);

impl CellIndex {
    pub const NONE: CellIndex = CellIndex(-1);

    pub const fn new(value: i32) -> Self {
        CellIndex(value)
    }

    #[inline]
    pub fn value(self) -> i32 {
        self.0
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 < 0
    }

    /// Array slot for this index, `None` for the sentinel.
    #[inline]
    pub fn slot(self) -> Option<usize> {
        if self.0 < 0 { None } else { Some(self.0 as usize) }
    }
}

impl From<usize> for CellIndex {
    fn from(slot: usize) -> Self {
        CellIndex(slot as i32)
    }
}

// ============================================================================
// Directions
// ============================================================================

/// Neighbor direction in the grid plane. North is +y, east is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    /// All eight directions, orthogonal ones first.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    #[inline]
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, 1),
            Direction::NorthWest => (-1, 1),
            Direction::SouthEast => (1, -1),
            Direction::SouthWest => (-1, -1),
        }
    }

    #[inline]
    pub fn is_diagonal(self) -> bool {
        let (dx, dy) = self.offset();
        dx != 0 && dy != 0
    }
}

/// Which neighbors sound may travel to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// North, south, east, west.
    Four,
    /// The four orthogonal neighbors plus the diagonals.
    #[default]
    Eight,
}

impl Connectivity {
    pub fn directions(self) -> &'static [Direction] {
        match self {
            Connectivity::Four => &Direction::ALL[..4],
            Connectivity::Eight => &Direction::ALL,
        }
    }
}

/// Neighbor indices of one cell, laid out in [`Direction::ALL`] order.
/// Missing neighbors (grid edge, or diagonals under four-connectivity) are [`CellIndex::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors(pub [CellIndex; 8]);

impl Neighbors {
    pub const EMPTY: Neighbors = Neighbors([CellIndex::NONE; 8]);

    #[inline]
    pub fn get(&self, direction: Direction) -> CellIndex {
        let slot = Direction::ALL.iter().position(|&d| d == direction).unwrap_or(0);
        self.0[slot]
    }

    /// Existing neighbors with the direction leading to them.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, CellIndex)> + '_ {
        Direction::ALL
            .iter()
            .copied()
            .zip(self.0.iter().copied())
            .filter(|(_, index)| !index.is_none())
    }
}

// ============================================================================
// Grid info
// ============================================================================

/// Size of a grid in cells per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl GridSize {
    pub const fn flat(x: usize, y: usize) -> Self {
        GridSize { x, y, z: 1 }
    }

    #[inline]
    pub fn cell_count(self) -> usize {
        self.x * self.y * self.z
    }
}

/// Immutable per-grid constants shared by every computation against a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridInfo {
    origin: GridCoord,
    size: GridSize,
    world_origin: WorldPoint,
    cell_size: WorldPoint,
    diagonal_distance: f32,
    cell_centered: bool,
}

impl GridInfo {
    /// Validated constructor. Rejects empty axes, non-positive cell sizes,
    /// grids whose cell count does not fit the index type and grids whose
    /// absolute coordinates would overflow `i32`.
    pub fn new(
        origin: GridCoord,
        size: GridSize,
        world_origin: WorldPoint,
        cell_size: WorldPoint,
    ) -> Result<Self> {
        if size.x == 0 || size.y == 0 || size.z == 0 {
            return Err(AudibilityError::InvalidGrid(format!(
                "every axis needs at least one cell, got {}x{}x{}",
                size.x, size.y, size.z
            )));
        }
        if size
            .x
            .checked_mul(size.y)
            .and_then(|xy| xy.checked_mul(size.z))
            .is_none_or(|count| count > i32::MAX as usize)
        {
            return Err(AudibilityError::InvalidGrid(format!(
                "{}x{}x{} cells do not fit a cell index",
                size.x, size.y, size.z
            )));
        }
        let extents = [(origin.x, size.x), (origin.y, size.y), (origin.z, size.z)];
        if extents
            .iter()
            .any(|&(start, len)| start as i64 + len as i64 - 1 > i32::MAX as i64)
        {
            return Err(AudibilityError::InvalidGrid(format!(
                "origin {:?} with {}x{}x{} cells overflows absolute coordinates",
                origin, size.x, size.y, size.z
            )));
        }
        let sizes = [cell_size.x, cell_size.y, cell_size.z];
        if sizes.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(AudibilityError::InvalidGrid(format!(
                "cell size must be positive and finite, got {:?}",
                cell_size
            )));
        }

        Ok(GridInfo {
            origin,
            size,
            world_origin,
            cell_size,
            diagonal_distance: (cell_size.x * cell_size.x + cell_size.y * cell_size.y).sqrt(),
            cell_centered: false,
        })
    }

    /// 2D grid with unit-depth cells.
    pub fn flat(
        origin: (i32, i32),
        size: (usize, usize),
        world_origin: (f32, f32),
        cell_size: (f32, f32),
    ) -> Result<Self> {
        GridInfo::new(
            GridCoord::flat(origin.0, origin.1),
            GridSize::flat(size.0, size.1),
            WorldPoint::flat(world_origin.0, world_origin.1),
            WorldPoint::new(cell_size.0, cell_size.1, 1.0),
        )
    }

    /// Report world positions at cell centers instead of cell corners.
    /// Only the tile plane (x, y) is centered; layers stay on their base.
    pub fn with_cell_centered(mut self, cell_centered: bool) -> Self {
        self.cell_centered = cell_centered;
        self
    }

    #[inline]
    pub fn origin(&self) -> GridCoord {
        self.origin
    }

    #[inline]
    pub fn size(&self) -> GridSize {
        self.size
    }

    #[inline]
    pub fn world_origin(&self) -> WorldPoint {
        self.world_origin
    }

    #[inline]
    pub fn cell_size(&self) -> WorldPoint {
        self.cell_size
    }

    #[inline]
    pub fn diagonal_distance(&self) -> f32 {
        self.diagonal_distance
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.size.cell_count()
    }

    /// World-space length of one step in `direction`.
    #[inline]
    pub fn step_distance(&self, direction: Direction) -> f32 {
        match direction {
            Direction::North | Direction::South => self.cell_size.y,
            Direction::East | Direction::West => self.cell_size.x,
            _ => self.diagonal_distance,
        }
    }

    #[inline]
    pub fn contains_relative(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.z >= 0
            && (coord.x as usize) < self.size.x
            && (coord.y as usize) < self.size.y
            && (coord.z as usize) < self.size.z
    }

    #[inline]
    pub fn contains_absolute(&self, coord: GridCoord) -> bool {
        coord
            .minus(self.origin)
            .is_some_and(|relative| self.contains_relative(relative))
    }

    #[inline]
    pub fn contains_index(&self, index: CellIndex) -> bool {
        index.slot().is_some_and(|slot| slot < self.cell_count())
    }

    // ------------------------------------------------------------------------
    // Index <-> coordinate
    // ------------------------------------------------------------------------

    /// Index of a zero-based coordinate, [`CellIndex::NONE`] outside the grid.
    #[inline]
    pub fn to_index_relative(&self, coord: GridCoord) -> CellIndex {
        if !self.contains_relative(coord) {
            return CellIndex::NONE;
        }
        let (sy, sz) = (self.size.y as i32, self.size.z as i32);
        CellIndex((coord.x * sy + coord.y) * sz + coord.z)
    }

    /// Index of an origin-relative coordinate, [`CellIndex::NONE`] outside the grid.
    #[inline]
    pub fn to_index_absolute(&self, coord: GridCoord) -> CellIndex {
        coord
            .minus(self.origin)
            .map_or(CellIndex::NONE, |relative| self.to_index_relative(relative))
    }

    /// Zero-based coordinate of `index`. `None` for the sentinel or out-of-range indices.
    #[inline]
    pub fn from_index_relative(&self, index: CellIndex) -> Option<GridCoord> {
        if !self.contains_index(index) {
            return None;
        }
        let value = index.value();
        let (sy, sz) = (self.size.y as i32, self.size.z as i32);
        let x = value / (sy * sz);
        let remainder = value % (sy * sz);
        Some(GridCoord::new(x, remainder / sz, remainder % sz))
    }

    #[inline]
    pub fn from_index_absolute(&self, index: CellIndex) -> Option<GridCoord> {
        self.from_index_relative(index).and_then(|c| c.plus(self.origin))
    }

    // ------------------------------------------------------------------------
    // Neighbors
    // ------------------------------------------------------------------------

    /// Neighbor of `index` in `direction`, [`CellIndex::NONE`] past the grid edge.
    #[inline]
    pub fn neighbor(&self, index: CellIndex, direction: Direction) -> CellIndex {
        let Some(coord) = self.from_index_relative(index) else {
            return CellIndex::NONE;
        };
        let (dx, dy) = direction.offset();
        self.to_index_relative(coord.offset(dx, dy, 0))
    }

    /// Precomputed neighbor table for one cell.
    pub fn neighbors(&self, index: CellIndex, connectivity: Connectivity) -> Neighbors {
        let mut neighbors = Neighbors::EMPTY;
        for (slot, &direction) in Direction::ALL.iter().enumerate() {
            if connectivity.directions().contains(&direction) {
                neighbors.0[slot] = self.neighbor(index, direction);
            }
        }
        neighbors
    }

    // ------------------------------------------------------------------------
    // World space
    // ------------------------------------------------------------------------

    pub fn world_position_relative(&self, coord: GridCoord) -> WorldPoint {
        let center = if self.cell_centered { 0.5 } else { 0.0 };
        WorldPoint::new(
            self.world_origin.x + self.cell_size.x * (coord.x as f32 + center),
            self.world_origin.y + self.cell_size.y * (coord.y as f32 + center),
            self.world_origin.z + self.cell_size.z * coord.z as f32,
        )
    }

    pub fn world_position_absolute(&self, coord: GridCoord) -> WorldPoint {
        let center = if self.cell_centered { 0.5 } else { 0.0 };
        let axis = |c: i32, o: i32| (c as i64 - o as i64) as f32;
        WorldPoint::new(
            self.world_origin.x + self.cell_size.x * (axis(coord.x, self.origin.x) + center),
            self.world_origin.y + self.cell_size.y * (axis(coord.y, self.origin.y) + center),
            self.world_origin.z + self.cell_size.z * axis(coord.z, self.origin.z),
        )
    }

    /// World position of a cell; `None` for indices outside the grid.
    pub fn world_position(&self, index: CellIndex) -> Option<WorldPoint> {
        self.from_index_relative(index)
            .map(|coord| self.world_position_relative(coord))
    }

    /// Nearest zero-based coordinate to a world position (may lie outside the
    /// grid). `None` when a component is not finite or leaves the `i32` range.
    pub fn relative_from_world(&self, point: WorldPoint) -> Option<GridCoord> {
        let center = if self.cell_centered { 0.5 } else { 0.0 };
        let axis = |p: f32, o: f32, s: f32, c: f32| {
            let cell = ((p - o) / s - c).round();
            (cell.is_finite() && cell >= i32::MIN as f32 && cell < i32::MAX as f32).then_some(cell as i32)
        };
        Some(GridCoord::new(
            axis(point.x, self.world_origin.x, self.cell_size.x, center)?,
            axis(point.y, self.world_origin.y, self.cell_size.y, center)?,
            axis(point.z, self.world_origin.z, self.cell_size.z, 0.0)?,
        ))
    }

    pub fn absolute_from_world(&self, point: WorldPoint) -> Option<GridCoord> {
        self.relative_from_world(point)?.plus(self.origin)
    }

    /// Cell containing a world position, [`CellIndex::NONE`] outside the grid
    /// or for non-finite positions.
    pub fn index_from_world(&self, point: WorldPoint) -> CellIndex {
        self.relative_from_world(point)
            .map_or(CellIndex::NONE, |coord| self.to_index_relative(coord))
    }
}
