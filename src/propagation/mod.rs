//! Layer 2: loudness propagation through a prepared grid.
//!
//! A grid is prepared once into a [`CellState`] arena (neighbors and world
//! positions precomputed, muffling copied from the cache). Each tick the
//! [`FloodFill`] spreads every source through that arena and merges the
//! results by cell-wise maximum.

pub mod flood_fill;

pub use flood_fill::FloodFill;

use serde::{Deserialize, Serialize};

use crate::grid::{CellIndex, Connectivity, GridInfo, Neighbors, WorldPoint};
use crate::loudness::{LOUDNESS_MAX, Loudness};

/// Decibels lost per world unit unless configured otherwise.
pub const DEFAULT_DECIBELS_PER_UNIT: f32 = (LOUDNESS_MAX / 25) as f32;

/// How travelled distance turns into lost loudness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Attenuation {
    /// Fixed loss per world unit.
    DecayPerUnit { decibels_per_unit: f32 },
    /// Loss proportional to the hop length relative to the source range,
    /// scaled so one hop of the full range silences anything.
    RangeFraction,
}

impl Default for Attenuation {
    fn default() -> Self {
        Attenuation::DecayPerUnit { decibels_per_unit: DEFAULT_DECIBELS_PER_UNIT }
    }
}

impl Attenuation {
    /// Whole decibels lost over one hop of `distance`, for a source of `range`.
    #[inline]
    pub fn penalty(&self, distance: f32, range: f32) -> i32 {
        match *self {
            Attenuation::DecayPerUnit { decibels_per_unit } => (distance * decibels_per_unit) as i32,
            Attenuation::RangeFraction => {
                if range <= 0.0 {
                    return LOUDNESS_MAX as i32;
                }
                (LOUDNESS_MAX as f32 * (distance / range).clamp(0.0, 1.0)) as i32
            }
        }
    }
}

/// Per-cell compute state. Allocated once per grid and reused every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellState<L> {
    pub index: CellIndex,
    pub position: WorldPoint,
    /// Copied from the muffling cache; read-only during a tick.
    pub muffling: L,
    /// Settled loudness of the last tick.
    pub current_level: L,
    pub neighbors: Neighbors,
}

/// Build the cell arena for a grid. Muffling starts out silent; the engine
/// fills it from the cache before the first tick.
pub fn prepare_cells<L: Loudness>(info: &GridInfo, connectivity: Connectivity) -> Vec<CellState<L>> {
    (0..info.cell_count())
        .map(|slot| {
            let index = CellIndex::from(slot);
            CellState {
                index,
                position: info.world_position(index).unwrap_or_default(),
                muffling: L::SILENCE,
                current_level: L::SILENCE,
                neighbors: info.neighbors(index, connectivity),
            }
        })
        .collect()
}

/// Whether every source ran until its worklist emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Settled,
    /// Some sources hit the expansion cap; their contribution is partial.
    Capped { sources: usize },
}

/// Summary of one propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Sources that were flooded.
    pub sources: usize,
    /// Sources dropped because their origin was not a cell of the grid.
    pub skipped: usize,
    /// Worklist pops over all sources.
    pub expansions: usize,
    pub convergence: Convergence,
}

impl TickReport {
    pub fn is_settled(&self) -> bool {
        self.convergence == Convergence::Settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Direction, GridCoord};
    use crate::loudness::LoudnessLevel;

    #[test]
    fn test_decay_per_unit_truncates() {
        let attenuation = Attenuation::default();
        assert_eq!(attenuation.penalty(1.0, 10.0), 6);
        assert_eq!(attenuation.penalty(std::f32::consts::SQRT_2, 10.0), 8);
        assert_eq!(attenuation.penalty(0.0, 10.0), 0);
    }

    #[test]
    fn test_range_fraction_saturates() {
        let attenuation = Attenuation::RangeFraction;
        assert_eq!(attenuation.penalty(1.0, 4.0), 40);
        assert_eq!(attenuation.penalty(8.0, 4.0), LOUDNESS_MAX as i32);
        assert_eq!(attenuation.penalty(1.0, 0.0), LOUDNESS_MAX as i32);
    }

    #[test]
    fn test_prepare_cells() {
        let info = GridInfo::flat((0, 0), (3, 3), (5.0, 5.0), (2.0, 2.0)).unwrap();
        let cells = prepare_cells::<LoudnessLevel>(&info, Connectivity::Four);
        assert_eq!(cells.len(), 9);

        let center = info.to_index_relative(GridCoord::flat(1, 1));
        let cell = &cells[center.slot().unwrap()];
        assert_eq!(cell.index, center);
        assert_eq!(cell.position, WorldPoint::flat(7.0, 7.0));
        assert_eq!(cell.neighbors.iter().count(), 4);
        assert!(cell.neighbors.get(Direction::NorthEast).is_none());
        assert!(cells.iter().all(|c| c.current_level.is_silent()));
    }
}
