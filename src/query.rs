//! Read-only views of settled cell state for gameplay and debug tooling.

use crate::grid::{GridInfo, WorldPoint};
use crate::loudness::Loudness;
use crate::propagation::CellState;

/// What the debug overlay draws for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellDebugInfo {
    pub world_position: WorldPoint,
    /// Average loudness over `LOUDNESS_MAX`, in `[0, 1]`.
    pub normalized: f32,
}

pub fn debug_info<L: Loudness>(info: &GridInfo, cells: &[CellState<L>]) -> Vec<CellDebugInfo> {
    cells
        .iter()
        .map(|cell| CellDebugInfo {
            world_position: info.world_position(cell.index).unwrap_or(cell.position),
            normalized: cell.current_level.normalized(),
        })
        .collect()
}

pub fn normalized_levels<L: Loudness>(cells: &[CellState<L>]) -> Vec<f32> {
    cells.iter().map(|cell| cell.current_level.normalized()).collect()
}

/// Band-averaged loudness per cell, in whole decibels.
pub fn average_levels<L: Loudness>(cells: &[CellState<L>]) -> Vec<i32> {
    cells.iter().map(|cell| cell.current_level.average()).collect()
}

/// Loudest band-average of the grid, `0` for silence everywhere.
pub fn loudest<L: Loudness>(cells: &[CellState<L>]) -> i32 {
    cells
        .iter()
        .map(|cell| cell.current_level.average())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Connectivity;
    use crate::loudness::BandedLoudness;
    use crate::propagation::prepare_cells;

    #[test]
    fn test_banded_queries_average_bands() {
        let info = GridInfo::flat((0, 0), (2, 1), (1.0, 1.0), (2.0, 2.0))
            .unwrap()
            .with_cell_centered(true);
        let mut cells = prepare_cells::<BandedLoudness>(&info, Connectivity::Eight);
        cells[1].current_level = BandedLoudness::new(160, 80, 80, 0);

        assert_eq!(average_levels(&cells), vec![0, 80]);
        assert_eq!(normalized_levels(&cells), vec![0.0, 0.5]);
        assert_eq!(loudest(&cells), 80);

        let debug = debug_info(&info, &cells);
        assert_eq!(debug[1].world_position, WorldPoint::flat(4.0, 2.0));
        assert_eq!(debug[1].normalized, 0.5);
    }
}
