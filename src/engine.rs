//! The audibility engine: owns per-grid state and drives ticks.
//!
//! Typical host loop:
//! 1. `register_grid` once per tilemap
//! 2. forward material edits with `notify` (or a [`DirtySender`] from other threads)
//! 3. call `tick` every frame, then read results with the `query_*` methods

use std::collections::HashMap;
use std::sync::mpsc;

use crate::config::PropagationConfig;
use crate::error::{AudibilityError, Result};
use crate::grid::{CellIndex, GridCoord, GridId, GridInfo, WorldPoint};
use crate::loudness::{Loudness, LoudnessLevel};
use crate::muffling::{DirtySender, MufflingCache, MufflingChange, MufflingProvider};
use crate::propagation::{CellState, FloodFill, TickReport, prepare_cells};
use crate::query::{self, CellDebugInfo};
use crate::sources::{SoundEmitter, SourceRegistry, SourceSample};

/// Everything the engine keeps for one registered grid.
struct GridSlot<L> {
    info: GridInfo,
    cells: Vec<CellState<L>>,
    /// Output buffer of the flood fill, mirrored into `cells` after each pass.
    levels: Vec<L>,
    /// Muffling cache version last copied into `cells`.
    synced_version: Option<u64>,
    pending_cells: Vec<GridCoord>,
    registry: SourceRegistry<L>,
}

impl<L: Loudness> GridSlot<L> {
    fn new(info: GridInfo, config: &PropagationConfig) -> Self {
        GridSlot {
            info,
            cells: prepare_cells(&info, config.connectivity),
            levels: vec![L::SILENCE; info.cell_count()],
            synced_version: None,
            pending_cells: Vec::new(),
            registry: SourceRegistry::new(),
        }
    }
}

pub struct AudibilityEngine<L: Loudness = LoudnessLevel> {
    config: PropagationConfig,
    grids: HashMap<GridId, GridSlot<L>>,
    muffling: MufflingCache<L>,
    changes_tx: mpsc::Sender<MufflingChange>,
    changes_rx: mpsc::Receiver<MufflingChange>,
}

impl<L: Loudness> AudibilityEngine<L> {
    pub fn new(config: PropagationConfig) -> Self {
        let (changes_tx, changes_rx) = mpsc::channel();
        AudibilityEngine {
            config,
            grids: HashMap::new(),
            muffling: MufflingCache::new(),
            changes_tx,
            changes_rx,
        }
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Swap propagation settings. Grids are re-prepared when the neighbor
    /// layout or cell centering changes; muffling is re-synced on the next build.
    pub fn set_config(&mut self, config: PropagationConfig) {
        let relayout = config.connectivity != self.config.connectivity
            || config.cell_centered != self.config.cell_centered;
        self.config = config;
        if !relayout {
            return;
        }
        for slot in self.grids.values_mut() {
            let info = slot.info.with_cell_centered(self.config.cell_centered);
            slot.info = info;
            slot.cells = prepare_cells(&info, self.config.connectivity);
            slot.levels.fill(L::SILENCE);
            slot.synced_version = None;
        }
    }

    // ========================================================================
    // Grid lifecycle
    // ========================================================================

    /// Start tracking a grid. Re-registering an id replaces its state and
    /// drops its cached muffling.
    pub fn register_grid(&mut self, grid: GridId, info: GridInfo) {
        let info = info.with_cell_centered(self.config.cell_centered);
        self.muffling.forget(grid);
        self.grids.insert(grid, GridSlot::new(info, &self.config));
        log::debug!("registered {:?}: {} cells", grid, info.cell_count());
    }

    pub fn unregister_grid(&mut self, grid: GridId) -> bool {
        self.muffling.forget(grid);
        self.grids.remove(&grid).is_some()
    }

    pub fn grid_info(&self, grid: GridId) -> Option<&GridInfo> {
        self.grids.get(&grid).map(|slot| &slot.info)
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    /// Report a muffling change. Takes effect at the next `ensure_built`.
    pub fn notify(&mut self, change: MufflingChange) {
        match change {
            MufflingChange::Grid(grid) => self.muffling.mark_dirty(grid),
            MufflingChange::All => self.muffling.mark_all_dirty(),
            MufflingChange::Cell(grid, coord) => match self.grids.get_mut(&grid) {
                Some(slot) => {
                    if !slot.pending_cells.contains(&coord) {
                        slot.pending_cells.push(coord);
                    }
                }
                None => log::debug!("ignoring cell change for unknown {:?}", grid),
            },
        }
    }

    /// Handle for reporting changes from other threads.
    pub fn dirty_sender(&self) -> DirtySender {
        DirtySender::new(self.changes_tx.clone())
    }

    fn drain_changes(&mut self) {
        while let Ok(change) = self.changes_rx.try_recv() {
            self.notify(change);
        }
    }

    /// Whether `grid` will rebuild its muffling on the next `ensure_built`.
    pub fn is_dirty(&self, grid: GridId) -> bool {
        self.muffling.is_dirty(grid)
    }

    /// Bring the muffling of `grid` up to date, rebuilding from `provider`
    /// when the grid is dirty and patching queued single-cell edits otherwise.
    pub fn ensure_built(&mut self, grid: GridId, provider: &impl MufflingProvider<L>) -> Result<()> {
        self.drain_changes();
        let slot = self
            .grids
            .get_mut(&grid)
            .ok_or(AudibilityError::UnknownGrid(grid))?;

        if self.muffling.is_dirty(grid) {
            self.muffling.rebuild(grid, &slot.info, provider);
            slot.pending_cells.clear();
        } else {
            for coord in slot.pending_cells.drain(..) {
                self.muffling.rebuild_one(grid, &slot.info, provider, coord);
            }
        }

        let version = self.muffling.version(grid);
        if version != slot.synced_version {
            let strengths = self.muffling.strengths(grid)?;
            if strengths.len() != slot.cells.len() {
                return Err(AudibilityError::ShapeMismatch {
                    what: "muffling strengths",
                    expected: slot.cells.len(),
                    actual: strengths.len(),
                });
            }
            for (cell, &strength) in slot.cells.iter_mut().zip(strengths) {
                cell.muffling = strength;
            }
            slot.synced_version = version;
        }
        Ok(())
    }

    // ========================================================================
    // Propagation
    // ========================================================================

    /// Full update: build if needed, snapshot `emitters`, flood every source.
    pub fn tick<E: SoundEmitter<L>>(
        &mut self,
        grid: GridId,
        emitters: &[E],
        provider: &impl MufflingProvider<L>,
    ) -> Result<TickReport> {
        self.ensure_built(grid, provider)?;
        let fill = self.config.flood_fill();
        let slot = self
            .grids
            .get_mut(&grid)
            .ok_or(AudibilityError::UnknownGrid(grid))?;

        slot.registry.refresh(&slot.info, emitters);
        let samples = slot.registry.samples();
        let mut report = run_pass(&fill, &slot.info, &mut slot.cells, &mut slot.levels, samples);
        report.skipped += slot.registry.outside();
        Ok(report)
    }

    /// Flood caller-built samples. The grid must have been built with
    /// `ensure_built` and not dirtied since, including single-cell edits.
    pub fn propagate(&mut self, grid: GridId, samples: &[SourceSample<L>]) -> Result<TickReport> {
        self.drain_changes();
        let fill = self.config.flood_fill();
        let slot = self
            .grids
            .get_mut(&grid)
            .ok_or(AudibilityError::UnknownGrid(grid))?;
        if slot.synced_version.is_none()
            || self.muffling.is_dirty(grid)
            || !slot.pending_cells.is_empty()
        {
            return Err(AudibilityError::NotBuilt(grid));
        }
        Ok(run_pass(&fill, &slot.info, &mut slot.cells, &mut slot.levels, samples))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Cell states after the last pass.
    pub fn settled(&self, grid: GridId) -> Result<&[CellState<L>]> {
        self.grids
            .get(&grid)
            .map(|slot| slot.cells.as_slice())
            .ok_or(AudibilityError::UnknownGrid(grid))
    }

    /// Loudness of one cell; silence for unknown grids or invalid indices.
    pub fn query_cell(&self, grid: GridId, index: CellIndex) -> L {
        self.grids
            .get(&grid)
            .and_then(|slot| index.slot().and_then(|i| slot.cells.get(i)))
            .map_or(L::SILENCE, |cell| cell.current_level)
    }

    pub fn query_absolute(&self, grid: GridId, coord: GridCoord) -> L {
        let index = self
            .grid_info(grid)
            .map_or(CellIndex::NONE, |info| info.to_index_absolute(coord));
        self.query_cell(grid, index)
    }

    pub fn query_world(&self, grid: GridId, point: WorldPoint) -> L {
        let index = self
            .grid_info(grid)
            .map_or(CellIndex::NONE, |info| info.index_from_world(point));
        self.query_cell(grid, index)
    }

    /// Cached muffling strength of one cell.
    pub fn muffling_at(&self, grid: GridId, index: CellIndex) -> Result<L> {
        self.muffling.get(grid, index)
    }

    pub fn debug_info(&self, grid: GridId) -> Result<Vec<CellDebugInfo>> {
        let slot = self
            .grids
            .get(&grid)
            .ok_or(AudibilityError::UnknownGrid(grid))?;
        Ok(query::debug_info(&slot.info, &slot.cells))
    }

    pub fn average_levels(&self, grid: GridId) -> Result<Vec<i32>> {
        Ok(query::average_levels(self.settled(grid)?))
    }

    pub fn normalized_levels(&self, grid: GridId) -> Result<Vec<f32>> {
        Ok(query::normalized_levels(self.settled(grid)?))
    }

    /// Settled levels as raw bytes, in cell-index order.
    pub fn level_bytes(&self, grid: GridId) -> Result<&[u8]> {
        self.grids
            .get(&grid)
            .map(|slot| bytemuck::cast_slice(slot.levels.as_slice()))
            .ok_or(AudibilityError::UnknownGrid(grid))
    }
}

fn run_pass<L: Loudness>(
    fill: &FloodFill,
    info: &GridInfo,
    cells: &mut [CellState<L>],
    levels: &mut [L],
    samples: &[SourceSample<L>],
) -> TickReport {
    levels.fill(L::SILENCE);
    let report = fill.run(info, cells, samples, levels);
    for (cell, &level) in cells.iter_mut().zip(levels.iter()) {
        cell.current_level = level;
    }
    log::debug!(
        "propagated {} sources ({} skipped) in {} expansions",
        report.sources,
        report.skipped,
        report.expansions
    );
    report
}
