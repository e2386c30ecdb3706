//! Muffling cache: per-cell dampening strength derived from map content.
//!
//! Strengths are pulled from a [`MufflingProvider`] only when a grid is
//! rebuilt. Dirtiness is tracked per grid and an unseen grid counts as dirty,
//! so the first access always triggers a full build. Single-cell edits are
//! patched in place with [`MufflingCache::rebuild_one`].

use std::collections::HashMap;
use std::sync::mpsc;

use crate::error::{AudibilityError, Result};
use crate::grid::{CellIndex, GridCoord, GridId, GridInfo};
use crate::loudness::Loudness;

/// Source of material data for a grid.
pub trait MufflingProvider<L> {
    /// Strength of the material at an absolute cell coordinate, `None` when
    /// the cell has no material (treated as zero dampening).
    fn muffling_at(&self, coord: GridCoord) -> Option<L>;
}

impl<L, F> MufflingProvider<L> for F
where
    F: Fn(GridCoord) -> Option<L>,
{
    fn muffling_at(&self, coord: GridCoord) -> Option<L> {
        self(coord)
    }
}

/// A notification that muffling content changed and must be rebuilt before next use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MufflingChange {
    /// Material data of a whole grid changed.
    Grid(GridId),
    /// One cell (absolute coordinate) got a different material.
    Cell(GridId, GridCoord),
    /// A shared material definition changed; every grid may be affected.
    All,
}

/// Cloneable, fire-and-forget handle for reporting [`MufflingChange`]s from other threads.
#[derive(Debug, Clone)]
pub struct DirtySender(mpsc::Sender<MufflingChange>);

impl DirtySender {
    pub(crate) fn new(tx: mpsc::Sender<MufflingChange>) -> Self {
        DirtySender(tx)
    }

    /// Queue a change. Dropped silently if the engine no longer exists.
    pub fn notify(&self, change: MufflingChange) {
        let _ = self.0.send(change);
    }
}

// ============================================================================
// Material layer
// ============================================================================

/// In-memory material map covering one grid, usable directly as a [`MufflingProvider`].
#[derive(Debug, Clone)]
pub struct MaterialLayer<L> {
    info: GridInfo,
    cells: Vec<Option<L>>,
}

impl<L: Loudness> MaterialLayer<L> {
    pub fn new(info: GridInfo) -> Self {
        MaterialLayer { info, cells: vec![None; info.cell_count()] }
    }

    /// Place a material at an absolute coordinate. Returns `false` outside the grid.
    pub fn set(&mut self, coord: GridCoord, material: Option<L>) -> bool {
        match self.info.to_index_absolute(coord).slot() {
            Some(slot) => {
                self.cells[slot] = material;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, coord: GridCoord) -> Option<L> {
        self.info
            .to_index_absolute(coord)
            .slot()
            .and_then(|slot| self.cells[slot])
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    pub fn info(&self) -> &GridInfo {
        &self.info
    }
}

impl<L: Loudness> MufflingProvider<L> for MaterialLayer<L> {
    fn muffling_at(&self, coord: GridCoord) -> Option<L> {
        self.get(coord)
    }
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Debug)]
struct CachedStrengths<L> {
    strengths: Vec<L>,
    dirty: bool,
    version: u64,
}

/// Cached muffling strengths for every grid an engine knows about.
#[derive(Debug)]
pub struct MufflingCache<L> {
    grids: HashMap<GridId, CachedStrengths<L>>,
}

impl<L: Loudness> Default for MufflingCache<L> {
    fn default() -> Self {
        MufflingCache { grids: HashMap::new() }
    }
}

impl<L: Loudness> MufflingCache<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `grid` needs a full rebuild. Grids never seen are dirty.
    pub fn is_dirty(&self, grid: GridId) -> bool {
        self.grids.get(&grid).is_none_or(|cached| cached.dirty)
    }

    pub fn mark_dirty(&mut self, grid: GridId) {
        if let Some(cached) = self.grids.get_mut(&grid) {
            cached.dirty = true;
        }
    }

    pub fn mark_all_dirty(&mut self) {
        self.grids.values_mut().for_each(|cached| cached.dirty = true);
    }

    /// Drop everything cached for `grid`.
    pub fn forget(&mut self, grid: GridId) {
        self.grids.remove(&grid);
    }

    /// Bumped on every rebuild or patch that changed a value.
    pub fn version(&self, grid: GridId) -> Option<u64> {
        self.grids.get(&grid).map(|cached| cached.version)
    }

    /// Recompute every cell of `grid` and clear its dirty flag.
    pub fn rebuild(&mut self, grid: GridId, info: &GridInfo, provider: &impl MufflingProvider<L>) {
        let size = info.size();
        let mut strengths = vec![L::SILENCE; info.cell_count()];
        for x in 0..size.x as i32 {
            for y in 0..size.y as i32 {
                for z in 0..size.z as i32 {
                    let relative = GridCoord::new(x, y, z);
                    let Some(slot) = info.to_index_relative(relative).slot() else {
                        continue;
                    };
                    let absolute = GridCoord::new(
                        x + info.origin().x,
                        y + info.origin().y,
                        z + info.origin().z,
                    );
                    strengths[slot] = provider.muffling_at(absolute).unwrap_or(L::SILENCE);
                }
            }
        }

        let version = self.version(grid).map_or(0, |v| v + 1);
        log::trace!("rebuilt muffling cache for {:?}: {} cells, version {}", grid, strengths.len(), version);
        self.grids.insert(grid, CachedStrengths { strengths, dirty: false, version });
    }

    /// Refresh one cell (absolute coordinate) without touching the others.
    ///
    /// A grid that was never built gets a full rebuild instead. Returns
    /// whether the cached strength changed; coordinates outside the grid are
    /// ignored.
    pub fn rebuild_one(
        &mut self,
        grid: GridId,
        info: &GridInfo,
        provider: &impl MufflingProvider<L>,
        coord: GridCoord,
    ) -> bool {
        let Some(cached) = self.grids.get_mut(&grid) else {
            self.rebuild(grid, info, provider);
            return true;
        };
        let Some(slot) = info.to_index_absolute(coord).slot() else {
            return false;
        };
        let Some(current) = cached.strengths.get_mut(slot) else {
            return false;
        };

        let strength = provider.muffling_at(coord).unwrap_or(L::SILENCE);
        if *current == strength {
            return false;
        }
        *current = strength;
        cached.version += 1;
        true
    }

    /// Cached strength of one cell.
    pub fn get(&self, grid: GridId, index: CellIndex) -> Result<L> {
        let strengths = self.strengths(grid)?;
        index
            .slot()
            .and_then(|slot| strengths.get(slot).copied())
            .ok_or(AudibilityError::ShapeMismatch {
                what: "muffling lookup",
                expected: strengths.len(),
                actual: index.value().max(0) as usize + 1,
            })
    }

    /// All cached strengths of `grid`, in cell-index order.
    pub fn strengths(&self, grid: GridId) -> Result<&[L]> {
        self.grids
            .get(&grid)
            .map(|cached| cached.strengths.as_slice())
            .ok_or(AudibilityError::NotBuilt(grid))
    }
}
