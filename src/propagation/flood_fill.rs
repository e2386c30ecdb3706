//! Breadth-first flood fill, one pass per source.
//!
//! Every source floods a private zeroed buffer, so sources never observe
//! each other's values. Buffers are merged into the output by cell-wise
//! maximum; the merge is order independent, which makes the parallel and
//! sequential paths produce identical results.
//!
//! Key points:
//! - FIFO worklist, a cell is queued at most once at a time
//! - a cell is re-queued whenever a louder path reaches it
//! - only touched cells are reset between sources

use std::collections::VecDeque;

use rayon::prelude::*;

use super::{Attenuation, CellState, Convergence, TickReport};
use crate::grid::GridInfo;
use crate::loudness::{LOUDNESS_MAX, Loudness};
use crate::sources::SourceSample;

/// Flood fill parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodFill {
    pub attenuation: Attenuation,
    /// Worklist pops allowed per source; `None` uses [`FloodFill::default_cap`].
    pub max_expansions: Option<usize>,
    pub parallel: bool,
}

impl Default for FloodFill {
    fn default() -> Self {
        FloodFill { attenuation: Attenuation::default(), max_expansions: None, parallel: true }
    }
}

impl FloodFill {
    pub fn new(attenuation: Attenuation) -> Self {
        FloodFill { attenuation, ..Self::default() }
    }

    /// Upper bound on expansions of a correct run: every band of every cell
    /// can rise at most `LOUDNESS_MAX` times.
    pub fn default_cap(cell_count: usize) -> usize {
        cell_count.saturating_mul(LOUDNESS_MAX as usize * 4 + 1)
    }

    /// Flood every sample and merge the results, by maximum, into `levels`.
    ///
    /// `levels` must already be cleared to silence by the caller.
    pub fn run<L: Loudness>(
        &self,
        info: &GridInfo,
        cells: &[CellState<L>],
        samples: &[SourceSample<L>],
        levels: &mut [L],
    ) -> TickReport {
        let cap = self
            .max_expansions
            .unwrap_or_else(|| Self::default_cap(cells.len()));

        let total = if self.parallel {
            samples
                .par_iter()
                .fold(
                    || Accumulator::new(cells.len()),
                    |mut acc, sample| {
                        acc.flood(self.attenuation, cap, info, cells, sample);
                        acc
                    },
                )
                .reduce(Accumulator::empty, Accumulator::merge)
        } else {
            samples
                .iter()
                .fold(Accumulator::new(cells.len()), |mut acc, sample| {
                    acc.flood(self.attenuation, cap, info, cells, sample);
                    acc
                })
        };

        for (level, merged) in levels.iter_mut().zip(&total.levels) {
            *level = level.max(*merged);
        }

        let convergence = if total.capped == 0 {
            Convergence::Settled
        } else {
            log::warn!(
                "{} of {} sources hit the expansion cap of {}",
                total.capped,
                samples.len(),
                cap
            );
            Convergence::Capped { sources: total.capped }
        };

        TickReport {
            sources: samples.len() - total.skipped,
            skipped: total.skipped,
            expansions: total.expansions,
            convergence,
        }
    }
}

// ============================================================================
// Per-worker state
// ============================================================================

/// Worklist and private buffer for a single source.
struct Scratch<L> {
    levels: Vec<L>,
    queued: Vec<bool>,
    queue: VecDeque<usize>,
    touched: Vec<usize>,
}

impl<L: Loudness> Scratch<L> {
    fn new(cell_count: usize) -> Self {
        Scratch {
            levels: vec![L::SILENCE; cell_count],
            queued: vec![false; cell_count],
            queue: VecDeque::new(),
            touched: Vec::new(),
        }
    }

    #[inline]
    fn raise(&mut self, slot: usize, level: L) {
        let existing = self.levels[slot];
        let merged = existing.max(level);
        if merged == existing {
            return;
        }
        if existing.is_silent() {
            self.touched.push(slot);
        }
        self.levels[slot] = merged;
        if !self.queued[slot] {
            self.queued[slot] = true;
            self.queue.push_back(slot);
        }
    }

    fn reset(&mut self) {
        for slot in self.queue.drain(..) {
            self.queued[slot] = false;
        }
        for &slot in &self.touched {
            self.levels[slot] = L::SILENCE;
        }
        self.touched.clear();
    }
}

/// Merged output of the sources one worker processed.
struct Accumulator<L> {
    levels: Vec<L>,
    scratch: Option<Scratch<L>>,
    expansions: usize,
    capped: usize,
    skipped: usize,
}

impl<L: Loudness> Accumulator<L> {
    fn new(cell_count: usize) -> Self {
        Accumulator {
            levels: vec![L::SILENCE; cell_count],
            scratch: Some(Scratch::new(cell_count)),
            expansions: 0,
            capped: 0,
            skipped: 0,
        }
    }

    /// Identity of [`Accumulator::merge`].
    fn empty() -> Self {
        Accumulator { levels: Vec::new(), scratch: None, expansions: 0, capped: 0, skipped: 0 }
    }

    fn merge(mut self, other: Self) -> Self {
        if self.levels.is_empty() {
            self.levels = other.levels;
        } else {
            for (level, rhs) in self.levels.iter_mut().zip(other.levels) {
                *level = level.max(rhs);
            }
        }
        self.expansions += other.expansions;
        self.capped += other.capped;
        self.skipped += other.skipped;
        self
    }

    fn flood(
        &mut self,
        attenuation: Attenuation,
        cap: usize,
        info: &GridInfo,
        cells: &[CellState<L>],
        sample: &SourceSample<L>,
    ) {
        let Some(seed) = sample.origin.slot().filter(|&slot| slot < cells.len()) else {
            self.skipped += 1;
            return;
        };
        let scratch = self.scratch.get_or_insert_with(|| Scratch::new(cells.len()));
        let origin = cells[seed].position;

        // The seed keeps the full source loudness
        scratch.raise(seed, sample.loudness);

        let mut expansions = 0;
        let mut capped = false;
        while let Some(current) = scratch.queue.pop_front() {
            scratch.queued[current] = false;
            if expansions == cap {
                capped = true;
                break;
            }
            expansions += 1;

            let level = scratch.levels[current];
            if level.is_silent() {
                continue;
            }

            for (direction, neighbor) in cells[current].neighbors.iter() {
                let Some(slot) = neighbor.slot() else {
                    continue;
                };
                let target = &cells[slot];
                if origin.distance(target.position) > sample.range {
                    continue;
                }
                let penalty = attenuation.penalty(info.step_distance(direction), sample.range);
                let candidate = level.muffle_uniform(penalty).muffle_by(target.muffling);
                scratch.raise(slot, candidate);
            }
        }

        for &slot in &scratch.touched {
            self.levels[slot] = self.levels[slot].max(scratch.levels[slot]);
        }
        scratch.reset();

        self.expansions += expansions;
        if capped {
            self.capped += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellIndex, Connectivity, GridCoord};
    use crate::loudness::LoudnessLevel;
    use crate::propagation::prepare_cells;

    fn setup(connectivity: Connectivity) -> (GridInfo, Vec<CellState<LoudnessLevel>>) {
        let info = GridInfo::flat((0, 0), (5, 5), (0.0, 0.0), (1.0, 1.0)).unwrap();
        let cells = prepare_cells(&info, connectivity);
        (info, cells)
    }

    fn level_at(info: &GridInfo, levels: &[LoudnessLevel], x: i32, y: i32) -> i16 {
        levels[info.to_index_relative(GridCoord::flat(x, y)).slot().unwrap()].decibels()
    }

    #[test]
    fn test_single_hop_values() {
        let (info, cells) = setup(Connectivity::Eight);
        let source = SourceSample::new(
            info.to_index_relative(GridCoord::flat(2, 2)),
            LoudnessLevel::new(100),
            3.0,
        );
        let mut levels = vec![LoudnessLevel::SILENCE; cells.len()];
        let report = FloodFill::default().run(&info, &cells, &[source], &mut levels);

        assert!(report.is_settled());
        assert_eq!(report.sources, 1);
        assert_eq!(level_at(&info, &levels, 2, 2), 100);
        assert_eq!(level_at(&info, &levels, 2, 3), 94);
        assert_eq!(level_at(&info, &levels, 1, 1), 92);
    }

    #[test]
    fn test_four_connectivity_walks_around_corners() {
        let (info, cells) = setup(Connectivity::Four);
        let source = SourceSample::new(
            info.to_index_relative(GridCoord::flat(2, 2)),
            LoudnessLevel::new(100),
            10.0,
        );
        let mut levels = vec![LoudnessLevel::SILENCE; cells.len()];
        FloodFill::new(Attenuation::default()).run(&info, &cells, &[source], &mut levels);

        // Two orthogonal hops instead of one diagonal
        assert_eq!(level_at(&info, &levels, 3, 3), 88);
    }

    #[test]
    fn test_invalid_origin_is_skipped() {
        let (info, cells) = setup(Connectivity::Eight);
        let samples = [
            SourceSample::new(CellIndex::NONE, LoudnessLevel::new(100), 3.0),
            SourceSample::new(CellIndex::new(999), LoudnessLevel::new(100), 3.0),
        ];
        let mut levels = vec![LoudnessLevel::SILENCE; cells.len()];
        let report = FloodFill::default().run(&info, &cells, &samples, &mut levels);

        assert_eq!(report.sources, 0);
        assert_eq!(report.skipped, 2);
        assert!(levels.iter().all(|l| l.is_silent()));
    }

    #[test]
    fn test_cap_is_reported() {
        let (info, cells) = setup(Connectivity::Eight);
        let source = SourceSample::new(
            info.to_index_relative(GridCoord::flat(0, 0)),
            LoudnessLevel::new(160),
            100.0,
        );
        let mut levels = vec![LoudnessLevel::SILENCE; cells.len()];
        let fill = FloodFill { max_expansions: Some(3), ..FloodFill::default() };
        let report = fill.run(&info, &cells, &[source], &mut levels);

        assert_eq!(report.convergence, Convergence::Capped { sources: 1 });
        assert_eq!(report.expansions, 3);
        // Partial output is still a valid lower bound
        assert_eq!(level_at(&info, &levels, 0, 0), 160);
    }

    #[test]
    fn test_scratch_is_clean_between_sources() {
        let (info, cells) = setup(Connectivity::Eight);
        let loud = SourceSample::new(
            info.to_index_relative(GridCoord::flat(0, 0)),
            LoudnessLevel::new(150),
            1.0,
        );
        let quiet = SourceSample::new(
            info.to_index_relative(GridCoord::flat(4, 4)),
            LoudnessLevel::new(30),
            1.0,
        );
        let mut levels = vec![LoudnessLevel::SILENCE; cells.len()];
        let fill = FloodFill { parallel: false, ..FloodFill::default() };
        fill.run(&info, &cells, &[loud, quiet], &mut levels);

        assert_eq!(level_at(&info, &levels, 4, 4), 30);
        assert_eq!(level_at(&info, &levels, 4, 3), 24);
        assert_eq!(level_at(&info, &levels, 2, 2), 0);
    }
}
