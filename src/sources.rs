//! Sound sources and the per-tick source registry.

use crate::grid::{CellIndex, GridInfo, WorldPoint};
use crate::loudness::Loudness;

/// Anything that makes noise the engine should hear.
pub trait SoundEmitter<L> {
    fn world_position(&self) -> WorldPoint;
    /// Loudness at the emitter's own cell.
    fn loudness(&self) -> L;
    /// Distance at which the sound is considered gone.
    fn range(&self) -> f32;
}

impl<L, T: SoundEmitter<L> + ?Sized> SoundEmitter<L> for &T {
    fn world_position(&self) -> WorldPoint {
        (**self).world_position()
    }

    fn loudness(&self) -> L {
        (**self).loudness()
    }

    fn range(&self) -> f32 {
        (**self).range()
    }
}

/// A point sound with position, loudness and range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudibleSound<L> {
    pub position: WorldPoint,
    pub loudness: L,
    pub range: f32,
}

impl<L: Loudness> AudibleSound<L> {
    pub fn new(position: WorldPoint, loudness: L, range: f32) -> Self {
        AudibleSound { position, loudness, range }
    }
}

impl<L: Loudness> SoundEmitter<L> for AudibleSound<L> {
    fn world_position(&self) -> WorldPoint {
        self.position
    }

    fn loudness(&self) -> L {
        self.loudness
    }

    fn range(&self) -> f32 {
        self.range
    }
}

/// Compute input for one source, captured fresh every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSample<L> {
    pub origin: CellIndex,
    pub loudness: L,
    pub range: f32,
}

impl<L: Loudness> SourceSample<L> {
    /// Negative or NaN ranges collapse to zero (only the origin cell hears the sound).
    pub fn new(origin: CellIndex, loudness: L, range: f32) -> Self {
        SourceSample { origin, loudness, range: range.max(0.0) }
    }
}

/// Snapshot of the live emitters for one tick. The allocation is reused across ticks.
#[derive(Debug, Clone)]
pub struct SourceRegistry<L> {
    samples: Vec<SourceSample<L>>,
    outside: usize,
}

impl<L: Loudness> Default for SourceRegistry<L> {
    fn default() -> Self {
        SourceRegistry { samples: Vec::new(), outside: 0 }
    }
}

impl<L: Loudness> SourceRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with the current state of `emitters`.
    ///
    /// Emitters whose position maps outside the grid are left out and
    /// counted in [`SourceRegistry::outside`].
    pub fn refresh<E: SoundEmitter<L>>(&mut self, info: &GridInfo, emitters: &[E]) -> &[SourceSample<L>] {
        self.samples.clear();
        self.outside = 0;

        for emitter in emitters {
            let origin = info.index_from_world(emitter.world_position());
            if origin.is_none() {
                self.outside += 1;
                continue;
            }
            self.samples
                .push(SourceSample::new(origin, emitter.loudness(), emitter.range()));
        }

        if self.outside > 0 {
            log::debug!("{} of {} emitters are outside the grid", self.outside, emitters.len());
        }
        &self.samples
    }

    pub fn samples(&self) -> &[SourceSample<L>] {
        &self.samples
    }

    /// Emitters dropped by the last refresh because they were off the grid.
    pub fn outside(&self) -> usize {
        self.outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridCoord;
    use crate::loudness::LoudnessLevel;

    #[test]
    fn test_refresh_maps_positions_to_cells() {
        let info = GridInfo::flat((0, 0), (5, 5), (10.0, 10.0), (2.0, 2.0)).unwrap();
        let sounds = [
            AudibleSound::new(WorldPoint::flat(14.0, 12.2), LoudnessLevel::new(100), 6.0),
            AudibleSound::new(WorldPoint::flat(-50.0, 0.0), LoudnessLevel::new(80), 6.0),
        ];

        let mut registry = SourceRegistry::new();
        let samples = registry.refresh(&info, &sounds);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].origin, info.to_index_relative(GridCoord::flat(2, 1)));
        assert_eq!(samples[0].loudness.decibels(), 100);
        assert_eq!(registry.outside(), 1);
    }

    #[test]
    fn test_refresh_replaces_previous_snapshot() {
        let info = GridInfo::flat((0, 0), (3, 3), (0.0, 0.0), (1.0, 1.0)).unwrap();
        let mut registry = SourceRegistry::new();
        let many = vec![AudibleSound::new(WorldPoint::flat(1.0, 1.0), LoudnessLevel::new(50), 2.0); 4];
        registry.refresh(&info, &many);
        assert_eq!(registry.samples().len(), 4);

        registry.refresh(&info, &many[..1]);
        assert_eq!(registry.samples().len(), 1);
    }

    #[test]
    fn test_invalid_range_collapses_to_zero() {
        let sample = SourceSample::new(CellIndex::new(0), LoudnessLevel::new(10), f32::NAN);
        assert_eq!(sample.range, 0.0);
        let sample = SourceSample::new(CellIndex::new(0), LoudnessLevel::new(10), -3.0);
        assert_eq!(sample.range, 0.0);
    }
}
