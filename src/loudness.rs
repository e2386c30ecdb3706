//! Loudness values: decibel-like magnitudes that can only get quieter.
//!
//! Two representations implement the [`Loudness`] trait:
//! - [`LoudnessLevel`] stores a single scalar
//! - [`BandedLoudness`] stores four independent frequency bands
//!
//! Muffling strengths reuse the same types: a strength is the amount a
//! material removes from any sound that enters it.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Silence. Nothing is ever quieter than this.
pub const LOUDNESS_NONE: i16 = 0;

/// Loudest representable level.
pub const LOUDNESS_MAX: i16 = 160;

#[inline]
fn clamp_decibels(decibels: i32) -> i16 {
    decibels.clamp(LOUDNESS_NONE as i32, LOUDNESS_MAX as i32) as i16
}

/// Operations the propagation engine needs from a loudness representation.
///
/// `max` is the merge operator of the flood fill, so it must be commutative,
/// associative and idempotent. `muffle_by` must never raise a value.
/// Implementors are plain old data so settled grids can be dumped as bytes.
pub trait Loudness: Pod + Eq + std::fmt::Debug + Send + Sync {
    /// Value of a cell no sound reaches.
    const SILENCE: Self;

    /// Build a value with every band set to `decibels` (clamped to the valid range).
    fn uniform(decibels: i32) -> Self;

    /// Subtract `strength` band by band, flooring at silence.
    fn muffle_by(self, strength: Self) -> Self;

    /// Subtract the same amount from every band, flooring at silence.
    /// Negative amounts are ignored.
    fn muffle_uniform(self, decibels: i32) -> Self;

    /// Band-wise maximum.
    fn max(self, other: Self) -> Self;

    /// Mean over all bands (integer division, as the game logic expects whole decibels).
    fn average(self) -> i32;

    /// Loudest band.
    fn peak(self) -> i32;

    #[inline]
    fn is_silent(self) -> bool {
        self == Self::SILENCE
    }

    /// Average loudness mapped to `[0, 1]` by [`LOUDNESS_MAX`].
    #[inline]
    fn normalized(self) -> f32 {
        self.average() as f32 / LOUDNESS_MAX as f32
    }
}

// ============================================================================
// Scalar level
// ============================================================================

/// Single-value loudness in decibels, always within `[LOUDNESS_NONE, LOUDNESS_MAX]`.
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[serde(from = "i32", into = "i32")]
pub struct LoudnessLevel(i16);

impl LoudnessLevel {
    pub const fn silence() -> Self {
        LoudnessLevel(LOUDNESS_NONE)
    }

    pub fn new(decibels: i32) -> Self {
        LoudnessLevel(clamp_decibels(decibels))
    }

    #[inline]
    pub fn decibels(self) -> i16 {
        self.0
    }
}

impl From<i32> for LoudnessLevel {
    fn from(decibels: i32) -> Self {
        LoudnessLevel::new(decibels)
    }
}

impl From<LoudnessLevel> for i32 {
    fn from(level: LoudnessLevel) -> Self {
        level.0 as i32
    }
}

impl Loudness for LoudnessLevel {
    const SILENCE: Self = LoudnessLevel(LOUDNESS_NONE);

    #[inline]
    fn uniform(decibels: i32) -> Self {
        LoudnessLevel::new(decibels)
    }

    #[inline]
    fn muffle_by(self, strength: Self) -> Self {
        LoudnessLevel((self.0 - strength.0.min(self.0)).max(LOUDNESS_NONE))
    }

    #[inline]
    fn muffle_uniform(self, decibels: i32) -> Self {
        self.muffle_by(LoudnessLevel::new(decibels))
    }

    #[inline]
    fn max(self, other: Self) -> Self {
        LoudnessLevel(self.0.max(other.0))
    }

    #[inline]
    fn average(self) -> i32 {
        self.0 as i32
    }

    #[inline]
    fn peak(self) -> i32 {
        self.0 as i32
    }
}

// ============================================================================
// Banded level
// ============================================================================

/// Loudness split into four frequency bands: about 20Hz, 200Hz, 2kHz and 20kHz.
///
/// Materials can muffle bands differently (a thick wall eats highs and keeps
/// lows), so propagation treats every band independently.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BandedLoudness {
    bands: [i16; 4],
}

impl BandedLoudness {
    pub const LOW: usize = 0;
    pub const MID_LOW: usize = 1;
    pub const MID_HIGH: usize = 2;
    pub const HIGH: usize = 3;

    pub fn new(low: i32, mid_low: i32, mid_high: i32, high: i32) -> Self {
        BandedLoudness {
            bands: [
                clamp_decibels(low),
                clamp_decibels(mid_low),
                clamp_decibels(mid_high),
                clamp_decibels(high),
            ],
        }
    }

    #[inline]
    pub fn bands(self) -> [i16; 4] {
        self.bands
    }

    #[inline]
    pub fn band(self, band: usize) -> i16 {
        self.bands[band]
    }

    #[inline]
    fn zip_with(self, other: Self, f: impl Fn(i16, i16) -> i16) -> Self {
        let mut bands = self.bands;
        for (band, rhs) in bands.iter_mut().zip(other.bands) {
            *band = f(*band, rhs);
        }
        BandedLoudness { bands }
    }
}

impl From<[i32; 4]> for BandedLoudness {
    fn from(b: [i32; 4]) -> Self {
        BandedLoudness::new(b[0], b[1], b[2], b[3])
    }
}

impl From<BandedLoudness> for [i32; 4] {
    fn from(level: BandedLoudness) -> Self {
        level.bands.map(i32::from)
    }
}

impl From<LoudnessLevel> for BandedLoudness {
    fn from(level: LoudnessLevel) -> Self {
        BandedLoudness { bands: [level.decibels(); 4] }
    }
}

impl Loudness for BandedLoudness {
    const SILENCE: Self = BandedLoudness { bands: [LOUDNESS_NONE; 4] };

    #[inline]
    fn uniform(decibels: i32) -> Self {
        BandedLoudness { bands: [clamp_decibels(decibels); 4] }
    }

    #[inline]
    fn muffle_by(self, strength: Self) -> Self {
        self.zip_with(strength, |level, s| (level - s.min(level)).max(LOUDNESS_NONE))
    }

    #[inline]
    fn muffle_uniform(self, decibels: i32) -> Self {
        self.muffle_by(BandedLoudness::uniform(decibels))
    }

    #[inline]
    fn max(self, other: Self) -> Self {
        self.zip_with(other, i16::max)
    }

    #[inline]
    fn average(self) -> i32 {
        self.bands.iter().map(|&b| b as i32).sum::<i32>() / 4
    }

    #[inline]
    fn peak(self) -> i32 {
        self.bands.iter().copied().max().unwrap_or(LOUDNESS_NONE) as i32
    }
}
