//! Tile-grid audibility: how loud every cell of a map is, given a set of
//! sound sources and the materials between them.
//!
//! Layers, leaves first:
//! - [`loudness`] and [`grid`]: value type and cell addressing
//! - [`muffling`]: cached per-cell material dampening
//! - [`sources`]: per-tick source snapshots
//! - [`propagation`]: the flood fill
//! - [`engine`]: per-grid state, dirty tracking and the tick entry point
//! - [`query`] and [`render`]: read-only views of the result

pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod loudness;
pub mod muffling;
pub mod propagation;
pub mod query;
pub mod render;
pub mod sources;


// Re-export public API
pub use config::{AudibilityConfig, PropagationConfig, ViewerConfig};
pub use engine::AudibilityEngine;
pub use error::{AudibilityError, Result};
pub use grid::{CellIndex, Connectivity, Direction, GridCoord, GridId, GridInfo, GridSize, Neighbors, WorldPoint};
pub use loudness::{BandedLoudness, LOUDNESS_MAX, LOUDNESS_NONE, Loudness, LoudnessLevel};
pub use muffling::{DirtySender, MaterialLayer, MufflingCache, MufflingChange, MufflingProvider};
pub use propagation::{Attenuation, CellState, Convergence, FloodFill, TickReport};
pub use query::CellDebugInfo;
pub use render::{Normalization, save_ppm, write_ppm};
pub use sources::{AudibleSound, SoundEmitter, SourceRegistry, SourceSample};
