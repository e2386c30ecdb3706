//! Error types for the audibility engine.
//!
//! Out-of-bounds coordinates are not errors (they resolve to
//! [`CellIndex::NONE`](crate::grid::CellIndex::NONE)); these variants cover
//! invalid construction and calls the engine cannot honour.

use thiserror::Error;

use crate::grid::GridId;

#[derive(Error, Debug)]
pub enum AudibilityError {
    /// Grid constants that cannot describe a real grid
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// Array length disagrees with the grid it belongs to
    #[error("Shape mismatch for {what}: expected {expected} cells, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Grid was never registered with the engine
    #[error("Unknown grid {0:?}")]
    UnknownGrid(GridId),

    /// Muffling data read before the grid was built
    #[error("Muffling cache for grid {0:?} has not been built")]
    NotBuilt(GridId),

    /// Configuration values out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AudibilityError>;
