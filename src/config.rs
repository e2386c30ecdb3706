//! Runtime configuration, loaded from TOML.
//!
//! ```toml
//! [propagation]
//! connectivity = "eight"
//! parallel = true
//!
//! [propagation.attenuation]
//! mode = "decay_per_unit"
//! decibels_per_unit = 6.0
//!
//! [viewer]
//! grid_width = 64
//! ```
//!
//! Every field has a default, so a partial file (or none at all) is valid.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AudibilityError, Result};
use crate::grid::Connectivity;
use crate::loudness::LOUDNESS_MAX;
use crate::propagation::{Attenuation, FloodFill};
use crate::render::Normalization;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PropagationConfig {
    pub connectivity: Connectivity,
    pub attenuation: Attenuation,
    /// Worklist pops allowed per source before the run is reported as capped.
    /// Unset means a bound no converging run can reach.
    pub max_expansions_per_source: Option<usize>,
    /// Flood sources on the rayon pool instead of one after another.
    pub parallel: bool,
    /// Report world positions at cell centers.
    pub cell_centered: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Eight,
            attenuation: Attenuation::default(),
            max_expansions_per_source: None,
            parallel: true,
            cell_centered: false,
        }
    }
}

impl PropagationConfig {
    pub fn flood_fill(&self) -> FloodFill {
        FloodFill {
            attenuation: self.attenuation,
            max_expansions: self.max_expansions_per_source,
            parallel: self.parallel,
        }
    }
}

/// Settings for the demo binary's render and interactive modes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub grid_width: usize,
    pub grid_height: usize,
    /// Pixels per cell edge.
    pub scale: usize,
    /// Muffling strength of a wall cell.
    pub wall_muffling: i32,
    pub source_loudness: i32,
    /// Source range in cells.
    pub source_range: f32,
    pub normalization: Normalization,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            grid_width: 64,
            grid_height: 64,
            scale: 10,
            wall_muffling: 40,
            source_loudness: 120,
            source_range: 24.0,
            normalization: Normalization::Absolute,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AudibilityConfig {
    pub propagation: PropagationConfig,
    pub viewer: ViewerConfig,
}

fn invalid(message: impl Into<String>) -> AudibilityError {
    AudibilityError::InvalidConfig(message.into())
}

impl AudibilityConfig {
    pub fn validate(&self) -> Result<()> {
        match self.propagation.attenuation {
            Attenuation::DecayPerUnit { decibels_per_unit } => {
                if !decibels_per_unit.is_finite() || decibels_per_unit < 0.0 {
                    return Err(invalid("decibels_per_unit must be a non-negative number"));
                }
            }
            Attenuation::RangeFraction => {}
        }
        if self.propagation.max_expansions_per_source == Some(0) {
            return Err(invalid("max_expansions_per_source must be positive"));
        }

        let viewer = &self.viewer;
        if viewer.grid_width == 0 || viewer.grid_height == 0 {
            return Err(invalid("viewer grid must have at least one cell"));
        }
        if viewer.grid_width > 4096 || viewer.grid_height > 4096 {
            return Err(invalid("viewer grid too large (max 4096 per axis)"));
        }
        if viewer.scale == 0 {
            return Err(invalid("viewer scale must be positive"));
        }
        let max = LOUDNESS_MAX as i32;
        if !(0..=max).contains(&viewer.wall_muffling) || !(0..=max).contains(&viewer.source_loudness) {
            return Err(invalid(format!("viewer loudness values must lie in 0..={}", max)));
        }
        if !viewer.source_range.is_finite() || viewer.source_range < 0.0 {
            return Err(invalid("viewer source_range must be non-negative"));
        }
        Ok(())
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&content)?;
        log::info!("loaded config from {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AudibilityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.propagation.attenuation,
            Attenuation::DecayPerUnit { decibels_per_unit: 6.0 }
        );
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = AudibilityConfig::from_toml("").unwrap();
        assert_eq!(config, AudibilityConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = AudibilityConfig::from_toml(
            r#"
            [propagation]
            connectivity = "four"
            parallel = false
            max_expansions_per_source = 5000

            [propagation.attenuation]
            mode = "range_fraction"

            [viewer]
            normalization = "relative"
            "#,
        )
        .unwrap();

        assert_eq!(config.propagation.connectivity, Connectivity::Four);
        assert_eq!(config.propagation.attenuation, Attenuation::RangeFraction);
        assert_eq!(config.propagation.max_expansions_per_source, Some(5000));
        assert!(!config.propagation.flood_fill().parallel);
        assert_eq!(config.viewer.normalization, Normalization::Relative);
        assert_eq!(config.viewer.scale, ViewerConfig::default().scale);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let negative = "[propagation.attenuation]\nmode = \"decay_per_unit\"\ndecibels_per_unit = -1.0\n";
        assert!(matches!(
            AudibilityConfig::from_toml(negative),
            Err(AudibilityError::InvalidConfig(_))
        ));

        let mut config = AudibilityConfig::default();
        config.viewer.source_loudness = 500;
        assert!(config.validate().is_err());

        assert!(matches!(
            AudibilityConfig::from_toml("[propagation]\nconnectivity = \"six\""),
            Err(AudibilityError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = AudibilityConfig::default();
        config.propagation.cell_centered = true;
        let text = toml::to_string(&config).unwrap();
        assert_eq!(AudibilityConfig::from_toml(&text).unwrap(), config);
    }
}
