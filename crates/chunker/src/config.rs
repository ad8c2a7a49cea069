use serde::{Deserialize, Serialize};

/// Configuration for sheet compression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorConfig {
    /// Maximum number of key anchors kept per chunk
    pub max_anchors: usize,

    /// Raw value/formula grids are carried only up to this many cells
    pub raw_grid_cell_limit: usize,

    /// Numbers with an absolute value at or above this are anchors
    pub large_number_threshold: f64,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            max_anchors: 20,
            raw_grid_cell_limit: 2_500,
            large_number_threshold: 10_000.0,
        }
    }
}

impl CompressorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.large_number_threshold.is_finite() || self.large_number_threshold <= 0.0 {
            return Err(format!(
                "large_number_threshold must be a positive number, got {}",
                self.large_number_threshold
            ));
        }
        Ok(())
    }
}

/// Thresholds for dense-region detection.
///
/// The defaults are the fixed production constants; tests override them to
/// exercise the edges of the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum accepted region height
    pub min_region_rows: usize,

    /// Minimum accepted region width
    pub min_region_cols: usize,

    /// Minimum filled/total ratio of an accepted region
    pub min_density: f64,

    /// Minimum filled ratio of a column/row for the rectangle to keep growing
    pub growth_density: f64,

    /// Formula regions with fewer formula cells are discarded
    pub min_formula_cells: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_region_rows: 2,
            min_region_cols: 2,
            min_density: 0.4,
            growth_density: 0.3,
            min_formula_cells: 3,
        }
    }
}

impl DetectorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_region_rows == 0 || self.min_region_cols == 0 {
            return Err("min_region_rows and min_region_cols must be > 0".to_string());
        }

        for (name, value) in [
            ("min_density", self.min_density),
            ("growth_density", self.growth_density),
        ] {
            if !(0.0..=1.0).contains(&value) || value == 0.0 {
                return Err(format!("{name} must be in (0, 1], got {value}"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_valid() {
        assert!(CompressorConfig::default().validate().is_ok());
        assert!(DetectorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_detector_validation() {
        let mut config = DetectorConfig::default();

        config.min_region_rows = 0;
        assert!(config.validate().is_err());

        config.min_region_rows = 2;
        config.min_density = 1.5;
        assert!(config.validate().is_err());

        config.min_density = 0.0;
        assert!(config.validate().is_err());

        config.min_density = 0.4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_compressor_validation() {
        let config = CompressorConfig {
            large_number_threshold: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{"min_density": 0.5}"#).expect("parse config");
        assert_eq!(config.min_density, 0.5);
        assert_eq!(config.min_region_rows, 2);
        assert_eq!(config.growth_density, 0.3);
    }
}
