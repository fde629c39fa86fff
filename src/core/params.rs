use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::geometry::WGS84;
use crate::error::Result;

/// Default output cell size, in degrees (about 30 m at mid latitudes).
pub const CELL_SIZE_DEGREES: f64 = 0.0003;

/// Subset parameters suitable for config files and batch presets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetConfig {
    /// Output cell size, identical in both axes
    pub cell_size_degrees: f64,
    /// Half-width of the output box around the ROI centroid; None means the
    /// area-tiered policy decides
    pub buffer_size_degrees: Option<f64>,
    /// CRS of the output grid
    pub target_crs: String,
    /// If false, an all-NaN mosaic fails with `BlankOutput`
    pub allow_blank: bool,
}

impl Default for SubsetConfig {
    fn default() -> Self {
        Self {
            cell_size_degrees: CELL_SIZE_DEGREES,
            buffer_size_degrees: None,
            target_crs: WGS84.to_string(),
            allow_blank: true,
        }
    }
}

impl SubsetConfig {
    /// Load a JSON config file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
