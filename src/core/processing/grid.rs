use tracing::debug;

use crate::core::geometry::{PolygonGeometry, WGS84};
use crate::core::params::SubsetConfig;
use crate::error::{Error, Result};
use crate::types::TargetGrid;

/// Half-width of the output box, in degrees, for an ROI of `acres`.
///
/// The area is rounded to two decimals first. The two smallest tiers
/// (up to 4 acres and up to 10 acres) intentionally share the same value.
#[allow(clippy::if_same_then_else)]
pub fn buffer_degrees(acres: f64) -> f64 {
    let roi_size = (acres * 100.0).round() / 100.0;

    if roi_size <= 4.0 {
        0.005
    } else if roi_size <= 10.0 {
        0.005
    } else if roi_size <= 30.0 {
        (roi_size / 4.0) / 1000.0
    } else if roi_size <= 60.0 {
        (roi_size / 6.0) / 1000.0
    } else {
        (roi_size / 8.0) / 1000.0
    }
}

/// Build the square, north-up output grid centred on the ROI centroid.
///
/// The ROI (geographic coordinates) is reprojected into `config.target_crs`
/// before its centroid is taken. Columns and rows are the floor of the box
/// extent over the cell size, so a degenerate box yields a zero-sized grid.
pub fn build_target_grid(
    roi: &PolygonGeometry,
    acres: f64,
    config: &SubsetConfig,
) -> Result<TargetGrid> {
    let cell_size = config.cell_size_degrees;
    if !(cell_size > 0.0) {
        return Err(Error::InvalidArgument {
            arg: "cell_size_degrees",
            value: cell_size.to_string(),
        });
    }
    let buffer = config
        .buffer_size_degrees
        .unwrap_or_else(|| buffer_degrees(acres));

    let projected = roi.transform(WGS84, &config.target_crs)?;
    let (cx, cy) = projected
        .centroid()
        .ok_or_else(|| Error::geometry("ROI has no vertices"))?;

    let x_min = cx - buffer;
    let x_max = cx + buffer;
    let y_min = cy - buffer;
    let y_max = cy + buffer;

    let cols = ((x_max - x_min) / cell_size).floor() as usize;
    let rows = ((y_max - y_min) / cell_size).floor() as usize;

    debug!(
        "target grid: centroid=({:.6}, {:.6}) buffer={} cell={} -> {}x{} in {}",
        cx, cy, buffer, cell_size, cols, rows, config.target_crs
    );

    Ok(TargetGrid {
        origin_x: x_min,
        origin_y: y_max,
        cell_size,
        rows,
        cols,
        crs: config.target_crs.clone(),
    })
}
