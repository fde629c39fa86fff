use ndarray::{Array2, Zip};

use crate::error::Result;
use crate::io::RasterError;
use crate::types::{RasterBuffer, TargetGrid};

/// Fill every NaN pixel of `accumulated` with the value of `tile` at the same
/// position. Pixels that already hold a value are never overwritten.
pub fn fill_gaps(accumulated: &mut Array2<f64>, tile: &Array2<f64>) {
    Zip::from(accumulated).and(tile).for_each(|acc, &value| {
        if acc.is_nan() {
            *acc = value;
        }
    });
}

/// First-wins, gap-filling accumulator over the rasters of one request.
///
/// Tiles must be added in the selector's order; the result depends only on
/// that order and on tile contents.
#[derive(Debug, Clone)]
pub struct Mosaic {
    raster: RasterBuffer,
    tiles_merged: usize,
}

impl Mosaic {
    /// Start from an all-NaN raster covering `grid`
    pub fn new(grid: &TargetGrid) -> Self {
        Self {
            raster: RasterBuffer::nan(grid),
            tiles_merged: 0,
        }
    }

    pub fn add(&mut self, tile: &RasterBuffer) -> Result<()> {
        let (rows, cols) = self.raster.shape();
        let (tile_rows, tile_cols) = tile.shape();
        if (rows, cols) != (tile_rows, tile_cols) {
            return Err(RasterError::DimensionMismatch(cols, rows, tile_cols, tile_rows).into());
        }
        if self.tiles_merged == 0 {
            self.raster.data.assign(&tile.data);
        } else {
            fill_gaps(&mut self.raster.data, &tile.data);
        }
        self.tiles_merged += 1;
        Ok(())
    }

    pub fn tiles_merged(&self) -> usize {
        self.tiles_merged
    }

    pub fn finish(self) -> RasterBuffer {
        self.raster
    }
}
