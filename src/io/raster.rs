use gdal::raster::ResampleAlg;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform};
use gdal::{Dataset, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::core::geometry::spatial_ref;
use crate::types::{RasterBuffer, TargetGrid};

/// Errors encountered when reading rasters through GDAL
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),
    #[error("Raster has no usable georeferencing: {0}")]
    MissingGeoreference(String),
}

/// Metadata extracted from a GDAL-supported dataset
#[derive(Debug, Clone)]
pub struct RasterMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Number of raster bands
    pub bands: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// Projection as "EPSG:XXXX" when an authority code is present, else WKT
    pub projection: String,
    /// No-data value of band 1, mapped to NaN on read
    pub no_data: Option<f64>,
}

/// Reader for single-band georeferenced rasters (GeoTIFF tiles and cached subsets)
pub struct GeoRasterReader {
    pub path: PathBuf,
    pub dataset: Dataset,
    pub metadata: RasterMetadata,
}

// Helper to extract EPSG code from WKT authority tag
fn parse_epsg(wkt: &str) -> Option<String> {
    const KEY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(idx) = wkt.rfind(KEY) {
        let start = idx + KEY.len();
        if let Some(end) = wkt[start..].find('"') {
            let code = &wkt[start..start + end];
            return Some(format!("EPSG:{}", code));
        }
    }
    None
}

impl GeoRasterReader {
    /// Open a GDAL-supported raster; a geotransform is required
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let dataset = Dataset::open(path)?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(RasterError::UnsupportedFormat("No raster bands found".into()));
        }
        let geotransform = dataset.geo_transform().map_err(|_| {
            RasterError::MissingGeoreference(format!("{} has no geotransform", path.display()))
        })?;
        let proj = dataset.projection();
        let projection = if proj.starts_with("EPSG:") {
            proj
        } else if let Some(code) = parse_epsg(&proj) {
            code
        } else {
            proj
        };
        let no_data = dataset.rasterband(1)?.no_data_value();
        Ok(GeoRasterReader {
            path: path.to_path_buf(),
            dataset,
            metadata: RasterMetadata {
                size_x: size_x as usize,
                size_y: size_y as usize,
                bands,
                geotransform,
                projection,
                no_data,
            },
        })
    }

    /// Read a window of band 1 as an f64 ndarray of shape (height, width),
    /// with the band's no-data value replaced by NaN
    pub fn read_window(
        &self,
        offset: (usize, usize),
        size: (usize, usize),
    ) -> Result<Array2<f64>, RasterError> {
        let (width, height) = size;
        let band = self.dataset.rasterband(1)?;
        let buf = band.read_as::<f64>(
            (offset.0 as isize, offset.1 as isize),
            size,
            size,
            Some(ResampleAlg::NearestNeighbour),
        )?;
        let mut data_vec = buf.data().to_vec();
        if let Some(no_data) = self.metadata.no_data {
            if !no_data.is_nan() {
                for v in data_vec.iter_mut().filter(|v| **v == no_data) {
                    *v = f64::NAN;
                }
            }
        }
        Array2::from_shape_vec((height, width), data_vec)
            .map_err(|_| RasterError::DimensionMismatch(width, height, width, height))
    }

    /// Read band 1 in full, with its georeferencing, as stored on disk
    pub fn read_raster(&self) -> Result<RasterBuffer, RasterError> {
        let data = self.read_window((0, 0), (self.metadata.size_x, self.metadata.size_y))?;
        Ok(RasterBuffer {
            data,
            geotransform: self.metadata.geotransform,
            crs: self.metadata.projection.clone(),
        })
    }

    /// Fractional (col, row) of a map coordinate under the dataset geotransform
    fn map_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let gt = self.metadata.geotransform;
        let det = gt[1] * gt[5] - gt[2] * gt[4];
        let dx = x - gt[0];
        let dy = y - gt[3];
        ((gt[5] * dx - gt[2] * dy) / det, (gt[1] * dy - gt[4] * dx) / det)
    }

    /// Resample band 1 onto `grid` with nearest-neighbour sampling at target
    /// pixel centres. Target pixels falling outside the source, or on source
    /// no-data, are NaN. Only the source window covering the grid is read.
    pub fn resample_to_grid(&self, grid: &TargetGrid) -> crate::Result<RasterBuffer> {
        let (rows, cols) = grid.shape();
        let mut xs = Vec::with_capacity(rows * cols);
        let mut ys = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let (x, y) = grid.pixel_center(r, c);
                xs.push(x);
                ys.push(y);
            }
        }

        let mut source_srs = self.dataset.spatial_ref().map_err(|_| {
            RasterError::MissingGeoreference(format!("{} has no CRS", self.path.display()))
        })?;
        source_srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let target_srs = spatial_ref(&grid.crs)?;
        if !xs.is_empty() {
            let mut zs = vec![0.0_f64; xs.len()];
            CoordTransform::new(&target_srs, &source_srs)?
                .transform_coords(&mut xs, &mut ys, &mut zs)?;
        }

        let (size_x, size_y) = (self.metadata.size_x, self.metadata.size_y);
        let pixels: Vec<Option<(usize, usize)>> = xs
            .iter()
            .zip(&ys)
            .map(|(&x, &y)| {
                let (col, row) = self.map_to_pixel(x, y);
                let (col, row) = (col.floor(), row.floor());
                if col >= 0.0 && row >= 0.0 && col < size_x as f64 && row < size_y as f64 {
                    Some((col as usize, row as usize))
                } else {
                    None
                }
            })
            .collect();

        let mut data = Array2::from_elem((rows, cols), f64::NAN);
        let inside = pixels.iter().flatten();
        let col_min = inside.clone().map(|p| p.0).min();
        let col_max = inside.clone().map(|p| p.0).max();
        let row_min = inside.clone().map(|p| p.1).min();
        let row_max = inside.map(|p| p.1).max();

        if let (Some(c0), Some(c1), Some(r0), Some(r1)) = (col_min, col_max, row_min, row_max) {
            let window = self.read_window((c0, r0), (c1 - c0 + 1, r1 - r0 + 1))?;
            for (i, pixel) in pixels.iter().enumerate() {
                if let Some((col, row)) = pixel {
                    data[[i / cols, i % cols]] = window[[row - r0, col - c0]];
                }
            }
            debug!(
                "resampled {} onto {}x{} grid from window {}x{}+{}+{}",
                self.path.display(),
                cols,
                rows,
                c1 - c0 + 1,
                r1 - r0 + 1,
                c0,
                r0
            );
        } else {
            debug!("{} does not overlap the target grid", self.path.display());
        }

        Ok(RasterBuffer {
            data,
            geotransform: grid.geotransform(),
            crs: grid.crs.clone(),
        })
    }
}

/// Open one tile and resample it onto the target grid
pub fn load_tile(path: &Path, grid: &TargetGrid) -> crate::Result<RasterBuffer> {
    GeoRasterReader::open(path)?.resample_to_grid(grid)
}
