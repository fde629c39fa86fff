//! Shared types used across the subset pipeline.
//! Includes the region of interest (`Roi`), the per-request `TargetGrid`, the
//! transient `RasterBuffer`, the cache key `SubsetRequest`, and a data-source
//! `Inventory`.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use ndarray::Array2;

use crate::core::geometry::PolygonGeometry;

/// Directory and file-name date format used by tile archives and subset outputs.
pub const DATE_DIRECTORY_FORMAT: &str = "%Y.%m.%d";

/// Region of interest: a named polygon in geographic coordinates with its area.
#[derive(Debug, Clone, PartialEq)]
pub struct Roi {
    pub name: String,
    pub geometry: PolygonGeometry,
    pub acres: f64,
}

impl Roi {
    pub fn new(name: impl Into<String>, geometry: PolygonGeometry, acres: f64) -> Self {
        Self {
            name: name.into(),
            geometry,
            acres,
        }
    }
}

/// Axis-aligned output grid shared by every tile of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGrid {
    /// X coordinate of the top-left corner
    pub origin_x: f64,
    /// Y coordinate of the top-left corner
    pub origin_y: f64,
    /// Cell size in CRS units, identical in both axes
    pub cell_size: f64,
    pub rows: usize,
    pub cols: usize,
    /// CRS definition (e.g. "EPSG:4326")
    pub crs: String,
}

impl TargetGrid {
    /// GDAL-ordered affine coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub fn geotransform(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.cell_size,
            0.0,
            self.origin_y,
            0.0,
            -self.cell_size,
        ]
    }

    /// (rows, cols), the shape of every raster placed on this grid
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Map coordinates of the centre of pixel (row, col)
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.cell_size,
            self.origin_y - (row as f64 + 0.5) * self.cell_size,
        )
    }

    /// (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.origin_x,
            self.origin_y - self.rows as f64 * self.cell_size,
            self.origin_x + self.cols as f64 * self.cell_size,
            self.origin_y,
        )
    }
}

/// A single band of f64 samples with NaN as no-data, plus its georeferencing.
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    /// Samples of shape (rows, cols)
    pub data: Array2<f64>,
    pub geotransform: [f64; 6],
    pub crs: String,
}

impl RasterBuffer {
    /// An all-NaN raster covering `grid`
    pub fn nan(grid: &TargetGrid) -> Self {
        Self {
            data: Array2::from_elem(grid.shape(), f64::NAN),
            geotransform: grid.geotransform(),
            crs: grid.crs.clone(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// True when no pixel holds a valid observation
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|v| v.is_nan())
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

/// The unit of idempotent computation and the cache key.
#[derive(Debug, Clone)]
pub struct SubsetRequest {
    pub roi: Roi,
    pub date: NaiveDate,
    pub variable: String,
    pub output: PathBuf,
}

impl SubsetRequest {
    pub fn new(roi: Roi, date: NaiveDate, variable: impl Into<String>, output: PathBuf) -> Self {
        Self {
            roi,
            date,
            variable: variable.into(),
            output,
        }
    }

    /// Request whose output lands in `directory` under the default subset name
    pub fn in_directory(
        roi: Roi,
        date: NaiveDate,
        variable: impl Into<String>,
        directory: &Path,
    ) -> Self {
        let variable = variable.into();
        let output = directory.join(subset_filename(&roi.name, date, &variable));
        Self::new(roi, date, variable, output)
    }
}

/// Default subset file name: `YYYY.MM.DD_{roi}_{variable}_subset.tif`
pub fn subset_filename(roi_name: &str, date: NaiveDate, variable: &str) -> String {
    format!(
        "{}_{}_{}_subset.tif",
        date.format(DATE_DIRECTORY_FORMAT),
        roi_name,
        variable
    )
}

/// Years and acquisition dates a data source can serve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub years: BTreeSet<i32>,
    /// Ascending
    pub dates: Vec<NaiveDate>,
}

impl Inventory {
    pub fn from_dates(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort();
        dates.dedup();
        let years = dates.iter().map(|d| d.year()).collect();
        Self { years, dates }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Dates whose year lies within the inclusive bounds
    pub fn dates_between(&self, start_year: Option<i32>, end_year: Option<i32>) -> Vec<NaiveDate> {
        self.dates
            .iter()
            .copied()
            .filter(|d| {
                let year = d.year();
                start_year.is_none_or(|s| year >= s) && end_year.is_none_or(|e| year <= e)
            })
            .collect()
    }
}
