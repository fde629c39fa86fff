//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, GDAL, raster reader and object-store errors, and provides
//! semantic variants for the subset pipeline (`FileUnavailable`, `BlankOutput`).
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Raster error: {0}")]
    Raster(#[from] crate::io::RasterError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no files found for tile {tile} variable {variable} date {date}")]
    FileUnavailable {
        tile: String,
        variable: String,
        date: NaiveDate,
    },

    #[error("blank output raster for date {date} variable {variable} ROI {roi} from tiles: {tiles}")]
    BlankOutput {
        roi: String,
        variable: String,
        date: NaiveDate,
        tiles: String,
    },

    #[error("Target grid is empty: {rows} rows x {cols} cols")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },
}

impl Error {
    pub fn geometry<E: std::fmt::Display>(e: E) -> Self {
        Error::InvalidGeometry(e.to_string())
    }
}
