//! Tile data sources.
//!
//! A [`DataSource`] resolves `(tile, variable, date)` to a readable raster file
//! and reports which dates it holds. The pipeline depends only on this trait;
//! [`LocalDirectorySource`] and [`ObjectStoreSource`] are interchangeable.
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::TempPath;
use tracing::debug;

use crate::error::Result;
use crate::types::{DATE_DIRECTORY_FORMAT, Inventory};

pub mod local;
pub mod remote;

pub use local::LocalDirectorySource;
pub use remote::ObjectStoreSource;

pub trait DataSource: Send + Sync {
    /// Locate the file for one tile, variable and date. Fails with
    /// `Error::FileUnavailable` when nothing matches.
    fn resolve(&self, tile: &str, variable: &str, date: NaiveDate) -> Result<TileHandle>;

    /// Years and dates available; empty when nothing can be listed.
    fn inventory(&self) -> Inventory;
}

/// Scoped access to a resolved tile file.
///
/// Temporary copies (e.g. downloads from an object store) are deleted when the
/// handle is dropped, whichever way the holder's scope is left.
#[derive(Debug)]
pub struct TileHandle {
    path: PathBuf,
    temporary: Option<TempPath>,
}

impl TileHandle {
    /// A file owned by the data source; nothing is released on drop
    pub fn local(path: PathBuf) -> Self {
        Self {
            path,
            temporary: None,
        }
    }

    /// A temporary copy, removed on drop
    pub fn temporary(temp: TempPath) -> Self {
        Self {
            path: temp.to_path_buf(),
            temporary: Some(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary.is_some()
    }
}

impl Drop for TileHandle {
    fn drop(&mut self) {
        if self.temporary.is_some() {
            debug!("releasing temporary tile copy: {}", self.path.display());
        }
    }
}

/// Name of the per-date directory (`YYYY.MM.DD`)
pub fn date_directory_name(date: NaiveDate) -> String {
    date.format(DATE_DIRECTORY_FORMAT).to_string()
}

pub fn parse_date_directory(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, DATE_DIRECTORY_FORMAT).ok()
}

/// True when `file_name` matches `*_{tile}_*_{variable}.tif`
pub fn matches_tile_file(file_name: &str, tile: &str, variable: &str) -> bool {
    if file_name.starts_with('.') {
        return false;
    }
    let suffix = format!("_{}.tif", variable);
    match file_name.strip_suffix(&suffix) {
        Some(stem) => stem.contains(&format!("_{}_", tile)),
        None => false,
    }
}
