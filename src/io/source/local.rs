//! Tiles stored on a local filesystem under per-date directories.
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{DataSource, TileHandle, date_directory_name, matches_tile_file, parse_date_directory};
use crate::error::{Error, Result};
use crate::types::Inventory;

/// Reads tiles laid out as `<root>/YYYY.MM.DD/**/*_{tile}_*_{variable}.tif`.
///
/// Hidden entries below the date directory are skipped, and matches are
/// ordered by their full path string.
#[derive(Debug, Clone)]
pub struct LocalDirectorySource {
    root: PathBuf,
}

impl LocalDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::DirectoryNotFound(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn list_dates(&self) -> std::io::Result<Vec<NaiveDate>> {
        let mut dates = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(date) = entry.file_name().to_str().and_then(parse_date_directory) {
                dates.push(date);
            }
        }
        Ok(dates)
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().starts_with(b".")
}

impl DataSource for LocalDirectorySource {
    fn resolve(&self, tile: &str, variable: &str, date: NaiveDate) -> Result<TileHandle> {
        let date_dir = self.root.join(date_directory_name(date));
        let mut matches: Vec<PathBuf> = WalkDir::new(&date_dir)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| matches_tile_file(name, tile, variable))
            })
            .map(|entry| entry.into_path())
            .collect();
        matches.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

        match matches.into_iter().next() {
            Some(path) => {
                debug!("tile {} resolved to {}", tile, path.display());
                Ok(TileHandle::local(path))
            }
            None => Err(Error::FileUnavailable {
                tile: tile.to_string(),
                variable: variable.to_string(),
                date,
            }),
        }
    }

    fn inventory(&self) -> Inventory {
        match self.list_dates() {
            Ok(dates) => Inventory::from_dates(dates),
            Err(e) => {
                warn!("cannot list {}: {}", self.root.display(), e);
                Inventory::default()
            }
        }
    }
}
