//! Tiles stored in an object store (S3-compatible bucket, or in-memory for tests).
//!
//! The key layout mirrors the local one: `[prefix/]YYYY.MM.DD/.../*_{tile}_*_{variable}.tif`.
//! Matching objects are downloaded into a temporary file so GDAL can open them
//! by path; the download is removed when the returned [`TileHandle`] drops.
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::TryStreamExt;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::{DataSource, TileHandle, date_directory_name, matches_tile_file, parse_date_directory};
use crate::error::{Error, Result};
use crate::types::Inventory;

#[derive(Debug)]
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    prefix: Option<ObjectPath>,
    runtime: Runtime,
    temporary_directory: Option<PathBuf>,
}

impl ObjectStoreSource {
    /// Wrap an existing store. Builds a small runtime to drive its async API.
    pub fn new(store: Arc<dyn ObjectStore>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("roi-subset-store")
            .enable_all()
            .build()?;
        Ok(Self {
            store,
            prefix: None,
            runtime,
            temporary_directory: None,
        })
    }

    /// S3 bucket configured from the standard `AWS_*` environment variables
    pub fn s3_from_env(bucket: &str) -> Result<Self> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        info!("using object store bucket: {}", bucket);
        Self::new(Arc::new(store))
    }

    /// Only consider keys under `prefix`
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        self.prefix = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));
        self
    }

    /// Download tiles into `dir` instead of the system temp directory
    pub fn with_temporary_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temporary_directory = Some(dir.into());
        self
    }

    fn date_prefix(&self, date: NaiveDate) -> ObjectPath {
        let name = date_directory_name(date);
        match &self.prefix {
            Some(prefix) => prefix.child(name.as_str()),
            None => ObjectPath::from(name),
        }
    }

    /// First matching key in string order; keys with a hidden segment below
    /// the date prefix are skipped
    fn find_object(&self, tile: &str, variable: &str, date: NaiveDate) -> Result<Option<ObjectPath>> {
        let prefix = self.date_prefix(date);
        let depth = prefix.parts().count();
        let objects = self
            .runtime
            .block_on(self.store.list(Some(&prefix)).try_collect::<Vec<_>>())?;

        let mut matches: Vec<ObjectPath> = objects
            .into_iter()
            .map(|meta| meta.location)
            .filter(|location| {
                !location
                    .parts()
                    .skip(depth)
                    .any(|part| part.as_ref().starts_with('.'))
            })
            .filter(|location| {
                location
                    .filename()
                    .is_some_and(|name| matches_tile_file(name, tile, variable))
            })
            .collect();
        matches.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
        Ok(matches.into_iter().next())
    }

    fn download(&self, location: &ObjectPath) -> Result<TileHandle> {
        let bytes = self.runtime.block_on(async {
            let result = self.store.get(location).await?;
            result.bytes().await
        })?;

        let suffix = format!("_{}", location.filename().unwrap_or("tile.tif"));
        let mut builder = tempfile::Builder::new();
        builder.prefix("roi-subset-").suffix(&suffix);
        let mut file = match &self.temporary_directory {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(&bytes)?;
        file.flush()?;

        let temp = file.into_temp_path();
        debug!(
            "downloaded {} ({} bytes) to {}",
            location,
            bytes.len(),
            temp.display()
        );
        Ok(TileHandle::temporary(temp))
    }

    fn list_dates(&self) -> Result<Vec<NaiveDate>> {
        let listing = self
            .runtime
            .block_on(self.store.list_with_delimiter(self.prefix.as_ref()))?;
        Ok(listing
            .common_prefixes
            .iter()
            .filter_map(|p| p.filename())
            .filter_map(parse_date_directory)
            .collect())
    }
}

impl DataSource for ObjectStoreSource {
    fn resolve(&self, tile: &str, variable: &str, date: NaiveDate) -> Result<TileHandle> {
        match self.find_object(tile, variable, date)? {
            Some(location) => self.download(&location),
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
                warn!("cannot list object store {}: {}", self.store, e);
                Inventory::default()
            }
        }
    }
}
