//! Subset cache: a persisted subset file is reused verbatim for as long as it
//! exists. There is no checksum or timestamp invalidation, and lookup and
//! persistence are not atomic against concurrent writers of the same path.
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::io::raster::GeoRasterReader;
use crate::io::writers::metadata::{SubsetProvenance, embed_tiff_metadata};
use crate::io::writers::tiff::write_tiff_f64;
use crate::types::RasterBuffer;

/// Read a previously persisted subset, if the file exists
pub fn load_existing(path: &Path) -> Result<Option<RasterBuffer>> {
    if !path.exists() {
        return Ok(None);
    }
    info!("loading existing subset file: {}", path.display());
    let raster = GeoRasterReader::open(path)?.read_raster()?;
    Ok(Some(raster))
}

/// Persist a subset as a single-band Float64 GeoTIFF with NaN no-data
pub fn persist(path: &Path, raster: &RasterBuffer, provenance: &SubsetProvenance<'_>) -> Result<()> {
    let (rows, cols) = raster.shape();
    let data: Vec<f64> = raster.data.iter().copied().collect();
    let mut ds = write_tiff_f64(path, cols, rows, &data)?;
    embed_tiff_metadata(&mut ds, raster.geotransform, &raster.crs, provenance)?;
    ds.flush_cache()?;
    info!("writing subset: {}", path.display());
    Ok(())
}
