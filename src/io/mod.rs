//! I/O layer: ROI boundaries, tile footprints, tile data sources, GDAL-backed
//! raster reading, and the subset cache with its GeoTIFF writer.
pub mod boundary;
pub mod cache;
pub mod tiles;
pub use tiles::{TileFootprint, TileIndex, TileSelector};

pub mod source;
pub use source::{DataSource, LocalDirectorySource, ObjectStoreSource, TileHandle};

pub mod raster;
pub use raster::{GeoRasterReader, RasterError, RasterMetadata, load_tile};

pub mod writers;
