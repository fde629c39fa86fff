#![doc = r#"
roi-subset: georeferenced raster subsets for regions of interest.

Given an ROI polygon, an acquisition date and a variable name, the pipeline
selects the imagery tiles intersecting the ROI, resamples each onto a square
target grid centred on the ROI, merges them first-wins into one mosaic, and
persists the result as a single-band Float64 GeoTIFF. A request whose output
file already exists is served from that file without touching any tile.

Requirements
------------
- GDAL development headers and runtime available on your system.
- Rust 2024 edition toolchain.

Quick start: one subset from a local archive
--------------------------------------------
```rust,no_run
use std::path::Path;
use chrono::NaiveDate;
use roi_subset::{
    generate_subset, load_roi, LocalDirectorySource, SubsetConfig, SubsetRequest, TileIndex,
};

fn main() -> roi_subset::Result<()> {
    let source = LocalDirectorySource::new("/data/ard")?;
    let tiles = TileIndex::from_geojson_file(Path::new("/data/ard_tiles.geojson"))?;
    let roi = load_roi(Path::new("/data/boundaries/field_7.geojson"), None)?;

    let date = NaiveDate::from_ymd_opt(2020, 7, 4).expect("valid date");
    let request = SubsetRequest::in_directory(roi, date, "ET", Path::new("/out"));

    let raster = generate_subset(&source, &tiles, &request, &SubsetConfig::default())?;
    println!("{:?} valid pixels: {}", raster.shape(), raster.valid_count());
    Ok(())
}
```

Batch helpers
-------------
```rust,no_run
use std::path::Path;
use roi_subset::{
    load_roi, process_requests, DataSource, ObjectStoreSource, SubsetConfig, SubsetRequest,
    TileIndex,
};

fn main() -> roi_subset::Result<()> {
    let source = ObjectStoreSource::s3_from_env("ard-archive")?.with_prefix("conus");
    let tiles = TileIndex::from_geojson_file(Path::new("/data/ard_tiles.geojson"))?;
    let roi = load_roi(Path::new("/data/boundaries/field_7.geojson"), None)?;

    let requests: Vec<SubsetRequest> = source
        .inventory()
        .dates_between(Some(2019), Some(2020))
        .into_iter()
        .map(|date| SubsetRequest::in_directory(roi.clone(), date, "ET", Path::new("/out")))
        .collect();

    let config = SubsetConfig { allow_blank: false, ..Default::default() };
    let report = process_requests(&source, &tiles, &requests, &config);
    println!("processed={} cached={} errors={}", report.processed, report.cached, report.errors);
    Ok(())
}
```

Error handling
--------------
All public functions return `roi_subset::Result<T>`; match on `roi_subset::Error`
to handle specific cases.

```rust,no_run
# use roi_subset::{generate_subset, Error, LocalDirectorySource, SubsetConfig, SubsetRequest, TileIndex};
# fn run(source: &LocalDirectorySource, tiles: &TileIndex, request: &SubsetRequest) {
match generate_subset(source, tiles, request, &SubsetConfig::default()) {
    Ok(_) => {}
    Err(Error::FileUnavailable { tile, .. }) => eprintln!("tile {tile} missing, nothing written"),
    Err(Error::BlankOutput { tiles, .. }) => eprintln!("no valid pixels in {tiles}"),
    Err(other) => eprintln!("Other error: {other}"),
}
# }
```

Useful modules
--------------
- [`api`]: pipeline entry points.
- [`types`]: ROI, grid, raster and request types.
- [`io`]: boundaries, tile index, data sources, GDAL reader and writers.
- [`core`]: configuration, geometry, grid construction and mosaicking.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use core::geometry::PolygonGeometry;
pub use core::params::SubsetConfig;
pub use error::{Error, Result};
pub use types::{Inventory, RasterBuffer, Roi, SubsetRequest, TargetGrid};

// Sources, selection and reading
pub use io::boundary::load_roi;
pub use io::raster::{GeoRasterReader, RasterError, RasterMetadata};
pub use io::source::{DataSource, LocalDirectorySource, ObjectStoreSource, TileHandle};
pub use io::tiles::{TileIndex, TileSelector};

// Selected writer helpers (keep low-level metadata helpers public)
pub use io::writers::metadata::{SubsetProvenance, embed_tiff_metadata, extract_metadata_fields};

// High-level API re-exports
pub use api::{
    BatchReport, SubsetOutcome, generate_subset, generate_subset_detailed, process_requests,
};
