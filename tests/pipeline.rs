use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use ndarray::Array2;
use object_store::ObjectStore;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;

use roi_subset::io::cache::persist;
use roi_subset::io::tiles::TileFootprint;
use roi_subset::{
    DataSource, Error, GeoRasterReader, Inventory, LocalDirectorySource, ObjectStoreSource,
    PolygonGeometry, RasterBuffer, Roi, SubsetConfig, SubsetProvenance, SubsetRequest,
    TileHandle, TileIndex, generate_subset, generate_subset_detailed, process_requests,
};

const TILE_A: &str = "008012";
const TILE_B: &str = "009012";

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 7, 4).unwrap()
}

/// 5-acre ROI around (-106.5, 35.0): a 33x33 grid at the default cell size
fn roi() -> Roi {
    Roi::new(
        "field",
        PolygonGeometry::rectangle(-106.501, 34.999, -106.499, 35.001),
        5.0,
    )
}

/// Both footprints cover the ROI; selection order is A then B
fn selector() -> TileIndex {
    let footprint = || PolygonGeometry::rectangle(-107.0, 34.0, -106.0, 36.0);
    TileIndex::new(vec![
        TileFootprint {
            id: TILE_B.to_string(),
            geometry: footprint(),
        },
        TileFootprint {
            id: TILE_A.to_string(),
            geometry: footprint(),
        },
    ])
}

/// A 20x20 EPSG:4326 tile at 0.001 deg covering -106.51..-106.49, 34.99..35.01
fn write_tile(path: &Path, value: impl Fn(usize, usize) -> f64) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let data = Array2::from_shape_fn((20, 20), |(row, col)| value(row, col));
    let raster = RasterBuffer {
        data,
        geotransform: [-106.51, 0.001, 0.0, 35.01, 0.0, -0.001],
        crs: "EPSG:4326".to_string(),
    };
    let provenance = SubsetProvenance {
        roi: "fixture",
        variable: "ET",
        date: date(),
        tiles: &[],
        cell_size: 0.001,
    };
    persist(path, &raster, &provenance).unwrap();
}

fn tile_path(archive: &Path, tile: &str, variable: &str) -> PathBuf {
    archive
        .join("2020.07.04")
        .join(format!("LC08_{tile}_20200704_{variable}.tif"))
}

struct Fixture {
    _dir: tempfile::TempDir,
    archive: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("archive");
        let output = dir.path().join("out");
        std::fs::create_dir_all(&archive).unwrap();
        Self {
            _dir: dir,
            archive,
            output,
        }
    }

    fn tile(&self, tile: &str, value: impl Fn(usize, usize) -> f64) -> &Self {
        write_tile(&tile_path(&self.archive, tile, "ET"), value);
        self
    }

    fn source(&self) -> LocalDirectorySource {
        LocalDirectorySource::new(&self.archive).unwrap()
    }

    fn request(&self, variable: &str) -> SubsetRequest {
        SubsetRequest::in_directory(roi(), date(), variable, &self.output)
    }
}

/// Counts `resolve` calls made through it
struct CountingSource<S> {
    inner: S,
    resolves: AtomicUsize,
}

impl<S> CountingSource<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            resolves: AtomicUsize::new(0),
        }
    }

    fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

impl<S: DataSource> DataSource for CountingSource<S> {
    fn resolve(&self, tile: &str, variable: &str, date: NaiveDate) -> roi_subset::Result<TileHandle> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(tile, variable, date)
    }

    fn inventory(&self) -> Inventory {
        self.inner.inventory()
    }
}

fn same_pixels(a: &Array2<f64>, b: &Array2<f64>) -> bool {
    a.dim() == b.dim()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan()))
}

#[test]
fn grid_sizing_and_first_wins_merge() {
    let fx = Fixture::new();
    fx.tile(TILE_A, |_, _| 1.0).tile(TILE_B, |_, _| 2.0);
    let request = fx.request("ET");

    let outcome =
        generate_subset_detailed(&fx.source(), &selector(), &request, &SubsetConfig::default())
            .unwrap();

    assert!(!outcome.from_cache);
    assert_eq!(outcome.tiles, vec![TILE_A, TILE_B]);
    assert_eq!(outcome.raster.shape(), (33, 33));
    assert!(outcome.raster.data.iter().all(|&v| v == 1.0));
    assert!(request.output.exists());
    assert!(
        request
            .output
            .to_string_lossy()
            .ends_with("2020.07.04_field_ET_subset.tif")
    );
}

#[test]
fn later_tiles_only_fill_gaps() {
    let fx = Fixture::new();
    // Source columns 0..10 lie west of -106.5
    fx.tile(TILE_A, |_, col| if col < 10 { f64::NAN } else { 5.0 })
        .tile(TILE_B, |_, _| 7.0);

    let raster = generate_subset(
        &fx.source(),
        &selector(),
        &fx.request("ET"),
        &SubsetConfig::default(),
    )
    .unwrap();

    assert_eq!(raster.data[[0, 0]], 7.0);
    assert_eq!(raster.data[[0, 32]], 5.0);
    assert_eq!(raster.valid_count(), 33 * 33);
    let filled = raster.data.iter().filter(|&&v| v == 7.0).count();
    assert_eq!(filled, 17 * 33);
}

#[test]
fn missing_tile_aborts_without_writing() {
    let fx = Fixture::new();
    fx.tile(TILE_A, |_, _| 1.0);
    let request = fx.request("ET");

    let err = generate_subset(&fx.source(), &selector(), &request, &SubsetConfig::default())
        .unwrap_err();

    match err {
        Error::FileUnavailable { tile, variable, .. } => {
            assert_eq!(tile, TILE_B);
            assert_eq!(variable, "ET");
        }
        other => panic!("expected FileUnavailable, got {other:?}"),
    }
    assert!(!request.output.exists());
}

#[test]
fn second_run_is_served_from_disk_without_lookups() {
    let fx = Fixture::new();
    fx.tile(TILE_A, |row, col| (row * 20 + col) as f64)
        .tile(TILE_B, |_, _| 2.0);
    let request = fx.request("ET");
    let config = SubsetConfig::default();

    let source = CountingSource::new(fx.source());
    let first = generate_subset(&source, &selector(), &request, &config).unwrap();
    assert_eq!(source.resolves(), 2);
    let bytes_on_disk = std::fs::read(&request.output).unwrap();

    let source = CountingSource::new(fx.source());
    let second = generate_subset_detailed(&source, &selector(), &request, &config).unwrap();
    assert_eq!(source.resolves(), 0);
    assert!(second.from_cache);
    assert!(second.tiles.is_empty());

    let stored = GeoRasterReader::open(&request.output)
        .unwrap()
        .read_raster()
        .unwrap();
    assert!(same_pixels(&second.raster.data, &stored.data));
    assert!(same_pixels(&second.raster.data, &first.data));
    assert_eq!(second.raster.geotransform, first.geotransform);
    assert_eq!(std::fs::read(&request.output).unwrap(), bytes_on_disk);
}

#[test]
fn blank_mosaic_fails_only_when_disallowed() {
    let fx = Fixture::new();
    fx.tile(TILE_A, |_, _| f64::NAN).tile(TILE_B, |_, _| f64::NAN);
    let request = fx.request("ET");

    let strict = SubsetConfig {
        allow_blank: false,
        ..SubsetConfig::default()
    };
    let err = generate_subset(&fx.source(), &selector(), &request, &strict).unwrap_err();
    match err {
        Error::BlankOutput { roi, tiles, .. } => {
            assert_eq!(roi, "field");
            assert_eq!(tiles, "008012, 009012");
        }
        other => panic!("expected BlankOutput, got {other:?}"),
    }
    assert!(!request.output.exists());

    let raster = generate_subset(&fx.source(), &selector(), &request, &SubsetConfig::default())
        .unwrap();
    assert_eq!(raster.shape(), (33, 33));
    assert!(raster.is_blank());
    assert!(request.output.exists());
}

#[test]
fn no_intersecting_tiles_gives_blank_grid() {
    let fx = Fixture::new();
    let far_away = TileIndex::new(vec![TileFootprint {
        id: TILE_A.to_string(),
        geometry: PolygonGeometry::rectangle(10.0, 10.0, 11.0, 11.0),
    }]);

    let outcome = generate_subset_detailed(
        &fx.source(),
        &far_away,
        &fx.request("ET"),
        &SubsetConfig::default(),
    )
    .unwrap();
    assert!(outcome.tiles.is_empty());
    assert_eq!(outcome.raster.shape(), (33, 33));
    assert!(outcome.raster.is_blank());
}

#[test]
fn empty_grid_is_rejected_before_any_lookup() {
    let fx = Fixture::new();
    let config = SubsetConfig {
        buffer_size_degrees: Some(0.0),
        ..SubsetConfig::default()
    };
    let source = CountingSource::new(fx.source());
    let err = generate_subset(&source, &selector(), &fx.request("ET"), &config).unwrap_err();
    assert!(matches!(err, Error::EmptyGrid { rows: 0, cols: 0 }));
    assert_eq!(source.resolves(), 0);
}

#[test]
fn batch_isolates_failures_and_reuses_outputs() {
    let fx = Fixture::new();
    fx.tile(TILE_A, |_, _| 1.0).tile(TILE_B, |_, _| 2.0);
    let requests = vec![fx.request("ET"), fx.request("PET")];
    let config = SubsetConfig::default();

    let report = process_requests(&fx.source(), &selector(), &requests, &config);
    assert_eq!((report.processed, report.cached, report.errors), (1, 0, 1));

    let report = process_requests(&fx.source(), &selector(), &requests, &config);
    assert_eq!((report.processed, report.cached, report.errors), (0, 1, 1));
}

#[test]
fn object_store_source_feeds_the_same_pipeline() {
    let fx = Fixture::new();
    fx.tile(TILE_A, |_, _| 3.0).tile(TILE_B, |_, _| 4.0);

    let store = Arc::new(InMemory::new());
    let rt = tokio::runtime::Runtime::new().unwrap();
    for tile in [TILE_A, TILE_B] {
        let bytes = std::fs::read(tile_path(&fx.archive, tile, "ET")).unwrap();
        let key = ObjectPath::from(format!("ard/2020.07.04/LC08_{tile}_20200704_ET.tif"));
        rt.block_on(store.put(&key, bytes.into())).unwrap();
    }

    let scratch = tempfile::tempdir().unwrap();
    let source = ObjectStoreSource::new(store)
        .unwrap()
        .with_prefix("ard")
        .with_temporary_directory(scratch.path());
    assert_eq!(source.inventory().dates, vec![date()]);

    let raster = generate_subset(&source, &selector(), &fx.request("ET"), &SubsetConfig::default())
        .unwrap();
    assert!(raster.data.iter().all(|&v| v == 3.0));
    // Downloads are released once each tile has been merged
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn failed_remote_requests_leave_no_downloads_behind() {
    let fx = Fixture::new();
    fx.tile(TILE_A, |_, _| 3.0);
    let valid = std::fs::read(tile_path(&fx.archive, TILE_A, "ET")).unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let key = |tile: &str| ObjectPath::from(format!("ard/2020.07.04/LC08_{tile}_20200704_ET.tif"));

    // Tile A downloads but is not a raster GDAL can open
    let corrupt = Arc::new(InMemory::new());
    rt.block_on(corrupt.put(&key(TILE_A), b"not a tiff".to_vec().into()))
        .unwrap();
    rt.block_on(corrupt.put(&key(TILE_B), valid.clone().into()))
        .unwrap();

    // Tile A downloads and merges, tile B is absent
    let partial = Arc::new(InMemory::new());
    rt.block_on(partial.put(&key(TILE_A), valid.into())).unwrap();

    let request = fx.request("ET");
    for (store, missing) in [(corrupt, false), (partial, true)] {
        let scratch = tempfile::tempdir().unwrap();
        let source = ObjectStoreSource::new(store)
            .unwrap()
            .with_prefix("ard")
            .with_temporary_directory(scratch.path());

        let err = generate_subset(&source, &selector(), &request, &SubsetConfig::default())
            .unwrap_err();
        if missing {
            assert!(matches!(err, Error::FileUnavailable { ref tile, .. } if tile == TILE_B));
        } else {
            assert!(!matches!(err, Error::FileUnavailable { .. }));
        }
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
        assert!(!request.output.exists());
    }
}
