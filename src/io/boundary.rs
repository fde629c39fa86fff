//! ROI boundaries from GeoJSON files.
//!
//! The ROI name is the file stem. Unless the caller supplies one, the area is
//! measured in the UTM zone containing the ROI centroid and reported in acres.
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::geometry::{PolygonGeometry, WGS84};
use crate::error::{Error, Result};
use crate::types::Roi;

pub const SQUARE_METERS_PER_ACRE: f64 = 4046.8564224;

/// EPSG code of the WGS84 / UTM zone containing (lon, lat)
pub fn utm_epsg(lon: f64, lat: f64) -> u32 {
    let zone = (((lon + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60) as u32;
    if lat >= 0.0 { 32600 + zone } else { 32700 + zone }
}

/// Area in acres of a geographic polygon, measured in its local UTM zone
pub fn area_acres(geometry: &PolygonGeometry) -> Result<f64> {
    let (lon, lat) = geometry
        .centroid()
        .ok_or_else(|| Error::geometry("ROI has no vertices"))?;
    let utm = format!("EPSG:{}", utm_epsg(lon, lat));
    let square_meters = geometry.transform(WGS84, &utm)?.area();
    Ok(square_meters / SQUARE_METERS_PER_ACRE)
}

/// ROI name: the file stem of the boundary file
pub fn roi_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "roi".to_string())
}

/// Load an ROI from a GeoJSON boundary file.
///
/// `area_override` (acres) skips the UTM area computation.
pub fn load_roi(path: &Path, area_override: Option<f64>) -> Result<Roi> {
    let text = std::fs::read_to_string(path)?;
    let geometry = PolygonGeometry::from_geojson_str(&text)?;
    let acres = match area_override {
        Some(acres) => acres,
        None => area_acres(&geometry)?,
    };
    let name = roi_name(path);
    info!("loaded ROI {} ({:.2} acres) from {}", name, acres, path.display());
    Ok(Roi::new(name, geometry, acres))
}

/// A single boundary file, or every `.geojson` file in a directory (sorted)
pub fn boundary_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(Error::DirectoryNotFound(path.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let p = entry?.path();
        let is_geojson = p
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("geojson"));
        if p.is_file() && is_geojson {
            files.push(p);
        }
    }
    files.sort();
    debug!("found {} boundary files in {}", files.len(), path.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utm_zone_lookup() {
        assert_eq!(utm_epsg(-106.5, 35.0), 32613);
        assert_eq!(utm_epsg(3.0, -10.0), 32731);
        assert_eq!(utm_epsg(-180.0, 0.0), 32601);
        assert_eq!(utm_epsg(180.0, 0.0), 32660);
    }

    #[test]
    fn small_square_area_in_acres() {
        // 0.001 deg square near the equator is ~111 m a side, ~3.04 acres
        let square = PolygonGeometry::rectangle(-75.0005, 0.0, -74.9995, 0.001);
        let acres = area_acres(&square).unwrap();
        assert!((acres - 3.04).abs() < 0.05, "acres = {acres}");
    }

    #[test]
    fn load_roi_uses_stem_and_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field_7.geojson");
        std::fs::write(
            &path,
            r#"{"type": "Feature", "properties": {}, "geometry": {"type": "Polygon",
                "coordinates": [[[-106.5,35.0],[-106.49,35.0],[-106.49,35.01],[-106.5,35.01],[-106.5,35.0]]]}}"#,
        )
        .unwrap();

        let roi = load_roi(&path, Some(12.5)).unwrap();
        assert_eq!(roi.name, "field_7");
        assert_eq!(roi.acres, 12.5);

        let measured = load_roi(&path, None).unwrap();
        assert!(measured.acres > 240.0 && measured.acres < 260.0, "{}", measured.acres);
    }

    #[test]
    fn boundary_directory_is_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.geojson", "a.GeoJSON", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let files = boundary_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| roi_name(p)).collect();
        assert_eq!(names, vec!["a", "b"]);

        let single = boundary_files(&files[0]).unwrap();
        assert_eq!(single, vec![files[0].clone()]);

        assert!(boundary_files(&dir.path().join("missing")).is_err());
    }
}
