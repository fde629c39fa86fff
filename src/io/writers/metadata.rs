use chrono::NaiveDate;
use gdal::Dataset;
use gdal::Metadata;
use std::collections::BTreeMap;

use crate::core::geometry::spatial_ref;
use crate::types::DATE_DIRECTORY_FORMAT;

/// Provenance of a persisted subset
#[derive(Debug, Clone)]
pub struct SubsetProvenance<'a> {
    pub roi: &'a str,
    pub variable: &'a str,
    pub date: NaiveDate,
    pub tiles: &'a [String],
    pub cell_size: f64,
}

/// Extract the metadata items written into a subset GeoTIFF
pub fn extract_metadata_fields(provenance: &SubsetProvenance<'_>) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("ROI".to_string(), provenance.roi.to_string());
    metadata.insert("VARIABLE".to_string(), provenance.variable.to_string());
    metadata.insert(
        "DATE".to_string(),
        provenance.date.format(DATE_DIRECTORY_FORMAT).to_string(),
    );
    metadata.insert("TILES".to_string(), provenance.tiles.join(","));
    metadata.insert(
        "CELL_SIZE_DEGREES".to_string(),
        provenance.cell_size.to_string(),
    );
    metadata
}

/// Embed georeferencing and provenance into a GeoTIFF dataset
pub fn embed_tiff_metadata(
    ds: &mut Dataset,
    geotransform: [f64; 6],
    crs: &str,
    provenance: &SubsetProvenance<'_>,
) -> crate::Result<()> {
    ds.set_geo_transform(&geotransform)?;
    ds.set_projection(&spatial_ref(crs)?.to_wkt()?)?;

    for (key, value) in extract_metadata_fields(provenance) {
        ds.set_metadata_item(&key, &value, "")?;
    }

    Ok(())
}
