//! Tile selection against a fixed tiling scheme (e.g. the ARD tile grid).
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::core::geometry::{GeoJson, PolygonGeometry};
use crate::error::{Error, Result};

/// Resolves an ROI polygon (geographic coordinates) to the identifiers of the
/// tiles whose footprints intersect it, in a deterministic order.
pub trait TileSelector: Send + Sync {
    fn select_tiles(&self, roi: &PolygonGeometry) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileFootprint {
    pub id: String,
    pub geometry: PolygonGeometry,
}

/// In-memory footprint collection, read-only once loaded
#[derive(Debug, Clone, Default)]
pub struct TileIndex {
    footprints: Vec<TileFootprint>,
}

#[derive(Debug, Deserialize)]
struct FootprintCollection {
    features: Vec<FootprintFeature>,
}

#[derive(Debug, Deserialize)]
struct FootprintFeature {
    #[serde(default)]
    properties: Option<FootprintProperties>,
    geometry: Option<GeoJson>,
}

#[derive(Debug, Default, Deserialize)]
struct FootprintProperties {
    tile: Option<TileName>,
    h: Option<u64>,
    v: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TileName {
    Text(String),
    Number(serde_json::Number),
}

impl FootprintProperties {
    /// Tile identifier: the `tile` property, or ARD-style `h`/`v` indices
    /// formatted as `hhhvvv`.
    fn tile_id(&self) -> Option<String> {
        match (&self.tile, self.h, self.v) {
            (Some(TileName::Text(s)), _, _) => Some(s.clone()),
            (Some(TileName::Number(n)), _, _) => Some(n.to_string()),
            (None, Some(h), Some(v)) => Some(format!("{:03}{:03}", h, v)),
            _ => None,
        }
    }
}

impl TileIndex {
    pub fn new(footprints: Vec<TileFootprint>) -> Self {
        Self { footprints }
    }

    pub fn from_geojson_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let index = Self::from_geojson_str(&text)?;
        info!(
            "loaded {} tile footprints from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let collection: FootprintCollection = serde_json::from_str(text)
            .map_err(|e| Error::geometry(format!("tile index: {e}")))?;

        let footprints = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| {
                let id = feature
                    .properties
                    .as_ref()
                    .and_then(FootprintProperties::tile_id)
                    .ok_or_else(|| {
                        Error::geometry(format!(
                            "tile feature {i} has no `tile` or `h`/`v` properties"
                        ))
                    })?;
                let geometry = feature
                    .geometry
                    .as_ref()
                    .ok_or_else(|| Error::geometry(format!("tile feature {i} has no geometry")))?;
                let geometry = PolygonGeometry::from_geojson(geometry)?;
                Ok(TileFootprint { id, geometry })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(footprints))
    }

    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    pub fn footprints(&self) -> &[TileFootprint] {
        &self.footprints
    }
}

impl TileSelector for TileIndex {
    /// Bounding-box prefilter, then an OGR intersection test. Sorted, de-duplicated.
    fn select_tiles(&self, roi: &PolygonGeometry) -> Result<Vec<String>> {
        let roi_ogr = roi.to_ogr()?;
        let mut tiles = Vec::new();
        for footprint in &self.footprints {
            if !footprint.geometry.bounds_overlap(roi) {
                continue;
            }
            if footprint.geometry.to_ogr()?.intersects(&roi_ogr) {
                tiles.push(footprint.id.clone());
            }
        }
        tiles.sort();
        tiles.dedup();
        debug!("selected tiles: {:?}", tiles);
        Ok(tiles)
    }
}
