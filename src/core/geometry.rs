//! Polygon geometry for ROIs and tile footprints.
//!
//! Geometries are held as plain coordinate rings so they can be shared across
//! threads; GDAL/OGR geometries are built on demand for predicates, and GDAL
//! coordinate transforms handle reprojection.
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::Geometry;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Geographic CRS of boundary files and tile footprints.
pub const WGS84: &str = "EPSG:4326";

/// A closed or open ring of (x, y) vertices.
pub type Ring = Vec<[f64; 2]>;

/// One or more polygons, each an exterior ring followed by optional holes.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonGeometry {
    polygons: Vec<Vec<Ring>>,
}

/// Build a spatial reference from a user definition (EPSG code, WKT, PROJ string)
/// with x = longitude / easting axis order.
pub fn spatial_ref(definition: &str) -> Result<SpatialRef> {
    let mut srs = SpatialRef::from_definition(definition)?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Cheap textual comparison of two CRS definitions
pub fn same_crs(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

impl PolygonGeometry {
    pub fn new(polygons: Vec<Vec<Ring>>) -> Result<Self> {
        if polygons.is_empty() {
            return Err(Error::geometry("geometry has no polygons"));
        }
        for polygon in &polygons {
            if polygon.is_empty() {
                return Err(Error::geometry("polygon has no exterior ring"));
            }
            if polygon.iter().any(|ring| ring.len() < 3) {
                return Err(Error::geometry("polygon ring has fewer than 3 vertices"));
            }
        }
        Ok(Self { polygons })
    }

    /// Axis-aligned rectangle
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            polygons: vec![vec![vec![
                [min_x, min_y],
                [max_x, min_y],
                [max_x, max_y],
                [min_x, max_y],
                [min_x, min_y],
            ]]],
        }
    }

    pub fn polygons(&self) -> &[Vec<Ring>] {
        &self.polygons
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let object: GeoJson = serde_json::from_str(text).map_err(Error::geometry)?;
        Self::from_geojson(&object)
    }

    /// Every polygon part of `object` merged into one multipolygon
    pub fn from_geojson(object: &GeoJson) -> Result<Self> {
        let mut polygons = Vec::new();
        object.collect_polygons(&mut polygons)?;
        Self::new(polygons)
    }

    /// Well-known text, rings explicitly closed
    pub fn to_wkt(&self) -> String {
        let polygons: Vec<String> = self
            .polygons
            .iter()
            .map(|polygon| {
                let rings: Vec<String> = polygon.iter().map(|ring| ring_wkt(ring)).collect();
                format!("({})", rings.join(", "))
            })
            .collect();
        format!("MULTIPOLYGON ({})", polygons.join(", "))
    }

    pub fn to_ogr(&self) -> Result<Geometry> {
        Ok(Geometry::from_wkt(&self.to_wkt())?)
    }

    /// Planar area in squared CRS units, holes subtracted
    pub fn area(&self) -> f64 {
        self.polygons
            .iter()
            .map(|polygon| {
                let mut rings = polygon.iter();
                let exterior = rings.next().map_or(0.0, |r| shoelace(r).abs());
                let holes: f64 = rings.map(|r| shoelace(r).abs()).sum();
                exterior - holes
            })
            .sum()
    }

    /// Area-weighted centroid; falls back to the mean exterior vertex for
    /// degenerate (zero-area) shapes.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let (mut area, mut mx, mut my) = (0.0, 0.0, 0.0);
        for polygon in &self.polygons {
            for (i, ring) in polygon.iter().enumerate() {
                let (a, cx, cy) = ring_moments(ring);
                let sign = if i == 0 { 1.0 } else { -1.0 };
                area += sign * a;
                mx += sign * a * cx;
                my += sign * a * cy;
            }
        }
        if area != 0.0 {
            return Some((mx / area, my / area));
        }
        let vertices: Vec<&[f64; 2]> = self
            .polygons
            .iter()
            .filter_map(|p| p.first())
            .flatten()
            .collect();
        if vertices.is_empty() {
            return None;
        }
        let n = vertices.len() as f64;
        Some((
            vertices.iter().map(|v| v[0]).sum::<f64>() / n,
            vertices.iter().map(|v| v[1]).sum::<f64>() / n,
        ))
    }

    /// (min_x, min_y, max_x, max_y) over all vertices
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut b = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for [x, y] in self.polygons.iter().flatten().flatten() {
            b.0 = b.0.min(*x);
            b.1 = b.1.min(*y);
            b.2 = b.2.max(*x);
            b.3 = b.3.max(*y);
        }
        b
    }

    pub fn bounds_overlap(&self, other: &PolygonGeometry) -> bool {
        let a = self.bounds();
        let b = other.bounds();
        a.0 <= b.2 && b.0 <= a.2 && a.1 <= b.3 && b.1 <= a.3
    }

    /// Reproject every vertex from `source_crs` into `target_crs`
    pub fn transform(&self, source_crs: &str, target_crs: &str) -> Result<Self> {
        if same_crs(source_crs, target_crs) {
            return Ok(self.clone());
        }
        let transform = CoordTransform::new(&spatial_ref(source_crs)?, &spatial_ref(target_crs)?)?;

        let mut xs: Vec<f64> = Vec::new();
        let mut ys: Vec<f64> = Vec::new();
        for [x, y] in self.polygons.iter().flatten().flatten() {
            xs.push(*x);
            ys.push(*y);
        }
        let mut zs = vec![0.0_f64; xs.len()];
        transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

        let mut k = 0;
        let polygons = self
            .polygons
            .iter()
            .map(|polygon| {
                polygon
                    .iter()
                    .map(|ring| {
                        ring.iter()
                            .map(|_| {
                                let p = [xs[k], ys[k]];
                                k += 1;
                                p
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Ok(Self { polygons })
    }
}

/// GeoJSON position: x, y and any further ordinates (ignored)
pub type Position = Vec<f64>;

/// The GeoJSON objects a boundary or footprint file may hold. Other geometry
/// types fail to deserialize.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum GeoJson {
    FeatureCollection {
        features: Vec<GeoJson>,
    },
    Feature {
        geometry: Option<Box<GeoJson>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJson>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

impl GeoJson {
    fn collect_polygons(&self, out: &mut Vec<Vec<Ring>>) -> Result<()> {
        match self {
            GeoJson::FeatureCollection { features: members }
            | GeoJson::GeometryCollection { geometries: members } => {
                for member in members {
                    member.collect_polygons(out)?;
                }
            }
            GeoJson::Feature { geometry } => {
                if let Some(geometry) = geometry {
                    geometry.collect_polygons(out)?;
                }
            }
            GeoJson::Polygon { coordinates } => out.push(polygon_rings(coordinates)?),
            GeoJson::MultiPolygon { coordinates } => {
                for part in coordinates {
                    out.push(polygon_rings(part)?);
                }
            }
        }
        Ok(())
    }
}

fn polygon_rings(rings: &[Vec<Position>]) -> Result<Vec<Ring>> {
    rings
        .iter()
        .map(|ring| -> Result<Ring> { ring.iter().map(|p| position(p)).collect() })
        .collect()
}

fn position(p: &[f64]) -> Result<[f64; 2]> {
    match p {
        [x, y, ..] => Ok([*x, *y]),
        _ => Err(Error::geometry("position must hold at least two numbers")),
    }
}

fn ring_wkt(ring: &Ring) -> String {
    let mut points: Vec<String> = ring.iter().map(|[x, y]| format!("{x} {y}")).collect();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            points.push(format!("{} {}", first[0], first[1]));
        }
    }
    format!("({})", points.join(", "))
}

// Signed; closing edge included so open and closed rings agree. Coordinates are
// taken relative to the first vertex to keep the products small.
fn shoelace(ring: &Ring) -> f64 {
    let n = ring.len();
    let [ox, oy] = ring[0];
    (0..n)
        .map(|i| {
            let [x0, y0] = ring[i];
            let [x1, y1] = ring[(i + 1) % n];
            (x0 - ox) * (y1 - oy) - (x1 - ox) * (y0 - oy)
        })
        .sum::<f64>()
        / 2.0
}

/// (unsigned area, centroid x, centroid y) of a single ring
fn ring_moments(ring: &Ring) -> (f64, f64, f64) {
    let n = ring.len();
    let a = shoelace(ring);
    if a == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let [ox, oy] = ring[0];
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let (x0, y0) = (ring[i][0] - ox, ring[i][1] - oy);
        let (x1, y1) = (ring[(i + 1) % n][0] - ox, ring[(i + 1) % n][1] - oy);
        let cross = x0 * y1 - x1 * y0;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    (a.abs(), ox + cx / (6.0 * a), oy + cy / (6.0 * a))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{
        "type": "Feature",
        "properties": {"name": "square"},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
        }
    }"#;

    #[test]
    fn parses_feature_polygon() {
        let g = PolygonGeometry::from_geojson_str(SQUARE).unwrap();
        assert_eq!(g.polygons().len(), 1);
        assert_eq!(g.area(), 4.0);
        assert_eq!(g.centroid(), Some((1.0, 1.0)));
        assert_eq!(g.bounds(), (0.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn hole_reduces_area_and_shifts_centroid() {
        let g = PolygonGeometry::new(vec![vec![
            vec![[0.0, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 2.0]],
            vec![[2.0, 0.0], [4.0, 0.0], [4.0, 2.0], [2.0, 2.0]],
        ]])
        .unwrap();
        assert_eq!(g.area(), 4.0);
        let (cx, cy) = g.centroid().unwrap();
        assert!((cx - 1.0).abs() < 1e-12);
        assert!((cy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clockwise_ring_has_positive_area() {
        let g = PolygonGeometry::new(vec![vec![vec![
            [0.0, 0.0],
            [0.0, 3.0],
            [1.0, 3.0],
            [1.0, 0.0],
        ]]])
        .unwrap();
        assert_eq!(g.area(), 3.0);
        assert_eq!(g.centroid(), Some((0.5, 1.5)));
    }

    #[test]
    fn feature_collection_merges_parts() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry":
                {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature", "properties": {}, "geometry":
                {"type": "MultiPolygon", "coordinates": [[[[5,5],[6,5],[6,6],[5,6],[5,5]]]]}}
        ]}"#;
        let g = PolygonGeometry::from_geojson_str(text).unwrap();
        assert_eq!(g.polygons().len(), 2);
        assert_eq!(g.area(), 2.0);
        assert_eq!(g.bounds(), (0.0, 0.0, 6.0, 6.0));
    }

    #[test]
    fn rejects_point_geometry() {
        let err = PolygonGeometry::from_geojson_str(r#"{"type": "Point", "coordinates": [1, 2]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
    }

    #[test]
    fn ignores_elevation_and_null_geometries() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": null, "geometry": null},
            {"type": "Feature", "geometry":
                {"type": "Polygon", "coordinates": [[[0,0,10],[1,0,10],[1,1,12],[0,0,10]]]}}
        ]}"#;
        let g = PolygonGeometry::from_geojson_str(text).unwrap();
        assert_eq!(g.polygons()[0][0][1], [1.0, 0.0]);
        assert_eq!(g.area(), 0.5);
    }

    #[test]
    fn rejects_malformed_positions() {
        let one_ordinate = r#"{"type": "Polygon", "coordinates": [[[0],[1,0],[1,1],[0,0]]]}"#;
        assert!(matches!(
            PolygonGeometry::from_geojson_str(one_ordinate),
            Err(Error::InvalidGeometry(_))
        ));
        let text_ordinate = r#"{"type": "Polygon", "coordinates": [[["a",0],[1,0],[1,1]]]}"#;
        assert!(PolygonGeometry::from_geojson_str(text_ordinate).is_err());
    }

    #[test]
    fn rejects_short_ring() {
        assert!(PolygonGeometry::new(vec![vec![vec![[0.0, 0.0], [1.0, 1.0]]]]).is_err());
        assert!(PolygonGeometry::new(vec![]).is_err());
    }

    #[test]
    fn small_roi_far_from_origin_keeps_precise_centroid() {
        let g = PolygonGeometry::rectangle(-106.501, 34.999, -106.499, 35.001);
        let (cx, cy) = g.centroid().unwrap();
        assert!((cx - (-106.5)).abs() < 1e-9);
        assert!((cy - 35.0).abs() < 1e-9);
        assert!((g.area() - 4e-6).abs() < 1e-15);
    }

    #[test]
    fn degenerate_shape_uses_vertex_mean() {
        let g = PolygonGeometry::new(vec![vec![vec![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]]]).unwrap();
        assert_eq!(g.area(), 0.0);
        assert_eq!(g.centroid(), Some((1.0, 1.0)));
    }

    #[test]
    fn wkt_closes_open_rings() {
        let g = PolygonGeometry::new(vec![vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]]).unwrap();
        assert_eq!(g.to_wkt(), "MULTIPOLYGON (((0 0, 1 0, 1 1, 0 0)))");
    }

    #[test]
    fn bounds_overlap_detects_disjoint_boxes() {
        let a = PolygonGeometry::rectangle(0.0, 0.0, 1.0, 1.0);
        let b = PolygonGeometry::rectangle(0.5, 0.5, 2.0, 2.0);
        let c = PolygonGeometry::rectangle(3.0, 3.0, 4.0, 4.0);
        assert!(a.bounds_overlap(&b));
        assert!(!a.bounds_overlap(&c));
    }

    #[test]
    fn same_crs_transform_is_identity() {
        let g = PolygonGeometry::rectangle(-106.5, 35.0, -106.4, 35.1);
        assert_eq!(g.transform(WGS84, "epsg:4326").unwrap(), g);
    }

    #[test]
    fn transform_to_web_mercator_moves_vertices() {
        let g = PolygonGeometry::rectangle(0.0, 0.0, 1.0, 1.0);
        let projected = g.transform(WGS84, "EPSG:3857").unwrap();
        let (min_x, min_y, max_x, _) = projected.bounds();
        assert!(min_x.abs() < 1e-6);
        assert!(min_y.abs() < 1e-6);
        assert!((max_x - 111_319.490_793).abs() < 1.0);
    }
}
