//! Geometry models for osmcache-geo.
//!
//! This module re-exports canonical types from `osmcache-core` and provides
//! conversions to/from the `geo` crate.

use geo::Geometry as GeoGeometry;

// Re-export canonical types from osmcache-core
pub use osmcache_core::models::{BoundingBox, Crs, Geometry, GeometryType};

fn to_line_string(coords: &[[f64; 2]]) -> geo::LineString {
    geo::LineString::new(coords.iter().map(|c| geo::Coord { x: c[0], y: c[1] }).collect())
}

fn ring_coords(ring: &geo::LineString) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

/// Convert a canonical Geometry to a geo::Geometry
pub fn to_geo_geometry(geom: &Geometry) -> GeoGeometry {
    match geom {
        Geometry::Point { coordinates } => {
            GeoGeometry::Point(geo::Point::new(coordinates[0], coordinates[1]))
        }
        Geometry::LineString { coordinates } => GeoGeometry::LineString(to_line_string(coordinates)),
        Geometry::Polygon { coordinates } => GeoGeometry::Polygon(to_geo_polygon(coordinates)),
    }
}

/// Convert polygon rings (exterior first) to a geo::Polygon
pub fn to_geo_polygon(rings: &[Vec<[f64; 2]>]) -> geo::Polygon {
    match rings.split_first() {
        Some((exterior, interiors)) => geo::Polygon::new(
            to_line_string(exterior),
            interiors.iter().map(|r| to_line_string(r)).collect(),
        ),
        None => geo::Polygon::new(geo::LineString::new(vec![]), vec![]),
    }
}

/// Convert a geo::Polygon to canonical rings (exterior first)
pub fn from_geo_polygon(polygon: &geo::Polygon) -> Vec<Vec<[f64; 2]>> {
    let mut rings = vec![ring_coords(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_coords));
    rings
}

/// Convert a geo::Geometry to a canonical Geometry
///
/// Returns `None` for shapes the cache cannot store: multi-part geometries
/// with more than one part and geometry collections.
pub fn from_geo_geometry(geom: &GeoGeometry) -> Option<Geometry> {
    match geom {
        GeoGeometry::Point(p) => Some(Geometry::point(p.x(), p.y())),
        GeoGeometry::Line(l) => {
            Some(Geometry::line_string(vec![[l.start.x, l.start.y], [l.end.x, l.end.y]]))
        }
        GeoGeometry::LineString(ls) => Some(Geometry::line_string(ring_coords(ls))),
        GeoGeometry::Polygon(p) => Some(Geometry::polygon(from_geo_polygon(p))),
        GeoGeometry::MultiPoint(mp) if mp.0.len() == 1 => {
            from_geo_geometry(&GeoGeometry::Point(mp.0[0]))
        }
        GeoGeometry::MultiLineString(mls) if mls.0.len() == 1 => {
            Some(Geometry::line_string(ring_coords(&mls.0[0])))
        }
        GeoGeometry::MultiPolygon(mp) if mp.0.len() == 1 => {
            Some(Geometry::polygon(from_geo_polygon(&mp.0[0])))
        }
        GeoGeometry::Rect(r) => Some(Geometry::polygon(from_geo_polygon(&r.to_polygon()))),
        GeoGeometry::Triangle(t) => Some(Geometry::polygon(from_geo_polygon(&t.to_polygon()))),
        _ => None,
    }
}
