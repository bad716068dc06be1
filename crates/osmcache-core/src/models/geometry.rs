//! Canonical geometry types used across all osmcache crates.
//!
//! These types provide a bridge between the JSON feature store and the
//! computational geo crate types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::Error;

/// Coordinate Reference System identified by EPSG code
///
/// Two CRS are the same system iff their EPSG codes are equal; the name is
/// for display only. Serialized as `EPSG:<code>`.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    pub epsg: u32,
    pub name: String,
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Crs {
    pub fn new(epsg: u32, name: impl Into<String>) -> Self {
        Self { epsg, name: name.into() }
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::new(4326, "WGS 84")
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::new(3857, "Web Mercator")
    }

    /// Build a CRS from a bare EPSG code, naming the common ones
    pub fn from_epsg(epsg: u32) -> Self {
        match epsg {
            4326 => Self::wgs84(),
            3857 => Self::web_mercator(),
            _ => Self::new(epsg, format!("EPSG:{}", epsg)),
        }
    }

    /// Authority identifier, e.g. `EPSG:4326`
    pub fn authid(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.epsg == other.epsg
    }
}

impl Hash for Crs {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epsg.hash(state);
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl FromStr for Crs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);

        code.parse::<u32>()
            .map(Crs::from_epsg)
            .map_err(|_| Error::InvalidCrs { value: s.to_string() })
    }
}

impl TryFrom<String> for Crs {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// Axis-aligned bounding box in the units of its CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Smallest box covering every coordinate, `None` when empty
    pub fn from_coords<'a, I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [f64; 2]>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first[0], first[1], first[0], first[1]);
        for c in iter {
            bbox.xmin = bbox.xmin.min(c[0]);
            bbox.ymin = bbox.ymin.min(c[1]);
            bbox.xmax = bbox.xmax.max(c[0]);
            bbox.ymax = bbox.ymax.max(c[1]);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Finite bounds with min <= max on both axes
    pub fn is_valid(&self) -> bool {
        [self.xmin, self.ymin, self.xmax, self.ymax].iter().all(|v| v.is_finite())
            && self.xmin <= self.xmax
            && self.ymin <= self.ymax
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    /// Closed rectangle ring, counter-clockwise from the lower-left corner
    pub fn to_ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.xmin, self.ymin],
            [self.xmax, self.ymin],
            [self.xmax, self.ymax],
            [self.xmin, self.ymax],
            [self.xmin, self.ymin],
        ]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}, {}", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GeometryType {
    #[default]
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    /// Upper-case WKT keyword
    pub fn as_wkt_keyword(&self) -> &'static str {
        match self {
            GeometryType::Point => "POINT",
            GeometryType::LineString => "LINESTRING",
            GeometryType::Polygon => "POLYGON",
        }
    }
}

/// GeoJSON-compatible geometry representation
///
/// This enum maps to the GeoJSON geometry types a cached feature can carry.
/// It is serialized with a `type` tag and converted to/from `geo` crate types
/// in `osmcache-geo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl Geometry {
    /// Create a Point geometry
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { coordinates: [x, y] }
    }

    /// Create a LineString geometry
    pub fn line_string(coords: Vec<[f64; 2]>) -> Self {
        Geometry::LineString { coordinates: coords }
    }

    /// Create a Polygon geometry
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates: rings }
    }

    /// Axis-aligned rectangle polygon covering `bbox`
    pub fn rectangle(bbox: &BoundingBox) -> Self {
        Geometry::Polygon { coordinates: vec![bbox.to_ring()] }
    }

    /// Get the geometry type
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } => GeometryType::Point,
            Geometry::LineString { .. } => GeometryType::LineString,
            Geometry::Polygon { .. } => GeometryType::Polygon,
        }
    }

    /// Iterate every coordinate, ring by ring for polygons
    pub fn coords(&self) -> Box<dyn Iterator<Item = &[f64; 2]> + '_> {
        match self {
            Geometry::Point { coordinates } => Box::new(std::iter::once(coordinates)),
            Geometry::LineString { coordinates } => Box::new(coordinates.iter()),
            Geometry::Polygon { coordinates } => Box::new(coordinates.iter().flatten()),
        }
    }

    /// Bounding box of the geometry, `None` when it has no coordinates
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_coords(self.coords())
    }

    /// Whether every coordinate is a finite number
    pub fn is_finite(&self) -> bool {
        self.coords().all(|c| c[0].is_finite() && c[1].is_finite())
    }

    /// Whether the geometry has the minimum number of vertices for its type
    ///
    /// Polygons need an exterior ring, and every ring must have at least four
    /// positions with the last equal to the first.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Geometry::Point { .. } => true,
            Geometry::LineString { coordinates } => coordinates.len() >= 2,
            Geometry::Polygon { coordinates } => {
                !coordinates.is_empty()
                    && coordinates
                        .iter()
                        .all(|ring| ring.len() >= 4 && ring.first() == ring.last())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_serialization() {
        let point = Geometry::point(115.0, -8.5);
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("Point"));
        assert!(json.contains("115"));

        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(point, parsed);
    }

    #[test]
    fn test_polygon_serialization() {
        let polygon = Geometry::polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]);
        let json = serde_json::to_string(&polygon).unwrap();
        assert!(json.contains("Polygon"));

        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(polygon, parsed);
    }

    #[test]
    fn test_crs_parse_and_display() {
        let crs: Crs = "EPSG:3857".parse().unwrap();
        assert_eq!(crs, Crs::web_mercator());
        assert_eq!(crs.to_string(), "EPSG:3857");

        let bare: Crs = "32748".parse().unwrap();
        assert_eq!(bare.epsg, 32748);

        assert!("WGS84".parse::<Crs>().is_err());
    }

    #[test]
    fn test_crs_equality_ignores_name() {
        assert_eq!(Crs::new(4326, "anything"), Crs::wgs84());
        assert_ne!(Crs::wgs84(), Crs::web_mercator());
    }

    #[test]
    fn test_crs_serializes_as_authid() {
        let json = serde_json::to_string(&Crs::wgs84()).unwrap();
        assert_eq!(json, "\"EPSG:4326\"");
        let parsed: Crs = serde_json::from_str("\"EPSG:25832\"").unwrap();
        assert_eq!(parsed.epsg, 25832);
    }

    #[test]
    fn test_well_formed_polygon_rings_are_closed() {
        let closed = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let open = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        assert!(Geometry::polygon(vec![closed.clone()]).is_well_formed());
        assert!(!Geometry::polygon(vec![open.clone()]).is_well_formed());
        assert!(!Geometry::polygon(vec![closed.clone(), open]).is_well_formed());
        assert!(!Geometry::polygon(vec![closed[..3].to_vec()]).is_well_formed());
        assert!(!Geometry::polygon(vec![]).is_well_formed());
        assert!(!Geometry::line_string(vec![[0.0, 0.0]]).is_well_formed());
    }

    #[test]
    fn test_geometry_bbox() {
        let line = Geometry::line_string(vec![[1.0, 5.0], [-2.0, 3.0], [4.0, 0.5]]);
        let bbox = line.bbox().unwrap();
        assert_eq!(bbox, BoundingBox::new(-2.0, 0.5, 4.0, 5.0));
    }

    #[test]
    fn test_rectangle_from_bbox() {
        let rect = Geometry::rectangle(&BoundingBox::new(0.0, 0.0, 2.0, 1.0));
        match rect {
            Geometry::Polygon { coordinates } => {
                assert_eq!(coordinates[0].len(), 5);
                assert_eq!(coordinates[0].first(), coordinates[0].last());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_detection() {
        assert!(Geometry::point(1.0, 2.0).is_finite());
        assert!(!Geometry::point(f64::NAN, 2.0).is_finite());
        assert!(!Geometry::line_string(vec![[0.0, 0.0], [f64::INFINITY, 1.0]]).is_finite());
    }

    #[test]
    fn test_bbox_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(1.0, 1.0, 2.0, 2.0);
        let c = BoundingBox::new(1.5, 1.5, 2.0, 2.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
