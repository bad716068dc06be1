//! Study-area content hashing
//!
//! The hash identifies a study area independently of floating-point noise:
//! every coordinate is rounded to 7 decimal places before digesting.

use crate::models::{Crs, Geometry};
use sha2::{Digest, Sha256};

/// Decimal places kept when canonicalizing coordinates
pub const HASH_PRECISION: usize = 7;

fn canonical_number(value: f64) -> String {
    let scale = 10f64.powi(HASH_PRECISION as i32);
    let mut rounded = (value * scale).round() / scale;
    // -0.0 and 0.0 must hash identically
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{:.*}", HASH_PRECISION, rounded)
}

fn canonical_coords(coords: &[[f64; 2]]) -> String {
    coords
        .iter()
        .map(|c| format!("{} {}", canonical_number(c[0]), canonical_number(c[1])))
        .collect::<Vec<_>>()
        .join(",")
}

/// Canonical text form of a geometry and CRS, e.g. `POINT(1.0000000 2.0000000)|EPSG:4326`
pub fn canonical_form(geometry: &Geometry, crs: &Crs) -> String {
    let body = match geometry {
        Geometry::Point { coordinates } => canonical_coords(std::slice::from_ref(coordinates)),
        Geometry::LineString { coordinates } => canonical_coords(coordinates),
        Geometry::Polygon { coordinates } => coordinates
            .iter()
            .map(|ring| canonical_coords(ring))
            .collect::<Vec<_>>()
            .join(";"),
    };

    format!("{}({})|{}", geometry.geometry_type().as_wkt_keyword(), body, crs)
}

/// SHA-256 of the canonical form, lowercase hex
pub fn geometry_hash(geometry: &Geometry, crs: &Crs) -> String {
    let digest = Sha256::digest(canonical_form(geometry, crs).as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
