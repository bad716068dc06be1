//! WKT reading and writing for canonical geometries

use crate::models::{from_geo_geometry, to_geo_geometry, Geometry};
use osmcache_core::error::{Error, Result};
use wkt::{ToWkt, TryFromWkt};

/// Parse a WKT string into a canonical geometry
pub fn parse_wkt(input: &str) -> Result<Geometry> {
    let geo_geom = geo::Geometry::<f64>::try_from_wkt_str(input.trim())
        .map_err(|e| Error::InvalidGeometry { reason: format!("Invalid WKT: {}", e) })?;

    from_geo_geometry(&geo_geom).ok_or_else(|| Error::InvalidGeometry {
        reason: "WKT must describe a single point, line string or polygon".to_string(),
    })
}

/// Render a canonical geometry as WKT
pub fn to_wkt(geometry: &Geometry) -> String {
    to_geo_geometry(geometry).wkt_string()
}
