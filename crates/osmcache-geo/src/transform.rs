//! CRS transformation

use crate::models::{BoundingBox, Crs, Geometry};
use osmcache_core::error::{Error, Result};
use proj::Proj;

/// Check if two CRS are the same
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    crs1.epsg == crs2.epsg
}

/// Converts single coordinates between two fixed CRS
pub trait CoordTransform {
    fn convert(&self, coord: [f64; 2]) -> Result<[f64; 2]>;
}

/// Port for reprojection keyed by source and target CRS
pub trait Reproject: Send + Sync {
    /// Build a coordinate transform from `from` to `to`
    fn transformer(&self, from: &Crs, to: &Crs) -> Result<Box<dyn CoordTransform>>;
}

/// Pass-through transform for matching CRS
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl CoordTransform for Identity {
    fn convert(&self, coord: [f64; 2]) -> Result<[f64; 2]> {
        Ok(coord)
    }
}

struct ProjTransform {
    proj: Proj,
    from: String,
    to: String,
}

impl CoordTransform for ProjTransform {
    fn convert(&self, coord: [f64; 2]) -> Result<[f64; 2]> {
        let (x, y) = self.proj.convert((coord[0], coord[1])).map_err(|e| Error::Reprojection {
            from: self.from.clone(),
            to: self.to.clone(),
            reason: e.to_string(),
        })?;
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::Reprojection {
                from: self.from.clone(),
                to: self.to.clone(),
                reason: format!("coordinate ({}, {}) has no finite image", coord[0], coord[1]),
            });
        }
        Ok([x, y])
    }
}

/// PROJ-backed reprojection
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjReprojector;

impl Reproject for ProjReprojector {
    fn transformer(&self, from: &Crs, to: &Crs) -> Result<Box<dyn CoordTransform>> {
        // If CRS are the same, no transformation needed
        if crs_match(from, to) {
            return Ok(Box::new(Identity));
        }

        let from_proj = from.authid();
        let to_proj = to.authid();

        let proj = Proj::new_known_crs(&from_proj, &to_proj, None).map_err(|e| {
            Error::Reprojection {
                from: from_proj.clone(),
                to: to_proj.clone(),
                reason: format!("Failed to create projection: {}", e),
            }
        })?;

        Ok(Box::new(ProjTransform { proj, from: from_proj, to: to_proj }))
    }
}

/// Reproject a geometry with a prepared transform
pub fn reproject_geometry(geometry: &Geometry, transform: &dyn CoordTransform) -> Result<Geometry> {
    let convert_all = |coords: &[[f64; 2]]| -> Result<Vec<[f64; 2]>> {
        coords.iter().map(|c| transform.convert(*c)).collect()
    };

    Ok(match geometry {
        Geometry::Point { coordinates } => {
            Geometry::Point { coordinates: transform.convert(*coordinates)? }
        }
        Geometry::LineString { coordinates } => {
            Geometry::LineString { coordinates: convert_all(coordinates.as_slice())? }
        }
        Geometry::Polygon { coordinates } => Geometry::Polygon {
            coordinates: coordinates
                .iter()
                .map(|ring| convert_all(ring.as_slice()))
                .collect::<Result<_>>()?,
        },
    })
}

/// Reproject a geometry between two CRS
pub fn reproject(
    reprojector: &dyn Reproject,
    geometry: &Geometry,
    from: &Crs,
    to: &Crs,
) -> Result<Geometry> {
    let transform = reprojector.transformer(from, to)?;
    reproject_geometry(geometry, transform.as_ref())
}

/// Bounding box of a geometry after reprojection
pub fn reprojected_bbox(
    reprojector: &dyn Reproject,
    geometry: &Geometry,
    from: &Crs,
    to: &Crs,
) -> Result<BoundingBox> {
    reproject(reprojector, geometry, from, to)?
        .bbox()
        .ok_or_else(|| Error::InvalidGeometry { reason: "geometry has no coordinates".to_string() })
}
