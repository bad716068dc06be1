use crate::hash::geometry_hash;
use crate::models::{BoundingBox, Crs, Geometry};
use crate::transform::{reprojected_bbox, Reproject};
use crate::wkt_io::{parse_wkt, to_wkt};
use osmcache_core::error::{Error, Result};

/// The polygon an analysis runs over, in its own CRS
///
/// Ephemeral: built per request and compared against cache metadata by hash.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyArea {
    geometry: Geometry,
    crs: Crs,
    hash: String,
}

impl StudyArea {
    /// Build a study area from a polygon geometry
    pub fn from_polygon(geometry: Geometry, crs: Crs) -> Result<Self> {
        if !matches!(geometry, Geometry::Polygon { .. }) {
            return Err(Error::InvalidGeometry {
                reason: format!("study area must be a polygon, got {:?}", geometry.geometry_type()),
            });
        }
        if !geometry.is_well_formed() {
            return Err(Error::InvalidGeometry {
                reason: "study area polygon needs a closed ring of at least 4 positions"
                    .to_string(),
            });
        }
        if !geometry.is_finite() {
            return Err(Error::InvalidGeometry {
                reason: "study area has non-finite coordinates".to_string(),
            });
        }

        let hash = geometry_hash(&geometry, &crs);
        Ok(Self { geometry, crs, hash })
    }

    /// Parse a study area from WKT
    pub fn from_wkt(wkt: &str, crs: Crs) -> Result<Self> {
        Self::from_polygon(parse_wkt(wkt)?, crs)
    }

    /// Rectangle covering a layer extent
    pub fn from_extent(extent: BoundingBox, crs: Crs) -> Result<Self> {
        if !extent.is_valid() || extent.width() <= 0.0 || extent.height() <= 0.0 {
            return Err(Error::InvalidGeometry {
                reason: format!("extent ({}) does not span an area", extent),
            });
        }
        Self::from_polygon(Geometry::rectangle(&extent), crs)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Content hash of geometry and CRS
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn wkt(&self) -> String {
        to_wkt(&self.geometry)
    }

    /// Extent in the study area's own CRS
    pub fn bbox(&self) -> BoundingBox {
        // from_polygon guarantees at least one coordinate
        self.geometry.bbox().unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Extent in WGS 84, as sent to the remote source
    pub fn download_bbox(&self, reprojector: &dyn Reproject) -> Result<BoundingBox> {
        reprojected_bbox(reprojector, &self.geometry, &self.crs, &Crs::wgs84())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::ProjReprojector;

    #[test]
    fn test_from_wkt() {
        let area = StudyArea::from_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))", Crs::wgs84()).unwrap();
        assert_eq!(area.bbox(), BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(area.hash().len(), 64);
    }

    #[test]
    fn test_rejects_non_polygon() {
        assert!(StudyArea::from_wkt("POINT(1 1)", Crs::wgs84()).is_err());
        assert!(StudyArea::from_polygon(Geometry::polygon(vec![]), Crs::wgs84()).is_err());
    }

    #[test]
    fn test_from_extent() {
        let extent = BoundingBox::new(10.0, 20.0, 11.0, 21.0);
        let area = StudyArea::from_extent(extent, Crs::wgs84()).unwrap();
        assert_eq!(area.bbox(), extent);

        let degenerate = BoundingBox::new(10.0, 20.0, 10.0, 21.0);
        assert!(StudyArea::from_extent(degenerate, Crs::wgs84()).is_err());
    }

    #[test]
    fn test_same_geometry_same_hash() {
        let a = StudyArea::from_wkt("POLYGON((0 0, 1 0, 1 1, 0 0))", Crs::wgs84()).unwrap();
        let b = StudyArea::from_wkt("POLYGON((0.00000001 0, 1 0, 1 1, 0.00000001 0))", Crs::wgs84()).unwrap();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_download_bbox_in_wgs84() {
        let area = StudyArea::from_wkt("POLYGON((0 0, 1 0, 1 1, 0 0))", Crs::wgs84()).unwrap();
        let bbox = area.download_bbox(&ProjReprojector).unwrap();
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
    }
}
