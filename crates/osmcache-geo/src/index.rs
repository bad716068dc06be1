use crate::models::{to_geo_geometry, BoundingBox, Geometry};
use crate::spatial::geo_distance_to_point;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::intersects::Intersects;
use geo::Geometry as GeoGeometry;
use osmcache_core::error::{Error, Result};
use rstar::{RTree, RTreeObject, AABB};

/// Indexed geometry with ID
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedGeometry {
    /// Position of the geometry in the indexed layer
    pub id: usize,

    /// The geometry in `geo` form, ready for exact predicates
    pub geometry: GeoGeometry,

    /// Bounding box for spatial indexing
    envelope: AABB<[f64; 2]>,
}

impl IndexedGeometry {
    /// Create a new indexed geometry
    ///
    /// Fails when the geometry has no coordinates or a non-finite one.
    pub fn new(id: usize, geometry: &Geometry) -> Result<Self> {
        if !geometry.is_finite() {
            return Err(Error::InvalidGeometry {
                reason: format!("geometry #{} has non-finite coordinates", id),
            });
        }

        let geo_geom = to_geo_geometry(geometry);
        let rect = geo_geom.bounding_rect().ok_or_else(|| Error::InvalidGeometry {
            reason: format!("geometry #{} is empty", id),
        })?;

        let min = rect.min();
        let max = rect.max();
        Ok(Self {
            id,
            geometry: geo_geom,
            envelope: AABB::from_corners([min.x, min.y], [max.x, max.y]),
        })
    }
}

impl RTreeObject for IndexedGeometry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Read-only R-tree over one feature layer
///
/// Ids are positions in the layer the index was built from.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<IndexedGeometry>,
}

impl SpatialIndex {
    /// Create a spatial index from a collection of geometries
    pub fn from_geometries<'a, I>(geometries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, &'a Geometry)>,
    {
        let indexed = geometries
            .into_iter()
            .map(|(id, geom)| IndexedGeometry::new(id, geom))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Bulk-loading spatial index with {} geometries", indexed.len());
        Ok(Self { tree: RTree::bulk_load(indexed) })
    }

    /// Ids whose envelope intersects the box
    pub fn query_bbox(&self, bbox: &BoundingBox) -> Vec<usize> {
        let envelope = AABB::from_corners([bbox.xmin, bbox.ymin], [bbox.xmax, bbox.ymax]);
        let mut ids: Vec<usize> =
            self.tree.locate_in_envelope_intersecting(&envelope).map(|g| g.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Ids whose geometry intersects `query`, boundary inclusive
    ///
    /// Envelope pruning first, then the exact predicate.
    pub fn query_intersecting(&self, query: &Geometry) -> Vec<usize> {
        let geo_query = to_geo_geometry(query);
        let Some(rect) = geo_query.bounding_rect() else {
            return Vec::new();
        };

        let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|indexed| indexed.geometry.intersects(&geo_query))
            .map(|indexed| indexed.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids within `max_distance` of `point` (inclusive), with their distances
    pub fn query_within_distance(&self, point: [f64; 2], max_distance: f64) -> Vec<(usize, f64)> {
        if !max_distance.is_finite() || max_distance < 0.0 {
            return Vec::new();
        }

        let window = AABB::from_corners(
            [point[0] - max_distance, point[1] - max_distance],
            [point[0] + max_distance, point[1] + max_distance],
        );

        let mut hits: Vec<(usize, f64)> = self
            .tree
            .locate_in_envelope_intersecting(&window)
            .filter_map(|indexed| {
                geo_distance_to_point(&indexed.geometry, point).map(|d| (indexed.id, d))
            })
            .filter(|(_, d)| *d <= max_distance)
            .collect();
        hits.sort_by_key(|(id, _)| *id);
        hits
    }

    /// Get the total number of geometries in the index
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
