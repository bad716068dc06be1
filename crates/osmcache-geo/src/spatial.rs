use geo::algorithm::closest_point::ClosestPoint;
use geo::algorithm::intersects::Intersects;
use geo::{Closest, Distance, Euclidean, Geometry as GeoGeometry, Point};

/// Planar distance from a geo geometry to a point, in map units
///
/// Zero when the point lies on or inside the geometry. Returns `None` when
/// no closest point can be determined (e.g. empty geometries).
pub fn geo_distance_to_point(geometry: &GeoGeometry, point: [f64; 2]) -> Option<f64> {
    let p = Point::new(point[0], point[1]);

    if geometry.intersects(&p) {
        return Some(0.0);
    }

    match geometry.closest_point(&p) {
        Closest::Intersection(_) => Some(0.0),
        Closest::SinglePoint(closest) => Some(Euclidean.distance(closest, p)),
        Closest::Indeterminate => None,
    }
}
