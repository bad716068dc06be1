//! Raw elements to cache features
//!
//! Geometry is resolved in EPSG:4326 from node references, inline geometry or
//! the element centre, then reprojected into the cache CRS.

use geo::algorithm::area::Area;
use geo::algorithm::contains::Contains;
use osmcache_core::models::{Category, ElementKind, Feature, Geometry};
use osmcache_geo::models::to_geo_polygon;
use osmcache_geo::transform::{reproject_geometry, CoordTransform};
use std::collections::{HashMap, HashSet};

use crate::elements::{LatLon, ParsedResponse, RawElement, RawRelation, RawWay};

/// Features of one category, ordered by `(osm_id, osm_type)`
#[derive(Debug, Default)]
pub struct NormalizedLayer {
    pub features: Vec<Feature>,
    /// Tagged elements that produced no usable feature
    pub dropped: usize,
    /// Repeated `(id, kind)` pairs that were skipped
    pub duplicates: usize,
}

struct Lookup<'a> {
    nodes: HashMap<i64, [f64; 2]>,
    ways: HashMap<i64, &'a RawWay>,
}

impl<'a> Lookup<'a> {
    fn new(elements: &'a [RawElement]) -> Self {
        let mut nodes = HashMap::new();
        let mut ways = HashMap::new();
        for element in elements {
            match element {
                RawElement::Node(n) => {
                    nodes.entry(n.id).or_insert([n.lon, n.lat]);
                }
                RawElement::Way(w) => {
                    ways.entry(w.id).or_insert(w);
                }
                RawElement::Relation(_) => {}
            }
        }
        Self { nodes, ways }
    }

    /// Coordinates of a way, from inline geometry or node references
    fn way_coords(&self, way: &RawWay) -> Option<Vec<[f64; 2]>> {
        if let Some(geometry) = &way.geometry {
            if !geometry.is_empty() {
                return Some(geometry.iter().map(LatLon::xy).collect());
            }
        }
        if way.nodes.is_empty() {
            return None;
        }
        way.nodes.iter().map(|id| self.nodes.get(id).copied()).collect()
    }
}

fn is_closed_ring(coords: &[[f64; 2]]) -> bool {
    coords.len() >= 4 && coords.first() == coords.last()
}

fn way_geometry(lookup: &Lookup<'_>, way: &RawWay) -> Option<Geometry> {
    match lookup.way_coords(way) {
        Some(coords) if is_closed_ring(&coords) => Some(Geometry::polygon(vec![coords])),
        Some(coords) if coords.len() >= 2 => Some(Geometry::line_string(coords)),
        _ => way.center.map(|c| Geometry::point(c.lon, c.lat)),
    }
}

/// Join open segments end to end into closed rings
///
/// Segments that cannot be closed are discarded.
fn assemble_rings(mut segments: Vec<Vec<[f64; 2]>>) -> Vec<Vec<[f64; 2]>> {
    let mut rings = Vec::new();

    while let Some(mut current) = segments.pop() {
        loop {
            if is_closed_ring(&current) {
                rings.push(current);
                break;
            }
            let (Some(&start), Some(&end)) = (current.first(), current.last()) else {
                break;
            };

            let next = segments.iter().position(|s| {
                s.first() == Some(&end)
                    || s.last() == Some(&end)
                    || s.first() == Some(&start)
                    || s.last() == Some(&start)
            });
            let Some(index) = next else {
                break;
            };

            let mut segment = segments.swap_remove(index);
            if segment.first() == Some(&end) {
                current.extend(segment.into_iter().skip(1));
            } else if segment.last() == Some(&end) {
                segment.reverse();
                current.extend(segment.into_iter().skip(1));
            } else if segment.last() == Some(&start) {
                segment.pop();
                segment.extend(current);
                current = segment;
            } else {
                segment.reverse();
                segment.pop();
                segment.extend(current);
                current = segment;
            }
        }
    }
    rings
}

fn relation_geometry(lookup: &Lookup<'_>, relation: &RawRelation) -> Option<Geometry> {
    let mut outer = Vec::new();
    let mut inner = Vec::new();

    for member in relation.members.iter().filter(|m| m.kind == "way") {
        let coords = match &member.geometry {
            Some(geometry) if !geometry.is_empty() => Some(geometry.iter().map(LatLon::xy).collect()),
            _ => lookup.ways.get(&member.reference).and_then(|w| lookup.way_coords(w)),
        };
        let Some(coords) = coords else {
            continue;
        };
        match member.role.as_str() {
            "inner" => inner.push(coords),
            "outer" | "" => outer.push(coords),
            _ => {}
        }
    }

    let outer_rings = assemble_rings(outer);
    let largest = outer_rings.into_iter().max_by(|a, b| {
        let area_a = to_geo_polygon(std::slice::from_ref(a)).unsigned_area();
        let area_b = to_geo_polygon(std::slice::from_ref(b)).unsigned_area();
        area_a.total_cmp(&area_b)
    });

    match largest {
        Some(exterior) => {
            let shell = to_geo_polygon(std::slice::from_ref(&exterior));
            let holes: Vec<Vec<[f64; 2]>> = assemble_rings(inner)
                .into_iter()
                .filter(|ring| {
                    let p = ring[0];
                    shell.contains(&geo::Point::new(p[0], p[1]))
                })
                .collect();

            let mut rings = vec![exterior];
            rings.extend(holes);
            Some(Geometry::polygon(rings))
        }
        None => relation.center.map(|c| Geometry::point(c.lon, c.lat)),
    }
}

fn element_feature(
    lookup: &Lookup<'_>,
    element: &RawElement,
    category: Category,
    transform: &dyn CoordTransform,
) -> Option<Feature> {
    let (osm_id, osm_type, geometry) = match element {
        RawElement::Node(n) => (n.id, ElementKind::Node, Some(Geometry::point(n.lon, n.lat))),
        RawElement::Way(w) => (w.id, ElementKind::Way, way_geometry(lookup, w)),
        RawElement::Relation(r) => (r.id, ElementKind::Relation, relation_geometry(lookup, r)),
    };

    let Some(geometry) = geometry else {
        tracing::debug!("Dropping {} {}: no resolvable geometry", osm_type, osm_id);
        return None;
    };

    let geometry = match reproject_geometry(&geometry, transform) {
        Ok(g) => g,
        Err(e) => {
            tracing::debug!("Dropping {} {}: {}", osm_type, osm_id, e);
            return None;
        }
    };

    if !geometry.is_finite() || !geometry.is_well_formed() {
        tracing::debug!("Dropping {} {}: invalid coordinates", osm_type, osm_id);
        return None;
    }

    Some(Feature {
        osm_id,
        osm_type,
        category,
        name: element.tags().get("name").cloned(),
        geometry,
    })
}

/// Turn the tagged elements of a response into features of `category`
///
/// Untagged elements only supply geometry. The first occurrence of an
/// `(id, kind)` pair wins.
pub fn normalize_elements(
    parsed: &ParsedResponse,
    category: Category,
    transform: &dyn CoordTransform,
) -> NormalizedLayer {
    let lookup = Lookup::new(&parsed.elements);
    let mut seen = HashSet::new();
    let mut layer = NormalizedLayer { dropped: parsed.dropped, ..Default::default() };

    for element in parsed.elements.iter().filter(|e| !e.tags().is_empty()) {
        match element_feature(&lookup, element, category, transform) {
            Some(feature) => {
                if seen.insert(feature.key()) {
                    layer.features.push(feature);
                } else {
                    layer.duplicates += 1;
                }
            }
            None => layer.dropped += 1,
        }
    }

    layer.features.sort_by_key(Feature::key);
    layer
}
