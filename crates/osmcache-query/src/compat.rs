//! String-keyed call shapes for callers written against the old plugin API
//!
//! Categories are plain names and areas are WKT. Failures are logged and
//! answered with an empty result instead of an error, so a missing cache
//! reads as zero features. Callers that need `CacheUnavailable` or other
//! query errors surfaced go through [`LegacyOsmQuery::engine`] instead.

use osmcache_core::error::QueryError;
use osmcache_core::models::{BoundingBox, Category, Geometry};
use osmcache_geo::wkt_io::parse_wkt;
use std::path::Path;

use crate::engine::LocalQueryEngine;
use crate::models::{FeatureSummary, NearestFeature};

/// Search radius used when a nearest lookup gives none, in map units
pub const DEFAULT_NEAREST_DISTANCE: f64 = 50_000.0;

#[derive(Debug)]
pub struct LegacyOsmQuery {
    engine: LocalQueryEngine,
    default_distance: f64,
}

impl LegacyOsmQuery {
    pub fn new(engine: LocalQueryEngine) -> Self {
        Self { engine, default_distance: DEFAULT_NEAREST_DISTANCE }
    }

    pub fn for_project(project_dir: impl AsRef<Path>) -> Self {
        Self::new(LocalQueryEngine::for_project(project_dir))
    }

    pub fn with_default_distance(mut self, distance: f64) -> Self {
        self.default_distance = distance;
        self
    }

    pub fn engine(&self) -> &LocalQueryEngine {
        &self.engine
    }

    pub fn count_features(&self, category: &str, polygon_wkt: &str) -> usize {
        self.with_area(category, polygon_wkt, |c, area| self.engine.count_features(c, area))
            .unwrap_or(0)
    }

    pub fn get_features_within_polygon(&self, category: &str, polygon_wkt: &str) -> Vec<FeatureSummary> {
        self.with_area(category, polygon_wkt, |c, area| {
            self.engine.get_features_within_polygon(c, area)
        })
        .unwrap_or_default()
    }

    pub fn get_named_features_within_polygon(&self, category: &str, polygon_wkt: &str) -> Vec<String> {
        self.with_area(category, polygon_wkt, |c, area| {
            self.engine.get_named_features_within_polygon(c, area)
        })
        .unwrap_or_default()
    }

    pub fn nearest_feature(
        &self,
        category: &str,
        x: f64,
        y: f64,
        max_distance: Option<f64>,
    ) -> Option<NearestFeature> {
        let category = resolve(category)?;
        let distance = max_distance.unwrap_or(self.default_distance);
        report(self.engine.nearest_feature(category, [x, y], distance)).flatten()
    }

    pub fn features_within_bbox(
        &self,
        category: &str,
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    ) -> Vec<FeatureSummary> {
        let Some(category) = resolve(category) else {
            return Vec::new();
        };
        let bbox = BoundingBox::new(xmin, ymin, xmax, ymax);
        report(self.engine.features_within_bbox(category, &bbox)).unwrap_or_default()
    }

    pub fn clear_cache(&self) {
        self.engine.clear_cache();
    }

    fn with_area<T>(
        &self,
        category: &str,
        polygon_wkt: &str,
        run: impl FnOnce(Category, &Geometry) -> Result<T, QueryError>,
    ) -> Option<T> {
        let category = resolve(category)?;
        let area = match parse_wkt(polygon_wkt) {
            Ok(area) => area,
            Err(e) => {
                tracing::warn!("Invalid polygon geometry for {}: {}", category, e);
                return None;
            }
        };
        report(run(category, &area))
    }
}

fn resolve(category: &str) -> Option<Category> {
    match category.parse() {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    }
}

fn report<T>(result: Result<T, QueryError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Local query failed: {}", e);
            None
        }
    }
}
