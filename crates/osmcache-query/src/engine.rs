use osmcache_core::error::QueryError;
use osmcache_core::models::{BoundingBox, Category, Feature, Geometry};
use osmcache_store::{read_metadata, CacheLayout};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::models::{FeatureSummary, NearestFeature};
use crate::session::{Fingerprint, StoreSession};

/// Attempts at reading a store whose metadata disagrees with it
const CONSISTENCY_ATTEMPTS: usize = 3;
const CONSISTENCY_BACKOFF: Duration = Duration::from_millis(25);

/// Spatial queries against a project's feature store
///
/// Never touches the network. Each call checks whether the store file was
/// replaced since it was opened and reopens it if so.
#[derive(Debug)]
pub struct LocalQueryEngine {
    layout: CacheLayout,
    session: RwLock<Option<Arc<StoreSession>>>,
}

impl LocalQueryEngine {
    pub fn new(layout: CacheLayout) -> Self {
        Self { layout, session: RwLock::new(None) }
    }

    pub fn for_project(project_dir: impl AsRef<Path>) -> Self {
        Self::new(CacheLayout::for_project(project_dir))
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Current session, reopened if the store changed on disk
    pub fn session(&self) -> Result<Arc<StoreSession>, QueryError> {
        let path = self.layout.store_path();
        let Some(fingerprint) = Fingerprint::of(&path) else {
            self.clear_cache();
            return Err(QueryError::unavailable(format!(
                "no feature store at {}",
                path.display()
            )));
        };

        if let Some(current) = self.current() {
            if current.fingerprint() == &fingerprint {
                return Ok(current);
            }
            tracing::debug!("Feature store changed on disk, reopening");
        }

        let session = Arc::new(self.open_consistent(&path, fingerprint)?);
        match self.session.write() {
            Ok(mut slot) => *slot = Some(session.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(session.clone()),
        }
        Ok(session)
    }

    fn current(&self) -> Option<Arc<StoreSession>> {
        match self.session.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Open the store, riding out a commit caught between its two renames
    fn open_consistent(&self, path: &Path, fingerprint: Fingerprint) -> Result<StoreSession, QueryError> {
        let mut attempt = 0;
        loop {
            let session = StoreSession::open(path, fingerprint.clone())?;
            let metadata_generation = read_metadata(&self.layout.metadata_path())
                .ok()
                .flatten()
                .map(|m| m.generation);

            match metadata_generation {
                Some(generation) if generation != session.generation() => {
                    attempt += 1;
                    if attempt >= CONSISTENCY_ATTEMPTS {
                        return Err(QueryError::unavailable(format!(
                            "feature store generation {} does not match metadata generation {}",
                            session.generation(),
                            generation
                        )));
                    }
                    std::thread::sleep(CONSISTENCY_BACKOFF);
                }
                _ => return Ok(session),
            }
        }
    }

    /// Drop the open session and every layer index
    pub fn clear_cache(&self) {
        match self.session.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        tracing::debug!("Cleared query session");
    }

    /// Features of `category` intersecting `area`, in `(osm_id, osm_type)` order
    fn matching(
        session: &StoreSession,
        category: Category,
        area: &Geometry,
    ) -> Result<Vec<FeatureSummary>, QueryError> {
        check_query_geometry(area)?;
        let (features, index) = session.layer(category)?;
        Ok(summaries(features, index.query_intersecting(area)))
    }

    /// Number of features of `category` intersecting `area`
    pub fn count_features(&self, category: Category, area: &Geometry) -> Result<usize, QueryError> {
        check_query_geometry(area)?;
        let session = self.session()?;
        let (_, index) = session.layer(category)?;
        Ok(index.query_intersecting(area).len())
    }

    pub fn get_features_within_polygon(
        &self,
        category: Category,
        area: &Geometry,
    ) -> Result<Vec<FeatureSummary>, QueryError> {
        let session = self.session()?;
        Self::matching(&session, category, area)
    }

    /// Names of matching features; nameless ones are omitted
    pub fn get_named_features_within_polygon(
        &self,
        category: Category,
        area: &Geometry,
    ) -> Result<Vec<String>, QueryError> {
        let session = self.session()?;
        Ok(Self::matching(&session, category, area)?
            .into_iter()
            .filter_map(|f| f.name.filter(|n| !n.is_empty()))
            .collect())
    }

    /// Closest feature within `max_distance` (inclusive) of `point`
    ///
    /// Ties go to the lowest `(osm_id, osm_type)`.
    pub fn nearest_feature(
        &self,
        category: Category,
        point: [f64; 2],
        max_distance: f64,
    ) -> Result<Option<NearestFeature>, QueryError> {
        if !point[0].is_finite() || !point[1].is_finite() {
            return Err(QueryError::InvalidGeometry {
                reason: "query point has non-finite coordinates".to_string(),
            });
        }
        let session = self.session()?;
        let (features, index) = session.layer(category)?;

        let best = index
            .query_within_distance(point, max_distance)
            .into_iter()
            .min_by(|(a_id, a_dist), (b_id, b_dist)| {
                a_dist
                    .total_cmp(b_dist)
                    .then_with(|| features[*a_id].key().cmp(&features[*b_id].key()))
            });

        Ok(best.map(|(id, distance)| NearestFeature {
            feature: FeatureSummary::from(&features[id]),
            distance,
        }))
    }

    /// Features of `category` whose extent intersects `bbox`
    pub fn features_within_bbox(
        &self,
        category: Category,
        bbox: &BoundingBox,
    ) -> Result<Vec<FeatureSummary>, QueryError> {
        if !bbox.is_valid() {
            return Err(QueryError::InvalidGeometry { reason: format!("invalid bbox {}", bbox) });
        }
        let session = self.session()?;
        let (features, index) = session.layer(category)?;
        Ok(summaries(features, index.query_bbox(bbox)))
    }
}

fn check_query_geometry(area: &Geometry) -> Result<(), QueryError> {
    if !area.is_finite() || !area.is_well_formed() {
        return Err(QueryError::InvalidGeometry {
            reason: "query geometry is empty, unclosed or has non-finite coordinates".to_string(),
        });
    }
    Ok(())
}

fn summaries(features: &[Feature], ids: Vec<usize>) -> Vec<FeatureSummary> {
    let mut matched: Vec<&Feature> = ids.into_iter().filter_map(|id| features.get(id)).collect();
    matched.sort_by_key(|f| f.key());
    matched.into_iter().map(FeatureSummary::from).collect()
}
