use osmcache_core::models::{Category, ElementKind, Feature};
use serde::{Deserialize, Serialize};

/// Attributes of a matched feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub osm_id: i64,
    pub osm_type: ElementKind,
    pub category: Category,
    pub name: Option<String>,
}

impl From<&Feature> for FeatureSummary {
    fn from(feature: &Feature) -> Self {
        Self {
            osm_id: feature.osm_id,
            osm_type: feature.osm_type,
            category: feature.category,
            name: feature.name.clone(),
        }
    }
}

/// Closest feature to a query point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestFeature {
    #[serde(flatten)]
    pub feature: FeatureSummary,
    /// Planar distance in map units
    pub distance: f64,
}
