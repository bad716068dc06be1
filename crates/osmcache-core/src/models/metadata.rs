use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::Category;
use super::geometry::{BoundingBox, Crs};
use crate::error::ValidationError;

/// Format version written into every metadata file
pub const CACHE_VERSION: &str = "1.0";

/// Metadata persisted next to the feature store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Cache format version
    pub version: String,

    /// When the cache was committed
    pub created: DateTime<Utc>,

    /// Study area the cache was downloaded for
    pub geometry_wkt: String,

    /// CRS of the study area and of every cached feature
    pub crs: Crs,

    /// Content hash of the study area geometry and CRS
    pub geometry_hash: String,

    /// Study area extent in `crs`
    pub bbox: BoundingBox,

    /// When the source data was fetched
    pub osm_timestamp: DateTime<Utc>,

    /// Categories whose layers were fully written
    pub categories: Vec<Category>,

    /// Feature store generation this metadata was committed with
    #[serde(default)]
    pub generation: u64,
}

impl CacheMetadata {
    pub fn has_category(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

/// Human-facing summary of a cache on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub created: DateTime<Utc>,
    pub osm_timestamp: DateTime<Utc>,
    pub categories: Vec<Category>,
    pub counts: BTreeMap<Category, usize>,
    pub size_bytes: u64,
    pub bbox: BoundingBox,
    pub crs: Crs,
    pub generation: u64,
}

impl CacheInfo {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn total_features(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Result of validating a cache against a study area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    Valid,
    Invalid(ValidationError),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CacheMetadata {
        CacheMetadata {
            version: CACHE_VERSION.to_string(),
            created: Utc::now(),
            geometry_wkt: "POLYGON((0 0,1 0,1 1,0 1,0 0))".to_string(),
            crs: Crs::wgs84(),
            geometry_hash: "abc".to_string(),
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            osm_timestamp: Utc::now(),
            categories: vec![Category::Schools, Category::LeisureParks],
            generation: 3,
        }
    }

    #[test]
    fn test_metadata_json_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["crs"], "EPSG:4326");
        assert_eq!(value["categories"][1], "leisure_parks");
        assert_eq!(value["bbox"]["xmax"], 1.0);
        assert_eq!(value["generation"], 3);
    }

    #[test]
    fn test_generation_defaults_when_absent() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value.as_object_mut().unwrap().remove("generation");
        let parsed: CacheMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.generation, 0);
    }

    #[test]
    fn test_cache_info_size_mb() {
        let meta = sample();
        let info = CacheInfo {
            created: meta.created,
            osm_timestamp: meta.osm_timestamp,
            categories: meta.categories.clone(),
            counts: BTreeMap::from([(Category::Schools, 3), (Category::LeisureParks, 4)]),
            size_bytes: 2 * 1024 * 1024,
            bbox: meta.bbox,
            crs: meta.crs.clone(),
            generation: meta.generation,
        };
        assert!((info.size_mb() - 2.0).abs() < f64::EPSILON);
        assert_eq!(info.total_features(), 7);
    }
}
