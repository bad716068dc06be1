//! One opened generation of the feature store

use osmcache_core::error::QueryError;
use osmcache_core::models::{Category, Feature};
use osmcache_geo::SpatialIndex;
use osmcache_store::FeatureStore;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::SystemTime;

/// Identity of the store file on disk
///
/// Any replacement of the file changes at least one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
    inode: u64,
}

impl Fingerprint {
    /// Fingerprint of `path`, or `None` if it cannot be stat'ed
    pub fn of(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        Some(Self { len: meta.len(), modified: meta.modified().ok(), inode: inode(&meta) })
    }
}

#[cfg(unix)]
fn inode(meta: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn inode(_meta: &fs::Metadata) -> u64 {
    0
}

const LAYER_COUNT: usize = Category::ALL.len();

/// Loaded store plus lazily built layer indexes
#[derive(Debug)]
pub struct StoreSession {
    store: FeatureStore,
    fingerprint: Fingerprint,
    indexes: [OnceLock<Result<SpatialIndex, QueryError>>; LAYER_COUNT],
}

impl StoreSession {
    pub fn open(path: &Path, fingerprint: Fingerprint) -> Result<Self, QueryError> {
        let store = FeatureStore::open(path).map_err(|e| QueryError::unavailable(e.to_string()))?;
        Ok(Self { store, fingerprint, indexes: std::array::from_fn(|_| OnceLock::new()) })
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    /// Features of a layer together with its index
    ///
    /// The index is built on the first call for the layer; concurrent callers
    /// wait for that build.
    pub fn layer(&self, category: Category) -> Result<(&[Feature], &SpatialIndex), QueryError> {
        let features = self.store.layer(category);
        let built = self.indexes[category.index()].get_or_init(|| build_index(category, features));
        match built {
            Ok(index) => Ok((features, index)),
            Err(e) => Err(e.clone()),
        }
    }
}

fn build_index(category: Category, features: &[Feature]) -> Result<SpatialIndex, QueryError> {
    let index = SpatialIndex::from_geometries(features.iter().map(|f| &f.geometry).enumerate())
        .map_err(|e| QueryError::CorruptIndex {
            layer: category.layer_name(),
            reason: e.to_string(),
        })?;
    tracing::debug!("Built spatial index for {} ({} features)", category.layer_name(), index.len());
    Ok(index)
}
