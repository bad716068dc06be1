use osmcache_core::models::CacheMetadata;
use osmcache_query::{LegacyOsmQuery, LocalQueryEngine};
use osmcache_store::CacheLayout;
use std::ops::Deref;

/// Query access to a cache that was valid when the handle was opened
///
/// Owns its query session; indexes are released when the handle drops.
#[derive(Debug)]
pub struct CacheHandle {
    metadata: CacheMetadata,
    engine: LocalQueryEngine,
}

impl CacheHandle {
    pub(crate) fn new(layout: CacheLayout, metadata: CacheMetadata) -> Self {
        Self { metadata, engine: LocalQueryEngine::new(layout) }
    }

    /// Metadata as validated when the handle was opened
    pub fn metadata(&self) -> &CacheMetadata {
        &self.metadata
    }

    pub fn layout(&self) -> &CacheLayout {
        self.engine.layout()
    }

    pub fn engine(&self) -> &LocalQueryEngine {
        &self.engine
    }

    /// Switch to string-keyed legacy call shapes
    pub fn into_legacy(self, default_distance: f64) -> LegacyOsmQuery {
        let layout = self.engine.layout().clone();
        LegacyOsmQuery::new(LocalQueryEngine::new(layout)).with_default_distance(default_distance)
    }
}

impl Deref for CacheHandle {
    type Target = LocalQueryEngine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

impl Drop for CacheHandle {
    fn drop(&mut self) {
        self.engine.clear_cache();
        tracing::debug!("Released cache handle for {}", self.engine.layout().root().display());
    }
}
