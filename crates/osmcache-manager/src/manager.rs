use osmcache_core::models::{CacheInfo, Category, Crs, Geometry, Validity};
use osmcache_core::ports::ProgressSink;
use osmcache_fetch::{DownloadError, DownloadOutcome, Downloader};
use osmcache_geo::StudyArea;
use osmcache_store::{clear_cache, read_metadata, store_size_bytes, CacheLayout, FeatureStore};
use std::fs;
use tokio_util::sync::CancellationToken;

use crate::error::CacheError;
use crate::handle::CacheHandle;
use crate::state::CacheState;
use crate::validator::validate;

/// Drives one cache location through its lifecycle
///
/// Validity is recomputed from disk on every request and never carried
/// across runs.
pub struct CacheManager {
    layout: CacheLayout,
    downloader: Downloader,
    state: CacheState,
    /// State to return to when a failed download is aborted
    validated: CacheState,
    last_outcome: Option<DownloadOutcome>,
    last_error: Option<DownloadError>,
}

impl CacheManager {
    pub fn new(layout: CacheLayout, downloader: Downloader) -> Self {
        Self {
            layout,
            downloader,
            state: CacheState::NoCache,
            validated: CacheState::NoCache,
            last_outcome: None,
            last_error: None,
        }
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// Outcome of the last download that committed
    pub fn last_outcome(&self) -> Option<&DownloadOutcome> {
        self.last_outcome.as_ref()
    }

    /// Error of the last download that committed nothing
    pub fn last_error(&self) -> Option<&DownloadError> {
        self.last_error.as_ref()
    }

    fn transition_error(&self, action: &'static str) -> CacheError {
        CacheError::InvalidTransition { state: self.state.to_string(), action }
    }

    fn validated_state(&self, study_area: &StudyArea) -> CacheState {
        if !self.layout.store_path().exists() && !self.layout.metadata_path().exists() {
            return CacheState::NoCache;
        }
        match validate(&self.layout, study_area) {
            Validity::Valid => CacheState::Valid,
            Validity::Invalid(reason) => CacheState::Invalid(reason),
        }
    }

    /// Validate the cache on disk against `study_area`
    pub fn check(&mut self, study_area: &StudyArea) -> Result<&CacheState, CacheError> {
        if matches!(self.state, CacheState::Downloading | CacheState::Error(_)) {
            return Err(self.transition_error("validate"));
        }

        let state = self.validated_state(study_area);
        match &state {
            CacheState::Invalid(reason) => {
                tracing::warn!("Cache at {} is invalid: {}", self.layout.root().display(), reason)
            }
            other => tracing::info!("Cache at {} is {}", self.layout.root().display(), other),
        }
        self.validated = state.clone();
        self.state = state;
        Ok(&self.state)
    }

    /// Validate, downloading when there is no cache yet
    ///
    /// An invalid cache is left alone; it is only replaced through
    /// [`CacheManager::confirm_refresh`].
    pub async fn ensure(
        &mut self,
        study_area: &StudyArea,
        categories: &[Category],
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<&CacheState, CacheError> {
        self.check(study_area)?;
        if self.state == CacheState::NoCache {
            self.download(study_area, categories, progress, cancel).await?;
        }
        Ok(&self.state)
    }

    /// Replace the cache with a fresh download
    ///
    /// An invalid cache is cleared first. A valid one stays in place until
    /// the new store commits over it, so a failed refresh leaves it intact.
    pub async fn confirm_refresh(
        &mut self,
        study_area: &StudyArea,
        categories: &[Category],
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<&CacheState, CacheError> {
        match self.state {
            CacheState::Invalid(_) => {
                clear_cache(&self.layout)?;
                self.validated = CacheState::NoCache;
            }
            CacheState::Valid => {}
            _ => return Err(self.transition_error("refresh")),
        }

        self.download(study_area, categories, progress, cancel).await?;
        Ok(&self.state)
    }

    /// Run the download again after a failed attempt
    pub async fn retry(
        &mut self,
        study_area: &StudyArea,
        categories: &[Category],
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<&CacheState, CacheError> {
        if !matches!(self.state, CacheState::Error(_)) {
            return Err(self.transition_error("retry"));
        }
        self.download(study_area, categories, progress, cancel).await?;
        Ok(&self.state)
    }

    /// Give up after a failed download and return to the validated state
    pub fn abort(&mut self, study_area: &StudyArea) -> Result<&CacheState, CacheError> {
        if !matches!(self.state, CacheState::Error(_)) {
            return Err(self.transition_error("abort"));
        }
        self.state = self.validated_state(study_area);
        self.validated = self.state.clone();
        Ok(&self.state)
    }

    async fn download(
        &mut self,
        study_area: &StudyArea,
        categories: &[Category],
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), CacheError> {
        let mut job = self.downloader.job_for(study_area, categories)?;
        self.state = CacheState::Downloading;
        self.last_error = None;

        let result = self
            .downloader
            .download_and_cache(&self.layout, study_area, &mut job, progress, cancel)
            .await;

        match result {
            Ok(outcome) => {
                for (category, reason) in &outcome.failed {
                    tracing::warn!("{} not cached: {}", category.label(), reason);
                }
                tracing::info!(
                    "Cached {} features in {} categories (generation {})",
                    outcome.counts.values().sum::<usize>(),
                    outcome.counts.len(),
                    outcome.generation
                );
                self.state = CacheState::Valid;
                self.validated = CacheState::Valid;
                self.last_outcome = Some(outcome);
            }
            Err(e) => {
                tracing::warn!("Download failed: {}", e);
                self.state = CacheState::Error(e.to_string());
                self.last_error = Some(e);
            }
        }
        Ok(())
    }

    /// Summary of the cache on disk, `None` when there is none
    pub fn get_cache_info(&self) -> Result<Option<CacheInfo>, CacheError> {
        let Some(metadata) = read_metadata(&self.layout.metadata_path())? else {
            return Ok(None);
        };
        let store = FeatureStore::open(&self.layout.store_path())?;
        let metadata_bytes = fs::metadata(self.layout.metadata_path()).map(|m| m.len()).unwrap_or(0);

        Ok(Some(CacheInfo {
            created: metadata.created,
            osm_timestamp: metadata.osm_timestamp,
            categories: metadata.categories,
            counts: store.counts(),
            size_bytes: store_size_bytes(&self.layout) + metadata_bytes,
            bbox: metadata.bbox,
            crs: metadata.crs,
            generation: store.generation(),
        }))
    }

    /// Delete the cache under the write lock
    pub fn clear_cache(&mut self) -> Result<(), CacheError> {
        if self.state == CacheState::Downloading {
            return Err(self.transition_error("clear"));
        }
        clear_cache(&self.layout)?;
        self.state = CacheState::NoCache;
        self.validated = CacheState::NoCache;
        Ok(())
    }

    /// Whether the cache can serve `geometry` in `crs`
    pub fn is_valid_for_geometry(&self, geometry: &Geometry, crs: &Crs) -> Result<bool, CacheError> {
        let study_area = StudyArea::from_polygon(geometry.clone(), crs.clone())?;
        Ok(validate(&self.layout, &study_area).is_valid())
    }

    /// Query handle over the cache; requires a valid state
    pub fn open_handle(&self) -> Result<CacheHandle, CacheError> {
        if !self.state.is_valid() {
            return Err(self.transition_error("open a query handle"));
        }
        let metadata = read_metadata(&self.layout.metadata_path())?.ok_or_else(|| {
            CacheError::Query(osmcache_core::error::QueryError::unavailable("cache metadata is missing"))
        })?;
        Ok(CacheHandle::new(self.layout.clone(), metadata))
    }
}
