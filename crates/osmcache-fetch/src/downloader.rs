//! Download driver
//!
//! Categories are fetched concurrently on the calling task, normalized as
//! they arrive, and staged in a [`StoreWriter`]. The store is committed once
//! at the end with every category that succeeded.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use osmcache_core::config::LayeredConfig;
use osmcache_core::error::NetworkError;
use osmcache_core::models::{BoundingBox, CacheMetadata, Category, Crs, CACHE_VERSION};
use osmcache_core::ports::{ElementSource, ProgressSink};
use osmcache_geo::{ProjReprojector, Reproject, StudyArea};
use osmcache_store::{CacheLayout, StoreWriter};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::elements::parse_response;
use crate::error::DownloadError;
use crate::job::{CategoryState, DownloadJob, DownloadOutcome, FailureReason};
use crate::normalize::{normalize_elements, NormalizedLayer};
use crate::overpass::OverpassClient;
use crate::query::build_query;
use crate::retry::{RateLimitGate, RetryPolicy};

/// Tunables for one downloader
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Server-side timeout written into each query
    pub query_timeout_secs: u64,
    /// Client-side bound on each attempt
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_concurrency: usize,
    /// Minimum gap between request starts
    pub request_spacing: Duration,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            query_timeout_secs: 180,
            request_timeout: Duration::from_secs(190),
            retry: RetryPolicy::default(),
            max_concurrency: 2,
            request_spacing: Duration::ZERO,
        }
    }
}

impl DownloadSettings {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            query_timeout_secs: config.query_timeout_secs.value,
            request_timeout: Duration::from_secs(config.request_timeout_secs.value),
            retry: RetryPolicy::from_config(config),
            max_concurrency: config.max_concurrency.value.max(1),
            request_spacing: Duration::from_millis(config.request_spacing_ms.value),
        }
    }
}

/// Fetches, normalizes and commits category layers
pub struct Downloader {
    source: Arc<dyn ElementSource>,
    reprojector: Arc<dyn Reproject>,
    settings: DownloadSettings,
    gate: Arc<RateLimitGate>,
}

impl Downloader {
    pub fn new(
        source: Arc<dyn ElementSource>,
        reprojector: Arc<dyn Reproject>,
        settings: DownloadSettings,
    ) -> Self {
        let gate = Arc::new(RateLimitGate::new(settings.request_spacing));
        Self { source, reprojector, settings, gate }
    }

    /// Downloader against the configured Overpass endpoint, reprojecting with PROJ
    pub fn from_config(config: &LayeredConfig) -> osmcache_core::Result<Self> {
        let client = OverpassClient::new(
            config.overpass_url.value.clone(),
            Duration::from_secs(config.request_timeout_secs.value),
        )?;
        Ok(Self::new(Arc::new(client), Arc::new(ProjReprojector), DownloadSettings::from_config(config)))
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    pub fn reprojector(&self) -> &dyn Reproject {
        self.reprojector.as_ref()
    }

    /// Prepare a job for `study_area` with this downloader's reprojector
    pub fn job_for(
        &self,
        study_area: &StudyArea,
        categories: &[Category],
    ) -> Result<DownloadJob, DownloadError> {
        Ok(DownloadJob::for_study_area(study_area, categories, self.reprojector.as_ref())?)
    }

    /// Download every category of `job` and commit the successful ones
    ///
    /// Nothing is written when no category succeeds. `progress` is called
    /// once per finished category, on the calling task.
    pub async fn download_and_cache(
        &self,
        layout: &CacheLayout,
        study_area: &StudyArea,
        job: &mut DownloadJob,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        if job.categories().is_empty() {
            return Err(DownloadError::NoCategories);
        }
        if &job.target_crs != study_area.crs() {
            return Err(DownloadError::Config {
                reason: format!(
                    "job targets {} but the study area is in {}",
                    job.target_crs,
                    study_area.crs()
                ),
            });
        }

        layout.ensure_root()?;
        let mut writer = StoreWriter::begin(layout)?;

        let categories = job.categories().to_vec();
        let total = categories.len();
        let bbox = job.bbox;
        let target_crs = job.target_crs.clone();

        tracing::info!(
            "Downloading {} categories over {} from {}",
            total,
            bbox,
            self.source.describe()
        );

        let mut fetches = stream::iter(categories)
            .map(|category| async move {
                let body = self.fetch_category(category, &bbox, cancel).await;
                (category, body)
            })
            .buffer_unordered(self.settings.max_concurrency.max(1));

        let mut completed = 0;
        while let Some((category, body)) = fetches.next().await {
            let result = body.and_then(|body| self.normalize(category, &body, &target_crs));

            match result {
                Ok(layer) => {
                    let count = layer.features.len();
                    tracing::info!(
                        "{}: {} features ({} dropped, {} duplicates)",
                        category.label(),
                        count,
                        layer.dropped,
                        layer.duplicates
                    );
                    writer.replace_layer(category, layer.features);
                    job.set_state(category, CategoryState::Succeeded(count));
                }
                Err(reason) => {
                    tracing::warn!("{}: layer not updated: {}", category.label(), reason);
                    job.set_state(category, CategoryState::Failed(reason));
                }
            }

            completed += 1;
            progress.on_progress(completed, total, category.label());
        }
        drop(fetches);

        let failed: Vec<(Category, FailureReason)> =
            job.failed().map(|(c, reason)| (c, reason.clone())).collect();

        if writer.staged_categories().is_empty() {
            if cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }
            return Err(DownloadError::AllCategoriesFailed { failed });
        }

        let now = Utc::now();
        let metadata = CacheMetadata {
            version: CACHE_VERSION.to_string(),
            created: now,
            geometry_wkt: study_area.wkt(),
            crs: study_area.crs().clone(),
            geometry_hash: study_area.hash().to_string(),
            bbox: study_area.bbox(),
            osm_timestamp: now,
            categories: Vec::new(),
            generation: 0,
        };
        let generation = writer.commit(metadata)?;

        Ok(DownloadOutcome {
            source_timestamp: now,
            counts: job.succeeded().collect(),
            failed,
            generation,
        })
    }

    /// Fetch one category with bounded, paced retries
    async fn fetch_category(
        &self,
        category: Category,
        bbox: &BoundingBox,
        cancel: &CancellationToken,
    ) -> Result<String, FailureReason> {
        let query = build_query(category, bbox, self.settings.query_timeout_secs);
        let policy = self.settings.retry;
        let mut attempt = 0;

        tracing::info!("Fetching {}", category.label());

        loop {
            if cancel.is_cancelled() {
                return Err(FailureReason::Cancelled);
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureReason::Cancelled),
                _ = self.gate.wait_turn() => {}
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureReason::Cancelled),
                r = tokio::time::timeout(self.settings.request_timeout, self.source.fetch(&query)) => {
                    r.unwrap_or_else(|_| {
                        Err(NetworkError::Timeout { seconds: self.settings.request_timeout.as_secs() })
                    })
                }
            };

            let error = match result {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            let delay = policy.delay_for(attempt, &error);
            if matches!(error, NetworkError::RateLimited { .. }) {
                self.gate.pause_for(delay).await;
            }
            if !policy.should_retry(attempt, &error) {
                return Err(FailureReason::Network(error));
            }

            tracing::warn!(
                "{}: attempt {}/{} failed ({}), retrying in {:?}",
                category.label(),
                attempt + 1,
                policy.max_attempts,
                error,
                delay
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureReason::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    fn normalize(
        &self,
        category: Category,
        body: &str,
        target_crs: &Crs,
    ) -> Result<NormalizedLayer, FailureReason> {
        let parsed = parse_response(body).map_err(FailureReason::Parse)?;
        let transform = self
            .reprojector
            .transformer(&Crs::wgs84(), target_crs)
            .map_err(|e| FailureReason::Reprojection(e.to_string()))?;
        Ok(normalize_elements(&parsed, category, transform.as_ref()))
    }
}
