//! Integration tests for the cache lifecycle
//!
//! Walk a cache location through first download, validation, refresh,
//! failure and recovery against a scripted element source.

use osmcache_core::error::{NetworkError, ValidationError};
use osmcache_core::models::{BoundingBox, Category, Crs, Geometry};
use osmcache_core::ports::NoProgress;
use osmcache_fetch::scripted::nodes_response;
use osmcache_fetch::{DownloadSettings, Downloader, RetryPolicy, ScriptedSource};
use osmcache_geo::{ProjReprojector, StudyArea};
use osmcache_manager::{CacheError, CacheManager, CacheState};
use osmcache_store::CacheLayout;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const SCHOOLS: &str = r#""amenity"="school""#;
const HOSPITALS: &str = r#""healthcare"="hospital""#;

fn settings() -> DownloadSettings {
    DownloadSettings {
        query_timeout_secs: 25,
        request_timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
        max_concurrency: 2,
        request_spacing: Duration::ZERO,
    }
}

fn scripted() -> ScriptedSource {
    let source = ScriptedSource::new();
    source.respond(
        SCHOOLS,
        nodes_response(
            ("amenity", "school"),
            &[(1, 0.2, 0.2, Some("West School")), (2, 0.8, 0.8, Some("East School"))],
        ),
    );
    source.respond(
        HOSPITALS,
        nodes_response(("healthcare", "hospital"), &[(9, 0.5, 0.5, Some("General"))]),
    );
    source
}

fn manager(dir: &TempDir, source: &ScriptedSource) -> CacheManager {
    let downloader = Downloader::new(Arc::new(source.clone()), Arc::new(ProjReprojector), settings());
    CacheManager::new(CacheLayout::for_project(dir.path()), downloader)
}

fn area() -> StudyArea {
    StudyArea::from_extent(BoundingBox::new(0.0, 0.0, 1.0, 1.0), Crs::wgs84()).unwrap()
}

const CATEGORIES: [Category; 2] = [Category::Schools, Category::Hospitals];

#[tokio::test]
async fn test_first_request_downloads_then_serves() {
    let dir = TempDir::new().unwrap();
    let source = scripted();
    let mut manager = manager(&dir, &source);
    let area = area();
    let cancel = CancellationToken::new();

    assert_eq!(manager.check(&area).unwrap(), &CacheState::NoCache);

    let state = manager.ensure(&area, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    assert_eq!(state, &CacheState::Valid);
    let calls = source.calls().len();

    // Second request validates without downloading
    let state = manager.ensure(&area, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    assert_eq!(state, &CacheState::Valid);
    assert_eq!(source.calls().len(), calls);

    let info = manager.get_cache_info().unwrap().unwrap();
    assert_eq!(info.counts[&Category::Schools], 2);
    assert_eq!(info.counts[&Category::Hospitals], 1);
    assert_eq!(info.total_features(), 3);
    assert_eq!(info.crs, Crs::wgs84());
    assert!(info.size_bytes > 0);

    let handle = manager.open_handle().unwrap();
    let west = Geometry::rectangle(&BoundingBox::new(0.0, 0.0, 0.5, 1.0));
    assert_eq!(handle.count_features(Category::Schools, &west).unwrap(), 1);
    assert_eq!(
        handle.get_named_features_within_polygon(Category::Schools, &west).unwrap(),
        vec!["West School"]
    );
}

#[tokio::test]
async fn test_other_geometry_is_invalid_until_refresh() {
    let dir = TempDir::new().unwrap();
    let source = scripted();
    let mut manager = manager(&dir, &source);
    let cancel = CancellationToken::new();
    manager.ensure(&area(), &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();

    let moved = StudyArea::from_extent(BoundingBox::new(0.0, 0.0, 1.0, 2.0), Crs::wgs84()).unwrap();
    let calls = source.calls().len();
    let state = manager.ensure(&moved, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    assert_eq!(state, &CacheState::Invalid(ValidationError::HashMismatch));
    assert_eq!(source.calls().len(), calls);

    // The old cache is still on disk
    assert!(manager.layout().files_exist());
    assert!(manager.open_handle().is_err());

    let state = manager.confirm_refresh(&moved, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    assert_eq!(state, &CacheState::Valid);
    assert!(manager
        .is_valid_for_geometry(&Geometry::rectangle(&BoundingBox::new(0.0, 0.0, 1.0, 2.0)), &Crs::wgs84())
        .unwrap());
    assert!(!manager
        .is_valid_for_geometry(&Geometry::rectangle(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)), &Crs::wgs84())
        .unwrap());
}

#[tokio::test]
async fn test_other_crs_is_crs_mismatch() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(&dir, &scripted());
    manager
        .ensure(&area(), &CATEGORIES, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    let same_numbers =
        StudyArea::from_extent(BoundingBox::new(0.0, 0.0, 1.0, 1.0), Crs::web_mercator()).unwrap();
    assert_eq!(
        manager.check(&same_numbers).unwrap(),
        &CacheState::Invalid(ValidationError::CrsMismatch)
    );
}

#[tokio::test]
async fn test_sub_precision_noise_stays_valid() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(&dir, &scripted());
    manager
        .ensure(&area(), &CATEGORIES, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    let noisy = StudyArea::from_extent(BoundingBox::new(1e-9, 0.0, 1.0 + 2e-9, 1.0), Crs::wgs84())
        .unwrap();
    assert_eq!(manager.check(&noisy).unwrap(), &CacheState::Valid);
}

#[tokio::test]
async fn test_deleted_store_is_missing_files() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(&dir, &scripted());
    manager
        .ensure(&area(), &CATEGORIES, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    std::fs::remove_file(manager.layout().store_path()).unwrap();
    assert_eq!(
        manager.check(&area()).unwrap(),
        &CacheState::Invalid(ValidationError::MissingFiles)
    );
}

#[tokio::test]
async fn test_corrupt_metadata() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(&dir, &scripted());
    manager
        .ensure(&area(), &CATEGORIES, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    std::fs::write(manager.layout().metadata_path(), "{ not json").unwrap();
    assert_eq!(
        manager.check(&area()).unwrap(),
        &CacheState::Invalid(ValidationError::CorruptMetadata)
    );
}

#[tokio::test]
async fn test_failed_download_then_retry_and_abort() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedSource::new();
    source.fail(SCHOOLS, NetworkError::ServerError { status: 503 });
    source.fail(HOSPITALS, NetworkError::Http { status: 400 });
    let mut manager = manager(&dir, &source);
    let area = area();
    let cancel = CancellationToken::new();

    let state = manager.ensure(&area, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    assert!(matches!(state, CacheState::Error(_)));
    assert!(manager.last_error().is_some());
    assert!(!manager.layout().files_exist());

    // Validation is refused until the failure is resolved
    assert!(matches!(manager.check(&area), Err(CacheError::InvalidTransition { .. })));

    // Still failing: stays in error
    let state = manager.retry(&area, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    assert!(matches!(state, CacheState::Error(_)));

    assert_eq!(manager.abort(&area).unwrap(), &CacheState::NoCache);

    // Recovered source
    source.respond(SCHOOLS, nodes_response(("amenity", "school"), &[(1, 0.5, 0.5, None)]));
    let state = manager.ensure(&area, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    assert_eq!(state, &CacheState::Valid);

    let outcome = manager.last_outcome().unwrap();
    assert_eq!(outcome.counts.len(), 1);
    assert_eq!(outcome.failed[0].0, Category::Hospitals);
}

#[tokio::test]
async fn test_failed_refresh_keeps_valid_cache() {
    let dir = TempDir::new().unwrap();
    let source = scripted();
    let mut manager = manager(&dir, &source);
    let area = area();
    let cancel = CancellationToken::new();

    manager.ensure(&area, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    let before = manager.get_cache_info().unwrap().unwrap();

    source.fail(SCHOOLS, NetworkError::ServerError { status: 503 });
    source.fail(HOSPITALS, NetworkError::ServerError { status: 503 });
    let state = manager.confirm_refresh(&area, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    assert!(matches!(state, CacheState::Error(_)));

    // The committed store is untouched
    assert!(manager.layout().files_exist());
    let after = manager.get_cache_info().unwrap().unwrap();
    assert_eq!(after.counts, before.counts);
    assert_eq!(after.generation, before.generation);

    assert_eq!(manager.abort(&area).unwrap(), &CacheState::Valid);
    let handle = manager.open_handle().unwrap();
    let all = Geometry::rectangle(&BoundingBox::new(0.0, 0.0, 1.0, 1.0));
    assert_eq!(handle.count_features(Category::Schools, &all).unwrap(), 2);
}

#[tokio::test]
async fn test_refresh_of_valid_cache_replaces_it() {
    let dir = TempDir::new().unwrap();
    let source = scripted();
    let mut manager = manager(&dir, &source);
    let area = area();
    let cancel = CancellationToken::new();

    manager.ensure(&area, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    let first = manager.get_cache_info().unwrap().unwrap().generation;

    source.respond(SCHOOLS, nodes_response(("amenity", "school"), &[(7, 0.3, 0.3, Some("New School"))]));
    let state = manager.confirm_refresh(&area, &CATEGORIES, &mut NoProgress, &cancel).await.unwrap();
    assert_eq!(state, &CacheState::Valid);

    let info = manager.get_cache_info().unwrap().unwrap();
    assert_eq!(info.counts[&Category::Schools], 1);
    assert!(info.generation > first);
}

#[tokio::test]
async fn test_illegal_transitions() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(&dir, &scripted());
    let area = area();
    let cancel = CancellationToken::new();

    manager.check(&area).unwrap();
    assert!(matches!(
        manager.confirm_refresh(&area, &CATEGORIES, &mut NoProgress, &cancel).await,
        Err(CacheError::InvalidTransition { .. })
    ));
    assert!(matches!(
        manager.retry(&area, &CATEGORIES, &mut NoProgress, &cancel).await,
        Err(CacheError::InvalidTransition { .. })
    ));
    assert!(matches!(manager.abort(&area), Err(CacheError::InvalidTransition { .. })));
    assert!(matches!(manager.open_handle(), Err(CacheError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_clear_cache() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(&dir, &scripted());
    manager
        .ensure(&area(), &CATEGORIES, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    manager.clear_cache().unwrap();
    assert_eq!(manager.state(), &CacheState::NoCache);
    assert!(manager.get_cache_info().unwrap().is_none());
    assert_eq!(manager.check(&area()).unwrap(), &CacheState::NoCache);
}
