//! Integration tests for the download pipeline
//!
//! Drive the downloader end to end against a scripted element source and a
//! temporary cache location.

use osmcache_core::error::NetworkError;
use osmcache_core::models::{BoundingBox, Category, Crs, ElementKind};
use osmcache_core::ports::NoProgress;
use osmcache_fetch::scripted::nodes_response;
use osmcache_fetch::{
    CategoryState, DownloadError, DownloadSettings, Downloader, FailureReason, RetryPolicy,
    ScriptedSource,
};
use osmcache_geo::{ProjReprojector, StudyArea};
use osmcache_store::{read_metadata, CacheLayout, FeatureStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const SCHOOLS: &str = r#""amenity"="school""#;
const HOSPITALS: &str = r#""healthcare"="hospital""#;
const SHOPS: &str = r#""shop"~".""#;

fn settings() -> DownloadSettings {
    DownloadSettings {
        query_timeout_secs: 25,
        request_timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        },
        max_concurrency: 2,
        request_spacing: Duration::ZERO,
    }
}

fn study_area() -> StudyArea {
    StudyArea::from_extent(BoundingBox::new(13.0, 52.0, 14.0, 53.0), Crs::wgs84()).unwrap()
}

fn downloader(source: &ScriptedSource) -> Downloader {
    Downloader::new(Arc::new(source.clone()), Arc::new(ProjReprojector), settings())
}

fn schools_body() -> String {
    nodes_response(
        ("amenity", "school"),
        &[
            (30, 13.3, 52.3, Some("Gamma")),
            (10, 13.1, 52.1, Some("Alpha")),
            (20, 13.2, 52.2, None),
        ],
    )
}

#[tokio::test]
async fn test_partial_failure_commits_successful_categories() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());
    let source = ScriptedSource::new();
    source.respond(SCHOOLS, schools_body());
    source.fail(HOSPITALS, NetworkError::ServerError { status: 504 });

    let downloader = downloader(&source);
    let area = study_area();
    let mut job = downloader.job_for(&area, &[Category::Schools, Category::Hospitals]).unwrap();

    let mut reports = Vec::new();
    let mut sink = |done: usize, total: usize, message: &str| {
        reports.push((done, total, message.to_string()));
    };
    let outcome = downloader
        .download_and_cache(&layout, &area, &mut job, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.is_partial());
    assert_eq!(outcome.counts.get(&Category::Schools), Some(&3));
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, Category::Hospitals);

    // Hospitals were retried up to the cap
    assert_eq!(source.call_count(HOSPITALS), 3);

    assert_eq!(job.state(Category::Schools), Some(&CategoryState::Succeeded(3)));
    assert!(matches!(job.state(Category::Hospitals), Some(CategoryState::Failed(_))));

    assert_eq!(reports.len(), 2);
    assert_eq!(reports.last().map(|r| (r.0, r.1)), Some((2, 2)));

    let metadata = read_metadata(&layout.metadata_path()).unwrap().unwrap();
    assert_eq!(metadata.categories, vec![Category::Schools]);
    assert_eq!(metadata.geometry_hash, area.hash());
    assert_eq!(metadata.crs, Crs::wgs84());

    let store = FeatureStore::open(&layout.store_path()).unwrap();
    assert!(store.has_layer(Category::Schools));
    assert!(!store.has_layer(Category::Hospitals));
}

#[tokio::test]
async fn test_all_categories_failing_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());
    let source = ScriptedSource::new();
    source.fail(SCHOOLS, NetworkError::Http { status: 400 });
    source.fail(SHOPS, NetworkError::Transport("connection refused".into()));

    let downloader = downloader(&source);
    let area = study_area();
    let mut job = downloader.job_for(&area, &[Category::Schools, Category::Shops]).unwrap();

    let err = downloader
        .download_and_cache(&layout, &area, &mut job, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DownloadError::AllCategoriesFailed { failed } => assert_eq!(failed.len(), 2),
        other => panic!("unexpected error: {:?}", other),
    }
    // Neither error is transient
    assert_eq!(source.call_count(SCHOOLS), 1);
    assert_eq!(source.call_count(SHOPS), 1);
    assert!(!layout.files_exist());
}

#[tokio::test]
async fn test_failed_download_keeps_previous_cache() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());
    let area = study_area();

    let good = ScriptedSource::new();
    good.respond(SCHOOLS, schools_body());
    let mut job = downloader(&good).job_for(&area, &[Category::Schools]).unwrap();
    downloader(&good)
        .download_and_cache(&layout, &area, &mut job, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap();
    let before = std::fs::read(layout.store_path()).unwrap();

    let bad = ScriptedSource::new();
    bad.fail(SCHOOLS, NetworkError::Http { status: 500 });
    let mut job = downloader(&bad).job_for(&area, &[Category::Schools]).unwrap();
    assert!(downloader(&bad)
        .download_and_cache(&layout, &area, &mut job, &mut NoProgress, &CancellationToken::new())
        .await
        .is_err());

    assert_eq!(std::fs::read(layout.store_path()).unwrap(), before);
}

#[tokio::test]
async fn test_download_is_idempotent_and_ordered() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());
    let source = ScriptedSource::new();
    source.respond(SCHOOLS, schools_body());

    let downloader = downloader(&source);
    let area = study_area();

    let mut runs = Vec::new();
    for _ in 0..2 {
        let mut job = downloader.job_for(&area, &[Category::Schools]).unwrap();
        downloader
            .download_and_cache(&layout, &area, &mut job, &mut NoProgress, &CancellationToken::new())
            .await
            .unwrap();
        let store = FeatureStore::open(&layout.store_path()).unwrap();
        runs.push((store.generation(), store.layer(Category::Schools).to_vec()));
    }

    assert_eq!(runs[0].0 + 1, runs[1].0);
    assert_eq!(runs[0].1, runs[1].1);

    let keys: Vec<_> = runs[1].1.iter().map(|f| f.key()).collect();
    assert_eq!(keys, vec![(10, ElementKind::Node), (20, ElementKind::Node), (30, ElementKind::Node)]);
    assert_eq!(runs[1].1[0].name.as_deref(), Some("Alpha"));
    assert_eq!(runs[1].1[1].name, None);
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());
    let source = ScriptedSource::new();
    source
        .respond(SCHOOLS, schools_body())
        .push(SCHOOLS, Err(NetworkError::RateLimited { retry_after: Some(Duration::from_millis(5)) }))
        .push(SCHOOLS, Err(NetworkError::Timeout { seconds: 1 }));

    let downloader = downloader(&source);
    let area = study_area();
    let mut job = downloader.job_for(&area, &[Category::Schools]).unwrap();

    let outcome = downloader
        .download_and_cache(&layout, &area, &mut job, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.counts[&Category::Schools], 3);
    assert_eq!(source.call_count(SCHOOLS), 3);
}

#[tokio::test]
async fn test_malformed_response_fails_only_its_category() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());
    let source = ScriptedSource::new();
    source.respond(SCHOOLS, schools_body());
    source.respond(SHOPS, "<html>busy</html>");

    let downloader = downloader(&source);
    let area = study_area();
    let mut job = downloader.job_for(&area, &[Category::Shops, Category::Schools]).unwrap();

    let outcome = downloader
        .download_and_cache(&layout, &area, &mut job, &mut NoProgress, &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome.failed[0], (Category::Shops, FailureReason::Parse(_))));
    assert_eq!(source.call_count(SHOPS), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_commits_nothing() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());
    let source = ScriptedSource::new();
    source.respond(SCHOOLS, schools_body());

    let downloader = downloader(&source);
    let area = study_area();
    let mut job = downloader.job_for(&area, &[Category::Schools]).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = downloader
        .download_and_cache(&layout, &area, &mut job, &mut NoProgress, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Cancelled));
    assert_eq!(job.state(Category::Schools), Some(&CategoryState::Failed(FailureReason::Cancelled)));
    assert!(source.calls().is_empty());
    assert!(!layout.files_exist());
}

#[tokio::test]
async fn test_cancel_mid_fetch_keeps_completed_categories() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());
    let source = ScriptedSource::new().with_delay(Duration::from_millis(50));
    source.respond(SCHOOLS, schools_body());
    source.respond(SHOPS, nodes_response(("shop", "bakery"), &[(1, 13.5, 52.5, None)]));

    let mut settings = settings();
    settings.max_concurrency = 1;
    let downloader = Downloader::new(Arc::new(source.clone()), Arc::new(ProjReprojector), settings);
    let area = study_area();
    let mut job = downloader.job_for(&area, &[Category::Schools, Category::Shops]).unwrap();

    // Cancel once the first category has been reported
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut sink = move |_done: usize, _total: usize, _message: &str| trigger.cancel();

    let outcome = downloader
        .download_and_cache(&layout, &area, &mut job, &mut sink, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.counts.len(), 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].1, FailureReason::Cancelled);

    let metadata = read_metadata(&layout.metadata_path()).unwrap().unwrap();
    assert_eq!(metadata.categories.len(), 1);
}
