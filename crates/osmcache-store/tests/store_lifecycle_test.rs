//! Integration tests for the on-disk store lifecycle
//!
//! Stage, commit, reopen, replace and clear a cache location the way the
//! downloader and cache manager drive it.

use chrono::Utc;
use osmcache_core::models::{
    BoundingBox, CacheMetadata, Category, Crs, ElementKind, Feature, Geometry, CACHE_VERSION,
};
use osmcache_store::format::read_header;
use osmcache_store::{clear_cache, read_metadata, store_size_bytes, CacheLayout, FeatureStore, StoreWriter};
use std::fs;
use tempfile::TempDir;

fn metadata(crs: Crs) -> CacheMetadata {
    CacheMetadata {
        version: CACHE_VERSION.to_string(),
        created: Utc::now(),
        geometry_wkt: "POLYGON((0 0,10 0,10 10,0 10,0 0))".to_string(),
        crs,
        geometry_hash: "hash".to_string(),
        bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        osm_timestamp: Utc::now(),
        categories: vec![],
        generation: 0,
    }
}

fn feature(category: Category, id: i64, kind: ElementKind, name: Option<&str>) -> Feature {
    Feature {
        osm_id: id,
        osm_type: kind,
        category,
        name: name.map(str::to_string),
        geometry: Geometry::point(id as f64, id as f64),
    }
}

#[test]
fn test_commit_and_reopen_preserves_records() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());

    let schools = vec![
        feature(Category::Schools, 1, ElementKind::Node, Some("North School")),
        feature(Category::Schools, 1, ElementKind::Way, None),
        feature(Category::Schools, 7, ElementKind::Relation, Some("Campus")),
    ];

    let mut writer = StoreWriter::begin(&layout).unwrap();
    writer.replace_layer(Category::Schools, schools.clone());
    writer.replace_layer(Category::Hospitals, vec![]);
    writer.commit(metadata(Crs::web_mercator())).unwrap();

    let store = FeatureStore::open(&layout.store_path()).unwrap();
    assert_eq!(store.layer(Category::Schools), schools.as_slice());
    assert!(store.has_layer(Category::Hospitals));
    assert!(store.layer(Category::Hospitals).is_empty());
    assert!(!store.has_layer(Category::Shops));
    assert_eq!(store.crs(), &Crs::web_mercator());

    let meta = read_metadata(&layout.metadata_path()).unwrap().unwrap();
    assert_eq!(meta.categories, vec![Category::Schools, Category::Hospitals]);
    assert_eq!(meta.generation, store.generation());
    assert!(store_size_bytes(&layout) > 0);
}

#[test]
fn test_replacement_is_wholesale() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());

    let mut writer = StoreWriter::begin(&layout).unwrap();
    writer.replace_layer(Category::Shops, vec![feature(Category::Shops, 1, ElementKind::Node, None)]);
    writer.replace_layer(Category::Schools, vec![feature(Category::Schools, 2, ElementKind::Node, None)]);
    writer.commit(metadata(Crs::wgs84())).unwrap();

    let mut writer = StoreWriter::begin(&layout).unwrap();
    writer.replace_layer(Category::Shops, vec![feature(Category::Shops, 3, ElementKind::Node, None)]);
    writer.commit(metadata(Crs::wgs84())).unwrap();

    let store = FeatureStore::open(&layout.store_path()).unwrap();
    assert_eq!(store.generation(), 2);
    assert_eq!(store.layer(Category::Shops)[0].osm_id, 3);
    assert!(!store.has_layer(Category::Schools));
}

#[test]
fn test_header_generation_matches_metadata() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());

    let mut writer = StoreWriter::begin(&layout).unwrap();
    writer.replace_layer(Category::Airports, vec![]);
    writer.commit(metadata(Crs::wgs84())).unwrap();

    let header = read_header(&layout.store_path()).unwrap();
    let meta = read_metadata(&layout.metadata_path()).unwrap().unwrap();
    assert_eq!(header.generation, meta.generation);
    assert_eq!(header.crs, meta.crs);
}

#[test]
fn test_clear_after_commit() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());

    let mut writer = StoreWriter::begin(&layout).unwrap();
    writer.replace_layer(Category::Airports, vec![]);
    writer.commit(metadata(Crs::wgs84())).unwrap();
    assert!(layout.files_exist());

    clear_cache(&layout).unwrap();
    assert!(layout.is_empty());
    assert!(FeatureStore::open(&layout.store_path()).is_err());
}

#[test]
fn test_garbage_store_is_reported_corrupt() {
    let dir = TempDir::new().unwrap();
    let layout = CacheLayout::for_project(dir.path());
    layout.ensure_root().unwrap();
    fs::write(layout.store_path(), "not a header\n").unwrap();

    let err = FeatureStore::open(&layout.store_path()).unwrap_err();
    assert!(err.is_corrupt());
}
