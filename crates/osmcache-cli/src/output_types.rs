use chrono::{DateTime, Utc};
use osmcache_core::models::{CacheInfo, Category};
use osmcache_manager::CacheState;
use serde::Serialize;
use std::collections::BTreeMap;

/// Output for download command
#[derive(Debug, Serialize)]
pub struct DownloadOutput {
    pub state: CacheState,
    /// False when a valid cache was kept as is
    pub downloaded: bool,
    pub generation: Option<u64>,
    pub osm_timestamp: Option<DateTime<Utc>>,
    pub counts: BTreeMap<Category, usize>,
    pub failed: Vec<FailedCategory>,
}

#[derive(Debug, Serialize)]
pub struct FailedCategory {
    pub category: Category,
    pub reason: String,
}

/// Output for status command
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub project_dir: String,
    pub state: CacheState,
    pub study_area_hash: String,
    pub info: Option<CacheInfo>,
}

/// Output for count command
#[derive(Debug, Serialize)]
pub struct CountOutput {
    pub category: Category,
    pub count: usize,
}

/// Output for export command
#[derive(Debug, Serialize)]
pub struct ExportOutput {
    pub category: Category,
    pub features: usize,
    pub path: String,
}

/// One entry of the config command
#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub value: String,
    pub source: String,
}
