use osmcache_core::error::DiskError;
use osmcache_core::models::Category;
use osmcache_store::StoreError;
use thiserror::Error;

use crate::job::FailureReason;

/// Failures of a whole download run
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Every category failed to download ({} failures)", failed.len())]
    AllCategoriesFailed { failed: Vec<(Category, FailureReason)> },

    #[error("Download cancelled before any category completed")]
    Cancelled,

    #[error("No categories requested")]
    NoCategories,

    #[error("Invalid download setup: {reason}")]
    Config { reason: String },

    #[error(transparent)]
    Disk(#[from] DiskError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] osmcache_core::Error),
}
