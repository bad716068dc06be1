use osmcache_core::error::{DiskError, QueryError};
use osmcache_fetch::DownloadError;
use osmcache_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cannot {action} while the cache is {state}")]
    InvalidTransition { state: String, action: &'static str },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Disk(#[from] DiskError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Core(#[from] osmcache_core::Error),
}
