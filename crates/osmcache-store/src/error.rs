use osmcache_core::error::DiskError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cache lock {path} is held by another process")]
    Busy { path: PathBuf },

    #[error("Feature store not found at {path}")]
    NotFound { path: PathBuf },

    #[error(transparent)]
    Disk(#[from] DiskError),
}

impl StoreError {
    /// Whether the error means the store is unreadable rather than absent
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Disk(DiskError::Corrupt { .. }))
    }
}
