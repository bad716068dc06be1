use osmcache_core::error::DiskError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::layout::{sync_dir, CacheLayout};
use crate::lock::WriteLock;

fn rename_if_present(from: &Path, to: &Path) -> Result<bool, DiskError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DiskError::from_io(from, e)),
    }
}

fn tombstone(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.removed", name))
}

/// Delete the store and its metadata under the write lock
///
/// Metadata goes first so a concurrent validator sees a missing cache, never
/// metadata describing a store that is half gone.
pub fn clear_cache(layout: &CacheLayout) -> Result<(), StoreError> {
    if !layout.root().exists() {
        return Ok(());
    }

    let _lock = WriteLock::acquire(layout)?;

    let metadata_path = layout.metadata_path();
    let store_path = layout.store_path();
    let metadata_tomb = tombstone(&metadata_path);
    let store_tomb = tombstone(&store_path);

    let had_metadata = rename_if_present(&metadata_path, &metadata_tomb)?;
    let had_store = rename_if_present(&store_path, &store_tomb)?;
    sync_dir(layout.root())?;

    for tomb in [&metadata_tomb, &store_tomb] {
        match fs::remove_file(tomb) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(DiskError::from_io(tomb, e).into()),
        }
    }

    tracing::info!(
        "Cleared cache at {} (metadata: {}, store: {})",
        layout.root().display(),
        had_metadata,
        had_store
    );
    Ok(())
}

/// Size of the feature store file in bytes, 0 when absent
pub fn store_size_bytes(layout: &CacheLayout) -> u64 {
    fs::metadata(layout.store_path()).map(|m| m.len()).unwrap_or(0)
}
