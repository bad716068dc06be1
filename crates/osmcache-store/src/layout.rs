use osmcache_core::error::DiskError;
use std::fs;
use std::path::{Path, PathBuf};

/// Cache directory created inside a project directory
pub const CACHE_DIR_NAME: &str = "osm_cache";

/// Feature store file name
pub const STORE_FILE_NAME: &str = "osm_data.jsonl";

/// Metadata file name
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Exclusive writer lock file name
pub const LOCK_FILE_NAME: &str = ".write.lock";

/// Prefix of writer staging directories
pub const STAGING_PREFIX: &str = ".staging-";

/// Paths of one cache location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Use `root` directly as the cache directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache directory of a project: `<project_dir>/osm_cache`
    pub fn for_project(project_dir: impl AsRef<Path>) -> Self {
        Self::new(project_dir.as_ref().join(CACHE_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_path(&self) -> PathBuf {
        self.root.join(STORE_FILE_NAME)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    /// Both the store and the metadata file are present
    pub fn files_exist(&self) -> bool {
        self.store_path().is_file() && self.metadata_path().is_file()
    }

    /// Neither the store nor the metadata file is present
    pub fn is_empty(&self) -> bool {
        !self.store_path().exists() && !self.metadata_path().exists()
    }

    /// Create the cache directory if needed
    pub fn ensure_root(&self) -> Result<(), DiskError> {
        fs::create_dir_all(&self.root).map_err(|e| DiskError::from_io(&self.root, e))
    }
}

/// Flush directory entries (renames) to disk
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> Result<(), DiskError> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| DiskError::from_io(dir, e))
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> Result<(), DiskError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_layout() {
        let layout = CacheLayout::for_project("/work/project");
        assert_eq!(layout.root(), Path::new("/work/project/osm_cache"));
        assert_eq!(layout.store_path(), PathBuf::from("/work/project/osm_cache/osm_data.jsonl"));
        assert_eq!(layout.metadata_path(), PathBuf::from("/work/project/osm_cache/metadata.json"));
        assert_eq!(layout.lock_path(), PathBuf::from("/work/project/osm_cache/.write.lock"));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let layout = CacheLayout::new("/definitely/not/here");
        assert!(layout.is_empty());
        assert!(!layout.files_exist());
    }
}
