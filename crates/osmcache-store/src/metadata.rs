use osmcache_core::error::DiskError;
use osmcache_core::models::CacheMetadata;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Load cache metadata
///
/// `Ok(None)` when the file does not exist; `DiskError::Corrupt` when it
/// exists but cannot be parsed.
pub fn read_metadata(path: &Path) -> Result<Option<CacheMetadata>, DiskError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(DiskError::from_io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| DiskError::corrupt(path, format!("invalid metadata: {}", e)))
}

/// Write metadata as pretty JSON and flush it to disk
pub(crate) fn write_metadata(path: &Path, metadata: &CacheMetadata) -> Result<(), DiskError> {
    let file = File::create(path).map_err(|e| DiskError::from_io(path, e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, metadata)
        .map_err(|e| DiskError::from_io(path, e.into()))?;
    out.write_all(b"\n").map_err(|e| DiskError::from_io(path, e))?;
    let file = out.into_inner().map_err(|e| DiskError::from_io(path, e.into_error()))?;
    file.sync_all().map_err(|e| DiskError::from_io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use osmcache_core::models::{BoundingBox, Category, Crs, CACHE_VERSION};

    #[test]
    fn test_missing_metadata_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_metadata(&dir.path().join("metadata.json")).unwrap().is_none());
    }

    #[test]
    fn test_garbage_metadata_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_metadata(&path), Err(DiskError::Corrupt { .. })));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let metadata = CacheMetadata {
            version: CACHE_VERSION.to_string(),
            created: Utc::now(),
            geometry_wkt: "POLYGON((0 0,1 0,1 1,0 0))".to_string(),
            crs: Crs::wgs84(),
            geometry_hash: "h".to_string(),
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            osm_timestamp: Utc::now(),
            categories: vec![Category::Hospitals],
            generation: 1,
        };

        write_metadata(&path, &metadata).unwrap();
        assert_eq!(read_metadata(&path).unwrap(), Some(metadata));
    }
}
