//! Cache validity checks
//!
//! Order matters: missing files, unreadable metadata, CRS, geometry hash,
//! then agreement between the store header and the metadata.

use osmcache_core::error::ValidationError;
use osmcache_core::models::{CacheMetadata, Validity, CACHE_VERSION};
use osmcache_geo::transform::crs_match;
use osmcache_geo::StudyArea;
use osmcache_store::format::read_header;
use osmcache_store::{read_metadata, CacheLayout};
use std::time::Duration;

/// Header reads before a disagreement is reported as corruption
const HEADER_ATTEMPTS: usize = 3;
const HEADER_BACKOFF: Duration = Duration::from_millis(25);

/// Compare persisted metadata against a study area
pub fn check_metadata(metadata: &CacheMetadata, study_area: &StudyArea) -> Validity {
    if metadata.version != CACHE_VERSION {
        return Validity::Invalid(ValidationError::CorruptMetadata);
    }
    if !crs_match(&metadata.crs, study_area.crs()) {
        return Validity::Invalid(ValidationError::CrsMismatch);
    }
    if metadata.geometry_hash != study_area.hash() {
        return Validity::Invalid(ValidationError::HashMismatch);
    }
    Validity::Valid
}

/// Validate the cache at `layout` for `study_area`
pub fn validate(layout: &CacheLayout, study_area: &StudyArea) -> Validity {
    if !layout.store_path().is_file() || !layout.metadata_path().is_file() {
        return Validity::Invalid(ValidationError::MissingFiles);
    }

    let metadata = match read_metadata(&layout.metadata_path()) {
        Ok(Some(metadata)) => metadata,
        // Removed since the existence check
        Ok(None) => return Validity::Invalid(ValidationError::MissingFiles),
        Err(e) => {
            tracing::warn!("Cache metadata unreadable: {}", e);
            return Validity::Invalid(ValidationError::CorruptMetadata);
        }
    };

    let validity = check_metadata(&metadata, study_area);
    if !validity.is_valid() {
        return validity;
    }

    check_store_header(layout, &metadata)
}

fn check_store_header(layout: &CacheLayout, metadata: &CacheMetadata) -> Validity {
    let mut metadata = metadata.clone();

    for attempt in 1..=HEADER_ATTEMPTS {
        match read_header(&layout.store_path()) {
            Ok(header) if header.generation == metadata.generation && header.crs == metadata.crs => {
                return Validity::Valid;
            }
            Ok(header) => tracing::debug!(
                "Store header generation {} ({}) disagrees with metadata generation {} ({})",
                header.generation,
                header.crs,
                metadata.generation,
                metadata.crs
            ),
            Err(e) => tracing::debug!("Store header unreadable: {}", e),
        }

        if attempt < HEADER_ATTEMPTS {
            std::thread::sleep(HEADER_BACKOFF);
            // A commit in flight renames the metadata last
            if let Ok(Some(fresh)) = read_metadata(&layout.metadata_path()) {
                metadata = fresh;
            }
        }
    }

    Validity::Invalid(ValidationError::CorruptMetadata)
}
