use osmcache_core::error::DiskError;
use osmcache_core::models::{CacheMetadata, Category, Feature};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use tempfile::TempDir;

use crate::error::StoreError;
use crate::format::{read_header, write_store, StoreHeader};
use crate::layout::{sync_dir, CacheLayout, METADATA_FILE_NAME, STAGING_PREFIX, STORE_FILE_NAME};
use crate::lock::WriteLock;
use crate::metadata::{read_metadata, write_metadata};

/// Stages a complete feature store and swaps it in on commit
///
/// Holds the cache write lock for its whole life. Nothing is visible to
/// readers until [`StoreWriter::commit`]; dropping the writer discards the
/// staged files.
#[derive(Debug)]
pub struct StoreWriter {
    layout: CacheLayout,
    staging: TempDir,
    layers: BTreeMap<Category, Vec<Feature>>,
    base_generation: u64,
    _lock: WriteLock,
}

impl StoreWriter {
    /// Lock the cache location and open a staging area inside it
    pub fn begin(layout: &CacheLayout) -> Result<Self, StoreError> {
        let lock = WriteLock::acquire(layout)?;
        remove_stale_staging(layout);

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(layout.root())
            .map_err(|e| DiskError::from_io(layout.root(), e))?;

        Ok(Self {
            layout: layout.clone(),
            staging,
            layers: BTreeMap::new(),
            base_generation: current_generation(layout),
            _lock: lock,
        })
    }

    /// Stage a layer, replacing anything staged for it before
    pub fn replace_layer(&mut self, category: Category, features: Vec<Feature>) {
        self.layers.insert(category, features);
    }

    /// Categories staged so far
    pub fn staged_categories(&self) -> Vec<Category> {
        self.layers.keys().copied().collect()
    }

    /// Write both files, then rename the store and the metadata into place
    ///
    /// `metadata.generation` and `metadata.categories` are set from the
    /// staged state. Returns the committed generation.
    pub fn commit(self, mut metadata: CacheMetadata) -> Result<u64, StoreError> {
        let generation = self.base_generation + 1;

        let mut header = StoreHeader::new(generation, metadata.crs.clone());
        header.layers =
            self.layers.iter().map(|(c, features)| (c.layer_name(), features.len())).collect();

        metadata.generation = generation;
        metadata.categories = self.layers.keys().copied().collect();

        let staged_store = self.staging.path().join(STORE_FILE_NAME);
        let staged_metadata = self.staging.path().join(METADATA_FILE_NAME);

        let file = File::create(&staged_store).map_err(|e| DiskError::from_io(&staged_store, e))?;
        let mut out = BufWriter::new(file);
        write_store(&mut out, &header, &self.layers)
            .map_err(|e| DiskError::from_io(&staged_store, e.into()))?;
        let file = out.into_inner().map_err(|e| DiskError::from_io(&staged_store, e.into_error()))?;
        file.sync_all().map_err(|e| DiskError::from_io(&staged_store, e))?;

        write_metadata(&staged_metadata, &metadata)?;

        // Store first: a reader between the renames sees a generation mismatch
        let store_path = self.layout.store_path();
        fs::rename(&staged_store, &store_path).map_err(|e| DiskError::from_io(&store_path, e))?;
        let metadata_path = self.layout.metadata_path();
        fs::rename(&staged_metadata, &metadata_path)
            .map_err(|e| DiskError::from_io(&metadata_path, e))?;
        sync_dir(self.layout.root())?;

        tracing::info!(
            "Committed feature store generation {} ({} layers) to {}",
            generation,
            header.layers.len(),
            self.layout.root().display()
        );
        Ok(generation)
    }
}

fn current_generation(layout: &CacheLayout) -> u64 {
    let from_store = read_header(&layout.store_path()).map(|h| h.generation).unwrap_or(0);
    let from_metadata = read_metadata(&layout.metadata_path())
        .ok()
        .flatten()
        .map(|m| m.generation)
        .unwrap_or(0);
    from_store.max(from_metadata)
}

/// Remove staging directories left behind by an interrupted writer
fn remove_stale_staging(layout: &CacheLayout) {
    let Ok(entries) = fs::read_dir(layout.root()) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(STAGING_PREFIX) {
            tracing::debug!("Removing stale staging directory {}", entry.path().display());
            if let Err(e) = fs::remove_dir_all(entry.path()) {
                tracing::warn!("Failed to remove {}: {}", entry.path().display(), e);
            }
        }
    }
}
