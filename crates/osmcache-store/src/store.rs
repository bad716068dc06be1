use osmcache_core::models::{Category, Crs, Feature};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::format::{read_store, StoreHeader};

/// A feature store loaded into memory, one layer per category
#[derive(Debug, Clone)]
pub struct FeatureStore {
    path: PathBuf,
    header: StoreHeader,
    layers: BTreeMap<Category, Vec<Feature>>,
}

impl FeatureStore {
    /// Load and check the store at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let (header, layers) = read_store(path)?;
        tracing::debug!(
            "Opened feature store {} (generation {}, {} layers)",
            path.display(),
            header.generation,
            layers.len()
        );
        Ok(Self { path: path.to_path_buf(), header, layers })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &StoreHeader {
        &self.header
    }

    pub fn generation(&self) -> u64 {
        self.header.generation
    }

    pub fn crs(&self) -> &Crs {
        &self.header.crs
    }

    pub fn has_layer(&self, category: Category) -> bool {
        self.layers.contains_key(&category)
    }

    /// Features of a layer; empty when the layer is absent
    pub fn layer(&self, category: Category) -> &[Feature] {
        self.layers.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.layers.keys().copied()
    }

    /// Feature count per stored layer
    pub fn counts(&self) -> BTreeMap<Category, usize> {
        self.layers.iter().map(|(c, f)| (*c, f.len())).collect()
    }
}
