//! osmcache Store - On-disk feature store and cache metadata
//!
//! The store is a JSON-lines file holding one header line and one line per
//! category layer, written next to `metadata.json`. Writers stage both files
//! and swap them in with renames under an exclusive lock file.

pub mod error;
pub mod format;
pub mod layout;
pub mod lock;
pub mod maintenance;
pub mod metadata;
pub mod store;
pub mod writer;

pub use error::StoreError;
pub use format::{LayerRecord, StoreHeader};
pub use layout::CacheLayout;
pub use lock::WriteLock;
pub use maintenance::{clear_cache, store_size_bytes};
pub use metadata::read_metadata;
pub use store::FeatureStore;
pub use writer::StoreWriter;
