//! osmcache Query - Local spatial queries over the feature store
//!
//! Opens the committed store once per session, builds one R-tree per layer on
//! first use, and reopens transparently when the store file is replaced.

pub mod compat;
pub mod engine;
pub mod models;
pub mod session;

pub use compat::LegacyOsmQuery;
pub use engine::LocalQueryEngine;
pub use models::{FeatureSummary, NearestFeature};
