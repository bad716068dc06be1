//! osmcache Manager - Cache validity and lifecycle
//!
//! Decides whether the cache on disk can serve a study area, drives
//! downloads and refreshes through an explicit state machine, and hands out
//! query handles over a valid cache.

pub mod error;
pub mod handle;
pub mod manager;
pub mod state;
pub mod validator;

pub use error::CacheError;
pub use handle::CacheHandle;
pub use manager::CacheManager;
pub use state::CacheState;
pub use validator::{check_metadata, validate};
