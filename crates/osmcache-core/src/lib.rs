//! osmcache Core - Domain models, error taxonomy, and configuration
//!
//! This crate contains the core domain types and port definitions shared by the
//! store, downloader, query engine, and cache manager.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{Error, Result};
