//! osmcache Fetch - Download and normalization pipeline
//!
//! Builds one Overpass query per category, fetches them concurrently with
//! bounded retries, turns raw elements into features in the cache CRS, and
//! commits the successful layers through the store writer.

pub mod downloader;
pub mod elements;
pub mod error;
pub mod job;
pub mod normalize;
pub mod overpass;
pub mod query;
pub mod retry;
pub mod scripted;

pub use downloader::{DownloadSettings, Downloader};
pub use error::DownloadError;
pub use job::{CategoryState, DownloadJob, DownloadOutcome, FailureReason};
pub use overpass::OverpassClient;
pub use retry::{RateLimitGate, RetryPolicy};
pub use scripted::ScriptedSource;
