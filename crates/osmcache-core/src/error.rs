//! Error types for osmcache

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Reasons a cache is not valid for a study area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Cached study area does not match the requested geometry")]
    HashMismatch,

    #[error("Cached CRS does not match the requested CRS")]
    CrsMismatch,

    #[error("Cache files are missing")]
    MissingFiles,

    #[error("Cache metadata is corrupt or inconsistent with the feature store")]
    CorruptMetadata,
}

/// Failures talking to the remote element source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Rate limited by remote source")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Remote source error (HTTP {status})")]
    ServerError { status: u16 },

    #[error("Remote source rejected the request (HTTP {status})")]
    Http { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl NetworkError {
    /// Whether the request may succeed if retried
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::Timeout { .. }
            | NetworkError::RateLimited { .. }
            | NetworkError::ServerError { .. } => true,
            NetworkError::Http { .. } | NetworkError::Transport(_) => false,
        }
    }

    /// Server-provided delay before the next attempt, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            NetworkError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A raw response or element that could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context}: {reason}")]
pub struct ParseError {
    pub context: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { context: context.into(), reason: reason.into() }
    }
}

/// Failures reading or writing the on-disk cache
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("Permission denied writing {path}")]
    WritePermission { path: PathBuf },

    #[error("Corrupt file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Out of disk space writing {path}")]
    OutOfSpace { path: PathBuf },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DiskError {
    /// Classify an IO error raised while touching `path`
    pub fn from_io(path: impl AsRef<Path>, err: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();

        if err.kind() == io::ErrorKind::PermissionDenied {
            return DiskError::WritePermission { path };
        }
        if is_out_of_space(&err) {
            return DiskError::OutOfSpace { path };
        }
        DiskError::Io { path, source: err }
    }

    pub fn corrupt(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        DiskError::Corrupt { path: path.as_ref().to_path_buf(), reason: reason.into() }
    }
}

#[cfg(unix)]
fn is_out_of_space(err: &io::Error) -> bool {
    // ENOSPC
    err.raw_os_error() == Some(28)
}

#[cfg(windows)]
fn is_out_of_space(err: &io::Error) -> bool {
    // ERROR_HANDLE_DISK_FULL, ERROR_DISK_FULL
    matches!(err.raw_os_error(), Some(39) | Some(112))
}

#[cfg(not(any(unix, windows)))]
fn is_out_of_space(_err: &io::Error) -> bool {
    false
}

/// Failures answering a local query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Cache unavailable: {reason}. Refresh the cache to rebuild it")]
    CacheUnavailable { reason: String },

    #[error("Spatial index for {layer} is corrupt: {reason}. Refresh the cache to rebuild it")]
    CorruptIndex { layer: String, reason: String },

    #[error("Invalid query geometry: {reason}")]
    InvalidGeometry { reason: String },
}

impl QueryError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        QueryError::CacheUnavailable { reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Domain parsing errors
    #[error("Unknown category: {name}")]
    UnknownCategory { name: String },

    #[error("Invalid CRS '{value}': expected EPSG:<code>")]
    InvalidCrs { value: String },

    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("Reprojection from {from} to {to} failed: {reason}")]
    Reprojection { from: String, to: String, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Disk(#[from] DiskError),

    #[error(transparent)]
    Query(#[from] QueryError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
