use osmcache_core::error::ValidationError;
use serde::Serialize;
use std::fmt;

/// Lifecycle state of the cache for one study area
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum CacheState {
    /// Neither store nor metadata on disk
    NoCache,
    Valid,
    Invalid(ValidationError),
    Downloading,
    /// The last download committed nothing
    Error(String),
}

impl CacheState {
    pub fn name(&self) -> &'static str {
        match self {
            CacheState::NoCache => "no_cache",
            CacheState::Valid => "valid",
            CacheState::Invalid(_) => "invalid",
            CacheState::Downloading => "downloading",
            CacheState::Error(_) => "error",
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, CacheState::Valid)
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheState::Invalid(reason) => write!(f, "invalid ({})", reason),
            CacheState::Error(message) => write!(f, "in error ({})", message),
            other => write!(f, "{}", other.name().replace('_', " ")),
        }
    }
}
