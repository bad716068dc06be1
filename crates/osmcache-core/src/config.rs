use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Default Overpass API endpoint
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Name of the per-project config file
pub const CONFIG_FILE_NAME: &str = "osmcache.toml";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for osmcache
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub overpass_url: ConfigValue<String>,
    /// Client-side timeout per request
    pub request_timeout_secs: ConfigValue<u64>,
    /// Server-side timeout embedded in each Overpass query
    pub query_timeout_secs: ConfigValue<u64>,
    pub max_attempts: ConfigValue<u32>,
    pub backoff_base_ms: ConfigValue<u64>,
    pub backoff_max_ms: ConfigValue<u64>,
    pub max_concurrency: ConfigValue<usize>,
    pub request_spacing_ms: ConfigValue<u64>,
    /// Default search radius for nearest-feature lookups, in map units
    pub nearest_max_distance: ConfigValue<f64>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            overpass_url: ConfigValue::new(
                DEFAULT_OVERPASS_URL.to_string(),
                ConfigSource::Default,
            ),
            request_timeout_secs: ConfigValue::new(190, ConfigSource::Default),
            query_timeout_secs: ConfigValue::new(180, ConfigSource::Default),
            max_attempts: ConfigValue::new(3, ConfigSource::Default),
            backoff_base_ms: ConfigValue::new(30_000, ConfigSource::Default),
            backoff_max_ms: ConfigValue::new(120_000, ConfigSource::Default),
            max_concurrency: ConfigValue::new(2, ConfigSource::Default),
            request_spacing_ms: ConfigValue::new(0, ConfigSource::Default),
            nearest_max_distance: ConfigValue::new(50_000.0, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| Error::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(url) = file_config.overpass_url {
            self.overpass_url.update(url, ConfigSource::File);
        }
        if let Some(secs) = file_config.request_timeout_secs {
            self.request_timeout_secs.update(secs, ConfigSource::File);
        }
        if let Some(secs) = file_config.query_timeout_secs {
            self.query_timeout_secs.update(secs, ConfigSource::File);
        }
        if let Some(attempts) = file_config.max_attempts {
            self.max_attempts.update(attempts, ConfigSource::File);
        }
        if let Some(ms) = file_config.backoff_base_ms {
            self.backoff_base_ms.update(ms, ConfigSource::File);
        }
        if let Some(ms) = file_config.backoff_max_ms {
            self.backoff_max_ms.update(ms, ConfigSource::File);
        }
        if let Some(n) = file_config.max_concurrency {
            self.max_concurrency.update(n, ConfigSource::File);
        }
        if let Some(ms) = file_config.request_spacing_ms {
            self.request_spacing_ms.update(ms, ConfigSource::File);
        }
        if let Some(distance) = file_config.nearest_max_distance {
            self.nearest_max_distance.update(distance, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // OSMCACHE_OVERPASS_URL
        if let Ok(url) = env::var("OSMCACHE_OVERPASS_URL") {
            match parse_url(&url) {
                Ok(url) => self.overpass_url.update(url, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid OSMCACHE_OVERPASS_URL value '{}': expected an http(s) URL",
                    url
                ),
            }
        }

        // OSMCACHE_REQUEST_TIMEOUT
        if let Ok(timeout_str) = env::var("OSMCACHE_REQUEST_TIMEOUT") {
            match parse_positive::<u64>("request_timeout_secs", &timeout_str) {
                Ok(secs) => self.request_timeout_secs.update(secs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid OSMCACHE_REQUEST_TIMEOUT value '{}': expected seconds > 0",
                    timeout_str
                ),
            }
        }

        // OSMCACHE_MAX_ATTEMPTS
        if let Ok(attempts_str) = env::var("OSMCACHE_MAX_ATTEMPTS") {
            match parse_positive::<u32>("max_attempts", &attempts_str) {
                Ok(n) => self.max_attempts.update(n, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid OSMCACHE_MAX_ATTEMPTS value '{}': expected an integer > 0",
                    attempts_str
                ),
            }
        }

        // OSMCACHE_MAX_CONCURRENCY
        if let Ok(concurrency_str) = env::var("OSMCACHE_MAX_CONCURRENCY") {
            match parse_positive::<usize>("max_concurrency", &concurrency_str) {
                Ok(n) => self.max_concurrency.update(n, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid OSMCACHE_MAX_CONCURRENCY value '{}': expected an integer > 0",
                    concurrency_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(url) = overrides.overpass_url {
            self.overpass_url.update(url, ConfigSource::Cli);
        }

        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout_secs.update(secs, ConfigSource::Cli);
        }

        if let Some(n) = overrides.max_concurrency {
            self.max_concurrency.update(n, ConfigSource::Cli);
        }

        if let Some(distance) = overrides.nearest_max_distance {
            self.nearest_max_distance.update(distance, ConfigSource::Cli);
        }
    }

    /// Reject combinations no downloader can run with
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts.value == 0 {
            return Err(invalid("max_attempts", "must be at least 1"));
        }
        if self.max_concurrency.value == 0 {
            return Err(invalid("max_concurrency", "must be at least 1"));
        }
        if self.request_timeout_secs.value == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        if self.backoff_max_ms.value < self.backoff_base_ms.value {
            return Err(invalid("backoff_max_ms", "must not be below backoff_base_ms"));
        }
        if !self.nearest_max_distance.value.is_finite() || self.nearest_max_distance.value < 0.0 {
            return Err(invalid("nearest_max_distance", "must be a finite, non-negative number"));
        }
        Ok(())
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "overpass_url".to_string(),
            (self.overpass_url.value.clone(), self.overpass_url.source),
        );
        map.insert(
            "request_timeout_secs".to_string(),
            (self.request_timeout_secs.value.to_string(), self.request_timeout_secs.source),
        );
        map.insert(
            "query_timeout_secs".to_string(),
            (self.query_timeout_secs.value.to_string(), self.query_timeout_secs.source),
        );
        map.insert(
            "max_attempts".to_string(),
            (self.max_attempts.value.to_string(), self.max_attempts.source),
        );
        map.insert(
            "backoff_base_ms".to_string(),
            (self.backoff_base_ms.value.to_string(), self.backoff_base_ms.source),
        );
        map.insert(
            "backoff_max_ms".to_string(),
            (self.backoff_max_ms.value.to_string(), self.backoff_max_ms.source),
        );
        map.insert(
            "max_concurrency".to_string(),
            (self.max_concurrency.value.to_string(), self.max_concurrency.source),
        );
        map.insert(
            "request_spacing_ms".to_string(),
            (self.request_spacing_ms.value.to_string(), self.request_spacing_ms.source),
        );
        map.insert(
            "nearest_max_distance".to_string(),
            (self.nearest_max_distance.value.to_string(), self.nearest_max_distance.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    overpass_url: Option<String>,
    request_timeout_secs: Option<u64>,
    query_timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    backoff_base_ms: Option<u64>,
    backoff_max_ms: Option<u64>,
    max_concurrency: Option<usize>,
    request_spacing_ms: Option<u64>,
    nearest_max_distance: Option<f64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub overpass_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub nearest_max_distance: Option<f64>,
}

fn invalid(key: &str, reason: &str) -> Error {
    Error::ConfigInvalid { key: key.to_string(), reason: reason.to_string() }
}

/// Parse an endpoint URL
pub fn parse_url(s: &str) -> Result<String> {
    let trimmed = s.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(Error::ConfigInvalid {
            key: "overpass_url".to_string(),
            reason: format!("Invalid URL: {}. Use an http:// or https:// address", s),
        })
    }
}

/// Parse a strictly positive integer
pub fn parse_positive<T>(key: &str, s: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match s.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(Error::ConfigInvalid {
            key: key.to_string(),
            reason: format!("Invalid value: {}. Use an integer greater than zero", s),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.overpass_url.value, DEFAULT_OVERPASS_URL);
        assert_eq!(config.overpass_url.source, ConfigSource::Default);
        assert_eq!(config.request_timeout_secs.value, 190);
        assert_eq!(config.query_timeout_secs.value, 180);
        assert_eq!(config.max_attempts.value, 3);
        assert_eq!(config.max_concurrency.value, 2);
        assert_eq!(config.nearest_max_distance.value, 50_000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);
        assert_eq!(value.source, ConfigSource::Environment);

        // CLI should override environment
        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
overpass_url = "https://overpass.example.org/api/interpreter"
max_attempts = 5
max_concurrency = 4
request_spacing_ms = 250
nearest_max_distance = 1500.0
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.overpass_url.value, "https://overpass.example.org/api/interpreter");
        assert_eq!(config.overpass_url.source, ConfigSource::File);
        assert_eq!(config.max_attempts.value, 5);
        assert_eq!(config.max_concurrency.value, 4);
        assert_eq!(config.request_spacing_ms.value, 250);
        assert_eq!(config.nearest_max_distance.value, 1500.0);
        assert_eq!(config.request_timeout_secs.source, ConfigSource::Default);
    }

    #[test]
    fn test_load_from_bad_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_attempts = \"many\"").unwrap();
        assert!(LayeredConfig::with_defaults().load_from_file(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        env::set_var("OSMCACHE_MAX_CONCURRENCY", "6");
        env::set_var("OSMCACHE_MAX_ATTEMPTS", "zero");
        let config = LayeredConfig::with_defaults().load_from_env();
        env::remove_var("OSMCACHE_MAX_CONCURRENCY");
        env::remove_var("OSMCACHE_MAX_ATTEMPTS");

        assert_eq!(config.max_concurrency.value, 6);
        assert_eq!(config.max_concurrency.source, ConfigSource::Environment);
        // Invalid values are ignored
        assert_eq!(config.max_attempts.value, 3);
        assert_eq!(config.max_attempts.source, ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        let overrides = CliConfigOverrides {
            max_concurrency: Some(1),
            nearest_max_distance: Some(250.0),
            ..Default::default()
        };

        config.update_from_cli(overrides);

        assert_eq!(config.max_concurrency.value, 1);
        assert_eq!(config.max_concurrency.source, ConfigSource::Cli);
        assert_eq!(config.nearest_max_distance.value, 250.0);
        assert_eq!(config.overpass_url.source, ConfigSource::Default);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = LayeredConfig::with_defaults();
        config.max_concurrency.update(0, ConfigSource::Cli);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_url("https://example.org").is_ok());
        assert!(parse_url("ftp://example.org").is_err());
        assert_eq!(parse_positive::<u32>("k", "4").unwrap(), 4);
        assert!(parse_positive::<u32>("k", "0").is_err());
        assert!(parse_positive::<u32>("k", "-1").is_err());
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert_eq!(map.len(), 9);
        let (url, source) = &map["overpass_url"];
        assert_eq!(url, DEFAULT_OVERPASS_URL);
        assert_eq!(*source, ConfigSource::Default);
    }
}
