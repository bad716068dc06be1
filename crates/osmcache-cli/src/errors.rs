use console::style;
use osmcache_core::error::{QueryError, ValidationError};
use osmcache_manager::CacheError;
use osmcache_store::StoreError;
use std::fmt;
use std::path::Path;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// No cache under the project directory
pub fn no_cache(project_dir: &Path) -> CliError {
    CliError::new("No OSM cache found")
        .with_context(format!(
            "The project has no cached OSM data yet.\n\nProject directory: {}",
            project_dir.display()
        ))
        .with_suggestion("Download one: osmcache download --bbox xmin,ymin,xmax,ymax")
        .with_suggestion("Or point at another project: --project-dir <path>")
        .with_help("Run: osmcache download --help")
}

/// Cache does not match the requested study area
pub fn cache_invalid(reason: ValidationError) -> CliError {
    let error = CliError::new("OSM cache is not valid for this study area")
        .with_context(format!("Reason: {}", reason));

    let error = match reason {
        ValidationError::CrsMismatch => error
            .with_suggestion("Request the study area in the cache CRS: --crs <EPSG>")
            .with_suggestion("Or replace the cache: osmcache download --yes ..."),
        _ => error
            .with_suggestion("Replace the cache: osmcache download --yes ...")
            .with_suggestion("Inspect it first: osmcache info"),
    };
    error.with_help("Run: osmcache status --help")
}

/// Download committed nothing
pub fn download_failed(reason: &str) -> CliError {
    CliError::new("OSM download failed")
        .with_context(format!("No category could be cached; any previously valid cache is unchanged.\n\nError: {}", reason))
        .with_suggestion("Check network access to the Overpass API")
        .with_suggestion("Try another endpoint: --overpass-url <url> or OSMCACHE_OVERPASS_URL")
        .with_suggestion("Raise the timeout for large areas: --timeout <secs>")
        .with_help("Run: osmcache config")
}

/// Another process holds the cache lock
pub fn cache_busy(lock_path: &Path) -> CliError {
    CliError::new("OSM cache is busy")
        .with_context(format!(
            "Another osmcache process is writing this cache.\n\nLock file: {}",
            lock_path.display()
        ))
        .with_suggestion("Wait for the other download to finish and try again")
        .with_suggestion(format!(
            "If no osmcache process is running, delete the lock file: rm {}",
            lock_path.display()
        ))
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check osmcache.toml for syntax errors")
        .with_suggestion("Or unset the matching OSMCACHE_* environment variable")
        .with_help("Run: osmcache config")
}

/// Create error for an unusable study area or query geometry
pub fn invalid_geometry(reason: &str) -> CliError {
    CliError::new("Invalid geometry")
        .with_context(format!("Error: {}", reason))
        .with_suggestion("Give a closed polygon: --wkt \"POLYGON((x y, ...))\"")
        .with_suggestion("Or an extent: --bbox xmin,ymin,xmax,ymax")
}

/// Map a local query failure to a user-facing error
pub fn from_query_error(error: QueryError, project_dir: &Path) -> CliError {
    let message = error.to_string();
    match error {
        QueryError::CacheUnavailable { .. } => no_cache(project_dir),
        QueryError::CorruptIndex { .. } => CliError::new("OSM cache layer is corrupt")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Replace the cache: osmcache download --yes ...")
            .with_suggestion("Or delete it: osmcache clear"),
        QueryError::InvalidGeometry { reason } => invalid_geometry(&reason),
    }
}

/// Map a cache manager failure to a user-facing error
pub fn from_cache_error(error: CacheError, project_dir: &Path) -> CliError {
    match error {
        CacheError::Store(StoreError::Busy { path }) => cache_busy(&path),
        CacheError::Query(e) => from_query_error(e, project_dir),
        CacheError::Core(osmcache_core::Error::InvalidGeometry { reason }) => invalid_geometry(&reason),
        other => CliError::new(other.to_string()),
    }
}
