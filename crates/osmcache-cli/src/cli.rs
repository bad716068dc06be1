use clap::{Args, Parser, Subcommand};
use osmcache_core::models::{BoundingBox, Category, Crs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "osmcache")]
#[command(about = "Local OpenStreetMap cache for study-area analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Project directory holding the cache
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Config file (defaults to <project-dir>/osmcache.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download OSM features for a study area into the cache
    Download(DownloadArgs),

    /// Validate the cache against a study area and summarize it
    Status(StatusArgs),

    /// Summarize the cache on disk
    Info,

    /// Delete the cache
    Clear(ClearArgs),

    /// Count features of a category inside an area
    Count(AreaQueryArgs),

    /// List features of a category inside an area
    Features(AreaQueryArgs),

    /// List names of features of a category inside an area
    Names(AreaQueryArgs),

    /// Find the closest feature of a category to a point
    Nearest(NearestArgs),

    /// Export one cached layer as a GeoJSON FeatureCollection
    Export(ExportArgs),

    /// Show effective configuration values and their sources
    Config,
}

/// Study area given as WKT or as an extent
#[derive(Args, Clone)]
pub struct StudyAreaArgs {
    /// Study area polygon as WKT
    #[arg(long, conflicts_with = "bbox", required_unless_present = "bbox")]
    pub wkt: Option<String>,

    /// Study area extent as xmin,ymin,xmax,ymax
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<BoundingBox>,

    /// CRS of the study area and of the cached features
    #[arg(long, default_value = "EPSG:4326")]
    pub crs: Crs,
}

#[derive(Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub area: StudyAreaArgs,

    /// Categories to download (comma-separated; all when omitted)
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<Category>,

    /// Replace an existing cache without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Replace the cache even when it is valid for this study area
    #[arg(long)]
    pub refresh: bool,

    /// Overpass API endpoint
    #[arg(long)]
    pub overpass_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum categories fetched at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub area: StudyAreaArgs,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Query area in the cache CRS
#[derive(Args)]
pub struct AreaQueryArgs {
    /// Feature category
    pub category: Category,

    /// Query polygon as WKT
    #[arg(long, conflicts_with = "bbox", required_unless_present = "bbox")]
    pub wkt: Option<String>,

    /// Query extent as xmin,ymin,xmax,ymax
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<BoundingBox>,
}

#[derive(Args)]
pub struct NearestArgs {
    /// Feature category
    pub category: Category,

    /// X coordinate in the cache CRS
    #[arg(allow_negative_numbers = true)]
    pub x: f64,

    /// Y coordinate in the cache CRS
    #[arg(allow_negative_numbers = true)]
    pub y: f64,

    /// Search radius in map units (defaults to nearest_max_distance)
    #[arg(long)]
    pub max_distance: Option<f64>,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Feature category
    pub category: Category,

    /// Output file (stdout when omitted)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Parse `xmin,ymin,xmax,ymax`
pub fn parse_bbox(value: &str) -> Result<BoundingBox, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in bbox '{}': {}", value, e))?;

    let [xmin, ymin, xmax, ymax] = parts[..] else {
        return Err(format!("expected xmin,ymin,xmax,ymax, got '{}'", value));
    };

    let bbox = BoundingBox::new(xmin, ymin, xmax, ymax);
    if !bbox.is_valid() {
        return Err(format!("bbox '{}' is empty or inverted", value));
    }
    Ok(bbox)
}
