//! Command implementations

mod config;
mod download;
mod export;
mod info;
mod query;
mod status;

use crate::cli::{Cli, Commands, StudyAreaArgs};
use crate::config_loader::load_project_config_with_overrides;
use crate::errors::{self, CliError};
use crate::output::OutputWriter;
use anyhow::Result;
use osmcache_core::config::{CliConfigOverrides, LayeredConfig};
use osmcache_core::models::{BoundingBox, Geometry};
use osmcache_fetch::Downloader;
use osmcache_geo::wkt_io::parse_wkt;
use osmcache_geo::StudyArea;
use osmcache_manager::CacheManager;
use osmcache_store::CacheLayout;
use std::path::{Path, PathBuf};

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let project = Project { dir: cli.project_dir, config_file: cli.config };

    match cli.command {
        Commands::Download(args) => download::execute(args, &project, &output).await,
        Commands::Status(args) => status::execute(args, &project, &output),
        Commands::Info => info::execute(&project, &output),
        Commands::Clear(args) => info::clear(args, &project, &output),
        Commands::Count(args) => query::count(args, &project, &output),
        Commands::Features(args) => query::features(args, &project, &output),
        Commands::Names(args) => query::names(args, &project, &output),
        Commands::Nearest(args) => query::nearest(args, &project, &output),
        Commands::Export(args) => export::execute(args, &project, &output),
        Commands::Config => config::execute(&project, &output),
    }
}

/// Project directory and config file selected on the command line
pub struct Project {
    pub dir: PathBuf,
    pub config_file: Option<PathBuf>,
}

impl Project {
    pub fn layout(&self) -> CacheLayout {
        CacheLayout::for_project(&self.dir)
    }

    pub fn config(&self) -> Result<LayeredConfig> {
        self.config_with(CliConfigOverrides::default())
    }

    pub fn config_with(&self, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
        let config =
            load_project_config_with_overrides(&self.dir, self.config_file.as_deref(), overrides)
                .map_err(|e| errors::invalid_config("file", &format!("{:#}", e)))?;

        if let Err(osmcache_core::Error::ConfigInvalid { key, reason }) = config.validate() {
            return Err(errors::invalid_config(&key, &reason).into());
        }
        Ok(config)
    }

    pub fn manager(&self, config: &LayeredConfig) -> Result<CacheManager> {
        let downloader = Downloader::from_config(config)
            .map_err(|e| errors::invalid_config("overpass_url", &e.to_string()))?;
        Ok(CacheManager::new(self.layout(), downloader))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StudyAreaArgs {
    pub fn study_area(&self) -> Result<StudyArea, CliError> {
        let study_area = match (&self.wkt, &self.bbox) {
            (Some(wkt), _) => StudyArea::from_wkt(wkt, self.crs.clone()),
            (None, Some(bbox)) => StudyArea::from_extent(*bbox, self.crs.clone()),
            (None, None) => return Err(errors::invalid_geometry("no study area given")),
        };
        study_area.map_err(|e| errors::invalid_geometry(&e.to_string()))
    }
}

/// Query area from `--wkt` or `--bbox`
pub fn query_area(wkt: Option<&str>, bbox: Option<&BoundingBox>) -> Result<Geometry, CliError> {
    match (wkt, bbox) {
        (Some(wkt), _) => parse_wkt(wkt).map_err(|e| errors::invalid_geometry(&e.to_string())),
        (None, Some(bbox)) => Ok(Geometry::rectangle(bbox)),
        (None, None) => Err(errors::invalid_geometry("no query area given")),
    }
}
