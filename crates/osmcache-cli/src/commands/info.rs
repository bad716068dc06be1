use crate::cli::ClearArgs;
use crate::commands::Project;
use crate::errors;
use crate::interactive::confirm;
use crate::output::OutputWriter;
use anyhow::Result;
use osmcache_core::models::CacheInfo;
use tabled::Tabled;

#[derive(Tabled)]
struct LayerRow {
    #[tabled(rename = "Layer")]
    layer: String,
    #[tabled(rename = "Category")]
    category: &'static str,
    #[tabled(rename = "Features")]
    features: usize,
}

pub fn execute(project: &Project, output: &OutputWriter) -> Result<()> {
    let config = project.config()?;
    let manager = project.manager(&config)?;
    let info = manager
        .get_cache_info()
        .map_err(|e| errors::from_cache_error(e, project.dir()))?;

    let Some(info) = info else {
        return Err(errors::no_cache(project.dir()).into());
    };

    if output.is_json() {
        return output.result(&info);
    }

    output.section("OSM Cache");
    output.kv("Location", manager.layout().root().display());
    print_info(&info, output);
    Ok(())
}

/// Human summary shared with the status command
pub fn print_info(info: &CacheInfo, output: &OutputWriter) {
    output.kv("Created", info.created.format("%Y-%m-%d %H:%M:%S UTC"));
    output.kv("OSM data as of", info.osm_timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    output.kv("CRS", &info.crs);
    output.kv("Extent", info.bbox);
    output.kv("Size", format!("{:.2} MB", info.size_mb()));
    output.kv("Generation", info.generation);
    output.kv("Features", info.total_features());

    output.section("Layers");
    let rows: Vec<LayerRow> = info
        .counts
        .iter()
        .map(|(category, features)| LayerRow {
            layer: category.layer_name(),
            category: category.label(),
            features: *features,
        })
        .collect();
    output.table(rows);

    let missing: Vec<&str> = info
        .categories
        .iter()
        .filter(|c| !info.counts.contains_key(*c))
        .map(|c| c.label())
        .collect();
    if !missing.is_empty() {
        output.warning(format!("Recorded but not stored: {}", missing.join(", ")));
    }
}

pub fn clear(args: ClearArgs, project: &Project, output: &OutputWriter) -> Result<()> {
    let config = project.config()?;
    let mut manager = project.manager(&config)?;

    if manager.layout().is_empty() {
        output.info("No cache to clear");
        return Ok(());
    }

    let prompt = format!("Delete the OSM cache in {}?", manager.layout().root().display());
    if !confirm(&prompt, args.yes, output.is_json())? {
        output.info("Kept the existing cache");
        return Ok(());
    }

    manager
        .clear_cache()
        .map_err(|e| errors::from_cache_error(e, project.dir()))?;
    output.success("Cache cleared");
    Ok(())
}
