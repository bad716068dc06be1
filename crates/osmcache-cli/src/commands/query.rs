use crate::cli::{AreaQueryArgs, NearestArgs};
use crate::commands::{query_area, Project};
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::CountOutput;
use anyhow::Result;
use osmcache_query::{FeatureSummary, LocalQueryEngine};
use tabled::Tabled;

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "OSM ID")]
    osm_id: i64,
    #[tabled(rename = "Type")]
    osm_type: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&FeatureSummary> for FeatureRow {
    fn from(feature: &FeatureSummary) -> Self {
        Self {
            osm_id: feature.osm_id,
            osm_type: feature.osm_type.to_string(),
            name: feature.name.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub fn count(args: AreaQueryArgs, project: &Project, output: &OutputWriter) -> Result<()> {
    let area = query_area(args.wkt.as_deref(), args.bbox.as_ref())?;
    let engine = LocalQueryEngine::for_project(project.dir());

    let count = engine
        .count_features(args.category, &area)
        .map_err(|e| errors::from_query_error(e, project.dir()))?;

    if output.is_json() {
        return output.result(CountOutput { category: args.category, count });
    }
    output.kv(args.category.label(), count);
    Ok(())
}

pub fn features(args: AreaQueryArgs, project: &Project, output: &OutputWriter) -> Result<()> {
    let area = query_area(args.wkt.as_deref(), args.bbox.as_ref())?;
    let engine = LocalQueryEngine::for_project(project.dir());

    let features = match (&args.wkt, &args.bbox) {
        (None, Some(bbox)) => engine.features_within_bbox(args.category, bbox),
        _ => engine.get_features_within_polygon(args.category, &area),
    }
    .map_err(|e| errors::from_query_error(e, project.dir()))?;

    if output.is_json() {
        return output.result(&features);
    }

    output.section(format!("{} ({})", args.category.label(), features.len()));
    output.table(features.iter().map(FeatureRow::from).collect());
    Ok(())
}

pub fn names(args: AreaQueryArgs, project: &Project, output: &OutputWriter) -> Result<()> {
    let area = query_area(args.wkt.as_deref(), args.bbox.as_ref())?;
    let engine = LocalQueryEngine::for_project(project.dir());

    let names = engine
        .get_named_features_within_polygon(args.category, &area)
        .map_err(|e| errors::from_query_error(e, project.dir()))?;

    if output.is_json() {
        return output.result(&names);
    }

    if names.is_empty() {
        output.info(format!("No named {} in this area", args.category.label().to_lowercase()));
    }
    for name in &names {
        println!("{}", name);
    }
    Ok(())
}

pub fn nearest(args: NearestArgs, project: &Project, output: &OutputWriter) -> Result<()> {
    let max_distance = match args.max_distance {
        Some(distance) => distance,
        None => project.config()?.nearest_max_distance.value,
    };
    let engine = LocalQueryEngine::for_project(project.dir());

    let nearest = engine
        .nearest_feature(args.category, [args.x, args.y], max_distance)
        .map_err(|e| errors::from_query_error(e, project.dir()))?;

    if output.is_json() {
        return output.result(&nearest);
    }

    match nearest {
        Some(hit) => {
            output.kv("Nearest", hit.feature.name.as_deref().unwrap_or("(unnamed)"));
            output.kv("OSM", format!("{} {}", hit.feature.osm_type, hit.feature.osm_id));
            output.kv("Distance", format!("{:.2}", hit.distance));
        }
        None => output.info(format!(
            "No {} within {} map units",
            args.category.label().to_lowercase(),
            max_distance
        )),
    }
    Ok(())
}
