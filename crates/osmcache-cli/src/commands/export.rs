use crate::cli::ExportArgs;
use crate::commands::Project;
use crate::errors::{self, CliError};
use crate::output::OutputWriter;
use crate::output_types::ExportOutput;
use anyhow::{Context, Result};
use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};
use osmcache_core::models::{Category, Crs, Feature, Geometry};
use osmcache_store::{FeatureStore, StoreError};
use std::fs;

pub fn execute(args: ExportArgs, project: &Project, output: &OutputWriter) -> Result<()> {
    let layout = project.layout();
    let store = match FeatureStore::open(&layout.store_path()) {
        Ok(store) => store,
        Err(StoreError::NotFound { .. }) => return Err(errors::no_cache(project.dir()).into()),
        Err(e) => return Err(e).context("Failed to open the feature store"),
    };

    if !store.has_layer(args.category) {
        return Err(CliError::new(format!("{} are not cached", args.category.label()))
            .with_suggestion(format!("Download them: osmcache download --categories {} ...", args.category))
            .with_help("Run: osmcache info")
            .into());
    }

    let features = store.layer(args.category);
    let collection = feature_collection(args.category, store.crs(), features);
    let text = GeoJson::from(collection).to_string();

    match &args.output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            if output.is_json() {
                return output.result(ExportOutput {
                    category: args.category,
                    features: features.len(),
                    path: path.display().to_string(),
                });
            }
            output.success(format!(
                "Exported {} {} to {}",
                features.len(),
                args.category.label().to_lowercase(),
                path.display()
            ));
        }
        None => println!("{}", text),
    }
    Ok(())
}

/// One layer as a FeatureCollection, with the CRS as a named foreign member
pub fn feature_collection(category: Category, crs: &Crs, features: &[Feature]) -> FeatureCollection {
    let crs_member = serde_json::json!({
        "type": "name",
        "properties": { "name": crs.authid() },
    });
    let mut foreign_members = JsonObject::new();
    foreign_members.insert("crs".to_string(), crs_member);
    foreign_members.insert("name".to_string(), JsonValue::from(category.layer_name()));

    FeatureCollection {
        bbox: None,
        features: features.iter().map(to_geojson_feature).collect(),
        foreign_members: Some(foreign_members),
    }
}

fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    let mut properties = JsonObject::new();
    properties.insert("osm_id".to_string(), JsonValue::from(feature.osm_id));
    properties.insert("osm_type".to_string(), JsonValue::from(feature.osm_type.as_str()));
    properties.insert("category".to_string(), JsonValue::from(feature.category.as_str()));
    properties.insert(
        "name".to_string(),
        feature.name.clone().map(JsonValue::from).unwrap_or(JsonValue::Null),
    );

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(to_geojson_value(&feature.geometry))),
        id: Some(geojson::feature::Id::String(format!("{}/{}", feature.osm_type, feature.osm_id))),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn to_geojson_value(geometry: &Geometry) -> geojson::Value {
    match geometry {
        Geometry::Point { coordinates } => geojson::Value::Point(coordinates.to_vec()),
        Geometry::LineString { coordinates } => {
            geojson::Value::LineString(coordinates.iter().map(|c| c.to_vec()).collect())
        }
        Geometry::Polygon { coordinates } => geojson::Value::Polygon(
            coordinates
                .iter()
                .map(|ring| ring.iter().map(|c| c.to_vec()).collect())
                .collect(),
        ),
    }
}
