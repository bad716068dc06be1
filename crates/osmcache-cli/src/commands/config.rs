use crate::commands::Project;
use crate::config_loader::config_path;
use crate::output::OutputWriter;
use crate::output_types::ConfigEntry;
use anyhow::Result;
use std::collections::BTreeMap;
use tabled::Tabled;

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(project: &Project, output: &OutputWriter) -> Result<()> {
    let config = project.config()?;
    let entries: BTreeMap<String, ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| (key, ConfigEntry { value, source: format!("{:?}", source) }))
        .collect();

    if output.is_json() {
        return output.result(&entries);
    }

    output.section("Configuration");
    match config_path(project.dir(), project.config_file.as_deref()) {
        Some(path) => output.kv("Config file", path.display()),
        None => output.kv("Config file", "(none, defaults and environment only)"),
    }

    let rows: Vec<ConfigRow> = entries
        .into_iter()
        .map(|(key, entry)| ConfigRow { key, value: entry.value, source: entry.source })
        .collect();
    output.table(rows);
    Ok(())
}
