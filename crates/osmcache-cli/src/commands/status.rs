use crate::cli::StatusArgs;
use crate::commands::info::print_info;
use crate::commands::Project;
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::StatusOutput;
use anyhow::Result;
use console::style;
use osmcache_manager::CacheState;

pub fn execute(args: StatusArgs, project: &Project, output: &OutputWriter) -> Result<()> {
    let config = project.config()?;
    let study_area = args.area.study_area()?;
    let mut manager = project.manager(&config)?;

    let state = manager
        .check(&study_area)
        .map_err(|e| errors::from_cache_error(e, project.dir()))?
        .clone();
    let info = manager
        .get_cache_info()
        .map_err(|e| errors::from_cache_error(e, project.dir()))?;

    if output.is_json() {
        return output.result(StatusOutput {
            project_dir: project.dir().display().to_string(),
            state,
            study_area_hash: study_area.hash().to_string(),
            info,
        });
    }

    output.section("Cache Status");
    output.kv("Project", project.dir().display());
    output.kv("Study area", format!("{} ({})", study_area.bbox(), study_area.crs()));

    let state_label = match &state {
        CacheState::Valid => style(state.to_string()).green().to_string(),
        CacheState::NoCache => style(state.to_string()).dim().to_string(),
        _ => style(state.to_string()).yellow().to_string(),
    };
    output.kv("State", state_label);

    if let Some(info) = &info {
        print_info(info, output);
    }

    match state {
        CacheState::NoCache => output.info("Download with: osmcache download --bbox xmin,ymin,xmax,ymax"),
        CacheState::Invalid(_) => output.info("Replace with: osmcache download --yes ..."),
        _ => {}
    }
    Ok(())
}
