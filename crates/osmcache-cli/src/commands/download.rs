use crate::cli::DownloadArgs;
use crate::commands::Project;
use crate::errors::{self, CliError};
use crate::interactive::confirm;
use crate::output::OutputWriter;
use crate::output_types::{DownloadOutput, FailedCategory};
use crate::progress::DownloadProgress;
use anyhow::Result;
use osmcache_core::config::CliConfigOverrides;
use osmcache_core::models::Category;
use osmcache_manager::{CacheManager, CacheState};
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

#[derive(Tabled)]
struct LayerRow {
    #[tabled(rename = "Category")]
    category: &'static str,
    #[tabled(rename = "Layer")]
    layer: String,
    #[tabled(rename = "Features")]
    features: usize,
}

pub async fn execute(args: DownloadArgs, project: &Project, output: &OutputWriter) -> Result<()> {
    let config = project.config_with(CliConfigOverrides {
        overpass_url: args.overpass_url.clone(),
        request_timeout_secs: args.timeout,
        max_concurrency: args.concurrency,
        nearest_max_distance: None,
    })?;
    let study_area = args.area.study_area()?;
    let categories = if args.categories.is_empty() {
        Category::ALL.to_vec()
    } else {
        args.categories.clone()
    };

    let mut manager = project.manager(&config)?;
    let state = manager
        .check(&study_area)
        .map_err(|e| errors::from_cache_error(e, project.dir()))?
        .clone();

    let refresh = match &state {
        CacheState::Valid if !args.refresh => {
            output.success("Cache is already valid for this study area");
            return report(&manager, false, output);
        }
        CacheState::Valid => true,
        CacheState::Invalid(reason) => {
            output.warning(format!("Existing cache is invalid: {}", reason));
            true
        }
        _ => false,
    };

    if refresh && !confirm("Replace the existing OSM cache?", args.yes, output.is_json())? {
        return match state {
            CacheState::Invalid(reason) => Err(errors::cache_invalid(reason).into()),
            _ => {
                output.info("Kept the existing cache");
                Ok(())
            }
        };
    }

    output.info(format!(
        "Downloading {} categories from {} for {}",
        categories.len(),
        config.overpass_url.value,
        study_area.bbox()
    ));

    let cancel = CancellationToken::new();
    let interrupt = {
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; keeping categories that already finished");
                token.cancel();
            }
        })
    };

    let mut progress = DownloadProgress::new(categories.len(), output.is_json());
    let result = if refresh {
        manager.confirm_refresh(&study_area, &categories, &mut progress, &cancel).await
    } else {
        manager.ensure(&study_area, &categories, &mut progress, &cancel).await
    };
    interrupt.abort();

    if let Err(e) = result {
        progress.abandon("Download failed");
        return Err(errors::from_cache_error(e, project.dir()).into());
    }

    match manager.state().clone() {
        CacheState::Valid => {
            if let Some(outcome) = manager.last_outcome() {
                progress.finish(outcome.counts.len(), outcome.failed.len());
            }
            report(&manager, true, output)
        }
        CacheState::Error(message) => {
            progress.abandon("Download failed");
            if cancel.is_cancelled() {
                return Err(CliError::new("Download cancelled")
                    .with_context("No category finished before the interrupt; any previously valid cache is unchanged.")
                    .into());
            }
            Err(errors::download_failed(&message).into())
        }
        other => Err(CliError::new(format!("Unexpected cache state after download: {}", other)).into()),
    }
}

fn report(manager: &CacheManager, downloaded: bool, output: &OutputWriter) -> Result<()> {
    let outcome = manager.last_outcome();
    let counts = match outcome {
        Some(outcome) => outcome.counts.clone(),
        None => manager
            .get_cache_info()
            .map_err(|e| errors::from_cache_error(e, manager.layout().root()))?
            .map(|info| info.counts)
            .unwrap_or_default(),
    };
    let failed: Vec<FailedCategory> = outcome
        .map(|o| {
            o.failed
                .iter()
                .map(|(category, reason)| FailedCategory { category: *category, reason: reason.to_string() })
                .collect()
        })
        .unwrap_or_default();

    if output.is_json() {
        return output.result(DownloadOutput {
            state: manager.state().clone(),
            downloaded,
            generation: outcome.map(|o| o.generation),
            osm_timestamp: outcome.map(|o| o.source_timestamp),
            counts,
            failed,
        });
    }

    if downloaded {
        output.success(format!(
            "Cached {} features in {} categories",
            counts.values().sum::<usize>(),
            counts.len()
        ));
    }
    let rows: Vec<LayerRow> = counts
        .iter()
        .map(|(category, features)| LayerRow {
            category: category.label(),
            layer: category.layer_name(),
            features: *features,
        })
        .collect();
    output.table(rows);

    for entry in &failed {
        output.warning(format!("{} not cached: {}", entry.category.label(), entry.reason));
    }
    if !failed.is_empty() {
        output.info("Run the download again with --refresh --yes to retry the failed categories");
    }
    Ok(())
}
