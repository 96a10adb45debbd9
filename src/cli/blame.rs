//! Blame command - compute SCM measures for files

use anyhow::{Context, Result};
use console::style;
use rayon::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use scm_activity::activity::{Blame, RepositoryResolver};
use scm_activity::config::ScmConfiguration;
use scm_activity::measures::{content_hash, JsonMeasureStore, MeasureUpdate};
use scm_activity::scm::{ScmClient, ScmManager};

/// Run the blame command
pub fn run(
    path: &Path,
    files: &[PathBuf],
    format: &str,
    store: Option<&Path>,
    workers: usize,
) -> Result<()> {
    let basedir = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    let configuration = ScmConfiguration::load(&basedir);
    let client: Arc<dyn ScmClient> = Arc::new(ScmManager::with_default_providers());
    let blame = Blame::new(RepositoryResolver::new(client, configuration));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")?;

    // Files share one resolver; the first worker to need the repository builds it
    let results: Vec<Result<Option<MeasureUpdate>>> = pool.install(|| {
        files
            .par_iter()
            .map(|file| measure_file(&blame, &basedir, file))
            .collect()
    });
    let updates: Vec<MeasureUpdate> = results
        .into_iter()
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    let saved = updates.iter().filter(|u| u.measures().is_some()).count();
    info!(
        "Computed SCM measures for {} of {} files",
        saved,
        updates.len()
    );

    match format {
        "json" => print_json(&updates)?,
        _ => print_text(&updates),
    }

    if let Some(store_path) = store {
        let mut store = JsonMeasureStore::open(store_path)
            .with_context(|| format!("Failed to open measure store {}", store_path.display()))?;
        for update in &updates {
            update.apply(&mut store);
        }
        store
            .persist()
            .with_context(|| format!("Failed to write measure store {}", store_path.display()))?;
    }

    Ok(())
}

/// Blame one file. Unreadable files are skipped; resolution errors abort.
fn measure_file(blame: &Blame, basedir: &Path, file: &Path) -> Result<Option<MeasureUpdate>> {
    let path = match source_path(basedir, file).canonicalize() {
        Ok(path) => path,
        Err(e) => {
            warn!("Skipping {}: {}", file.display(), e);
            return Ok(None);
        }
    };
    let hash = match content_hash(&path) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            return Ok(None);
        }
    };

    let resource = resource_key(basedir, &path);
    let update = blame
        .build_measures(&path, &resource, &hash)
        .context("Unable to resolve the SCM repository")?;
    Ok(Some(update))
}

/// Relative files are taken from the base directory
fn source_path(basedir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        basedir.join(file)
    }
}

/// Resource key: path relative to the base directory, with `/` separators
fn resource_key(basedir: &Path, path: &Path) -> String {
    path.strip_prefix(basedir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn print_text(updates: &[MeasureUpdate]) {
    for update in updates {
        match update {
            MeasureUpdate::SaveNewMeasures { resource, measures } => {
                println!(
                    "{} {} ({} lines)",
                    style("✓").green(),
                    style(resource).cyan(),
                    measures.line_count()
                );
                for (line, author) in &measures.authors {
                    let date = measures.dates.get(line).map(String::as_str).unwrap_or("");
                    let revision = measures.revisions.get(line).map(String::as_str).unwrap_or("");
                    println!("  {:>5}  {:<20} {}  {}", line, author, date, revision);
                }
            }
            MeasureUpdate::CopyPreviousMeasures { resource } => {
                println!(
                    "{} {} (no SCM data, previous measures kept)",
                    style("-").yellow(),
                    style(resource).cyan()
                );
            }
        }
    }
}

fn print_json(updates: &[MeasureUpdate]) -> Result<()> {
    let entries: Vec<serde_json::Value> = updates
        .iter()
        .map(|update| match update {
            MeasureUpdate::SaveNewMeasures { resource, measures } => json!({
                "resource": resource,
                "status": "saved",
                "measures": measures,
            }),
            MeasureUpdate::CopyPreviousMeasures { resource } => json!({
                "resource": resource,
                "status": "preserved",
            }),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json!({ "files": entries }))?);
    Ok(())
}
