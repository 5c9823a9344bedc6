//! Index, Update and Remove commands.

use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{ExtractionMode, Settings};
use crate::indexing::{
    FileChanges, IndexContext, IndexManager, RequestAction, RequestState, UpdateSummary,
};

/// Arguments for the index command.
pub struct IndexArgs {
    pub project: Option<String>,
    pub force: bool,
    pub batch: bool,
    pub threads: Option<usize>,
}

fn manager_for(config: &Settings) -> Result<IndexManager> {
    let context = IndexContext::from_settings(Arc::new(config.clone()))
        .context("Failed to open the index")?;
    Ok(IndexManager::new(context))
}

fn print_summary(label: &str, summary: &UpdateSummary) {
    println!(
        "{label}: {} indexed ({}/{} required), {} removed, {} declarations",
        summary.files_indexed,
        summary.completed,
        summary.required,
        summary.files_removed,
        summary.declarations
    );
    if summary.failures > 0 {
        eprintln!("{label}: {} extraction(s) failed, see log", summary.failures);
    }
}

fn save(manager: &IndexManager) -> Result<()> {
    manager
        .run_now(RequestAction::SaveIndex)
        .context("Failed to save the index")?;
    Ok(())
}

fn report_problems(manager: &IndexManager, project: &str) {
    for problem in manager.context().problems.problems(project) {
        eprintln!("Problem [{project}]: {problem}");
    }
}

/// Run the index command over one or all configured projects.
pub fn run(args: IndexArgs, config: &mut Settings) -> Result<()> {
    if args.batch {
        config.indexing.extraction_mode = ExtractionMode::Batch;
    }
    if let Some(threads) = args.threads {
        config.indexing.parallel_threads = threads;
    }

    let projects: Vec<String> = match &args.project {
        Some(project) if config.projects.contains_key(project) => vec![project.clone()],
        Some(project) => bail!("Unknown project '{project}'"),
        None => config.projects.keys().cloned().collect(),
    };
    if projects.is_empty() {
        bail!("No projects configured. Run 'tagdex init' or add [projects.<name>] to settings.toml");
    }

    let manager = manager_for(config)?;
    let requests: Vec<_> = projects
        .iter()
        .filter_map(|project| {
            manager.submit(RequestAction::IndexProject {
                project: project.clone(),
                rebuild: args.force,
            })
        })
        .collect();

    manager.start(config.indexing.parallel_threads)?;
    manager.wait_idle();

    let mut failed = 0;
    let mut total = UpdateSummary::default();
    for request in &requests {
        let label = request.action().to_string();
        match request.state() {
            RequestState::Completed(summary) => {
                print_summary(&label, &summary);
                total.merge(summary);
            }
            RequestState::Failed(reason) => {
                failed += 1;
                eprintln!("{label}: failed: {reason}");
            }
            other => eprintln!("{label}: {other:?}"),
        }
    }
    for project in &projects {
        report_problems(&manager, project);
    }
    if requests.len() > 1 {
        print_summary("total", &total);
    }

    save(&manager)?;
    if failed > 0 {
        bail!("{failed} project(s) failed to index");
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Cannot resolve {}", path.display()))
}

fn project_for(
    manager: &IndexManager,
    explicit: Option<String>,
    path: Option<&Path>,
) -> Result<String> {
    if let Some(project) = explicit {
        return Ok(project);
    }
    let path = path.ok_or_else(|| anyhow!("No paths given"))?;
    manager
        .context()
        .sources
        .project_for(path)
        .ok_or_else(|| anyhow!("{} is not inside any configured project", path.display()))
}

/// Run the update command for explicit file sets.
pub fn run_update(
    config: &Settings,
    project: Option<String>,
    added: Vec<PathBuf>,
    changed: Vec<PathBuf>,
    removed: Vec<PathBuf>,
) -> Result<()> {
    let to_absolute = |paths: Vec<PathBuf>| -> Result<Vec<PathBuf>> {
        paths.iter().map(|p| absolute(p)).collect()
    };
    let changes = FileChanges::new()
        .with_added(to_absolute(added)?)
        .with_changed(to_absolute(changed)?)
        .with_removed(to_absolute(removed)?);
    if changes.is_empty() {
        bail!("Nothing to update: pass --added, --changed or --removed");
    }

    let manager = manager_for(config)?;
    let first = changes
        .added
        .iter()
        .chain(&changes.changed)
        .chain(&changes.removed)
        .next()
        .cloned();
    let project = project_for(&manager, project, first.as_deref())?;

    let result = manager.run_now(RequestAction::UpdateFiles {
        project: project.clone(),
        changes,
    });
    report_problems(&manager, &project);
    print_summary(&format!("update {project}"), &result?);
    save(&manager)
}

/// Run the remove command for a file or a directory.
pub fn run_remove(config: &Settings, path: PathBuf, project: Option<String>) -> Result<()> {
    let path = absolute(&path)?;
    let manager = manager_for(config)?;
    let project = project_for(&manager, project, Some(&path))?;

    let action = removal_action(&manager, project, path);
    let label = action.to_string();
    let summary = manager.run_now(action)?;
    println!("{label}: {} file(s) removed", summary.files_removed);
    save(&manager)
}

/// Directories are removed as folders, and so are paths already gone from
/// disk that still have indexed files below them.
fn removal_action(manager: &IndexManager, project: String, path: PathBuf) -> RequestAction {
    let context = manager.context();
    let is_folder = path.is_dir()
        || (!path.exists()
            && context
                .resolver
                .resolve(&path)
                .is_some_and(|location| context.index.has_files_under(&location)));
    if is_folder {
        RequestAction::RemoveFolder { project, path }
    } else {
        RequestAction::RemoveFile { project, path }
    }
}
