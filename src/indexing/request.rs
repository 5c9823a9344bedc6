//! Units of indexing work.
//!
//! A request is identified by its [`RequestAction`], which names both what to
//! do and what to do it to. Two requests with equal actions are the same
//! request as far as the queue is concerned.

use crate::indexing::update::ProjectUpdate;
use crate::indexing::{FileChanges, IndexContext, IndexState, UpdateMode, UpdateSummary};
use crate::{IndexError, IndexResult, log_event};
use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestAction {
    /// Index every file of a project; `rebuild` drops its files first
    IndexProject { project: String, rebuild: bool },
    UpdateFiles { project: String, changes: FileChanges },
    AddFile { project: String, path: PathBuf },
    RemoveFile { project: String, path: PathBuf },
    /// Remove every indexed file under a directory
    RemoveFolder { project: String, path: PathBuf },
    SaveIndex,
}

impl RequestAction {
    /// Project the action applies to, if any.
    pub fn project(&self) -> Option<&str> {
        match self {
            Self::IndexProject { project, .. }
            | Self::UpdateFiles { project, .. }
            | Self::AddFile { project, .. }
            | Self::RemoveFile { project, .. }
            | Self::RemoveFolder { project, .. } => Some(project),
            Self::SaveIndex => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::IndexProject { rebuild: false, .. } => "index-project",
            Self::IndexProject { rebuild: true, .. } => "rebuild-project",
            Self::UpdateFiles { .. } => "update-files",
            Self::AddFile { .. } => "add-file",
            Self::RemoveFile { .. } => "remove-file",
            Self::RemoveFolder { .. } => "remove-folder",
            Self::SaveIndex => "save-index",
        }
    }
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexProject { project, .. } => write!(f, "{} {project}", self.name()),
            Self::UpdateFiles { project, changes } => {
                write!(f, "{} {project} ({} paths)", self.name(), changes.len())
            }
            Self::AddFile { path, .. }
            | Self::RemoveFile { path, .. }
            | Self::RemoveFolder { path, .. } => write!(f, "{} {}", self.name(), path.display()),
            Self::SaveIndex => f.write_str(self.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Running,
    Completed(UpdateSummary),
    Failed(String),
    Cancelled,
}

impl RequestState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct IndexRequest {
    id: u64,
    action: RequestAction,
    state: Mutex<RequestState>,
    cancelled: AtomicBool,
}

impl IndexRequest {
    pub fn new(action: RequestAction) -> Self {
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            action,
            state: Mutex::new(RequestState::Pending),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The dedup key of this request.
    pub fn action(&self) -> &RequestAction {
        &self.action
    }

    pub fn state(&self) -> RequestState {
        self.state.lock().clone()
    }

    pub(crate) fn set_state(&self, state: RequestState) {
        *self.state.lock() = state;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Set the cancelled flag. Work in progress stops at its next check.
    ///
    /// Use [`IndexManager::cancel`](crate::indexing::IndexManager::cancel) to
    /// also withdraw a pending request and mark its project.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let mut state = self.state.lock();
        if *state == RequestState::Pending {
            *state = RequestState::Cancelled;
        }
    }

    /// Whether the target is still valid and indexing is enabled for it.
    ///
    /// When ready, the project's index state moves to `Updating`, or
    /// `Rebuilding` for a rebuild.
    pub fn is_ready_to_run(&self, ctx: &IndexContext) -> bool {
        match self.check_ready(ctx) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("[request] {} dropped: {e}", self.action);
                false
            }
        }
    }

    pub(crate) fn check_ready(&self, ctx: &IndexContext) -> IndexResult<()> {
        let Some(project) = self.action.project() else {
            return Ok(());
        };
        if ctx.sources.source_roots(project).is_none() {
            return Err(IndexError::UnknownProject(project.to_string()));
        }
        if !ctx.is_indexing_enabled(project) {
            return Err(IndexError::ProjectDisabled(project.to_string()));
        }
        if let RequestAction::AddFile { path, .. } = &self.action {
            if !path.exists() {
                return Err(IndexError::FileRead {
                    path: path.clone(),
                    source: std::io::ErrorKind::NotFound.into(),
                });
            }
        }

        let state = match &self.action {
            RequestAction::IndexProject { rebuild: true, .. } => IndexState::Rebuilding,
            _ => IndexState::Updating,
        };
        ctx.set_index_state(project, state);
        Ok(())
    }

    /// Perform the work.
    ///
    /// Index passes keep a shared hold on the index for their whole length and
    /// commit through it; the hold is released when this returns, whatever the
    /// outcome.
    pub fn execute(&self, ctx: &IndexContext) -> IndexResult<UpdateSummary> {
        let project = match &self.action {
            RequestAction::SaveIndex => {
                ctx.index.save()?;
                return Ok(UpdateSummary::default());
            }
            action => action.project().unwrap_or_default(),
        };

        let mut session = ctx.index.session();
        let update = ProjectUpdate::new(ctx, project, &self.cancelled);
        let result = match &self.action {
            RequestAction::IndexProject { rebuild, .. } => {
                let roots = project_roots(ctx, project);
                if *rebuild {
                    session.commit(|data| {
                        for root in &roots {
                            data.remove_under(root);
                        }
                    });
                }
                let files = ctx.sources.source_files(project);
                let mut present = std::collections::HashSet::new();
                for file in &files {
                    if let Some(location) = ctx.resolver.resolve(file) {
                        present.insert(location);
                    }
                }
                let removed: Vec<PathBuf> = session
                    .data()
                    .files()
                    .filter(|record| {
                        roots
                            .iter()
                            .any(|root| record.location.as_path().starts_with(root))
                    })
                    .filter(|record| !present.contains(&record.location))
                    .map(|record| record.location.as_path().to_path_buf())
                    .collect();

                let changes = FileChanges::new().with_added(files).with_removed(removed);
                let mode = if *rebuild {
                    UpdateMode::UpdateAll
                } else {
                    ctx.options.update_mode
                };
                update.run(&mut session, &changes, mode)
            }
            RequestAction::UpdateFiles { changes, .. } => {
                update.run(&mut session, changes, ctx.options.update_mode)
            }
            RequestAction::AddFile { path, .. } => {
                let changes = FileChanges::new().with_added([path.clone()]);
                update.run(&mut session, &changes, UpdateMode::UpdateAll)
            }
            RequestAction::RemoveFile { path, .. } => {
                let changes = FileChanges::new().with_removed([path.clone()]);
                update.run(&mut session, &changes, ctx.options.update_mode)
            }
            RequestAction::RemoveFolder { path, .. } => {
                let dir = ctx
                    .resolver
                    .resolve(path)
                    .ok_or_else(|| IndexError::UnresolvedPath(path.clone()))?;
                let removed = session.commit(|data| data.remove_under(dir.as_path()).len());
                Ok(UpdateSummary {
                    files_removed: removed,
                    ..UpdateSummary::default()
                })
            }
            RequestAction::SaveIndex => Ok(UpdateSummary::default()),
        };
        session.release();

        if let Ok(summary) = &result {
            log_event!(
                "request",
                "done",
                "{}: {} indexed, {} removed, {} declarations",
                self.action,
                summary.files_indexed,
                summary.files_removed,
                summary.declarations
            );
        }
        result
    }
}

/// Canonical source and include roots of `project`.
fn project_roots(ctx: &IndexContext, project: &str) -> Vec<PathBuf> {
    ctx.sources
        .source_roots(project)
        .unwrap_or_default()
        .into_iter()
        .chain(ctx.sources.include_roots(project))
        .filter_map(|root| ctx.resolver.resolve(&root))
        .map(|location| location.into_path_buf())
        .collect()
}
