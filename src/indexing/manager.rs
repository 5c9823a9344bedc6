//! Index manager: shared context, project index states and the worker pool.

use crate::config::{ExtractionMode, Settings};
use crate::extractor::{CtagsExtractor, TagExtractor};
use crate::indexing::{
    CanonicalPathResolver, IndexRequest, PathResolver, ProblemMarkers, ProblemSink, RequestAction,
    RequestQueue, RequestState, SettingsSourceProvider, SourceProvider, UpdateMode, UpdateSummary,
};
use crate::storage::SymbolIndex;
use crate::{IndexError, IndexResult, log_event};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Consistency of a project's part of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Consistent,
    Updating,
    Rebuilding,
    /// A pass was cancelled or failed; contents may be partial
    Inconsistent,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    pub extraction: ExtractionMode,
    pub update_mode: UpdateMode,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            extraction: ExtractionMode::Streaming,
            update_mode: UpdateMode::UpdateCheckTimestamps,
        }
    }
}

/// Everything a request needs to run.
pub struct IndexContext {
    pub index: Arc<SymbolIndex>,
    pub extractor: Arc<dyn TagExtractor>,
    pub sources: Arc<dyn SourceProvider>,
    pub resolver: Arc<dyn PathResolver>,
    pub problems: Arc<dyn ProblemSink>,
    pub options: IndexOptions,
    states: DashMap<String, IndexState>,
    enabled_overrides: DashMap<String, bool>,
}

impl IndexContext {
    pub fn new(
        index: Arc<SymbolIndex>,
        extractor: Arc<dyn TagExtractor>,
        sources: Arc<dyn SourceProvider>,
    ) -> Self {
        Self {
            index,
            extractor,
            sources,
            resolver: Arc::new(CanonicalPathResolver::new()),
            problems: Arc::new(ProblemMarkers::new()),
            options: IndexOptions::default(),
            states: DashMap::new(),
            enabled_overrides: DashMap::new(),
        }
    }

    /// Context over the projects, ctags program and index path in `settings`.
    pub fn from_settings(settings: Arc<Settings>) -> IndexResult<Self> {
        let index = SymbolIndex::open(settings.resolved_index_path())?;
        let extractor = CtagsExtractor::new(settings.indexing.ctags_program.clone())
            .with_stream_capacity(settings.indexing.stream_buffer_lines);
        let options = IndexOptions {
            extraction: settings.indexing.extraction_mode,
            update_mode: settings.indexing.update_mode,
        };
        let resolver = match &settings.workspace_root {
            Some(root) => CanonicalPathResolver::with_base(root),
            None => CanonicalPathResolver::new(),
        };
        Ok(Self::new(
            Arc::new(index),
            Arc::new(extractor),
            Arc::new(SettingsSourceProvider::new(settings)),
        )
        .with_resolver(Arc::new(resolver))
        .with_options(options))
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_problems(mut self, problems: Arc<dyn ProblemSink>) -> Self {
        self.problems = problems;
        self
    }

    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    /// State of `project`, `None` if no pass has run for it yet.
    pub fn index_state(&self, project: &str) -> Option<IndexState> {
        self.states.get(project).map(|state| *state)
    }

    pub(crate) fn set_index_state(&self, project: &str, state: IndexState) {
        self.states.insert(project.to_string(), state);
    }

    /// Configured setting, unless overridden at runtime.
    pub fn is_indexing_enabled(&self, project: &str) -> bool {
        match self.enabled_overrides.get(project) {
            Some(enabled) => *enabled,
            None => self.sources.is_indexing_enabled(project),
        }
    }

    pub fn set_indexing_enabled(&self, project: &str, enabled: bool) {
        self.enabled_overrides.insert(project.to_string(), enabled);
    }
}

/// Schedules requests onto a pool of worker threads.
///
/// Workers are started explicitly; until then submitted requests only queue up.
pub struct IndexManager {
    context: Arc<IndexContext>,
    queue: Arc<RequestQueue>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl IndexManager {
    pub fn new(context: IndexContext) -> Self {
        Self {
            context: Arc::new(context),
            queue: Arc::new(RequestQueue::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &IndexContext {
        &self.context
    }

    /// Start `threads` workers. Calling again adds more.
    pub fn start(&self, threads: usize) -> IndexResult<()> {
        let mut workers = self.workers.lock();
        for _ in 0..threads.max(1) {
            let context = Arc::clone(&self.context);
            let queue = Arc::clone(&self.queue);
            let worker_id = workers.len();
            let handle = std::thread::Builder::new()
                .name(format!("tagdex-worker-{worker_id}"))
                .spawn(move || {
                    while let Some(request) = queue.next() {
                        run_request(&context, &request);
                        queue.finish();
                    }
                    tracing::debug!("[manager] worker {worker_id} stopped");
                })
                .map_err(|e| IndexError::General(format!("Failed to spawn worker: {e}")))?;
            workers.push(handle);
        }
        Ok(())
    }

    /// Queue `action`. Returns the request, or `None` if an equal one is
    /// already pending.
    pub fn submit(&self, action: RequestAction) -> Option<Arc<IndexRequest>> {
        let request = Arc::new(IndexRequest::new(action));
        self.submit_request(Arc::clone(&request)).then_some(request)
    }

    pub fn submit_request(&self, request: Arc<IndexRequest>) -> bool {
        self.queue.submit(request)
    }

    /// Run `action` on the calling thread, bypassing the queue.
    pub fn run_now(&self, action: RequestAction) -> IndexResult<UpdateSummary> {
        let request = IndexRequest::new(action);
        run_request(&self.context, &request);
        match request.state() {
            RequestState::Completed(summary) => Ok(summary),
            RequestState::Cancelled => Err(IndexError::Cancelled),
            RequestState::Failed(reason) => Err(IndexError::General(reason)),
            RequestState::Pending | RequestState::Running => {
                Err(IndexError::General(format!("{} did not run", request.action())))
            }
        }
    }

    /// Cancel a request: withdraw it if still pending, otherwise stop it at its
    /// next check. The project is marked inconsistent; nothing is rolled back.
    pub fn cancel(&self, request: &IndexRequest) {
        request.cancel();
        if self.queue.remove(request).is_some() {
            tracing::debug!("[manager] withdrew {}", request.action());
        }
        if let Some(project) = request.action().project() {
            self.context.set_index_state(project, IndexState::Inconsistent);
        }
    }

    pub fn pending(&self) -> Vec<Arc<IndexRequest>> {
        self.queue.pending()
    }

    /// Block until the queue is empty and no worker is busy.
    pub fn wait_idle(&self) {
        self.queue.wait_idle();
    }

    /// Stop the workers after their current request. Pending requests are
    /// cancelled.
    pub fn shutdown(&self) {
        for request in self.queue.shutdown() {
            request.cancel();
        }
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                tracing::error!("[manager] worker thread panicked");
            }
        }
    }
}

impl Drop for IndexManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_request(context: &IndexContext, request: &IndexRequest) {
    if request.is_cancelled() {
        request.set_state(RequestState::Cancelled);
        return;
    }
    if let Err(e) = request.check_ready(context) {
        tracing::debug!("[manager] {} not ready: {e}", request.action());
        request.set_state(RequestState::Failed(e.to_string()));
        return;
    }

    request.set_state(RequestState::Running);
    let project = request.action().project();
    match request.execute(context) {
        // Cancelled after the last check; the work is done but was disowned
        Ok(_) if request.is_cancelled() => {
            if let Some(project) = project {
                context.set_index_state(project, IndexState::Inconsistent);
            }
            request.set_state(RequestState::Cancelled);
        }
        Ok(summary) => {
            if let Some(project) = project {
                context.set_index_state(project, IndexState::Consistent);
            }
            request.set_state(RequestState::Completed(summary));
        }
        Err(IndexError::Cancelled) => {
            if let Some(project) = project {
                context.set_index_state(project, IndexState::Inconsistent);
            }
            request.set_state(RequestState::Cancelled);
        }
        Err(e) => {
            log_event!("manager", "failed", "{}: {e}", request.action());
            if let Some(project) = project {
                context.set_index_state(project, IndexState::Inconsistent);
            }
            request.set_state(RequestState::Failed(e.to_string()));
        }
    }
}
