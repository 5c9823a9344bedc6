//! One indexing pass over a project.
//!
//! A pass plans the work, commits removals, then drives the extractor:
//! per file in streaming mode, per root directory in batch mode. Files still
//! required after the batch roots (files outside every root) are streamed.
//! Each file's tags are parsed before the exclusive hold is taken, so the hold
//! only covers the in-memory commit.
//!
//! A file's stamp never postdates the extraction that produced its tags. An
//! edit saved while ctags is running therefore still reads as stale on the
//! next timestamp check.

use crate::config::ExtractionMode;
use crate::extractor::{ExtractError, build_signature};
use crate::indexing::{
    FileChanges, IndexContext, UpdateMode, UpdatePlanner, file_stamp, unix_millis,
};
use crate::parsing::{ParsedTag, TagFileReader};
use crate::storage::{FileStamp, IndexSession};
use crate::types::FileLocation;
use crate::{IndexError, IndexResult, debug_event, log_event};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

/// What a pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Files explicitly required by the pass
    pub required: usize,
    /// Required files whose declarations were committed
    pub completed: usize,
    /// Files parsed and committed, including ones reached only through a batch
    pub files_indexed: usize,
    pub files_removed: usize,
    pub declarations: usize,
    /// Extractions that failed without aborting the pass
    pub failures: usize,
}

impl UpdateSummary {
    pub fn merge(&mut self, other: UpdateSummary) {
        self.required += other.required;
        self.completed += other.completed;
        self.files_indexed += other.files_indexed;
        self.files_removed += other.files_removed;
        self.declarations += other.declarations;
        self.failures += other.failures;
    }
}

pub(crate) struct ProjectUpdate<'a> {
    ctx: &'a IndexContext,
    project: &'a str,
    cancelled: &'a AtomicBool,
    summary: UpdateSummary,
}

impl<'a> ProjectUpdate<'a> {
    pub(crate) fn new(ctx: &'a IndexContext, project: &'a str, cancelled: &'a AtomicBool) -> Self {
        Self {
            ctx,
            project,
            cancelled,
            summary: UpdateSummary::default(),
        }
    }

    pub(crate) fn run(
        mut self,
        session: &mut IndexSession<'_>,
        changes: &FileChanges,
        mode: UpdateMode,
    ) -> IndexResult<UpdateSummary> {
        let include_roots = self.ctx.sources.include_roots(self.project);
        let signature = build_signature(include_roots.iter().map(PathBuf::as_path));
        let mut planner = UpdatePlanner::new(mode, signature);

        let removed = planner.plan(changes, self.ctx.resolver.as_ref(), session.data());
        if !removed.is_empty() {
            self.summary.files_removed += session.commit(|data| {
                removed
                    .iter()
                    .filter(|location| data.remove_file(location).is_some())
                    .count()
            });
        }
        self.summary.required = planner.progress().1;
        log_event!(
            "index",
            "planned",
            "{}: {} required, {} removed",
            self.project,
            self.summary.required,
            self.summary.files_removed
        );

        if self.ctx.options.extraction == ExtractionMode::Batch {
            let mut roots = self.ctx.sources.source_roots(self.project).unwrap_or_default();
            roots.extend(include_roots);
            for root in roots {
                self.check_cancelled()?;
                let Some(root) = self.ctx.resolver.resolve(&root) else {
                    continue;
                };
                if planner.has_required_under(root.as_path()) {
                    self.extract_root(session, &mut planner, root.as_path())?;
                }
            }
        }

        for location in planner.required_locations() {
            self.check_cancelled()?;
            if self.stream_file(session, &planner, &location)? {
                planner.post_add_to_index(&location);
            } else {
                planner.skip(&location);
            }
            let (completed, total) = planner.progress();
            debug_event!("index", "progress", "{completed}/{total}");
        }

        self.summary.completed = planner.progress().0;
        Ok(self.summary)
    }

    fn check_cancelled(&self) -> IndexResult<()> {
        if self.cancelled.load(Ordering::Acquire) {
            log_event!("index", "cancelled", "{}", self.project);
            return Err(IndexError::Cancelled);
        }
        Ok(())
    }

    /// Fatal extraction errors become a problem marker and abort the pass;
    /// anything else fails only the one extraction.
    fn extraction_failed(&mut self, err: ExtractError) -> IndexResult<()> {
        if err.is_fatal() {
            self.ctx.problems.report(self.project, &err.to_string());
            return Err(err.into());
        }
        tracing::warn!("[index] {err}");
        self.summary.failures += 1;
        Ok(())
    }

    /// Tag and commit one file. Returns whether anything was committed.
    fn stream_file(
        &mut self,
        session: &mut IndexSession<'_>,
        planner: &UpdatePlanner,
        location: &FileLocation,
    ) -> IndexResult<bool> {
        let stamp = file_stamp(location.as_path(), planner.signature())
            .unwrap_or_else(|| FileStamp::new(0, planner.signature()));

        let mut stream = match self.ctx.extractor.stream_file(location.as_path()) {
            Ok(stream) => stream,
            Err(e) => return self.extraction_failed(e).map(|()| false),
        };
        let tags: Vec<ParsedTag> = stream
            .by_ref()
            .filter_map(|line| ParsedTag::parse_line(&line))
            .collect();
        if let Err(e) = stream.finish() {
            return self.extraction_failed(e).map(|()| false);
        }
        self.commit_tags(session, location, stamp, tags)?;
        Ok(true)
    }

    fn extract_root(
        &mut self,
        session: &mut IndexSession<'_>,
        planner: &mut UpdatePlanner,
        root: &Path,
    ) -> IndexResult<()> {
        let tag_file = match tempfile::Builder::new()
            .prefix("tagdex-")
            .suffix(".tags")
            .tempfile()
        {
            Ok(tag_file) => tag_file,
            Err(e) => {
                self.extraction_failed(ExtractError::TagFile(e))?;
                abandon_under(planner, root);
                return Ok(());
            }
        };

        debug_event!("index", "batch", "{}", root.display());
        let started = unix_millis(SystemTime::now());
        if let Err(e) = self.ctx.extractor.extract_directory(root, tag_file.path()) {
            self.extraction_failed(e)?;
            abandon_under(planner, root);
            return Ok(());
        }
        let finished = unix_millis(SystemTime::now());

        // Read the whole file before committing anything, so a bad tag file
        // leaves the index as it was
        let read = TagFileReader::open(tag_file.path()).and_then(|reader| reader.group_by_file());
        let groups = match read {
            Ok(groups) => groups,
            Err(e) => {
                tracing::warn!("[index] rejected tag file for {}: {e}", root.display());
                self.summary.failures += 1;
                abandon_under(planner, root);
                return Ok(());
            }
        };

        for (file_name, tags) in groups {
            let Some(location) = self.ctx.resolver.resolve(Path::new(&file_name)) else {
                tracing::debug!("[index] cannot resolve tagged file {file_name}");
                continue;
            };
            if !planner.should_parse(&location, session.data()) {
                continue;
            }
            let stamp = batch_stamp(&location, planner.signature(), started, finished);
            self.commit_tags(session, &location, stamp, tags)?;
            planner.post_add_to_index(&location);
        }

        // Scanned but without a single tag
        for location in planner.required_locations() {
            if location.as_path().starts_with(root) {
                let stamp = batch_stamp(&location, planner.signature(), started, finished);
                self.commit_tags(session, &location, stamp, Vec::new())?;
                planner.post_add_to_index(&location);
            }
        }
        Ok(())
    }

    fn commit_tags(
        &mut self,
        session: &mut IndexSession<'_>,
        location: &FileLocation,
        stamp: FileStamp,
        tags: Vec<ParsedTag>,
    ) -> IndexResult<()> {
        let recorded = session.commit(|data| -> IndexResult<usize> {
            let file_id = data.begin_file(location, stamp)?;
            let mut recorded = 0;
            for tag in tags {
                if tag.kind.record(&mut *data, file_id, tag.name, tag.line) {
                    recorded += 1;
                }
            }
            Ok(recorded)
        })?;

        self.summary.files_indexed += 1;
        self.summary.declarations += recorded;
        Ok(())
    }
}

/// Stamp for a file tagged by a batch extraction that ran from `started` to
/// `finished`. A file modified inside that window is stamped `started`.
fn batch_stamp(
    location: &FileLocation,
    signature: &str,
    started: u64,
    finished: u64,
) -> FileStamp {
    match file_stamp(location.as_path(), signature) {
        Some(mut stamp) => {
            if (started..=finished).contains(&stamp.modified) {
                stamp.modified = started;
            }
            stamp
        }
        None => FileStamp::new(0, signature),
    }
}

/// Give up on the required files under a root whose extraction failed, so
/// they keep their indexed contents instead of being streamed one by one.
fn abandon_under(planner: &mut UpdatePlanner, root: &Path) {
    for location in planner.required_locations() {
        if location.as_path().starts_with(root) {
            planner.skip(&location);
        }
    }
}
