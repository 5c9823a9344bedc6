//! Decides which files a run has to (re)scan.
//!
//! A planner lives for one run. It classifies the caller's added, changed and
//! removed paths, then answers `need_to_update` for every file the run comes
//! across, including files nobody asked about (headers pulled in by a batch
//! extraction). Once a file has been handled it is `Skip` for the rest of the
//! run, which is what keeps include cycles and overlapping roots from parsing a
//! file twice.

use crate::indexing::PathResolver;
use crate::storage::{FileStamp, IndexData};
use crate::types::FileLocation;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Whether unchanged files are re-tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Re-tag every file the run touches
    UpdateAll,
    /// Re-tag only files newer than their indexed copy, or indexed with a
    /// different extractor configuration
    UpdateCheckTimestamps,
}

/// Per-run state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Explicitly part of this run and must be parsed
    Required,
    /// Not part of this run's input
    Missing,
    /// Already handled in this run, never parsed again
    Skip,
}

/// Paths handed to a run. The three sets are expected to be disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FileChanges {
    pub added: Vec<PathBuf>,
    pub changed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl FileChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_added(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.added.extend(paths);
        self
    }

    pub fn with_changed(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.changed.extend(paths);
        self
    }

    pub fn with_removed(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.removed.extend(paths);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.removed.len()
    }
}

/// Stamp of a file as it is on disk now, or `None` if it cannot be read.
pub fn file_stamp(path: &Path, signature: &str) -> Option<FileStamp> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(FileStamp::new(unix_millis(modified), signature))
}

/// Milliseconds since the Unix epoch, 0 for earlier times.
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug)]
pub struct UpdatePlanner {
    mode: UpdateMode,
    signature: String,
    states: IndexMap<FileLocation, UpdateState>,
    required_total: usize,
    completed: usize,
}

impl UpdatePlanner {
    pub fn new(mode: UpdateMode, signature: impl Into<String>) -> Self {
        Self {
            mode,
            signature: signature.into(),
            states: IndexMap::new(),
            required_total: 0,
            completed: 0,
        }
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Classify `changes` against the current index contents.
    ///
    /// Added and changed files that need parsing become `Required`; the rest
    /// are left out of the map. Returns the resolved locations of the removed
    /// files, which the caller deletes from the index.
    pub fn plan(
        &mut self,
        changes: &FileChanges,
        resolver: &dyn PathResolver,
        data: &IndexData,
    ) -> Vec<FileLocation> {
        for path in changes.added.iter().chain(&changes.changed) {
            let Some(location) = resolver.resolve(path) else {
                tracing::warn!("[planner] cannot resolve {}", path.display());
                continue;
            };
            if self.states.contains_key(&location) {
                continue;
            }
            let required = match self.mode {
                UpdateMode::UpdateAll => true,
                UpdateMode::UpdateCheckTimestamps => {
                    match file_stamp(location.as_path(), &self.signature) {
                        Some(stamp) => data.is_stale(&location, &stamp),
                        None => {
                            tracing::debug!("[planner] cannot stat {location}, skipping");
                            false
                        }
                    }
                }
            };
            if required {
                self.states.insert(location, UpdateState::Required);
                self.required_total += 1;
            }
        }

        changes
            .removed
            .iter()
            .filter_map(|path| {
                let location = resolver.resolve(path);
                if location.is_none() {
                    tracing::warn!("[planner] cannot resolve removed {}", path.display());
                }
                location
            })
            .collect()
    }

    pub fn need_to_update(&self, location: &FileLocation) -> UpdateState {
        self.states
            .get(location)
            .copied()
            .unwrap_or(UpdateState::Missing)
    }

    /// Whether the run should parse and commit `location` now.
    ///
    /// `Missing` files are taken only when the index holds no current copy of
    /// them, or when every touched file is re-tagged anyway.
    pub fn should_parse(&self, location: &FileLocation, data: &IndexData) -> bool {
        match self.need_to_update(location) {
            UpdateState::Required => true,
            UpdateState::Skip => false,
            UpdateState::Missing => match self.mode {
                UpdateMode::UpdateAll => true,
                UpdateMode::UpdateCheckTimestamps => file_stamp(location.as_path(), &self.signature)
                    .is_some_and(|stamp| data.is_stale(location, &stamp)),
            },
        }
    }

    /// Mark `location` as handled. Returns whether it was `Required`.
    pub fn post_add_to_index(&mut self, location: &FileLocation) -> bool {
        let previous = self.states.insert(location.clone(), UpdateState::Skip);
        let was_required = previous == Some(UpdateState::Required);
        if was_required {
            self.completed += 1;
        }
        was_required
    }

    /// Mark `location` as handled without counting it as completed, for files
    /// whose extraction failed.
    pub fn skip(&mut self, location: &FileLocation) {
        self.states.insert(location.clone(), UpdateState::Skip);
    }

    /// `Required` locations not yet handled, in the order they were planned.
    pub fn required_locations(&self) -> Vec<FileLocation> {
        self.states
            .iter()
            .filter(|(_, state)| **state == UpdateState::Required)
            .map(|(location, _)| location.clone())
            .collect()
    }

    /// Whether any unhandled `Required` location lies under `dir`.
    pub fn has_required_under(&self, dir: &Path) -> bool {
        self.states.iter().any(|(location, state)| {
            *state == UpdateState::Required && location.as_path().starts_with(dir)
        })
    }

    /// Completed and total counts of `Required` files.
    pub fn progress(&self) -> (usize, usize) {
        (self.completed, self.required_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::CanonicalPathResolver;
    use std::fs;
    use tempfile::TempDir;

    fn index_with(location: &FileLocation, stamp: FileStamp) -> IndexData {
        let mut data = IndexData::new();
        data.begin_file(location, stamp).unwrap();
        data
    }

    #[test]
    fn test_new_file_is_required_and_flips_to_skip() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.c");
        fs::write(&file, "int a;").unwrap();

        let resolver = CanonicalPathResolver::new();
        let mut planner = UpdatePlanner::new(UpdateMode::UpdateCheckTimestamps, "sig");
        let changes = FileChanges::new().with_added([file.clone()]);
        planner.plan(&changes, &resolver, &IndexData::new());

        let location = resolver.resolve(&file).unwrap();
        assert_eq!(planner.need_to_update(&location), UpdateState::Required);
        assert_eq!(planner.progress(), (0, 1));

        assert!(planner.post_add_to_index(&location));
        assert_eq!(planner.need_to_update(&location), UpdateState::Skip);
        assert!(!planner.post_add_to_index(&location));
        assert_eq!(planner.progress(), (1, 1));
        assert!(planner.required_locations().is_empty());
    }

    #[test]
    fn test_skipped_file_is_not_completed() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.c");
        fs::write(&file, "int a;").unwrap();

        let resolver = CanonicalPathResolver::new();
        let mut planner = UpdatePlanner::new(UpdateMode::UpdateAll, "sig");
        planner.plan(&FileChanges::new().with_added([file.clone()]), &resolver, &IndexData::new());

        let location = resolver.resolve(&file).unwrap();
        planner.skip(&location);
        assert_eq!(planner.need_to_update(&location), UpdateState::Skip);
        assert_eq!(planner.progress(), (0, 1));
        assert!(!planner.post_add_to_index(&location));
        assert_eq!(planner.progress(), (0, 1));
    }

    #[test]
    fn test_unchanged_file_is_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.c");
        fs::write(&file, "int a;").unwrap();

        let resolver = CanonicalPathResolver::new();
        let location = resolver.resolve(&file).unwrap();
        let data = index_with(&location, file_stamp(&file, "sig").unwrap());

        let mut planner = UpdatePlanner::new(UpdateMode::UpdateCheckTimestamps, "sig");
        planner.plan(&FileChanges::new().with_changed([file]), &resolver, &data);

        assert_eq!(planner.need_to_update(&location), UpdateState::Missing);
        assert!(!planner.should_parse(&location, &data));
        assert_eq!(planner.progress(), (0, 0));
    }

    #[test]
    fn test_signature_change_makes_file_required() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.c");
        fs::write(&file, "int a;").unwrap();

        let resolver = CanonicalPathResolver::new();
        let location = resolver.resolve(&file).unwrap();
        let data = index_with(&location, file_stamp(&file, "old").unwrap());

        let mut planner = UpdatePlanner::new(UpdateMode::UpdateCheckTimestamps, "new");
        planner.plan(&FileChanges::new().with_changed([file]), &resolver, &data);
        assert_eq!(planner.need_to_update(&location), UpdateState::Required);
    }

    #[test]
    fn test_update_all_requires_unchanged_files() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.c");
        fs::write(&file, "int a;").unwrap();

        let resolver = CanonicalPathResolver::new();
        let location = resolver.resolve(&file).unwrap();
        let data = index_with(&location, file_stamp(&file, "sig").unwrap());

        let mut planner = UpdatePlanner::new(UpdateMode::UpdateAll, "sig");
        planner.plan(&FileChanges::new().with_changed([file]), &resolver, &data);
        assert_eq!(planner.need_to_update(&location), UpdateState::Required);
    }

    #[test]
    fn test_missing_file_parsed_only_when_not_indexed() {
        let temp_dir = TempDir::new().unwrap();
        let indexed = temp_dir.path().join("indexed.h");
        let fresh = temp_dir.path().join("fresh.h");
        fs::write(&indexed, "").unwrap();
        fs::write(&fresh, "").unwrap();

        let resolver = CanonicalPathResolver::new();
        let indexed = resolver.resolve(&indexed).unwrap();
        let fresh = resolver.resolve(&fresh).unwrap();
        let data = index_with(&indexed, file_stamp(indexed.as_path(), "sig").unwrap());

        let planner = UpdatePlanner::new(UpdateMode::UpdateCheckTimestamps, "sig");
        assert_eq!(planner.need_to_update(&fresh), UpdateState::Missing);
        assert!(planner.should_parse(&fresh, &data));
        assert!(!planner.should_parse(&indexed, &data));

        let planner = UpdatePlanner::new(UpdateMode::UpdateAll, "sig");
        assert!(planner.should_parse(&indexed, &data));
    }

    #[test]
    fn test_removed_paths_resolve_even_when_gone() {
        let temp_dir = TempDir::new().unwrap();
        let gone = temp_dir.path().join("gone.c");

        let resolver = CanonicalPathResolver::new();
        let mut planner = UpdatePlanner::new(UpdateMode::UpdateCheckTimestamps, "sig");
        let removed = planner.plan(
            &FileChanges::new().with_removed([gone.clone()]),
            &resolver,
            &IndexData::new(),
        );
        assert_eq!(removed.len(), 1);
        assert!(removed[0].as_path().ends_with("gone.c"));
        assert_eq!(planner.progress(), (0, 0));
    }

    #[test]
    fn test_required_under_directory() {
        let temp_dir = TempDir::new().unwrap();
        let sub = temp_dir.path().join("lib");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("a.c"), "").unwrap();

        let resolver = CanonicalPathResolver::new();
        let mut planner = UpdatePlanner::new(UpdateMode::UpdateAll, "sig");
        planner.plan(
            &FileChanges::new().with_added([sub.join("a.c")]),
            &resolver,
            &IndexData::new(),
        );

        let root = resolver.resolve(temp_dir.path()).unwrap();
        let other = resolver.resolve(&sub).unwrap().as_path().join("nested");
        assert!(planner.has_required_under(root.as_path()));
        assert!(!planner.has_required_under(&other));
    }
}
