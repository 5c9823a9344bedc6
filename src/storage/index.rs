//! The persistent symbol index.
//!
//! [`SymbolIndex`] owns the index contents behind an [`IndexMonitor`] and an
//! optional on-disk location. All access goes through the monitor's guards.
//! Indexing requests work through an [`IndexSession`], which keeps a shared hold
//! for the length of the request and briefly upgrades it for each commit.

use crate::storage::index_data::IndexData;
use crate::storage::metadata::IndexMetadata;
use crate::storage::monitor::{IndexMonitor, MonitorState, ReadGuard, WriteGuard};
use crate::storage::persistence::IndexPersistence;
use crate::storage::StorageResult;
use crate::types::{FileLocation, QualifiedName, SymbolDeclaration};
use std::path::PathBuf;

/// Counts reported by [`SymbolIndex::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStats {
    pub file_count: usize,
    pub declaration_count: usize,
}

#[derive(Debug)]
pub struct SymbolIndex {
    monitor: IndexMonitor<IndexData>,
    persistence: Option<IndexPersistence>,
}

impl SymbolIndex {
    /// An index that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            monitor: IndexMonitor::new(IndexData::new()),
            persistence: None,
        }
    }

    /// Open the index stored under `base_path`, or start an empty one there.
    pub fn open(base_path: PathBuf) -> StorageResult<Self> {
        let persistence = IndexPersistence::new(base_path);
        let data = if persistence.exists() {
            persistence.load()?
        } else {
            tracing::debug!(
                "[index] no saved index in {}, starting empty",
                persistence.base_path().display()
            );
            IndexData::new()
        };
        Ok(Self {
            monitor: IndexMonitor::new(data),
            persistence: Some(persistence),
        })
    }

    pub fn read(&self) -> ReadGuard<'_, IndexData> {
        self.monitor.read()
    }

    pub fn write(&self) -> WriteGuard<'_, IndexData> {
        self.monitor.write()
    }

    pub fn state(&self) -> MonitorState {
        self.monitor.state()
    }

    /// Start a session for one unit of indexing work.
    pub fn session(&self) -> IndexSession<'_> {
        IndexSession {
            index: self,
            reader: None,
        }
    }

    pub fn persistence(&self) -> Option<&IndexPersistence> {
        self.persistence.as_ref()
    }

    /// Persist the index if it changed since the last save.
    ///
    /// Returns `true` when something was written. Holds the exclusive hold for
    /// the duration of the write; the hold is released on every path.
    pub fn save(&self) -> StorageResult<bool> {
        let Some(persistence) = &self.persistence else {
            return Ok(false);
        };
        let mut data = self.monitor.write();
        if !data.is_dirty() && persistence.exists() {
            return Ok(false);
        }
        let metadata = persistence.save(&data)?;
        data.mark_clean();
        tracing::info!(
            "[index] saved {} files, {} declarations",
            metadata.file_count,
            metadata.declaration_count
        );
        Ok(true)
    }

    /// Drop every file and declaration.
    pub fn clear(&self) {
        self.monitor.write().clear();
    }

    /// Metadata saved alongside the index, if the index is persistent.
    pub fn metadata(&self) -> Option<StorageResult<IndexMetadata>> {
        self.persistence
            .as_ref()
            .map(|p| IndexMetadata::load(p.base_path()))
    }

    /// Declarations whose own name is `name`.
    pub fn find_symbols(&self, name: &str) -> Vec<SymbolDeclaration> {
        self.read().find_by_name(name).into_iter().cloned().collect()
    }

    /// Declarations matching a `::`-separated qualified name exactly.
    pub fn find_qualified(&self, name: &QualifiedName) -> Vec<SymbolDeclaration> {
        self.read()
            .find_by_qualified_name(name)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Whether any indexed file lies below `dir`.
    pub fn has_files_under(&self, dir: &FileLocation) -> bool {
        self.read().files().any(|record| {
            let path = record.location.as_path();
            path != dir.as_path() && path.starts_with(dir.as_path())
        })
    }

    /// Declarations attributed to one file.
    pub fn declarations_in(&self, location: &FileLocation) -> Vec<SymbolDeclaration> {
        self.read().declarations_in(location).to_vec()
    }

    /// Path of an indexed file.
    pub fn file_path(&self, declaration: &SymbolDeclaration) -> Option<PathBuf> {
        self.read()
            .file_by_id(declaration.file_id)
            .map(|record| record.location.as_path().to_path_buf())
    }

    pub fn stats(&self) -> IndexStats {
        let data = self.read();
        IndexStats {
            file_count: data.file_count(),
            declaration_count: data.declaration_count(),
        }
    }
}

/// Lock scope of one indexing request.
///
/// The first access enters a shared hold that lasts until the session is
/// released or dropped. [`IndexSession::commit`] upgrades to the exclusive hold,
/// applies the change and downgrades straight back.
pub struct IndexSession<'a> {
    index: &'a SymbolIndex,
    reader: Option<ReadGuard<'a, IndexData>>,
}

impl<'a> IndexSession<'a> {
    /// Shared view of the index, entering the shared hold if not held yet.
    pub fn data(&mut self) -> &IndexData {
        let index = self.index;
        self.reader.get_or_insert_with(|| index.monitor.read())
    }

    /// Apply `change` under the exclusive hold.
    pub fn commit<R>(&mut self, change: impl FnOnce(&mut IndexData) -> R) -> R {
        let mut writer = match self.reader.take() {
            Some(reader) => reader.upgrade(),
            None => self.index.monitor.write(),
        };
        let out = change(&mut writer);
        self.reader = Some(writer.downgrade());
        out
    }

    /// Leave the shared hold early.
    pub fn release(&mut self) {
        self.reader = None;
    }

    pub fn is_holding(&self) -> bool {
        self.reader.is_some()
    }
}
