//! In-memory index contents: file records and their declarations.
//!
//! `IndexData` is only ever reached through the [`IndexMonitor`](super::IndexMonitor),
//! so it carries no locking of its own.

use crate::parsing::DeclarationSink;
use crate::storage::{StorageError, StorageResult};
use crate::types::{
    CompactString, DeclarationKind, FileId, FileLocation, PositionKind, QualifiedName,
    SymbolDeclaration, compact_string,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Format version of the persisted index.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Change-detection stamp stored with each indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    /// Modification time in milliseconds since the Unix epoch.
    pub modified: u64,
    /// Hash of the extractor configuration the file was indexed with.
    pub signature: String,
}

impl FileStamp {
    pub fn new(modified: u64, signature: impl Into<String>) -> Self {
        Self {
            modified,
            signature: signature.into(),
        }
    }
}

/// One indexed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub location: FileLocation,
    pub stamp: FileStamp,
    pub declarations: Vec<SymbolDeclaration>,
}

/// Serialized shape of the index.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedIndex {
    pub version: u32,
    pub next_file_id: u32,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Clone)]
pub struct IndexData {
    files: HashMap<FileId, FileRecord>,
    by_location: HashMap<FileLocation, FileId>,
    by_name: HashMap<CompactString, HashSet<FileId>>,
    next_file_id: u32,
    dirty: bool,
}

impl IndexData {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            by_location: HashMap::new(),
            by_name: HashMap::new(),
            next_file_id: 1,
            dirty: false,
        }
    }

    /// Rebuild lookup tables from the persisted form.
    pub fn from_persisted(persisted: PersistedIndex) -> StorageResult<Self> {
        if persisted.version != INDEX_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: persisted.version,
                expected: INDEX_FORMAT_VERSION,
            });
        }

        let mut data = Self::new();
        data.next_file_id = persisted.next_file_id.max(1);
        for record in persisted.files {
            data.next_file_id = data.next_file_id.max(record.id.value().saturating_add(1));
            data.by_location.insert(record.location.clone(), record.id);
            for declaration in &record.declarations {
                data.by_name
                    .entry(compact_string(declaration.name.name()))
                    .or_default()
                    .insert(record.id);
            }
            data.files.insert(record.id, record);
        }
        Ok(data)
    }

    pub fn to_persisted(&self) -> PersistedIndex {
        let mut files: Vec<FileRecord> = self.files.values().cloned().collect();
        files.sort_by_key(|record| record.id);
        PersistedIndex {
            version: INDEX_FORMAT_VERSION,
            next_file_id: self.next_file_id,
            files,
        }
    }

    /// Start (re)populating a file: returns its id, creating the record on first
    /// sight, and drops whatever declarations it had before.
    pub fn begin_file(
        &mut self,
        location: &FileLocation,
        stamp: FileStamp,
    ) -> StorageResult<FileId> {
        let file_id = match self.by_location.get(location) {
            Some(&id) => id,
            None => {
                let id = FileId::new(self.next_file_id).ok_or(StorageError::FileIdOverflow)?;
                self.next_file_id = self
                    .next_file_id
                    .checked_add(1)
                    .ok_or(StorageError::FileIdOverflow)?;
                self.by_location.insert(location.clone(), id);
                self.files.insert(
                    id,
                    FileRecord {
                        id,
                        location: location.clone(),
                        stamp: stamp.clone(),
                        declarations: Vec::new(),
                    },
                );
                id
            }
        };

        let old = match self.files.get_mut(&file_id) {
            Some(record) => {
                record.stamp = stamp;
                std::mem::take(&mut record.declarations)
            }
            None => Vec::new(),
        };
        self.unlink_names(file_id, &old);
        self.dirty = true;
        Ok(file_id)
    }

    /// Remove a file and every declaration attributed to it.
    pub fn remove_file(&mut self, location: &FileLocation) -> Option<FileRecord> {
        let file_id = self.by_location.remove(location)?;
        let record = self.files.remove(&file_id)?;
        self.unlink_names(file_id, &record.declarations);
        self.dirty = true;
        Some(record)
    }

    /// Remove every indexed file located under `dir`.
    pub fn remove_under(&mut self, dir: &Path) -> Vec<FileLocation> {
        let doomed: Vec<FileLocation> = self
            .by_location
            .keys()
            .filter(|location| location.as_path().starts_with(dir))
            .cloned()
            .collect();
        for location in &doomed {
            self.remove_file(location);
        }
        doomed
    }

    pub fn clear(&mut self) {
        let had_files = !self.files.is_empty();
        self.files.clear();
        self.by_location.clear();
        self.by_name.clear();
        self.dirty |= had_files;
    }

    /// Whether the stored stamp for `location` is older than `stamp`.
    ///
    /// Unknown files are always stale.
    pub fn is_stale(&self, location: &FileLocation, stamp: &FileStamp) -> bool {
        match self.file(location) {
            Some(record) => {
                record.stamp.modified < stamp.modified || record.stamp.signature != stamp.signature
            }
            None => true,
        }
    }

    pub fn file(&self, location: &FileLocation) -> Option<&FileRecord> {
        self.by_location
            .get(location)
            .and_then(|id| self.files.get(id))
    }

    pub fn file_by_id(&self, id: FileId) -> Option<&FileRecord> {
        self.files.get(&id)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    pub fn declarations_in(&self, location: &FileLocation) -> &[SymbolDeclaration] {
        self.file(location)
            .map(|record| record.declarations.as_slice())
            .unwrap_or_default()
    }

    /// Declarations whose own (innermost) name is `name`.
    pub fn find_by_name(&self, name: &str) -> Vec<&SymbolDeclaration> {
        let Some(file_ids) = self.by_name.get(name) else {
            return Vec::new();
        };
        let mut found: Vec<&SymbolDeclaration> = file_ids
            .iter()
            .filter_map(|id| self.files.get(id))
            .flat_map(|record| record.declarations.iter())
            .filter(|decl| decl.name.name() == name)
            .collect();
        found.sort_by_key(|decl| (decl.file_id, decl.line));
        found
    }

    pub fn find_by_qualified_name(&self, name: &QualifiedName) -> Vec<&SymbolDeclaration> {
        self.find_by_name(name.name())
            .into_iter()
            .filter(|decl| &decl.name == name)
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn declaration_count(&self) -> usize {
        self.files.values().map(|r| r.declarations.len()).sum()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn unlink_names(&mut self, file_id: FileId, declarations: &[SymbolDeclaration]) {
        for declaration in declarations {
            let name = declaration.name.name();
            if let Some(ids) = self.by_name.get_mut(name) {
                ids.remove(&file_id);
                if ids.is_empty() {
                    self.by_name.remove(name);
                }
            }
        }
    }
}

impl Default for IndexData {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationSink for IndexData {
    fn record(
        &mut self,
        kind: DeclarationKind,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        _occurrences: u32,
        _position: PositionKind,
    ) {
        let Some(record) = self.files.get_mut(&file_id) else {
            tracing::warn!("[index] declaration for unknown file id {file_id}: {name}");
            return;
        };
        self.by_name
            .entry(compact_string(name.name()))
            .or_default()
            .insert(file_id);
        record
            .declarations
            .push(SymbolDeclaration::new(kind, name, line, file_id));
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(path: &str) -> FileLocation {
        FileLocation::new(path)
    }

    fn populate(data: &mut IndexData, path: &str, names: &[&str]) -> FileId {
        let file_id = data
            .begin_file(&location(path), FileStamp::new(10, "sig"))
            .unwrap();
        for (i, name) in names.iter().enumerate() {
            data.add_function_definition(
                file_id,
                QualifiedName::simple(name),
                i as u32 + 1,
                1,
                PositionKind::Line,
            );
        }
        file_id
    }

    #[test]
    fn test_commit_then_remove_leaves_nothing() {
        let mut data = IndexData::new();
        let file_id = populate(&mut data, "/src/a.c", &["foo", "bar"]);
        populate(&mut data, "/src/b.c", &["foo"]);

        assert_eq!(data.find_by_name("foo").len(), 2);
        assert_eq!(data.declarations_in(&location("/src/a.c")).len(), 2);

        data.remove_file(&location("/src/a.c"));
        assert!(data.file(&location("/src/a.c")).is_none());
        assert!(data.declarations_in(&location("/src/a.c")).is_empty());
        assert!(data.find_by_name("bar").is_empty());
        assert!(data.find_by_name("foo").iter().all(|d| d.file_id != file_id));
        assert_eq!(data.file_count(), 1);
    }

    #[test]
    fn test_recommit_replaces_declarations_and_keeps_id() {
        let mut data = IndexData::new();
        let first = populate(&mut data, "/src/a.c", &["old"]);
        let second = populate(&mut data, "/src/a.c", &["new"]);

        assert_eq!(first, second);
        assert!(data.find_by_name("old").is_empty());
        assert_eq!(data.find_by_name("new").len(), 1);
        assert_eq!(data.declaration_count(), 1);
    }

    #[test]
    fn test_staleness() {
        let mut data = IndexData::new();
        populate(&mut data, "/src/a.c", &["foo"]);
        let loc = location("/src/a.c");

        assert!(!data.is_stale(&loc, &FileStamp::new(10, "sig")));
        assert!(!data.is_stale(&loc, &FileStamp::new(5, "sig")));
        assert!(data.is_stale(&loc, &FileStamp::new(11, "sig")));
        assert!(data.is_stale(&loc, &FileStamp::new(10, "other")));
        assert!(data.is_stale(&location("/src/unknown.c"), &FileStamp::new(0, "sig")));
    }

    #[test]
    fn test_remove_under_directory() {
        let mut data = IndexData::new();
        populate(&mut data, "/src/lib/a.c", &["a"]);
        populate(&mut data, "/src/lib/b.c", &["b"]);
        populate(&mut data, "/src/main.c", &["main"]);

        let removed = data.remove_under(Path::new("/src/lib"));
        assert_eq!(removed.len(), 2);
        assert_eq!(data.file_count(), 1);
        assert_eq!(data.find_by_name("main").len(), 1);
    }

    #[test]
    fn test_persisted_roundtrip_preserves_ids() {
        let mut data = IndexData::new();
        populate(&mut data, "/src/a.c", &["foo"]);
        let restored = IndexData::from_persisted(data.to_persisted()).unwrap();

        assert_eq!(restored.file_count(), 1);
        assert_eq!(restored.find_by_name("foo").len(), 1);
        assert!(!restored.is_dirty());

        let mut restored = restored;
        let next = restored
            .begin_file(&location("/src/b.c"), FileStamp::new(1, "sig"))
            .unwrap();
        assert_eq!(next.value(), 2);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let persisted = PersistedIndex {
            version: 99,
            next_file_id: 1,
            files: Vec::new(),
        };
        assert!(matches!(
            IndexData::from_persisted(persisted),
            Err(StorageError::UnsupportedVersion { found: 99, .. })
        ));
    }
}
