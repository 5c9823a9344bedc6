//! Metadata tracking for index state and data sources

use crate::storage::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the metadata sidecar inside the index directory.
pub const METADATA_FILE: &str = "index.meta";

/// Metadata about the index state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Version of the index format
    pub version: u32,

    /// Where the in-memory index came from
    pub data_source: DataSource,

    /// Number of declarations in the index
    pub declaration_count: u32,

    /// Number of files in the index
    pub file_count: u32,

    /// Last modification timestamp (seconds since the Unix epoch)
    pub last_modified: u64,
}

/// Describes where the index data came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataSource {
    /// Loaded from the JSON index file
    Json {
        path: PathBuf,
        size_bytes: u64,
        timestamp: u64,
    },

    /// Fresh index (not loaded)
    Fresh,
}

pub(crate) fn utc_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

impl IndexMetadata {
    /// Create new metadata for a fresh index
    pub fn new() -> Self {
        Self {
            version: super::INDEX_FORMAT_VERSION,
            data_source: DataSource::Fresh,
            declaration_count: 0,
            file_count: 0,
            last_modified: utc_timestamp(),
        }
    }

    /// Update counts from the index
    pub fn update_counts(&mut self, declaration_count: u32, file_count: u32) {
        self.declaration_count = declaration_count;
        self.file_count = file_count;
        self.last_modified = utc_timestamp();
    }

    /// Save metadata to file
    pub fn save(&self, base_path: &Path) -> StorageResult<()> {
        let metadata_path = base_path.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::Metadata(format!("Failed to serialize metadata: {e}")))?;

        fs::write(&metadata_path, json).map_err(|source| StorageError::Io {
            path: metadata_path,
            source,
        })
    }

    /// Load metadata from file, or fresh metadata if none was saved yet
    pub fn load(base_path: &Path) -> StorageResult<Self> {
        let metadata_path = base_path.join(METADATA_FILE);

        if !metadata_path.exists() {
            return Ok(Self::new());
        }

        let json = fs::read_to_string(&metadata_path).map_err(|source| StorageError::Io {
            path: metadata_path.clone(),
            source,
        })?;

        serde_json::from_str(&json)
            .map_err(|e| StorageError::Metadata(format!("Failed to parse metadata: {e}")))
    }

    /// Human readable description of the data source
    pub fn describe_source(&self) -> String {
        match &self.data_source {
            DataSource::Json {
                path, size_bytes, ..
            } => format!("Loaded from {} ({size_bytes} bytes)", path.display()),
            DataSource::Fresh => "Created fresh index".to_string(),
        }
    }
}

impl Default for IndexMetadata {
    fn default() -> Self {
        Self::new()
    }
}
