//! JSON persistence for the symbol index.
//!
//! The index lives in `<base>/index.json`, with counts and provenance in the
//! `index.meta` sidecar.

use crate::storage::index_data::{IndexData, PersistedIndex};
use crate::storage::metadata::{DataSource, IndexMetadata, METADATA_FILE, utc_timestamp};
use crate::storage::{StorageError, StorageResult};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the serialized index inside the index directory.
pub const INDEX_FILE: &str = "index.json";

/// Manages persistence of the index
#[derive(Debug, Clone)]
pub struct IndexPersistence {
    base_path: PathBuf,
}

impl IndexPersistence {
    /// Create a new persistence manager
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn index_path(&self) -> PathBuf {
        self.base_path.join(INDEX_FILE)
    }

    /// Write the index and its metadata.
    ///
    /// The index is written to a temporary file first and renamed into place,
    /// so a failed save leaves the previous file intact.
    #[must_use = "Save errors should be handled to ensure data is persisted"]
    pub fn save(&self, data: &IndexData) -> StorageResult<IndexMetadata> {
        fs::create_dir_all(&self.base_path).map_err(|source| StorageError::Io {
            path: self.base_path.clone(),
            source,
        })?;

        let path = self.index_path();
        let tmp_path = self.base_path.join(format!("{INDEX_FILE}.tmp"));
        let file = fs::File::create(&tmp_path).map_err(io_err(&tmp_path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &data.to_persisted())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        writer.flush().map_err(io_err(&tmp_path))?;
        drop(writer);
        fs::rename(&tmp_path, &path).map_err(io_err(&path))?;

        let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let mut metadata = IndexMetadata::load(&self.base_path).unwrap_or_default();
        metadata.update_counts(
            data.declaration_count() as u32,
            data.file_count() as u32,
        );
        metadata.data_source = DataSource::Json {
            path,
            size_bytes,
            timestamp: utc_timestamp(),
        };
        metadata.save(&self.base_path)?;
        Ok(metadata)
    }

    /// Load the index from disk
    #[must_use = "Load errors should be handled appropriately"]
    pub fn load(&self) -> StorageResult<IndexData> {
        let path = self.index_path();
        let file = fs::File::open(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        let persisted: PersistedIndex = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StorageError::Serialization(format!("{}: {e}", path.display())))?;
        let data = IndexData::from_persisted(persisted)?;

        tracing::debug!(
            "[persistence] loaded {} files, {} declarations from {}",
            data.file_count(),
            data.declaration_count(),
            path.display()
        );
        Ok(data)
    }

    /// Check if an index exists
    pub fn exists(&self) -> bool {
        self.index_path().exists()
    }

    /// Delete the persisted index
    pub fn clear(&self) -> Result<(), std::io::Error> {
        for name in [INDEX_FILE, METADATA_FILE] {
            let path = self.base_path.join(name);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + use<> {
    let path = path.to_path_buf();
    move |source| StorageError::Io { path, source }
}
