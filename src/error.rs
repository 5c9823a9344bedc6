//! Crate-level error type for indexing operations.

use crate::extractor::ExtractError;
use crate::parsing::TagFileError;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unknown project '{0}'")]
    UnknownProject(String),

    #[error("Indexing is disabled for project '{0}'")]
    ProjectDisabled(String),

    #[error("Cannot resolve path {}", .0.display())]
    UnresolvedPath(PathBuf),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Invalid tag file: {0}")]
    TagFile(#[from] TagFileError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("{0}")]
    General(String),
}

pub type IndexResult<T> = Result<T, IndexError>;
