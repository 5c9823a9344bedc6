//! Error types for running the external tag extractor.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Tag extractor '{program}' not found. Install Exuberant Ctags or set indexing.ctags_program")]
    ProgramNotFound { program: String },

    #[error("Failed to start tag extractor '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Tag extractor '{program}' exited with status {code} while processing {}", target.display())]
    Failed {
        program: String,
        code: i32,
        target: PathBuf,
    },

    #[error("Tag extractor '{program}' was interrupted while processing {}", target.display())]
    Interrupted { program: String, target: PathBuf },

    #[error("Failed to wait for tag extractor '{program}': {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to prepare tag file: {0}")]
    TagFile(#[from] std::io::Error),
}

impl ExtractError {
    /// Whether the whole unit of work must stop (as opposed to a single file).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ProgramNotFound { .. } | Self::Spawn { .. })
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;
