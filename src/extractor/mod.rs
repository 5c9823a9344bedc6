//! Adapter around the external ctags process.
//!
//! Two modes:
//! - **streaming**: one file, tags read line by line from the pipe while ctags runs
//! - **batch**: one directory tree, tags written to a tag file and read afterwards
//!
//! There is no timeout. A hung ctags process stalls the request that started it.

pub mod command;
pub mod error;
pub mod stream;

pub use command::{CTAGS_FLAGS, batch_args, build_signature, streaming_args};
pub use error::{ExtractError, ExtractResult};
pub use stream::TagStream;

use std::path::{Path, PathBuf};
use std::process::Command;

/// Source of tag output for files and directories.
///
/// The indexer only talks to this trait, so tests can substitute canned output
/// for a real ctags binary.
pub trait TagExtractor: Send + Sync {
    /// Tag a single file, streaming the output lines.
    fn stream_file(&self, file: &Path) -> ExtractResult<TagStream>;

    /// Tag `dir` recursively, writing a complete tag file (header included) to
    /// `tag_file`.
    fn extract_directory(&self, dir: &Path, tag_file: &Path) -> ExtractResult<()>;
}

/// Runs Exuberant Ctags.
#[derive(Debug, Clone)]
pub struct CtagsExtractor {
    program: PathBuf,
    stream_capacity: usize,
}

impl CtagsExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            stream_capacity: 256,
        }
    }

    /// Maximum number of lines buffered between the pipe and the parser.
    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl TagExtractor for CtagsExtractor {
    fn stream_file(&self, file: &Path) -> ExtractResult<TagStream> {
        let mut command = Command::new(&self.program);
        command.args(streaming_args(file));
        tracing::debug!("[extractor] streaming tags for {}", file.display());
        TagStream::spawn(
            command,
            &self.program_name(),
            file.to_path_buf(),
            self.stream_capacity,
        )
    }

    fn extract_directory(&self, dir: &Path, tag_file: &Path) -> ExtractResult<()> {
        let program = self.program_name();
        tracing::debug!(
            "[extractor] writing tags for {} into {}",
            dir.display(),
            tag_file.display()
        );
        let status = Command::new(&self.program)
            .args(batch_args(dir, tag_file))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map_err(|source| stream::spawn_error(&program, source))?;
        stream::exit_status_to_result(status, &program, dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_ctags_in_batch_mode() {
        let extractor = CtagsExtractor::new("tagdex-no-such-ctags");
        let dir = tempfile::TempDir::new().unwrap();
        let err = extractor
            .extract_directory(dir.path(), &dir.path().join("tags"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::ProgramNotFound { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_ctags_in_streaming_mode() {
        let extractor = CtagsExtractor::new("tagdex-no-such-ctags");
        let err = extractor.stream_file(Path::new("a.c")).err().unwrap();
        assert!(err.to_string().contains("not found"));
    }
}
