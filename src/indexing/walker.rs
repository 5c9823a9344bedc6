//! File system walker for discovering source files to index
//!
//! This module provides directory traversal with support for:
//! - .gitignore rules
//! - Custom ignore patterns from configuration
//! - C/C++ extension filtering
//! - Hidden file handling

use crate::config::Settings;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the per-directory ignore file honored in addition to .gitignore.
pub const IGNORE_FILE: &str = ".tagdexignore";

/// Walks directories to find source files to index
pub struct FileWalker {
    settings: Arc<Settings>,
}

impl FileWalker {
    /// Create a new file walker with the given settings
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walk a directory and return an iterator of files to index
    pub fn walk(&self, root: &Path) -> impl Iterator<Item = PathBuf> + use<> {
        let mut builder = WalkBuilder::new(root);

        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .max_depth(None)
            .require_git(false)
            .add_custom_ignore_filename(IGNORE_FILE);

        // Exclusion globs go in as `!pattern` overrides
        let mut override_builder = ignore::overrides::OverrideBuilder::new(root);
        for pattern in &self.settings.indexing.ignore_patterns {
            if let Err(e) = override_builder.add(&format!("!{pattern}")) {
                tracing::warn!("[walker] invalid ignore pattern '{pattern}': {e}");
            }
        }

        match override_builder.build() {
            Ok(overrides) => {
                builder.overrides(overrides);
            }
            Err(e) => tracing::warn!("[walker] ignoring custom patterns: {e}"),
        }

        let extensions: HashSet<String> = self
            .settings
            .indexing
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(move |entry| {
                let path = entry.path();

                let name = path.file_name()?.to_str()?;
                if name.starts_with('.') {
                    return None;
                }

                let extension = path.extension()?.to_str()?.to_ascii_lowercase();
                extensions
                    .contains(&extension)
                    .then(|| path.to_path_buf())
            })
    }

    /// Count files that would be indexed (useful for dry runs)
    pub fn count_files(&self, root: &Path) -> usize {
        self.walk(root).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn walker() -> FileWalker {
        FileWalker::new(Arc::new(Settings::default()))
    }

    #[test]
    fn test_walk_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("main.c"), "int main(void) { return 0; }").unwrap();
        fs::write(root.join("widget.hpp"), "class Widget {};").unwrap();
        fs::write(root.join("Shape.CPP"), "").unwrap();
        fs::write(root.join("test.py"), "def test(): pass").unwrap();
        fs::write(root.join("README.md"), "# Test").unwrap();

        let files: Vec<_> = walker().walk(root).collect();

        assert_eq!(files.len(), 3);
        assert!(files.iter().any(|p| p.ends_with("main.c")));
        assert!(files.iter().any(|p| p.ends_with("widget.hpp")));
        assert!(files.iter().any(|p| p.ends_with("Shape.CPP")));
    }

    #[test]
    fn test_ignore_hidden_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join(".hidden.c"), "").unwrap();
        fs::write(root.join("visible.c"), "").unwrap();

        let files: Vec<_> = walker().walk(root).collect();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("visible.c"));
    }

    #[test]
    fn test_gitignore_respected() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        // Works without git init due to require_git(false)
        fs::write(root.join(".gitignore"), "ignored.c\n").unwrap();
        fs::write(root.join("ignored.c"), "").unwrap();
        fs::write(root.join("included.c"), "").unwrap();

        let files: Vec<_> = walker().walk(root).collect();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("included.c"));
    }

    #[test]
    fn test_custom_ignore_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("build").join("gen.c"), "").unwrap();
        fs::write(root.join("src").join("real.c"), "").unwrap();

        assert_eq!(walker().count_files(root), 1);
    }
}
