//! Where files come from: project roots, enumeration and path canonicalization.

use crate::config::Settings;
use crate::indexing::FileWalker;
use crate::types::FileLocation;
use indexmap::IndexSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Project membership and file enumeration.
pub trait SourceProvider: Send + Sync {
    /// Names of all configured projects.
    fn projects(&self) -> Vec<String>;

    /// Source roots of `project`, or `None` if no such project exists.
    fn source_roots(&self, project: &str) -> Option<Vec<PathBuf>>;

    /// Include roots indexed together with `project`.
    fn include_roots(&self, project: &str) -> Vec<PathBuf>;

    /// Every indexable file of `project`.
    fn source_files(&self, project: &str) -> Vec<PathBuf>;

    fn is_indexing_enabled(&self, project: &str) -> bool;

    /// The project whose source roots contain `path`.
    fn project_for(&self, path: &Path) -> Option<String> {
        self.projects().into_iter().find(|project| {
            self.source_roots(project)
                .unwrap_or_default()
                .iter()
                .chain(self.include_roots(project).iter())
                .any(|root| path.starts_with(root))
        })
    }
}

/// Reads projects from `[projects.*]` in the settings and enumerates their
/// files with a [`FileWalker`].
pub struct SettingsSourceProvider {
    settings: Arc<Settings>,
    walker: FileWalker,
}

impl SettingsSourceProvider {
    pub fn new(settings: Arc<Settings>) -> Self {
        let walker = FileWalker::new(Arc::clone(&settings));
        Self { settings, walker }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        match &self.settings.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SourceProvider for SettingsSourceProvider {
    fn projects(&self) -> Vec<String> {
        self.settings.projects.keys().cloned().collect()
    }

    fn source_roots(&self, project: &str) -> Option<Vec<PathBuf>> {
        self.settings
            .projects
            .get(project)
            .map(|config| vec![self.absolute(&config.root)])
    }

    fn include_roots(&self, project: &str) -> Vec<PathBuf> {
        self.settings
            .projects
            .get(project)
            .map(|config| {
                config
                    .include_roots
                    .iter()
                    .map(|root| self.absolute(root))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn source_files(&self, project: &str) -> Vec<PathBuf> {
        let mut files = IndexSet::new();
        let roots = self.source_roots(project).unwrap_or_default();
        for root in roots.iter().chain(self.include_roots(project).iter()) {
            files.extend(self.walker.walk(root));
        }
        files.into_iter().collect()
    }

    fn is_indexing_enabled(&self, project: &str) -> bool {
        self.settings
            .projects
            .get(project)
            .is_some_and(|config| config.enabled)
    }
}

/// Maps caller paths to the canonical locations the index is keyed by.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> Option<FileLocation>;
}

/// Canonicalizes through the file system, falling back to a lexical absolute
/// path for files that no longer exist.
#[derive(Debug, Clone, Default)]
pub struct CanonicalPathResolver {
    base: Option<PathBuf>,
}

impl CanonicalPathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base` instead of the current directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    fn absolute(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }
        let base = match &self.base {
            Some(base) => base.clone(),
            None => std::env::current_dir().ok()?,
        };
        Some(base.join(path))
    }
}

impl PathResolver for CanonicalPathResolver {
    fn resolve(&self, path: &Path) -> Option<FileLocation> {
        let absolute = self.absolute(path)?;
        if let Ok(canonical) = absolute.canonicalize() {
            return Some(FileLocation::new(canonical));
        }
        // Gone from disk: canonicalize the parent if it still exists
        if let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) {
            if let Ok(parent) = parent.canonicalize() {
                return Some(FileLocation::new(parent.join(name)));
            }
        }
        Some(FileLocation::new(normalize_lexically(&absolute)))
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_existing_paths_are_canonical() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.c");
        fs::write(&file, "").unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let resolver = CanonicalPathResolver::with_base(temp_dir.path());
        let direct = resolver.resolve(&file).unwrap();
        let relative = resolver.resolve(Path::new("./sub/../a.c")).unwrap();
        assert_eq!(direct, relative);
    }

    #[test]
    fn test_deleted_file_keeps_canonical_parent() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("gone.c");
        fs::write(&file, "").unwrap();

        let resolver = CanonicalPathResolver::new();
        let before = resolver.resolve(&file).unwrap();
        fs::remove_file(&file).unwrap();
        assert_eq!(resolver.resolve(&file).unwrap(), before);
    }

    #[test]
    fn test_lexical_normalization() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/./../c.h")),
            PathBuf::from("/a/c.h")
        );
    }

    #[test]
    fn test_settings_provider_enumerates_project_files() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let include = temp_dir.path().join("include");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&include).unwrap();
        fs::write(src.join("main.c"), "").unwrap();
        fs::write(src.join("notes.txt"), "").unwrap();
        fs::write(include.join("api.h"), "").unwrap();

        let mut settings = Settings::default();
        settings.projects.insert(
            "app".to_string(),
            ProjectConfig::new(&src).with_include_root(&include),
        );
        let mut disabled = ProjectConfig::new(&src);
        disabled.enabled = false;
        settings.projects.insert("off".to_string(), disabled);

        let provider = SettingsSourceProvider::new(Arc::new(settings));
        let files = provider.source_files("app");
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.ends_with("main.c")));
        assert!(files.iter().any(|f| f.ends_with("api.h")));

        assert!(provider.is_indexing_enabled("app"));
        assert!(!provider.is_indexing_enabled("off"));
        assert!(!provider.is_indexing_enabled("unknown"));
        assert!(provider.source_roots("unknown").is_none());
        assert_eq!(
            provider.project_for(&include.join("api.h")).as_deref(),
            Some("app")
        );
    }
}
