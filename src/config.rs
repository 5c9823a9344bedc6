//! Configuration module for tagdex.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.tagdex/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the binary after loading)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TAGDEX_` and use double underscores
//! to separate nested levels:
//! - `TAGDEX_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`
//! - `TAGDEX_INDEXING__CTAGS_PROGRAM=/opt/bin/ctags` sets `indexing.ctags_program`
//! - `TAGDEX_LOGGING__DEFAULT=debug` sets `logging.default`

use crate::indexing::UpdateMode;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding settings and the index, relative to the workspace root.
pub const CONFIG_DIR: &str = ".tagdex";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the index directory
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Workspace root directory (where .tagdex is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Projects to index, by name
    #[serde(default)]
    pub projects: IndexMap<String, ProjectConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How tags are obtained from ctags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// One ctags process per file, output consumed while it runs
    Streaming,
    /// One ctags process per source root, output read from a tag file
    Batch,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Number of worker threads executing index requests
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// The ctags executable (Exuberant Ctags)
    #[serde(default = "default_ctags_program")]
    pub ctags_program: PathBuf,

    /// Streaming or batch extraction
    #[serde(default = "default_extraction_mode")]
    pub extraction_mode: ExtractionMode,

    /// Whether unchanged files are re-tagged on project passes
    #[serde(default = "default_update_mode")]
    pub update_mode: UpdateMode,

    /// Lines buffered between a streaming ctags process and the parser
    #[serde(default = "default_stream_buffer_lines")]
    pub stream_buffer_lines: usize,

    /// File extensions treated as C/C++ sources and headers
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Patterns to ignore during indexing
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProjectConfig {
    /// Source root of the project
    pub root: PathBuf,

    /// Additional directories whose headers are indexed with the project
    #[serde(default)]
    pub include_roots: Vec<PathBuf>,

    /// Whether indexing is enabled for this project
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("index")
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_ctags_program() -> PathBuf {
    PathBuf::from("ctags")
}
fn default_extraction_mode() -> ExtractionMode {
    ExtractionMode::Streaming
}
fn default_update_mode() -> UpdateMode {
    UpdateMode::UpdateCheckTimestamps
}
fn default_stream_buffer_lines() -> usize {
    256
}
fn default_extensions() -> Vec<String> {
    ["c", "h", "cc", "cpp", "cxx", "c++", "hh", "hpp", "hxx", "h++", "inl"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_ignore_patterns() -> Vec<String> {
    vec![
        "build/**".to_string(),
        ".git/**".to_string(),
        "*.generated.*".to_string(),
    ]
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            workspace_root: None,
            indexing: IndexingConfig::default(),
            projects: IndexMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            ctags_program: default_ctags_program(),
            extraction_mode: default_extraction_mode(),
            update_mode: default_update_mode(),
            stream_buffer_lines: default_stream_buffer_lines(),
            extensions: default_extensions(),
            ignore_patterns: default_ignore_patterns(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl ProjectConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_roots: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_include_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.include_roots.push(root.into());
        self
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .tagdex directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::load_from(config_path).map(|mut settings| {
            // If workspace_root is not set in config, detect it
            if settings.workspace_root.is_none() {
                settings.workspace_root = Self::workspace_root();
            }
            settings
        })
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore (__) separates nested levels
            .merge(Env::prefixed("TAGDEX_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the workspace config by looking for a .tagdex directory
    /// Searches from current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where .tagdex is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }

        None
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'tagdex init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Index directory, resolved against the workspace root when relative
    pub fn resolved_index_path(&self) -> PathBuf {
        match &self.workspace_root {
            Some(root) if self.index_path.is_relative() => root.join(&self.index_path),
            _ => self.index_path.clone(),
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    ///
    /// The current directory becomes a project named after itself.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let mut settings = Settings::default();
        let current_dir = std::env::current_dir()?;
        let project_name = current_dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "default".to_string());
        settings
            .projects
            .insert(project_name, ProjectConfig::new(current_dir.clone()));
        settings.workspace_root = Some(current_dir);

        settings.save(&config_path)?;
        Ok(config_path)
    }
}
