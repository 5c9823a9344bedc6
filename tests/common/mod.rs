//! Shared fixtures: a scripted ctags stand-in and a scratch workspace.

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tagdex::config::{ExtractionMode, ProjectConfig, Settings};
use tagdex::extractor::{ExtractError, ExtractResult, TagExtractor, TagStream};
use tagdex::indexing::{IndexContext, IndexOptions, SettingsSourceProvider, UpdateMode};
use tagdex::storage::SymbolIndex;

pub const PROJECT: &str = "app";

pub fn valid_header() -> Vec<String> {
    vec![
        "!_TAG_FILE_FORMAT\t2\t/extended format; --format=1 will not append ;\" to lines/"
            .to_string(),
        "!_TAG_FILE_SORTED\t0\t/0=unsorted, 1=sorted, 2=foldcase/".to_string(),
        "!_TAG_PROGRAM_AUTHOR\tDarren Hiebert\t/dhiebert@users.sourceforge.net/".to_string(),
        "!_TAG_PROGRAM_NAME\tExuberant Ctags\t//".to_string(),
        "!_TAG_PROGRAM_URL\thttp://ctags.sourceforge.net\t/official site/".to_string(),
        "!_TAG_PROGRAM_VERSION\t5.8\t//".to_string(),
    ]
}

/// Poll `done` until it holds, failing the test after ten seconds.
pub fn wait_for(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// One extended-format tag line.
pub fn tag(name: &str, file: &Path, line: u32, kind: &str, extra: &[&str]) -> String {
    let mut out = format!(
        "{name}\t{}\t{line};\"\tkind:{kind}\tline:{line}",
        file.display()
    );
    for field in extra {
        out.push('\t');
        out.push_str(field);
    }
    out
}

type ExtractHook = Box<dyn Fn(&Path) + Send + Sync>;

/// Replays scripted tag lines instead of running ctags.
#[derive(Default)]
pub struct FakeCtags {
    tags: Mutex<HashMap<PathBuf, Vec<String>>>,
    header: Mutex<Option<Vec<String>>>,
    raw_tail: Mutex<Vec<u8>>,
    streamed: Mutex<Vec<PathBuf>>,
    batched: Mutex<Vec<PathBuf>>,
    missing: AtomicBool,
    failing: Mutex<HashSet<PathBuf>>,
    gate: Mutex<Option<Receiver<()>>>,
    on_extract: Mutex<Option<ExtractHook>>,
}

impl FakeCtags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_tags(&self, file: &Path, lines: Vec<String>) {
        self.tags.lock().insert(file.to_path_buf(), lines);
    }

    pub fn set_header(&self, header: Vec<String>) {
        *self.header.lock() = Some(header);
    }

    /// Behave as if the executable did not exist.
    pub fn set_missing(&self, missing: bool) {
        self.missing.store(missing, Ordering::SeqCst);
    }

    /// Bytes appended verbatim to every batch tag file.
    pub fn append_raw(&self, bytes: &[u8]) {
        self.raw_tail.lock().extend_from_slice(bytes);
    }

    /// Exit with a non-zero status when asked to tag `target`.
    pub fn fail_on(&self, target: &Path) {
        self.failing.lock().insert(target.to_path_buf());
    }

    /// Every extraction waits for a message (or disconnect) on `gate`.
    pub fn set_gate(&self, gate: Receiver<()>) {
        *self.gate.lock() = Some(gate);
    }

    /// Run `hook` with the target of every extraction, after the gate and
    /// before any output is produced.
    pub fn on_extract(&self, hook: impl Fn(&Path) + Send + Sync + 'static) {
        *self.on_extract.lock() = Some(Box::new(hook));
    }

    pub fn streamed(&self) -> Vec<PathBuf> {
        self.streamed.lock().clone()
    }

    pub fn batched(&self) -> Vec<PathBuf> {
        self.batched.lock().clone()
    }

    fn not_found(&self) -> ExtractResult<()> {
        if self.missing.load(Ordering::SeqCst) {
            return Err(ExtractError::ProgramNotFound {
                program: "ctags".to_string(),
            });
        }
        Ok(())
    }

    fn run(&self, target: &Path) -> ExtractResult<()> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        if let Some(hook) = self.on_extract.lock().as_ref() {
            hook(target);
        }
        if self.failing.lock().contains(target) {
            return Err(ExtractError::Failed {
                program: "ctags".to_string(),
                code: 1,
                target: target.to_path_buf(),
            });
        }
        Ok(())
    }
}

impl TagExtractor for FakeCtags {
    fn stream_file(&self, file: &Path) -> ExtractResult<TagStream> {
        self.not_found()?;
        self.streamed.lock().push(file.to_path_buf());
        self.run(file)?;
        let lines = self.tags.lock().get(file).cloned().unwrap_or_default();
        Ok(TagStream::from_lines(lines))
    }

    fn extract_directory(&self, dir: &Path, tag_file: &Path) -> ExtractResult<()> {
        self.not_found()?;
        self.batched.lock().push(dir.to_path_buf());
        self.run(dir)?;
        let mut lines = self.header.lock().clone().unwrap_or_else(valid_header);
        let tags = self.tags.lock();
        let mut files: Vec<&PathBuf> = tags.keys().filter(|f| f.starts_with(dir)).collect();
        files.sort();
        for file in files {
            lines.extend(tags[file].iter().cloned());
        }
        let mut contents = lines.join("\n").into_bytes();
        contents.push(b'\n');
        contents.extend_from_slice(&self.raw_tail.lock());
        fs::write(tag_file, contents).map_err(ExtractError::TagFile)
    }
}

/// A temporary project directory configured as project `app`.
pub struct Workspace {
    _dir: tempfile::TempDir,
    pub root: PathBuf,
    pub include_roots: Vec<PathBuf>,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap().join("src");
        fs::create_dir_all(&root).unwrap();
        Self {
            _dir: dir,
            root,
            include_roots: Vec::new(),
        }
    }

    /// Register `rel` (under the source root) as an include root.
    pub fn with_include_root(mut self, rel: &str) -> Self {
        let dir = self.root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        self.include_roots.push(dir);
        self
    }

    /// Register `rel` (next to the source root, not inside it) as an include
    /// root.
    pub fn with_outside_include_root(mut self, rel: &str) -> Self {
        let dir = self.outside(rel);
        fs::create_dir_all(&dir).unwrap();
        self.include_roots.push(dir);
        self
    }

    /// Path of `rel` next to the source root.
    pub fn outside(&self, rel: &str) -> PathBuf {
        self.root.parent().unwrap().join(rel)
    }

    pub fn write_outside(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.outside(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    /// Move the modification time forward so the file reads as changed.
    pub fn touch_later(&self, path: &Path) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
    }

    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        let mut project = ProjectConfig::new(&self.root);
        project.include_roots = self.include_roots.clone();
        settings.projects.insert(PROJECT.to_string(), project);
        settings
    }

    pub fn context(&self, ctags: Arc<FakeCtags>, extraction: ExtractionMode) -> IndexContext {
        self.context_with_index(ctags, extraction, SymbolIndex::in_memory())
    }

    pub fn context_with_index(
        &self,
        ctags: Arc<FakeCtags>,
        extraction: ExtractionMode,
        index: SymbolIndex,
    ) -> IndexContext {
        IndexContext::new(
            Arc::new(index),
            ctags,
            Arc::new(SettingsSourceProvider::new(Arc::new(self.settings()))),
        )
        .with_options(IndexOptions {
            extraction,
            update_mode: UpdateMode::UpdateCheckTimestamps,
        })
    }
}
