//! Problem markers raised against projects.

use dashmap::DashMap;
use indexmap::IndexSet;

/// Receives problems found while indexing a project.
pub trait ProblemSink: Send + Sync {
    /// Record `message` for `project`. Returns `false` if the project already
    /// carries a marker with the same text.
    fn report(&self, project: &str, message: &str) -> bool;

    /// Markers currently recorded for `project`.
    fn problems(&self, project: &str) -> Vec<String>;

    fn clear(&self, project: &str);
}

/// In-memory markers, deduplicated per project by message text.
#[derive(Debug, Default)]
pub struct ProblemMarkers {
    markers: DashMap<String, IndexSet<String>>,
}

impl ProblemMarkers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProblemSink for ProblemMarkers {
    fn report(&self, project: &str, message: &str) -> bool {
        let mut markers = self.markers.entry(project.to_string()).or_default();
        let added = markers.insert(message.to_string());
        if added {
            tracing::warn!("[problems] {project}: {message}");
        }
        added
    }

    fn problems(&self, project: &str) -> Vec<String> {
        self.markers
            .get(project)
            .map(|markers| markers.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn clear(&self, project: &str) {
        self.markers.remove(project);
    }
}
