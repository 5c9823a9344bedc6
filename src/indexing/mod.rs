//! Incremental indexing: planning, requests, scheduling.
//!
//! Callers hand the [`IndexManager`] a [`RequestAction`]; the manager queues it
//! (dropping duplicates), and a worker plans the pass with an
//! [`UpdatePlanner`], runs the extractor and commits the results to the
//! [`SymbolIndex`](crate::storage::SymbolIndex).

pub mod manager;
pub mod planner;
pub mod problems;
pub mod queue;
pub mod request;
pub mod sources;
pub mod update;
pub mod walker;

pub use manager::{IndexContext, IndexManager, IndexOptions, IndexState};
pub use planner::{
    FileChanges, UpdateMode, UpdatePlanner, UpdateState, file_stamp, unix_millis,
};
pub use problems::{ProblemMarkers, ProblemSink};
pub use queue::RequestQueue;
pub use request::{IndexRequest, RequestAction, RequestState};
pub use sources::{CanonicalPathResolver, PathResolver, SettingsSourceProvider, SourceProvider};
pub use update::UpdateSummary;
pub use walker::FileWalker;
