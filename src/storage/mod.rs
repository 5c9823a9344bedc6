//! Storage for the symbol index: contents, coordination and persistence.

pub mod error;
pub mod index;
pub mod index_data;
pub mod metadata;
pub mod monitor;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use index::{IndexSession, IndexStats, SymbolIndex};
pub use index_data::{FileRecord, FileStamp, INDEX_FORMAT_VERSION, IndexData, PersistedIndex};
pub use metadata::{DataSource, IndexMetadata};
pub use monitor::{IndexMonitor, MonitorState, ReadGuard, WriteGuard};
pub use persistence::IndexPersistence;
