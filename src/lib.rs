//! tagdex: an incremental, ctags-driven symbol index for C and C++.
//!
//! - [`extractor`] runs Exuberant Ctags and streams its output
//! - [`parsing`] turns tag lines into declarations
//! - [`storage`] holds the index behind a read/write monitor and persists it
//! - [`indexing`] plans passes, queues requests and runs them on workers

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod storage;
pub mod types;

pub use config::Settings;
pub use error::{IndexError, IndexResult};
pub use indexing::{IndexContext, IndexManager, RequestAction};
pub use storage::SymbolIndex;
pub use types::{DeclarationKind, FileId, FileLocation, QualifiedName, SymbolDeclaration};
