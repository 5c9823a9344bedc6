//! Parsing of ctags output into declarations.
//!
//! - [`tag_line`]: one output line -> [`TagEntry`] -> [`ParsedTag`]
//! - [`kind`]: kind names -> declaration operations on a [`DeclarationSink`]
//! - [`header`] and [`tag_file`]: validated reading of whole tag files

pub mod header;
pub mod kind;
pub mod sink;
pub mod tag_file;
pub mod tag_line;

pub use header::{TagFileError, TagFileHeader, TagFileResult};
pub use kind::TagKind;
pub use sink::{DeclarationBuffer, DeclarationSink};
pub use tag_file::TagFileReader;
pub use tag_line::{ParsedTag, TagEntry};
