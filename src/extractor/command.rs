//! Argument sets for invoking Exuberant Ctags.

use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fmt::Write;
use std::path::Path;

/// Flags passed on every invocation.
///
/// Numeric line locators, extended format, unsorted output, explicit kind
/// filters for C and C++, and only those two languages.
pub const CTAGS_FLAGS: [&str; 7] = [
    "--excmd=number",
    "--format=2",
    "--sort=no",
    "--fields=aiKlmnsSz",
    "--c-types=cdefgmnpstuvx",
    "--c++-types=cdefgmnpstuvx",
    "--languages=c,c++",
];

/// Writes a fresh tag file instead of merging into an existing one.
const SINGLE_FILE_FLAG: &str = "--append=no";

/// Arguments to tag one file and write the tags to standard output.
pub fn streaming_args(file: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = CTAGS_FLAGS.iter().map(OsString::from).collect();
    args.push("-f".into());
    args.push("-".into());
    args.push(file.as_os_str().to_owned());
    args
}

/// Arguments to tag a directory recursively into `tag_file`.
pub fn batch_args(dir: &Path, tag_file: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = CTAGS_FLAGS.iter().map(OsString::from).collect();
    args.push(SINGLE_FILE_FLAG.into());
    args.push("-f".into());
    args.push(tag_file.as_os_str().to_owned());
    args.push("-R".into());
    args.push(dir.as_os_str().to_owned());
    args
}

/// Hash identifying the extraction configuration a file was indexed with.
///
/// Covers the fixed flag set plus the given extra inputs (include roots), so a
/// change to either makes every stored file stale.
pub fn build_signature<'a>(extra: impl IntoIterator<Item = &'a Path>) -> String {
    let mut hasher = Sha256::new();
    for flag in CTAGS_FLAGS {
        hasher.update(flag.as_bytes());
        hasher.update([0u8]);
    }
    for path in extra {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
