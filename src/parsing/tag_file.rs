//! Reader for complete tag files written by batch extraction.

use crate::parsing::header::{TagFileHeader, TagFileResult, HEADER_LINES};
use crate::parsing::{ParsedTag, TagEntry};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Streams entries out of a tag file after validating its header.
///
/// Construction fails if the header is not the one we expect; in that case no
/// entry from the file may be used.
pub struct TagFileReader<R> {
    header: TagFileHeader,
    reader: R,
    buf: Vec<u8>,
}

impl TagFileReader<BufReader<File>> {
    pub fn open(path: &Path) -> TagFileResult<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> TagFileReader<R> {
    pub fn new(reader: R) -> TagFileResult<Self> {
        let mut reader = reader;
        let mut buf = Vec::new();
        let mut head = Vec::with_capacity(HEADER_LINES);
        while head.len() < HEADER_LINES {
            match read_line(&mut reader, &mut buf)? {
                Some(line) => head.push(line),
                None => break,
            }
        }
        let header = TagFileHeader::parse(head)?;
        Ok(Self {
            header,
            reader,
            buf,
        })
    }

    pub fn header(&self) -> &TagFileHeader {
        &self.header
    }

    /// Resolve every entry, grouped by the file it belongs to.
    ///
    /// Files whose entries all have unrecorded kinds still get a (possibly empty)
    /// group so the caller can register them as indexed.
    pub fn group_by_file(self) -> TagFileResult<IndexMap<String, Vec<ParsedTag>>> {
        let mut groups: IndexMap<String, Vec<ParsedTag>> = IndexMap::new();
        for entry in self {
            let entry = entry?;
            let tags = groups.entry(entry.file_name.clone()).or_default();
            if let Some(tag) = ParsedTag::from_entry(entry) {
                tags.push(tag);
            }
        }
        Ok(groups)
    }
}

impl<R: BufRead> Iterator for TagFileReader<R> {
    type Item = TagFileResult<TagEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match read_line(&mut self.reader, &mut self.buf) {
                Ok(line) => line?,
                Err(e) => return Some(Err(e.into())),
            };
            if line.is_empty() || line.starts_with("!_") {
                continue;
            }
            return Some(Ok(TagEntry::parse(&line)));
        }
    }
}

/// Next line without its terminator. Invalid UTF-8 is replaced rather than
/// rejected, so one odd byte only affects the record it sits in.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}
