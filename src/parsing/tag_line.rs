//! Parser for one line of extended-format ctags output.
//!
//! ```text
//! name<TAB>file<TAB>42;"<TAB>kind:function<TAB>class:Outer::Inner<TAB>...
//! ```
//!
//! Fields are positional. Malformed pieces never fail the line: a bad line
//! locator leaves the line number at 0 and extension fields without a `:` are
//! skipped.

use crate::parsing::TagKind;
use crate::types::QualifiedName;
use indexmap::IndexMap;

/// Extension keys that carry the enclosing scope, in lookup priority order.
const SCOPE_KEYS: [&str; 6] = ["namespace", "class", "struct", "union", "function", "enum"];

/// Separator between scope components in scope extension values.
const SCOPE_SEPARATOR: &str = "::";

/// One parsed tag record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagEntry {
    pub element_name: String,
    pub file_name: String,
    pub line_number: u32,
    pub extension_fields: IndexMap<String, String>,
}

impl TagEntry {
    /// Parse one tab-separated output line. Never fails.
    pub fn parse(line: &str) -> Self {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let mut entry = TagEntry::default();
        for (position, field) in line.split('\t').enumerate() {
            match position {
                0 => entry.element_name = field.to_string(),
                1 => entry.file_name = field.to_string(),
                2 => {
                    if let Some(line_number) = parse_line_locator(field) {
                        entry.line_number = line_number;
                    }
                }
                _ => {
                    if let Some((key, value)) = field.split_once(':') {
                        entry
                            .extension_fields
                            .insert(key.to_string(), value.to_string());
                    }
                }
            }
        }
        entry
    }

    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extension_fields.get(key).map(String::as_str)
    }

    /// Raw value of the `kind` field; empty when absent.
    pub fn kind_name(&self) -> &str {
        self.extension("kind").unwrap_or_default()
    }

    /// Recognized kind, if the entry has one.
    pub fn kind(&self) -> Option<TagKind> {
        TagKind::parse(self.kind_name())
    }

    /// Scope taken from the first scope key present, followed by the element name.
    pub fn qualified_name(&self) -> QualifiedName {
        SCOPE_KEYS
            .iter()
            .find_map(|key| self.extension(key))
            .map(|scope| QualifiedName::scoped(scope.split(SCOPE_SEPARATOR), &self.element_name))
            .unwrap_or_else(|| QualifiedName::simple(&self.element_name))
    }

    /// Whether ctags marked the tag as file-local (`file:`).
    pub fn is_file_scoped(&self) -> bool {
        self.extension_fields.contains_key("file")
    }
}

/// Parses `<digits>;"...` into the leading number.
fn parse_line_locator(field: &str) -> Option<u32> {
    let (digits, _) = field.split_once(';')?;
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A tag entry resolved to a recordable kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    pub kind: TagKind,
    pub name: QualifiedName,
    pub line: u32,
    pub file_name: String,
}

impl ParsedTag {
    /// Resolve an entry; entries with a missing or unrecognized kind yield `None`.
    pub fn from_entry(entry: TagEntry) -> Option<Self> {
        let kind = entry.kind()?;
        let name = entry.qualified_name();
        Some(Self {
            kind,
            name,
            line: entry.line_number,
            file_name: entry.file_name,
        })
    }

    /// Parse and resolve one output line.
    pub fn parse_line(line: &str) -> Option<Self> {
        Self::from_entry(TagEntry::parse(line))
    }
}
