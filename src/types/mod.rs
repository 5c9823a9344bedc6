use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(NonZeroU32);

impl FileId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }

    /// Convert to the underlying u32 value
    pub fn to_u32(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical, stable identifier of a source file on disk.
///
/// Two paths that resolve to the same file (symlinks, `..` segments) produce
/// equal locations, which is what the planner keys its per-run state on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileLocation(PathBuf);

impl FileLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for FileLocation {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

/// Scope components from outermost to innermost, ending with the symbol itself.
///
/// Never empty: construction always includes the symbol's own name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName(Vec<CompactString>);

impl QualifiedName {
    /// A name with no enclosing scope.
    pub fn simple(name: &str) -> Self {
        Self(vec![compact_string(name)])
    }

    /// Builds `scope::...::name`.
    pub fn scoped<'a>(scope: impl IntoIterator<Item = &'a str>, name: &str) -> Self {
        let mut components: Vec<CompactString> = scope.into_iter().map(compact_string).collect();
        components.push(compact_string(name));
        Self(components)
    }

    /// The symbol's own (innermost) name.
    pub fn name(&self) -> &str {
        self.0.last().map(|s| s.as_ref()).unwrap_or_default()
    }

    /// Enclosing scopes, outermost first.
    pub fn scope(&self) -> impl Iterator<Item = &str> {
        let end = self.0.len().saturating_sub(1);
        self.0[..end].iter().map(|s| s.as_ref())
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses `a::b::c` as typed by a user.
    pub fn parse(text: &str) -> Self {
        let mut components: Vec<&str> = text.split("::").collect();
        let name = components.pop().unwrap_or_default();
        Self::scoped(components, name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(component)?;
        }
        Ok(())
    }
}

/// How the position of a declaration is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionKind {
    /// 1-based line numbers (what ctags `--excmd=number` produces).
    Line,
    /// Byte offsets into the file.
    Offset,
}

/// The twelve kinds of declaration the index records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationKind {
    Class,
    Macro,
    EnumMember,
    FunctionDefinition,
    Enum,
    Field,
    Namespace,
    FunctionDeclaration,
    Struct,
    Typedef,
    Union,
    Variable,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Macro => "macro",
            Self::EnumMember => "enum-member",
            Self::FunctionDefinition => "function-definition",
            Self::Enum => "enum",
            Self::Field => "field",
            Self::Namespace => "namespace",
            Self::FunctionDeclaration => "function-declaration",
            Self::Struct => "struct",
            Self::Typedef => "typedef",
            Self::Union => "union",
            Self::Variable => "variable",
        }
    }

    pub fn is_definition(&self) -> bool {
        !matches!(self, Self::FunctionDeclaration)
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One symbol declaration attributed to an indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDeclaration {
    pub kind: DeclarationKind,
    pub name: QualifiedName,
    pub line: u32,
    pub file_id: FileId,
}

impl SymbolDeclaration {
    pub fn new(kind: DeclarationKind, name: QualifiedName, line: u32, file_id: FileId) -> Self {
        Self {
            kind,
            name,
            line,
            file_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_creation() {
        assert!(FileId::new(0).is_none());

        let id = FileId::new(100).unwrap();
        assert_eq!(id.value(), 100);
    }

    #[test]
    fn test_qualified_name_scoped() {
        let name = QualifiedName::scoped(["Outer", "Inner"], "foo");
        assert_eq!(name.len(), 3);
        assert_eq!(name.name(), "foo");
        assert_eq!(name.scope().collect::<Vec<_>>(), vec!["Outer", "Inner"]);
        assert_eq!(name.to_string(), "Outer::Inner::foo");
    }

    #[test]
    fn test_qualified_name_parse() {
        assert_eq!(QualifiedName::parse("ns::Widget"), QualifiedName::scoped(["ns"], "Widget"));
        assert_eq!(QualifiedName::parse("main"), QualifiedName::simple("main"));
        assert!(!QualifiedName::parse("").is_empty());
    }

    #[test]
    fn test_only_prototypes_are_not_definitions() {
        assert!(!DeclarationKind::FunctionDeclaration.is_definition());
        assert!(DeclarationKind::FunctionDefinition.is_definition());
        assert!(DeclarationKind::Typedef.is_definition());
    }
}
