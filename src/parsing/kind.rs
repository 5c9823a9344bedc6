//! Mapping from ctags kind names to declaration operations.

use crate::parsing::DeclarationSink;
use crate::types::{DeclarationKind, FileId, PositionKind, QualifiedName};

/// The symbol kinds ctags reports for C and C++ with the kind filter we pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Class,
    Macro,
    Enumerator,
    Function,
    Enum,
    Member,
    Namespace,
    Prototype,
    Struct,
    Typedef,
    Union,
    Variable,
    /// `extern` variable declarations. Recognized, never recorded.
    ExternalVariable,
}

impl TagKind {
    /// Parse the value of a `kind:` extension field.
    ///
    /// Empty and unrecognized kinds yield `None`; such entries are dropped.
    pub fn parse(kind: &str) -> Option<Self> {
        let kind = match kind {
            "class" => Self::Class,
            "macro" => Self::Macro,
            "enumerator" => Self::Enumerator,
            "function" => Self::Function,
            "enum" => Self::Enum,
            "member" => Self::Member,
            "namespace" => Self::Namespace,
            "prototype" => Self::Prototype,
            "struct" => Self::Struct,
            "typedef" => Self::Typedef,
            "union" => Self::Union,
            "variable" => Self::Variable,
            "externvar" | "external variable" => Self::ExternalVariable,
            _ => return None,
        };
        Some(kind)
    }

    /// The declaration this kind produces, if any.
    pub fn declaration(self) -> Option<DeclarationKind> {
        match self {
            Self::Class => Some(DeclarationKind::Class),
            Self::Macro => Some(DeclarationKind::Macro),
            Self::Enumerator => Some(DeclarationKind::EnumMember),
            Self::Function => Some(DeclarationKind::FunctionDefinition),
            Self::Enum => Some(DeclarationKind::Enum),
            Self::Member => Some(DeclarationKind::Field),
            Self::Namespace => Some(DeclarationKind::Namespace),
            Self::Prototype => Some(DeclarationKind::FunctionDeclaration),
            Self::Struct => Some(DeclarationKind::Struct),
            Self::Typedef => Some(DeclarationKind::Typedef),
            Self::Union => Some(DeclarationKind::Union),
            Self::Variable => Some(DeclarationKind::Variable),
            Self::ExternalVariable => None,
        }
    }

    /// Record a declaration of this kind on `sink`.
    ///
    /// Returns false when the kind is recognized but not recorded.
    pub fn record(
        self,
        sink: &mut impl DeclarationSink,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
    ) -> bool {
        const OCCURRENCES: u32 = 1;
        const POSITION: PositionKind = PositionKind::Line;

        match self {
            Self::Class => sink.add_class_declaration(file_id, name, line, OCCURRENCES, POSITION),
            Self::Macro => sink.add_macro_declaration(file_id, name, line, OCCURRENCES, POSITION),
            Self::Enumerator => {
                sink.add_enum_member_declaration(file_id, name, line, OCCURRENCES, POSITION)
            }
            Self::Function => {
                sink.add_function_definition(file_id, name, line, OCCURRENCES, POSITION)
            }
            Self::Enum => sink.add_enum_declaration(file_id, name, line, OCCURRENCES, POSITION),
            Self::Member => sink.add_field_declaration(file_id, name, line, OCCURRENCES, POSITION),
            Self::Namespace => {
                sink.add_namespace_declaration(file_id, name, line, OCCURRENCES, POSITION)
            }
            Self::Prototype => {
                sink.add_function_declaration(file_id, name, line, OCCURRENCES, POSITION)
            }
            Self::Struct => sink.add_struct_declaration(file_id, name, line, OCCURRENCES, POSITION),
            Self::Typedef => {
                sink.add_typedef_declaration(file_id, name, line, OCCURRENCES, POSITION)
            }
            Self::Union => sink.add_union_declaration(file_id, name, line, OCCURRENCES, POSITION),
            Self::Variable => {
                sink.add_variable_declaration(file_id, name, line, OCCURRENCES, POSITION)
            }
            Self::ExternalVariable => return false,
        }
        true
    }
}
