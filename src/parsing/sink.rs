//! Receiver of symbol declarations.

use crate::types::{DeclarationKind, FileId, PositionKind, QualifiedName, SymbolDeclaration};

/// Receives declarations produced from tag entries.
///
/// Implementors provide [`record`](DeclarationSink::record); the per-kind methods
/// are what the kind mapper calls and all funnel into it.
pub trait DeclarationSink {
    fn record(
        &mut self,
        kind: DeclarationKind,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    );

    fn add_class_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::Class, file_id, name, line, occurrences, position);
    }

    fn add_macro_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::Macro, file_id, name, line, occurrences, position);
    }

    fn add_enum_member_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::EnumMember, file_id, name, line, occurrences, position);
    }

    fn add_function_definition(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(
            DeclarationKind::FunctionDefinition,
            file_id,
            name,
            line,
            occurrences,
            position,
        );
    }

    fn add_enum_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::Enum, file_id, name, line, occurrences, position);
    }

    fn add_field_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::Field, file_id, name, line, occurrences, position);
    }

    fn add_namespace_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::Namespace, file_id, name, line, occurrences, position);
    }

    fn add_function_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(
            DeclarationKind::FunctionDeclaration,
            file_id,
            name,
            line,
            occurrences,
            position,
        );
    }

    fn add_struct_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::Struct, file_id, name, line, occurrences, position);
    }

    fn add_typedef_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::Typedef, file_id, name, line, occurrences, position);
    }

    fn add_union_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::Union, file_id, name, line, occurrences, position);
    }

    fn add_variable_declaration(
        &mut self,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        occurrences: u32,
        position: PositionKind,
    ) {
        self.record(DeclarationKind::Variable, file_id, name, line, occurrences, position);
    }
}

/// Collects declarations in memory. Useful when the target index is not at hand.
#[derive(Debug, Default)]
pub struct DeclarationBuffer {
    declarations: Vec<SymbolDeclaration>,
}

impl DeclarationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declarations(&self) -> &[SymbolDeclaration] {
        &self.declarations
    }

    pub fn into_declarations(self) -> Vec<SymbolDeclaration> {
        self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl DeclarationSink for DeclarationBuffer {
    fn record(
        &mut self,
        kind: DeclarationKind,
        file_id: FileId,
        name: QualifiedName,
        line: u32,
        _occurrences: u32,
        _position: PositionKind,
    ) {
        self.declarations
            .push(SymbolDeclaration::new(kind, name, line, file_id));
    }
}
