//! Column schemas of all metadata tables (ECMA-335 II.22).
//!
//! Each table is described as an ordered list of named columns. The byte width of a column
//! is not part of the schema, it depends on the image (heap sizes and row counts) and is
//! derived by [`crate::metadata::tables::TableInfo`].

use crate::metadata::{
    streams::HeapKind,
    tables::{CodedIndexType, TableId},
};

/// The kind of a single column, which determines its width and how its value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// A 2-byte constant
    FixedU16,
    /// A 4-byte constant
    FixedU32,
    /// An offset into one of the heaps (`#Strings`, `#Blob`) or an index into `#GUID`
    HeapIndex(HeapKind),
    /// A 1-based row index into a single table
    SimpleTableIndex(TableId),
    /// A coded index of the given category
    CodedIndex(CodedIndexType),
}

/// A named column of a table schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name as used in ECMA-335
    pub name: &'static str,
    /// How the column is stored
    pub kind: ColumnKind,
}

// Rows of `schema` are built from these so every arm stays a promotable constant
macro_rules! col {
    ($name:literal, $kind:expr) => {
        Column {
            name: $name,
            kind: $kind,
        }
    };
}

macro_rules! index {
    ($table:expr) => {
        ColumnKind::SimpleTableIndex($table)
    };
}

macro_rules! coded {
    ($category:expr) => {
        ColumnKind::CodedIndex($category)
    };
}

const U16: ColumnKind = ColumnKind::FixedU16;
const U32: ColumnKind = ColumnKind::FixedU32;
const STRING: ColumnKind = ColumnKind::HeapIndex(HeapKind::String);
const BLOB: ColumnKind = ColumnKind::HeapIndex(HeapKind::Blob);
const GUID: ColumnKind = ColumnKind::HeapIndex(HeapKind::Guid);

/// The ordered column list of `table`
#[must_use]
pub fn schema(table: TableId) -> &'static [Column] {
    match table {
        TableId::Module => &[
            col!("Generation", U16),
            col!("Name", STRING),
            col!("Mvid", GUID),
            col!("EncId", GUID),
            col!("EncBaseId", GUID),
        ],
        TableId::TypeRef => &[
            col!("ResolutionScope", coded!(CodedIndexType::ResolutionScope)),
            col!("TypeName", STRING),
            col!("TypeNamespace", STRING),
        ],
        TableId::TypeDef => &[
            col!("Flags", U32),
            col!("TypeName", STRING),
            col!("TypeNamespace", STRING),
            col!("Extends", coded!(CodedIndexType::TypeDefOrRef)),
            col!("FieldList", index!(TableId::Field)),
            col!("MethodList", index!(TableId::MethodDef)),
        ],
        TableId::FieldPtr => &[col!("Field", index!(TableId::Field))],
        TableId::Field => &[
            col!("Flags", U16),
            col!("Name", STRING),
            col!("Signature", BLOB),
        ],
        TableId::MethodPtr => &[col!("Method", index!(TableId::MethodDef))],
        TableId::MethodDef => &[
            col!("RVA", U32),
            col!("ImplFlags", U16),
            col!("Flags", U16),
            col!("Name", STRING),
            col!("Signature", BLOB),
            col!("ParamList", index!(TableId::Param)),
        ],
        TableId::ParamPtr => &[col!("Param", index!(TableId::Param))],
        TableId::Param => &[
            col!("Flags", U16),
            col!("Sequence", U16),
            col!("Name", STRING),
        ],
        TableId::InterfaceImpl => &[
            col!("Class", index!(TableId::TypeDef)),
            col!("Interface", coded!(CodedIndexType::TypeDefOrRef)),
        ],
        TableId::MemberRef => &[
            col!("Class", coded!(CodedIndexType::MemberRefParent)),
            col!("Name", STRING),
            col!("Signature", BLOB),
        ],
        // Type is a single byte followed by a padding byte
        TableId::Constant => &[
            col!("Type", U16),
            col!("Parent", coded!(CodedIndexType::HasConstant)),
            col!("Value", BLOB),
        ],
        TableId::CustomAttribute => &[
            col!("Parent", coded!(CodedIndexType::HasCustomAttribute)),
            col!("Type", coded!(CodedIndexType::CustomAttributeType)),
            col!("Value", BLOB),
        ],
        TableId::FieldMarshal => &[
            col!("Parent", coded!(CodedIndexType::HasFieldMarshal)),
            col!("NativeType", BLOB),
        ],
        TableId::DeclSecurity => &[
            col!("Action", U16),
            col!("Parent", coded!(CodedIndexType::HasDeclSecurity)),
            col!("PermissionSet", BLOB),
        ],
        TableId::ClassLayout => &[
            col!("PackingSize", U16),
            col!("ClassSize", U32),
            col!("Parent", index!(TableId::TypeDef)),
        ],
        TableId::FieldLayout => &[col!("Offset", U32), col!("Field", index!(TableId::Field))],
        TableId::StandAloneSig => &[col!("Signature", BLOB)],
        TableId::EventMap => &[
            col!("Parent", index!(TableId::TypeDef)),
            col!("EventList", index!(TableId::Event)),
        ],
        TableId::EventPtr => &[col!("Event", index!(TableId::Event))],
        TableId::Event => &[
            col!("EventFlags", U16),
            col!("Name", STRING),
            col!("EventType", coded!(CodedIndexType::TypeDefOrRef)),
        ],
        TableId::PropertyMap => &[
            col!("Parent", index!(TableId::TypeDef)),
            col!("PropertyList", index!(TableId::Property)),
        ],
        TableId::PropertyPtr => &[col!("Property", index!(TableId::Property))],
        TableId::Property => &[col!("Flags", U16), col!("Name", STRING), col!("Type", BLOB)],
        TableId::MethodSemantics => &[
            col!("Semantics", U16),
            col!("Method", index!(TableId::MethodDef)),
            col!("Association", coded!(CodedIndexType::HasSemantics)),
        ],
        TableId::MethodImpl => &[
            col!("Class", index!(TableId::TypeDef)),
            col!("MethodBody", coded!(CodedIndexType::MethodDefOrRef)),
            col!("MethodDeclaration", coded!(CodedIndexType::MethodDefOrRef)),
        ],
        TableId::ModuleRef => &[col!("Name", STRING)],
        TableId::TypeSpec => &[col!("Signature", BLOB)],
        TableId::ImplMap => &[
            col!("MappingFlags", U16),
            col!("MemberForwarded", coded!(CodedIndexType::MemberForwarded)),
            col!("ImportName", STRING),
            col!("ImportScope", index!(TableId::ModuleRef)),
        ],
        TableId::FieldRVA => &[col!("RVA", U32), col!("Field", index!(TableId::Field))],
        TableId::EncLog => &[col!("Token", U32), col!("FuncCode", U32)],
        TableId::EncMap => &[col!("Token", U32)],
        TableId::Assembly => &[
            col!("HashAlgId", U32),
            col!("MajorVersion", U16),
            col!("MinorVersion", U16),
            col!("BuildNumber", U16),
            col!("RevisionNumber", U16),
            col!("Flags", U32),
            col!("PublicKey", BLOB),
            col!("Name", STRING),
            col!("Culture", STRING),
        ],
        TableId::AssemblyProcessor => &[col!("Processor", U32)],
        TableId::AssemblyOS => &[
            col!("OSPlatformID", U32),
            col!("OSMajorVersion", U32),
            col!("OSMinorVersion", U32),
        ],
        TableId::AssemblyRef => &[
            col!("MajorVersion", U16),
            col!("MinorVersion", U16),
            col!("BuildNumber", U16),
            col!("RevisionNumber", U16),
            col!("Flags", U32),
            col!("PublicKeyOrToken", BLOB),
            col!("Name", STRING),
            col!("Culture", STRING),
            col!("HashValue", BLOB),
        ],
        TableId::AssemblyRefProcessor => &[
            col!("Processor", U32),
            col!("AssemblyRef", index!(TableId::AssemblyRef)),
        ],
        TableId::AssemblyRefOS => &[
            col!("OSPlatformId", U32),
            col!("OSMajorVersion", U32),
            col!("OSMinorVersion", U32),
            col!("AssemblyRef", index!(TableId::AssemblyRef)),
        ],
        TableId::File => &[col!("Flags", U32), col!("Name", STRING), col!("HashValue", BLOB)],
        TableId::ExportedType => &[
            col!("Flags", U32),
            col!("TypeDefId", U32),
            col!("TypeName", STRING),
            col!("TypeNamespace", STRING),
            col!("Implementation", coded!(CodedIndexType::Implementation)),
        ],
        TableId::ManifestResource => &[
            col!("Offset", U32),
            col!("Flags", U32),
            col!("Name", STRING),
            col!("Implementation", coded!(CodedIndexType::Implementation)),
        ],
        TableId::NestedClass => &[
            col!("NestedClass", index!(TableId::TypeDef)),
            col!("EnclosingClass", index!(TableId::TypeDef)),
        ],
        TableId::GenericParam => &[
            col!("Number", U16),
            col!("Flags", U16),
            col!("Owner", coded!(CodedIndexType::TypeOrMethodDef)),
            col!("Name", STRING),
        ],
        TableId::MethodSpec => &[
            col!("Method", coded!(CodedIndexType::MethodDefOrRef)),
            col!("Instantiation", BLOB),
        ],
        TableId::GenericParamConstraint => &[
            col!("Owner", index!(TableId::GenericParam)),
            col!("Constraint", coded!(CodedIndexType::TypeDefOrRef)),
        ],
    }
}

/// Position of the column called `name` in the schema of `table`
#[must_use]
pub fn column_index(table: TableId, name: &str) -> Option<usize> {
    schema(table).iter().position(|column| column.name == name)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_table_has_columns() {
        for table in TableId::iter() {
            assert!(!schema(table).is_empty(), "{table:?} has no schema");
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(column_index(TableId::MethodDef, "ParamList"), Some(5));
        assert_eq!(column_index(TableId::TypeDef, "Extends"), Some(3));
        assert_eq!(column_index(TableId::TypeDef, "Nope"), None);
    }
}
