use crate::{
    metadata::{
        image::MetadataImage,
        signatures::TypeSignature,
        streams::HeapStore,
        tables::{
            rows::{blob, check_table, string, RowProjection, TypeAttributes},
            CodedReference, OwnedRange, Row, TableId,
        },
        token::Token,
    },
    Result,
};

/// The `TypeDef` table (0x02), types defined in this module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef<'a> {
    /// Token of this row
    pub token: Token,
    /// Type attributes
    pub flags: TypeAttributes,
    /// Simple name
    pub name: &'a str,
    /// Namespace, empty for the global namespace and for nested types
    pub namespace: &'a str,
    /// Base type, null for interfaces and `System.Object`
    pub extends: CodedReference,
    /// Fields owned by this type
    pub fields: OwnedRange,
    /// Methods owned by this type
    pub methods: OwnedRange,
}

impl TypeDef<'_> {
    /// `Namespace.Name`, or just the name in the global namespace
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.to_string()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

impl<'a> RowProjection<'a> for TypeDef<'a> {
    const TABLE: TableId = TableId::TypeDef;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(TypeDef {
            token: row.token(),
            flags: TypeAttributes::from_bits_retain(row.u32(0)?),
            name: string(row, 1, heaps)?,
            namespace: string(row, 2, heaps)?,
            extends: row.coded(3)?,
            fields: row.range(4)?,
            methods: row.range(5)?,
        })
    }
}

/// The `TypeRef` table (0x01), types defined elsewhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef<'a> {
    /// Token of this row
    pub token: Token,
    /// Where the type lives: a `Module`, `ModuleRef`, `AssemblyRef` or enclosing `TypeRef`
    pub resolution_scope: CodedReference,
    /// Simple name
    pub name: &'a str,
    /// Namespace
    pub namespace: &'a str,
}

impl<'a> RowProjection<'a> for TypeRef<'a> {
    const TABLE: TableId = TableId::TypeRef;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(TypeRef {
            token: row.token(),
            resolution_scope: row.coded(0)?,
            name: string(row, 1, heaps)?,
            namespace: string(row, 2, heaps)?,
        })
    }
}

/// The `TypeSpec` table (0x1B), constructed types such as generic instantiations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec<'a> {
    /// Token of this row
    pub token: Token,
    /// Raw type signature blob
    pub signature: &'a [u8],
}

impl TypeSpec<'_> {
    /// Decode the type signature
    ///
    /// # Errors
    /// Returns an error if the blob is not a valid type signature
    pub fn signature(&self, image: &MetadataImage) -> Result<TypeSignature> {
        image.signature_decoder(self.signature).decode_type_spec()
    }
}

impl<'a> RowProjection<'a> for TypeSpec<'a> {
    const TABLE: TableId = TableId::TypeSpec;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(TypeSpec {
            token: row.token(),
            signature: blob(row, 0, heaps)?,
        })
    }
}

/// The `InterfaceImpl` table (0x09)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceImpl {
    /// Token of this row
    pub token: Token,
    /// Implementing type, 0-based `TypeDef` row
    pub class: Option<u32>,
    /// The implemented interface
    pub interface: CodedReference,
}

impl RowProjection<'_> for InterfaceImpl {
    const TABLE: TableId = TableId::InterfaceImpl;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(InterfaceImpl {
            token: row.token(),
            class: row.table_index(0)?,
            interface: row.coded(1)?,
        })
    }
}

/// The `NestedClass` table (0x29)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedClass {
    /// Token of this row
    pub token: Token,
    /// The nested type, 0-based `TypeDef` row
    pub nested_class: Option<u32>,
    /// The enclosing type, 0-based `TypeDef` row
    pub enclosing_class: Option<u32>,
}

impl RowProjection<'_> for NestedClass {
    const TABLE: TableId = TableId::NestedClass;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(NestedClass {
            token: row.token(),
            nested_class: row.table_index(0)?,
            enclosing_class: row.table_index(1)?,
        })
    }
}

/// The `ClassLayout` table (0x0F)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLayout {
    /// Token of this row
    pub token: Token,
    /// Field alignment, a power of two up to 128, or 0
    pub packing_size: u16,
    /// Size of the type in bytes, 0 if unspecified
    pub class_size: u32,
    /// The laid out type, 0-based `TypeDef` row
    pub parent: Option<u32>,
}

impl RowProjection<'_> for ClassLayout {
    const TABLE: TableId = TableId::ClassLayout;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(ClassLayout {
            token: row.token(),
            packing_size: row.u16(0)?,
            class_size: row.u32(1)?,
            parent: row.table_index(2)?,
        })
    }
}
