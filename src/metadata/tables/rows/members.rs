use crate::{
    metadata::{
        image::MetadataImage,
        signatures::{Signature, StandAloneSignature},
        streams::HeapStore,
        tables::{
            rows::{
                blob, check_table, string, FieldAttributes, MethodAttributes,
                MethodImplAttributes, PInvokeAttributes, ParamAttributes, RowProjection,
            },
            CodedReference, OwnedRange, Row, TableId,
        },
        token::Token,
    },
    Result,
};

/// The `Field` table (0x04)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<'a> {
    /// Token of this row
    pub token: Token,
    /// Field attributes
    pub flags: FieldAttributes,
    /// Field name
    pub name: &'a str,
    /// Raw field signature blob
    pub signature: &'a [u8],
}

impl Field<'_> {
    /// Decode the field signature, the field type is the `return_type`
    ///
    /// # Errors
    /// Returns an error if the blob is not a valid field signature
    pub fn signature(&self, image: &MetadataImage) -> Result<Signature> {
        image.signature_decoder(self.signature).decode()
    }
}

impl<'a> RowProjection<'a> for Field<'a> {
    const TABLE: TableId = TableId::Field;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(Field {
            token: row.token(),
            flags: FieldAttributes::from_bits_retain(row.u16(0)?),
            name: string(row, 1, heaps)?,
            signature: blob(row, 2, heaps)?,
        })
    }
}

/// The `MethodDef` table (0x06)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef<'a> {
    /// Token of this row
    pub token: Token,
    /// RVA of the method body, 0 for abstract, runtime and PInvoke methods
    pub rva: u32,
    /// Implementation attributes
    pub impl_flags: MethodImplAttributes,
    /// Method attributes
    pub flags: MethodAttributes,
    /// Method name
    pub name: &'a str,
    /// Raw method signature blob
    pub signature: &'a [u8],
    /// Parameters owned by this method
    pub params: OwnedRange,
}

impl MethodDef<'_> {
    /// Decode the method signature
    ///
    /// # Errors
    /// Returns an error if the blob is not a valid method signature
    pub fn signature(&self, image: &MetadataImage) -> Result<Signature> {
        image.signature_decoder(self.signature).decode()
    }
}

impl<'a> RowProjection<'a> for MethodDef<'a> {
    const TABLE: TableId = TableId::MethodDef;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(MethodDef {
            token: row.token(),
            rva: row.u32(0)?,
            impl_flags: MethodImplAttributes::from_bits_retain(row.u16(1)?),
            flags: MethodAttributes::from_bits_retain(row.u16(2)?),
            name: string(row, 3, heaps)?,
            signature: blob(row, 4, heaps)?,
            params: row.range(5)?,
        })
    }
}

/// The `Param` table (0x08)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param<'a> {
    /// Token of this row
    pub token: Token,
    /// Parameter attributes
    pub flags: ParamAttributes,
    /// 0 for the return value, otherwise the 1-based position in the signature
    pub sequence: u16,
    /// Parameter name
    pub name: &'a str,
}

impl<'a> RowProjection<'a> for Param<'a> {
    const TABLE: TableId = TableId::Param;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(Param {
            token: row.token(),
            flags: ParamAttributes::from_bits_retain(row.u16(0)?),
            sequence: row.u16(1)?,
            name: string(row, 2, heaps)?,
        })
    }
}

/// The `MemberRef` table (0x0A), references to fields and methods of other types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef<'a> {
    /// Token of this row
    pub token: Token,
    /// The declaring type or module
    pub class: CodedReference,
    /// Member name
    pub name: &'a str,
    /// Raw field or method signature blob
    pub signature: &'a [u8],
}

impl MemberRef<'_> {
    /// Decode the signature, a field signature if the member is a field
    ///
    /// # Errors
    /// Returns an error if the blob is not a valid signature
    pub fn signature(&self, image: &MetadataImage) -> Result<Signature> {
        image.signature_decoder(self.signature).decode()
    }

    /// True if the member is a field rather than a method
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.signature.first().is_some_and(|first| first & 0x0F == 0x06)
    }
}

impl<'a> RowProjection<'a> for MemberRef<'a> {
    const TABLE: TableId = TableId::MemberRef;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(MemberRef {
            token: row.token(),
            class: row.coded(0)?,
            name: string(row, 1, heaps)?,
            signature: blob(row, 2, heaps)?,
        })
    }
}

/// The `FieldLayout` table (0x10), explicit field offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    /// Token of this row
    pub token: Token,
    /// Byte offset of the field within its type
    pub offset: u32,
    /// The field, 0-based `Field` row
    pub field: Option<u32>,
}

impl RowProjection<'_> for FieldLayout {
    const TABLE: TableId = TableId::FieldLayout;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(FieldLayout {
            token: row.token(),
            offset: row.u32(0)?,
            field: row.table_index(1)?,
        })
    }
}

/// The `FieldRVA` table (0x1D), initial data of static fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRva {
    /// Token of this row
    pub token: Token,
    /// RVA of the initial value
    pub rva: u32,
    /// The field, 0-based `Field` row
    pub field: Option<u32>,
}

impl RowProjection<'_> for FieldRva {
    const TABLE: TableId = TableId::FieldRVA;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(FieldRva {
            token: row.token(),
            rva: row.u32(0)?,
            field: row.table_index(1)?,
        })
    }
}

/// The `FieldMarshal` table (0x0D)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMarshal<'a> {
    /// Token of this row
    pub token: Token,
    /// The marshalled `Field` or `Param`
    pub parent: CodedReference,
    /// Raw marshalling descriptor
    pub native_type: &'a [u8],
}

impl<'a> RowProjection<'a> for FieldMarshal<'a> {
    const TABLE: TableId = TableId::FieldMarshal;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(FieldMarshal {
            token: row.token(),
            parent: row.coded(0)?,
            native_type: blob(row, 1, heaps)?,
        })
    }
}

/// The `StandAloneSig` table (0x11), local variable and call-site signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandAloneSig<'a> {
    /// Token of this row
    pub token: Token,
    /// Raw signature blob
    pub signature: &'a [u8],
}

impl StandAloneSig<'_> {
    /// Decode the signature, either a local variable list or a method signature
    ///
    /// # Errors
    /// Returns an error if the blob is not a valid signature
    pub fn signature(&self, image: &MetadataImage) -> Result<StandAloneSignature> {
        image.signature_decoder(self.signature).decode_standalone()
    }
}

impl<'a> RowProjection<'a> for StandAloneSig<'a> {
    const TABLE: TableId = TableId::StandAloneSig;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(StandAloneSig {
            token: row.token(),
            signature: blob(row, 0, heaps)?,
        })
    }
}

/// The `MethodImpl` table (0x19), explicit interface implementations and overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodImpl {
    /// Token of this row
    pub token: Token,
    /// The implementing type, 0-based `TypeDef` row
    pub class: Option<u32>,
    /// The implementing method
    pub method_body: CodedReference,
    /// The implemented declaration
    pub method_declaration: CodedReference,
}

impl RowProjection<'_> for MethodImpl {
    const TABLE: TableId = TableId::MethodImpl;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(MethodImpl {
            token: row.token(),
            class: row.table_index(0)?,
            method_body: row.coded(1)?,
            method_declaration: row.coded(2)?,
        })
    }
}

/// The `ImplMap` table (0x1C), PInvoke imports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplMap<'a> {
    /// Token of this row
    pub token: Token,
    /// Marshalling and calling convention flags
    pub mapping_flags: PInvokeAttributes,
    /// The forwarded `Field` or `MethodDef`
    pub member_forwarded: CodedReference,
    /// Name of the native entry point
    pub import_name: &'a str,
    /// The native module, 0-based `ModuleRef` row
    pub import_scope: Option<u32>,
}

impl<'a> RowProjection<'a> for ImplMap<'a> {
    const TABLE: TableId = TableId::ImplMap;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(ImplMap {
            token: row.token(),
            mapping_flags: PInvokeAttributes::from_bits_retain(row.u16(0)?),
            member_forwarded: row.coded(1)?,
            import_name: string(row, 2, heaps)?,
            import_scope: row.table_index(3)?,
        })
    }
}
