use crate::{
    metadata::{
        streams::HeapStore,
        tables::{
            rows::{blob, check_table, RowProjection},
            CodedReference, Row, TableId,
        },
        token::Token,
    },
    Result,
};

/// The `Constant` table (0x0B), default values of fields, parameters and properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant<'a> {
    /// Token of this row
    pub token: Token,
    /// Element type of the value, e.g. `0x08` for `I4`
    pub element_type: u8,
    /// The owning `Field`, `Param` or `Property`, may be null in damaged images
    pub parent: CodedReference,
    /// Little-endian encoded value
    pub value: &'a [u8],
}

impl<'a> RowProjection<'a> for Constant<'a> {
    const TABLE: TableId = TableId::Constant;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(Constant {
            token: row.token(),
            // The second byte is padding
            element_type: (row.u16(0)? & 0xFF) as u8,
            parent: row.coded(1)?,
            value: blob(row, 2, heaps)?,
        })
    }
}

/// The `CustomAttribute` table (0x0C)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAttribute<'a> {
    /// Token of this row
    pub token: Token,
    /// The attributed entity
    pub parent: CodedReference,
    /// The attribute constructor, a `MethodDef` or `MemberRef`
    pub constructor: CodedReference,
    /// Serialized constructor arguments
    pub value: &'a [u8],
}

impl<'a> RowProjection<'a> for CustomAttribute<'a> {
    const TABLE: TableId = TableId::CustomAttribute;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(CustomAttribute {
            token: row.token(),
            parent: row.coded(0)?,
            constructor: row.coded(1)?,
            value: blob(row, 2, heaps)?,
        })
    }
}

/// The `DeclSecurity` table (0x0E)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclSecurity<'a> {
    /// Token of this row
    pub token: Token,
    /// Security action code
    pub action: u16,
    /// The `TypeDef`, `MethodDef` or `Assembly` the permissions apply to
    pub parent: CodedReference,
    /// Serialized permission set
    pub permission_set: &'a [u8],
}

impl<'a> RowProjection<'a> for DeclSecurity<'a> {
    const TABLE: TableId = TableId::DeclSecurity;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(DeclSecurity {
            token: row.token(),
            action: row.u16(0)?,
            parent: row.coded(1)?,
            permission_set: blob(row, 2, heaps)?,
        })
    }
}
