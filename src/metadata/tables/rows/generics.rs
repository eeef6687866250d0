use crate::{
    metadata::{
        image::MetadataImage,
        signatures::MethodSpecSignature,
        streams::HeapStore,
        tables::{
            rows::{blob, check_table, string, GenericParamAttributes, RowProjection},
            CodedReference, Row, TableId,
        },
        token::Token,
    },
    Result,
};

/// The `GenericParam` table (0x2A)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParam<'a> {
    /// Token of this row
    pub token: Token,
    /// 0-based position in the owner's parameter list
    pub number: u16,
    /// Variance and constraint flags
    pub flags: GenericParamAttributes,
    /// The generic `TypeDef` or `MethodDef`
    pub owner: CodedReference,
    /// Parameter name, e.g. `T`
    pub name: &'a str,
}

impl<'a> RowProjection<'a> for GenericParam<'a> {
    const TABLE: TableId = TableId::GenericParam;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(GenericParam {
            token: row.token(),
            number: row.u16(0)?,
            flags: GenericParamAttributes::from_bits_retain(row.u16(1)?),
            owner: row.coded(2)?,
            name: string(row, 3, heaps)?,
        })
    }
}

/// The `GenericParamConstraint` table (0x2C)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParamConstraint {
    /// Token of this row
    pub token: Token,
    /// The constrained parameter, 0-based `GenericParam` row
    pub owner: Option<u32>,
    /// The type the argument must derive from or implement
    pub constraint: CodedReference,
}

impl RowProjection<'_> for GenericParamConstraint {
    const TABLE: TableId = TableId::GenericParamConstraint;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(GenericParamConstraint {
            token: row.token(),
            owner: row.table_index(0)?,
            constraint: row.coded(1)?,
        })
    }
}

/// The `MethodSpec` table (0x2B), instantiations of generic methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec<'a> {
    /// Token of this row
    pub token: Token,
    /// The generic method
    pub method: CodedReference,
    /// Raw instantiation blob
    pub instantiation: &'a [u8],
}

impl MethodSpec<'_> {
    /// Decode the generic arguments
    ///
    /// # Errors
    /// Returns an error if the blob is not a valid instantiation
    pub fn instantiation(&self, image: &MetadataImage) -> Result<MethodSpecSignature> {
        image.signature_decoder(self.instantiation).decode_method_spec()
    }
}

impl<'a> RowProjection<'a> for MethodSpec<'a> {
    const TABLE: TableId = TableId::MethodSpec;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(MethodSpec {
            token: row.token(),
            method: row.coded(0)?,
            instantiation: blob(row, 1, heaps)?,
        })
    }
}
