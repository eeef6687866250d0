use crate::{
    metadata::{
        image::MetadataImage,
        signatures::Signature,
        streams::HeapStore,
        tables::{
            rows::{
                blob, check_table, string, EventAttributes, MethodSemanticsAttributes,
                PropertyAttributes, RowProjection,
            },
            CodedReference, OwnedRange, Row, TableId,
        },
        token::Token,
    },
    Result,
};

/// The `EventMap` table (0x12), links a type to the events it declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMap {
    /// Token of this row
    pub token: Token,
    /// The declaring type, 0-based `TypeDef` row
    pub parent: Option<u32>,
    /// Events owned by the type
    pub events: OwnedRange,
}

impl RowProjection<'_> for EventMap {
    const TABLE: TableId = TableId::EventMap;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(EventMap {
            token: row.token(),
            parent: row.table_index(0)?,
            events: row.range(1)?,
        })
    }
}

/// The `Event` table (0x14)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<'a> {
    /// Token of this row
    pub token: Token,
    /// Event attributes
    pub flags: EventAttributes,
    /// Event name
    pub name: &'a str,
    /// The delegate type of the event
    pub event_type: CodedReference,
}

impl<'a> RowProjection<'a> for Event<'a> {
    const TABLE: TableId = TableId::Event;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(Event {
            token: row.token(),
            flags: EventAttributes::from_bits_retain(row.u16(0)?),
            name: string(row, 1, heaps)?,
            event_type: row.coded(2)?,
        })
    }
}

/// The `PropertyMap` table (0x15), links a type to the properties it declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMap {
    /// Token of this row
    pub token: Token,
    /// The declaring type, 0-based `TypeDef` row
    pub parent: Option<u32>,
    /// Properties owned by the type
    pub properties: OwnedRange,
}

impl RowProjection<'_> for PropertyMap {
    const TABLE: TableId = TableId::PropertyMap;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(PropertyMap {
            token: row.token(),
            parent: row.table_index(0)?,
            properties: row.range(1)?,
        })
    }
}

/// The `Property` table (0x17)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property<'a> {
    /// Token of this row
    pub token: Token,
    /// Property attributes
    pub flags: PropertyAttributes,
    /// Property name
    pub name: &'a str,
    /// Raw property signature blob
    pub signature: &'a [u8],
}

impl Property<'_> {
    /// Decode the property signature
    ///
    /// # Errors
    /// Returns an error if the blob is not a valid property signature
    pub fn signature(&self, image: &MetadataImage) -> Result<Signature> {
        image.signature_decoder(self.signature).decode()
    }
}

impl<'a> RowProjection<'a> for Property<'a> {
    const TABLE: TableId = TableId::Property;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(Property {
            token: row.token(),
            flags: PropertyAttributes::from_bits_retain(row.u16(0)?),
            name: string(row, 1, heaps)?,
            signature: blob(row, 2, heaps)?,
        })
    }
}

/// The `MethodSemantics` table (0x18), accessor methods of properties and events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSemantics {
    /// Token of this row
    pub token: Token,
    /// The role of the method
    pub semantics: MethodSemanticsAttributes,
    /// The accessor, 0-based `MethodDef` row
    pub method: Option<u32>,
    /// The `Event` or `Property`
    pub association: CodedReference,
}

impl RowProjection<'_> for MethodSemantics {
    const TABLE: TableId = TableId::MethodSemantics;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(MethodSemantics {
            token: row.token(),
            semantics: MethodSemanticsAttributes::from_bits_retain(row.u16(0)?),
            method: row.table_index(1)?,
            association: row.coded(2)?,
        })
    }
}
