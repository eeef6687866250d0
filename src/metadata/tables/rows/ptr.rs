//! Indirection and edit-and-continue tables, only found in unoptimized (`#-`) streams.

use crate::{
    metadata::{
        streams::HeapStore,
        tables::{
            rows::{check_table, RowProjection},
            Row, TableId,
        },
        token::Token,
    },
    Result,
};

macro_rules! pointer_projection {
    ($name:ident, $table:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            /// Token of this row
            pub token: Token,
            /// The physical target row, 0-based
            pub target: Option<u32>,
        }

        impl RowProjection<'_> for $name {
            const TABLE: TableId = TableId::$table;

            fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
                check_table(row, Self::TABLE)?;

                Ok($name {
                    token: row.token(),
                    target: row.table_index(0)?,
                })
            }
        }
    };
}

pointer_projection!(FieldPtr, FieldPtr, "The `FieldPtr` table (0x03)");
pointer_projection!(MethodPtr, MethodPtr, "The `MethodPtr` table (0x05)");
pointer_projection!(ParamPtr, ParamPtr, "The `ParamPtr` table (0x07)");
pointer_projection!(EventPtr, EventPtr, "The `EventPtr` table (0x13)");
pointer_projection!(PropertyPtr, PropertyPtr, "The `PropertyPtr` table (0x16)");

/// The `EncLog` table (0x1E)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncLog {
    /// Token of this row
    pub token: Token,
    /// The edited metadata token
    pub edited: Token,
    /// Edit operation code
    pub func_code: u32,
}

impl RowProjection<'_> for EncLog {
    const TABLE: TableId = TableId::EncLog;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(EncLog {
            token: row.token(),
            edited: Token::new(row.u32(0)?),
            func_code: row.u32(1)?,
        })
    }
}

/// The `EncMap` table (0x1F)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncMap {
    /// Token of this row
    pub token: Token,
    /// The mapped metadata token
    pub mapped: Token,
}

impl RowProjection<'_> for EncMap {
    const TABLE: TableId = TableId::EncMap;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(EncMap {
            token: row.token(),
            mapped: Token::new(row.u32(0)?),
        })
    }
}
