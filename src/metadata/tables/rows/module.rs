use crate::{
    metadata::{
        streams::HeapStore,
        tables::{
            rows::{check_table, guid, string, RowProjection},
            Row, TableId,
        },
        token::Token,
    },
    Result,
};

/// The `Module` table (0x00), a single row describing the current module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module<'a> {
    /// Token of this row
    pub token: Token,
    /// Reserved, 0
    pub generation: u16,
    /// Module name, usually the file name
    pub name: &'a str,
    /// Module version id, regenerated by every compilation
    pub mvid: uguid::Guid,
    /// Edit-and-continue id
    pub enc_id: uguid::Guid,
    /// Edit-and-continue base id
    pub enc_base_id: uguid::Guid,
}

impl<'a> RowProjection<'a> for Module<'a> {
    const TABLE: TableId = TableId::Module;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(Module {
            token: row.token(),
            generation: row.u16(0)?,
            name: string(row, 1, heaps)?,
            mvid: guid(row, 2, heaps)?,
            enc_id: guid(row, 3, heaps)?,
            enc_base_id: guid(row, 4, heaps)?,
        })
    }
}

/// The `ModuleRef` table (0x1A), modules referenced by `ImplMap` and `MemberRef`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef<'a> {
    /// Token of this row
    pub token: Token,
    /// Referenced module, e.g. `kernel32.dll`
    pub name: &'a str,
}

impl<'a> RowProjection<'a> for ModuleRef<'a> {
    const TABLE: TableId = TableId::ModuleRef;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(ModuleRef {
            token: row.token(),
            name: string(row, 0, heaps)?,
        })
    }
}
