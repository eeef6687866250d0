//! The tables stream (`#~`, or `#-` for unoptimized images) (ECMA-335 II.24.2.6).
//!
//! ```text
//! offset  size  field
//! 0       4     reserved, 0
//! 4       1     major version
//! 5       1     minor version
//! 6       1     heap sizes
//! 7       1     reserved, 1
//! 8       8     valid, bit n set if table n is present
//! 16      8     sorted, bit n set if table n is sorted
//! 24      4*n   row counts of the present tables, in table id order
//! ...           [4 bytes of extra data if heap sizes has bit 0x40 set]
//! ...           the rows of every present table, in table id order
//! ```

use std::sync::Arc;

use rayon::prelude::*;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at, read_le_at_dyn},
    metadata::tables::{
        schema, CodedReference, ColumnKind, OwnedRange, Row, TableId, TableInfo,
        HEAP_SIZE_EXTRA_DATA,
    },
    Error, Result,
};

/// Placement of one column inside a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Column name
    pub name: &'static str,
    /// What the column holds
    pub kind: ColumnKind,
    /// Byte offset of the column within the row
    pub offset: u32,
    /// Width in bytes, 2 or 4
    pub width: u8,
}

/// One metadata table: its rows and the layout they were decoded with
#[derive(Debug)]
pub struct Table {
    id: TableId,
    row_count: u32,
    row_size: u32,
    data: Vec<u8>,
    layout: Vec<ColumnLayout>,
    info: Arc<TableInfo>,
}

impl Table {
    fn new(id: TableId, row_count: u32, data: Vec<u8>, info: Arc<TableInfo>) -> Table {
        let mut offset = 0_u32;
        let layout = schema(id)
            .iter()
            .map(|column| {
                let width = info.column_bytes(column.kind);
                let placed = ColumnLayout {
                    name: column.name,
                    kind: column.kind,
                    offset,
                    width,
                };
                offset += u32::from(width);
                placed
            })
            .collect();

        Table {
            id,
            row_count,
            row_size: offset,
            data,
            layout,
            info,
        }
    }

    /// Which table this is
    #[must_use]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Size of a row in bytes
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// The column layout of this table
    #[must_use]
    pub fn columns(&self) -> &[ColumnLayout] {
        &self.layout
    }

    /// The sizing information of the stream this table belongs to
    #[must_use]
    pub fn info(&self) -> &TableInfo {
        &self.info
    }

    /// The row at the 0-based `index`
    ///
    /// # Arguments
    /// * 'index' - Row number, one less than the row part of its token
    ///
    /// # Errors
    /// Returns [`crate::Error::RowIndexOutOfRange`] if `index` is not below the row count
    pub fn row(&self, index: u32) -> Result<Row<'_>> {
        if index >= self.row_count {
            return Err(Error::RowIndexOutOfRange {
                table: self.id,
                index,
                count: self.row_count,
            });
        }

        let start = index as usize * self.row_size as usize;
        let end = start + self.row_size as usize;
        match self.data.get(start..end) {
            Some(data) => Ok(Row::new(self, index, data)),
            None => Err(out_of_bounds_error!()),
        }
    }

    /// Iterate over all rows in order
    #[must_use]
    pub fn rows(&self) -> TableIterator<'_> {
        TableIterator {
            table: self,
            next: 0,
        }
    }

    /// Iterate over all rows in parallel
    pub fn par_rows(&self) -> impl ParallelIterator<Item = Result<Row<'_>>> + '_ {
        (0..self.row_count)
            .into_par_iter()
            .map(move |index| self.row(index))
    }

    /// The undecoded value of `column` in the row at the 0-based `index`
    pub(crate) fn raw_cell(&self, index: u32, column: usize) -> Result<u32> {
        let Some(layout) = self.layout.get(column) else {
            return Err(malformed_error!("{:?} has no column {}", self.id, column));
        };

        let mut offset = index as usize * self.row_size as usize + layout.offset as usize;
        read_le_at_dyn(&self.data, &mut offset, layout.width == 4)
    }
}

/// Iterator over the rows of a [`Table`]
pub struct TableIterator<'a> {
    table: &'a Table,
    next: u32,
}

impl<'a> Iterator for TableIterator<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.table.row_count {
            return None;
        }

        let row = self.table.row(self.next).ok()?;
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.table.row_count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TableIterator<'_> {}

/// All tables of one image, parsed from the tables stream.
///
/// # Examples
///
/// ```rust,no_run
/// use clrscope::{metadata::tables::TableId, MetadataImage};
///
/// let image = MetadataImage::from_file("tests/samples/app.dll".as_ref())?;
/// for table in image.tables().present() {
///     println!("{:?}: {} rows of {} bytes", table.id(), table.row_count(), table.row_size());
/// }
/// println!("TypeDef sorted: {}", image.tables().is_sorted(TableId::TypeDef));
/// # Ok::<(), clrscope::Error>(())
/// ```
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.6
#[derive(Debug)]
pub struct TableSet {
    /// Major version of the tables schema, 2 for all current images
    pub major_version: u8,
    /// Minor version of the tables schema
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    tables: Vec<Option<Table>>,
    info: Arc<TableInfo>,
}

impl TableSet {
    /// Parse the tables stream
    ///
    /// # Arguments
    /// * 'data' - The content of the `#~` or `#-` stream
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream is truncated, or
    /// [`crate::Error::Malformed`] if it declares tables this library has no schema for
    pub fn parse(data: &[u8]) -> Result<TableSet> {
        if data.len() < 24 {
            return Err(out_of_bounds_error!());
        }

        let major_version = read_le::<u8>(&data[4..])?;
        let minor_version = read_le::<u8>(&data[5..])?;
        let heap_sizes = read_le::<u8>(&data[6..])?;
        let valid = read_le::<u64>(&data[8..])?;
        let sorted = read_le::<u64>(&data[16..])?;

        if valid >> TableId::COUNT != 0 {
            return Err(malformed_error!(
                "Tables stream declares unsupported tables - {:#018x}",
                valid
            ));
        }

        let mut offset = 24_usize;
        let mut rows = [0_u32; TableId::COUNT];
        for table_id in TableId::iter() {
            if valid & (1_u64 << table_id.as_u8()) != 0 {
                rows[table_id.as_u8() as usize] = read_le_at::<u32>(data, &mut offset)?;
            }
        }

        if heap_sizes & HEAP_SIZE_EXTRA_DATA != 0 {
            offset += 4;
        }

        let info = Arc::new(TableInfo::new(rows, heap_sizes));

        let mut tables = Vec::with_capacity(TableId::COUNT);
        tables.resize_with(TableId::COUNT, || None);

        for table_id in TableId::iter() {
            if valid & (1_u64 << table_id.as_u8()) == 0 {
                continue;
            }

            let row_count = info.rows(table_id);
            if row_count == 0 {
                tracing::warn!("{:?} is marked present but has no rows", table_id);
            }

            let size = u64::from(row_count) * u64::from(info.row_bytes(table_id));
            let Some(end) = usize::try_from(size)
                .ok()
                .and_then(|size| offset.checked_add(size))
                .filter(|end| *end <= data.len())
            else {
                return Err(out_of_bounds_error!());
            };

            tracing::trace!(
                "{:?}: {} rows of {} bytes at {:#x}",
                table_id,
                row_count,
                info.row_bytes(table_id),
                offset
            );

            tables[table_id.as_u8() as usize] = Some(Table::new(
                table_id,
                row_count,
                data[offset..end].to_vec(),
                info.clone(),
            ));
            offset = end;
        }

        Ok(TableSet {
            major_version,
            minor_version,
            valid,
            sorted,
            tables,
            info,
        })
    }

    /// The sizing information shared by all tables
    #[must_use]
    pub fn info(&self) -> &TableInfo {
        &self.info
    }

    /// The raw heap size flags
    #[must_use]
    pub fn heap_sizes(&self) -> u8 {
        self.info.heap_sizes()
    }

    /// True if `table` is present
    #[must_use]
    pub fn is_present(&self, table: TableId) -> bool {
        self.tables[table.as_u8() as usize].is_some()
    }

    /// True if `table` is flagged as sorted
    #[must_use]
    pub fn is_sorted(&self, table: TableId) -> bool {
        self.sorted & (1_u64 << table.as_u8()) != 0
    }

    /// The present tables, in table id order
    pub fn present(&self) -> impl Iterator<Item = &Table> + '_ {
        self.tables.iter().flatten()
    }

    /// The table `kind`
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidTableKind`] if the table is not present
    pub fn table(&self, kind: TableId) -> Result<&Table> {
        self.tables[kind.as_u8() as usize]
            .as_ref()
            .ok_or(Error::InvalidTableKind(kind))
    }

    /// Row count of `kind`, 0 if the table is absent
    #[must_use]
    pub fn row_count(&self, kind: TableId) -> u32 {
        self.info.rows(kind)
    }

    /// The row at the 0-based `index` of `kind`
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidTableKind`] or [`crate::Error::RowIndexOutOfRange`]
    pub fn row(&self, kind: TableId, index: u32) -> Result<Row<'_>> {
        self.table(kind)?.row(index)
    }

    /// The row a coded reference points to, `None` for a null reference
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the target row does not exist
    pub fn resolve(&self, reference: &CodedReference) -> Result<Option<Row<'_>>> {
        let Some((table, row)) = reference.get() else {
            return Ok(None);
        };

        match self.tables[table.as_u8() as usize].as_ref() {
            Some(target) if row < target.row_count() => Ok(Some(target.row(row)?)),
            _ => Err(Error::DanglingReference {
                table,
                row: row + 1,
            }),
        }
    }

    /// Map a 0-based logical row of `kind`, as produced by an [`OwnedRange`], to the physical
    /// row. Without a `*Ptr` table for `kind` both are the same.
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the pointer table entry is out of range
    pub fn resolve_indirection(&self, kind: TableId, logical: u32) -> Result<u32> {
        let Some(pointer) = kind.pointer_table() else {
            return Ok(logical);
        };

        let Some(table) = self.tables[pointer.as_u8() as usize].as_ref() else {
            return Ok(logical);
        };

        let physical = table.row(logical)?.table_index(0)?;
        match physical {
            Some(row) => Ok(row),
            None => Err(Error::DanglingReference {
                table: kind,
                row: 0,
            }),
        }
    }

    /// The rows an [`OwnedRange`] covers, with `*Ptr` indirection applied
    pub fn range_rows<'a>(
        &'a self,
        range: &OwnedRange,
    ) -> impl Iterator<Item = Result<Row<'a>>> + 'a {
        let target = range.target;
        range.iter().map(move |logical| {
            let physical = self.resolve_indirection(target, logical)?;
            self.row(target, physical)
        })
    }
}
