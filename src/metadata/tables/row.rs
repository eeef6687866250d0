use std::sync::OnceLock;

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        streams::HeapKind,
        tables::{CodedIndexType, CodedReference, ColumnKind, OwnedRange, Table, TableId},
        token::Token,
    },
    Error, Result,
};

/// A decoded column value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// A 2-byte constant
    U16(u16),
    /// A 4-byte constant
    U32(u32),
    /// An offset into `#Strings`/`#Blob`, or a 1-based `#GUID` index
    Heap(HeapKind, u32),
    /// A raw 1-based row index into a table, `0` for none
    Index(TableId, u32),
    /// A decoded, bounds-checked coded index
    Coded(CodedReference),
}

/// A single row of a metadata table.
///
/// Rows are cheap views over the table's bytes. Cells are decoded on first access and
/// remembered for the lifetime of the `Row`; decoding is a pure function of the row bytes, so
/// concurrent first accesses from multiple threads simply compute the same value.
///
/// Columns are addressed by their position in the table schema, see
/// [`crate::metadata::tables::schema`].
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.22
#[derive(Debug)]
pub struct Row<'a> {
    table: &'a Table,
    index: u32,
    data: &'a [u8],
    cells: Box<[OnceLock<Cell>]>,
}

impl<'a> Row<'a> {
    pub(crate) fn new(table: &'a Table, index: u32, data: &'a [u8]) -> Self {
        let cells = (0..table.columns().len()).map(|_| OnceLock::new()).collect();

        Row {
            table,
            index,
            data,
            cells,
        }
    }

    /// The table this row belongs to
    #[must_use]
    pub fn table_id(&self) -> TableId {
        self.table.id()
    }

    /// 0-based index of this row
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The metadata token addressing this row
    #[must_use]
    pub fn token(&self) -> Token {
        Token::from_parts(self.table.id().as_u8(), self.index + 1)
    }

    /// The raw bytes of this row
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The value of the column at position `column`
    ///
    /// # Errors
    /// Returns [`crate::Error::UnknownCodedTag`] or [`crate::Error::DanglingReference`] for
    /// corrupt coded indices, and [`crate::Error::Malformed`] if the table has no such column
    pub fn cell(&self, column: usize) -> Result<Cell> {
        let Some(slot) = self.cells.get(column) else {
            return Err(malformed_error!(
                "{:?} has no column {}",
                self.table.id(),
                column
            ));
        };

        if let Some(cell) = slot.get() {
            return Ok(*cell);
        }

        let cell = self.decode(column)?;
        // A concurrent decode produced the same value if this fails
        let _ = slot.set(cell);
        Ok(cell)
    }

    /// The value of the column called `name`
    ///
    /// # Errors
    /// See [`Row::cell`]
    pub fn column(&self, name: &str) -> Result<Cell> {
        match self.table.columns().iter().position(|c| c.name == name) {
            Some(column) => self.cell(column),
            None => Err(malformed_error!(
                "{:?} has no column named {}",
                self.table.id(),
                name
            )),
        }
    }

    fn raw(&self, column: usize) -> Result<u32> {
        let layout = &self.table.columns()[column];
        let mut offset = layout.offset as usize;
        read_le_at_dyn(self.data, &mut offset, layout.width == 4)
    }

    fn decode(&self, column: usize) -> Result<Cell> {
        let raw = self.raw(column)?;

        Ok(match self.table.columns()[column].kind {
            ColumnKind::FixedU16 => Cell::U16(u16::try_from(raw).unwrap_or(u16::MAX)),
            ColumnKind::FixedU32 => Cell::U32(raw),
            ColumnKind::HeapIndex(heap) => Cell::Heap(heap, raw),
            ColumnKind::SimpleTableIndex(table) => Cell::Index(table, raw),
            ColumnKind::CodedIndex(category) => {
                let reference = category.decode(raw)?;
                if let Some((table, row)) = reference.get() {
                    if row >= self.table.info().rows(table) {
                        return Err(Error::DanglingReference {
                            table,
                            row: row + 1,
                        });
                    }
                }

                Cell::Coded(reference)
            }
        })
    }

    fn mismatch(&self, column: usize, expected: &str) -> Error {
        malformed_error!(
            "Column {} of {:?} is not {}",
            column,
            self.table.id(),
            expected
        )
    }

    /// A 2-byte constant column
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the column has a different kind
    pub fn u16(&self, column: usize) -> Result<u16> {
        match self.cell(column)? {
            Cell::U16(value) => Ok(value),
            _ => Err(self.mismatch(column, "a 2-byte constant")),
        }
    }

    /// A 4-byte constant column
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the column has a different kind
    pub fn u32(&self, column: usize) -> Result<u32> {
        match self.cell(column)? {
            Cell::U32(value) => Ok(value),
            _ => Err(self.mismatch(column, "a 4-byte constant")),
        }
    }

    /// A heap index column
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the column has a different kind
    pub fn heap(&self, column: usize) -> Result<u32> {
        match self.cell(column)? {
            Cell::Heap(_, value) => Ok(value),
            _ => Err(self.mismatch(column, "a heap index")),
        }
    }

    /// A simple table index column, as a 0-based row; `None` for a null index
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if the row does not exist, or
    /// [`crate::Error::Malformed`] if the column has a different kind
    pub fn table_index(&self, column: usize) -> Result<Option<u32>> {
        match self.cell(column)? {
            Cell::Index(_, 0) => Ok(None),
            Cell::Index(table, raw) => {
                if raw > self.table.info().rows(table) {
                    return Err(Error::DanglingReference { table, row: raw });
                }

                Ok(Some(raw - 1))
            }
            _ => Err(self.mismatch(column, "a table index")),
        }
    }

    /// A coded index column
    ///
    /// # Errors
    /// See [`Row::cell`], and [`crate::Error::Malformed`] if the column has a different kind
    pub fn coded(&self, column: usize) -> Result<CodedReference> {
        match self.cell(column)? {
            Cell::Coded(reference) => Ok(reference),
            _ => Err(self.mismatch(column, "a coded index")),
        }
    }

    /// The coded index category of a coded index column
    #[must_use]
    pub fn coded_category(&self, column: usize) -> Option<CodedIndexType> {
        match self.table.columns().get(column)?.kind {
            ColumnKind::CodedIndex(category) => Some(category),
            _ => None,
        }
    }

    /// The run of rows this record owns through the list column at `column`.
    ///
    /// The run starts at this row's value and ends at the next row's value, or after the last
    /// row of the target for the last record. Both boundaries are clamped to the target table,
    /// and the end never precedes the start.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the column is not a table index
    pub fn range(&self, column: usize) -> Result<OwnedRange> {
        let Cell::Index(target, start) = self.cell(column)? else {
            return Err(self.mismatch(column, "a list column"));
        };

        let info = self.table.info();
        let count = match target.pointer_table() {
            Some(pointer) if info.rows(pointer) > 0 => info.rows(pointer),
            _ => info.rows(target),
        };

        let end = if self.index + 1 < self.table.row_count() {
            self.table.raw_cell(self.index + 1, column)?
        } else {
            count + 1
        };

        let start = start.clamp(1, count + 1);
        let end = end.clamp(start, count + 1);

        Ok(OwnedRange {
            target,
            start: start - 1,
            end: end - 1,
        })
    }
}
