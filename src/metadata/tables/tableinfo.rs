//! Per-image column width derivation.
//!
//! The width of every index column depends on the image it was read from:
//!
//! - heap indices are 4 bytes wide if the heap's bit is set in the `HeapSizes` byte of the
//!   tables header (`0x01` strings, `0x02` GUIDs, `0x04` blobs), 2 bytes otherwise
//! - simple table indices are 4 bytes wide if the target table has 2^16 rows or more
//! - coded indices are 4 bytes wide if the largest member table, shifted left by the
//!   category's tag bits, no longer fits into 16 bits
//!
//! [`TableInfo`] computes all of these once per image, everything else asks it.

use strum::{EnumCount, IntoEnumIterator};

use crate::metadata::{
    streams::HeapKind,
    tables::{schema, CodedIndexType, ColumnKind, TableId},
};

/// `HeapSizes` flag for 4-byte `#Strings` indices
pub const HEAP_SIZE_STRING: u8 = 0x01;
/// `HeapSizes` flag for 4-byte `#GUID` indices
pub const HEAP_SIZE_GUID: u8 = 0x02;
/// `HeapSizes` flag for 4-byte `#Blob` indices
pub const HEAP_SIZE_BLOB: u8 = 0x04;
/// `HeapSizes` flag announcing an extra 4 bytes after the row counts
pub const HEAP_SIZE_EXTRA_DATA: u8 = 0x40;

/// Row counts and heap sizes of an image, and the column widths derived from them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    rows: [u32; TableId::COUNT],
    heap_sizes: u8,
    coded_indexes: [u8; CodedIndexType::COUNT],
}

impl TableInfo {
    /// Derive the widths for the given row counts (indexed by table number) and `HeapSizes`
    #[must_use]
    pub fn new(rows: [u32; TableId::COUNT], heap_sizes: u8) -> Self {
        let mut info = TableInfo {
            rows,
            heap_sizes,
            coded_indexes: [2; CodedIndexType::COUNT],
        };

        for category in CodedIndexType::iter() {
            let max_rows = category
                .tables()
                .iter()
                .flatten()
                .map(|table| info.rows(*table))
                .max()
                .unwrap_or(0);

            if u64::from(max_rows) << category.tag_bits() >= 1 << 16 {
                info.coded_indexes[category as usize] = 4;
            }
        }

        info
    }

    /// Convenience constructor from `(table, rows)` pairs
    #[must_use]
    pub fn from_counts(counts: &[(TableId, u32)], heap_sizes: u8) -> Self {
        let mut rows = [0_u32; TableId::COUNT];
        for (table, count) in counts {
            rows[*table as usize] = *count;
        }

        TableInfo::new(rows, heap_sizes)
    }

    /// Row count of `table`, `0` if the table is not present
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize]
    }

    /// The raw `HeapSizes` byte
    #[must_use]
    pub fn heap_sizes(&self) -> u8 {
        self.heap_sizes
    }

    /// True if indices into `heap` are 4 bytes wide
    #[must_use]
    pub fn is_large_heap(&self, heap: HeapKind) -> bool {
        let flag = match heap {
            HeapKind::String => HEAP_SIZE_STRING,
            HeapKind::Guid => HEAP_SIZE_GUID,
            HeapKind::Blob => HEAP_SIZE_BLOB,
            HeapKind::UserString => return false,
        };

        self.heap_sizes & flag == flag
    }

    /// Width of an index into `heap`
    #[must_use]
    pub fn heap_index_bytes(&self, heap: HeapKind) -> u8 {
        if self.is_large_heap(heap) {
            4
        } else {
            2
        }
    }

    /// Width of a simple index into `table`
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u8 {
        if self.rows(table) > u32::from(u16::MAX) {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of `category`
    #[must_use]
    pub fn coded_index_bytes(&self, category: CodedIndexType) -> u8 {
        self.coded_indexes[category as usize]
    }

    /// Width of a column of `kind`
    #[must_use]
    pub fn column_bytes(&self, kind: ColumnKind) -> u8 {
        match kind {
            ColumnKind::FixedU16 => 2,
            ColumnKind::FixedU32 => 4,
            ColumnKind::HeapIndex(heap) => self.heap_index_bytes(heap),
            ColumnKind::SimpleTableIndex(table) => self.table_index_bytes(table),
            ColumnKind::CodedIndex(category) => self.coded_index_bytes(category),
        }
    }

    /// Byte stride of one row of `table`
    #[must_use]
    pub fn row_bytes(&self, table: TableId) -> u32 {
        schema(table)
            .iter()
            .map(|column| u32::from(self.column_bytes(column.kind)))
            .sum()
    }
}
