use std::ops::Range;

use crate::metadata::tables::TableId;

/// The run of rows a record owns in another table, e.g. the fields of a `TypeDef`.
///
/// List columns such as `TypeDef.FieldList` only store where a run starts; it ends where the
/// run of the next record starts, or at the end of the target table for the last record. An
/// `OwnedRange` is the result of evaluating both boundaries. It holds 0-based logical row
/// indices, `start..end`, and can be iterated any number of times.
///
/// In an unoptimized (`#-`) tables stream the logical indices address the matching `*Ptr`
/// table instead of the target itself, see
/// [`crate::metadata::tables::TableSet::resolve_indirection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnedRange {
    /// The table the rows belong to
    pub target: TableId,
    /// First owned row, 0-based
    pub start: u32,
    /// One past the last owned row, 0-based
    pub end: u32,
}

impl OwnedRange {
    /// Number of owned rows
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// True if the record owns no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if the 0-based logical `row` is part of this range
    #[must_use]
    pub fn contains(&self, row: u32) -> bool {
        self.start <= row && row < self.end
    }

    /// The owned logical rows, 0-based
    #[must_use]
    pub fn iter(&self) -> Range<u32> {
        self.start..self.end
    }
}

impl IntoIterator for OwnedRange {
    type Item = u32;
    type IntoIter = Range<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
