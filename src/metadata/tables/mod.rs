//! Metadata tables (ECMA-335 II.22).
//!
//! The tables stream stores up to 45 tables back to back. Nothing in a row says how wide its
//! columns are; widths follow from the row counts and heap size flags in the stream header:
//!
//! - heap indices are 4 bytes if the heap's bit is set in `HeapSizes`
//! - simple table indices are 4 bytes if the target table has more than 65535 rows
//! - coded indices are 4 bytes if the largest member table, shifted by the tag bits, needs
//!   more than 16 bits
//!
//! [`TableInfo`] computes these widths once per image, [`schema`] describes the columns of
//! every table, and [`TableSet`] slices the stream into [`Table`]s of [`Row`]s. Typed views of
//! rows live in [`rows`] and are re-exported here.
//!
//! Row indices are 0-based throughout this module. The 1-based form, with 0 meaning "none",
//! only appears in raw [`Cell`] values and in [`crate::metadata::token::Token`]s.

mod codedindex;
mod range;
mod row;
pub mod rows;
mod schema;
mod tableid;
mod tableinfo;
mod tableset;

pub use codedindex::{CodedIndexType, CodedReference};
pub use range::OwnedRange;
pub use row::{Cell, Row};
pub use rows::*;
pub use schema::{column_index, schema, Column, ColumnKind};
pub use tableid::TableId;
pub use tableinfo::{
    TableInfo, HEAP_SIZE_BLOB, HEAP_SIZE_EXTRA_DATA, HEAP_SIZE_GUID, HEAP_SIZE_STRING,
};
pub use tableset::{ColumnLayout, Table, TableIterator, TableSet};
