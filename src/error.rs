use thiserror::Error;

use crate::metadata::{streams::HeapKind, tables::CodedIndexType, tables::TableId};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure is local to the item that produced it: a broken row, signature or method body
/// never invalidates the rest of a loaded [`crate::metadata::image::MetadataImage`]. Callers that
/// walk many items are expected to report the failing one and continue with its siblings.
///
/// # Error Categories
///
/// ## Image access
/// - [`Error::ImageRead`] - The [`crate::ImageAccessor`] could not serve a byte range
/// - [`Error::OutOfBounds`] - A raw cursor read would have run past its buffer
/// - [`Error::Malformed`] - Structural corruption (root header, stream directory, ...)
///
/// ## Heaps and tables
/// - [`Error::HeapRead`] - Offset past the end of a heap
/// - [`Error::InvalidTableKind`] - The table is not present in this image
/// - [`Error::RowIndexOutOfRange`] - Row index beyond the table's row count
/// - [`Error::UnknownCodedTag`] / [`Error::DanglingReference`] - Corrupt coded index
///
/// ## Signatures and bytecode
/// - [`Error::SignatureTruncated`] / [`Error::SignatureTrailingBytes`] - Malformed blob
/// - [`Error::UnsupportedOpcode`] / [`Error::MethodBodyTruncated`] - Malformed CIL
///
/// # Examples
///
/// ```rust,no_run
/// use clrscope::{Error, MetadataImage};
/// use std::path::Path;
///
/// match MetadataImage::from_file(Path::new("assembly.dll")) {
///     Ok(image) => println!("{} tables present", image.tables().present().count()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The image accessor could not provide the requested range.
    ///
    /// Raised by [`crate::ImageAccessor`] implementations when `rva..rva+len` does not map to
    /// readable bytes of the underlying image.
    #[error("Could not read {len} bytes at RVA 0x{rva:08X}")]
    ImageRead {
        /// Relative virtual address of the failed read
        rva: u32,
        /// Amount of bytes that were requested
        len: u32,
    },

    /// The file is damaged and could not be parsed.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing a buffer.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// An offset into one of the metadata heaps lies beyond the heap's extent, or the entry
    /// found there is not well formed.
    #[error("Failed to read the {heap} heap at offset 0x{offset:X}")]
    HeapRead {
        /// The heap that was accessed
        heap: HeapKind,
        /// The offset that was requested
        offset: usize,
    },

    /// The requested table is not flagged as present in the tables header.
    #[error("Table {0:?} is not present in this image")]
    InvalidTableKind(TableId),

    /// A row index lies beyond the row count of its table.
    #[error("Row {index} is out of range for table {table:?} with {count} rows")]
    RowIndexOutOfRange {
        /// The table that was accessed
        table: TableId,
        /// The 0-based row index that was requested
        index: u32,
        /// Amount of rows in that table
        count: u32,
    },

    /// The tag bits of a coded index select no member table of its category.
    #[error("Tag {tag} is not valid for coded index {category:?}")]
    UnknownCodedTag {
        /// The coded index category the value was decoded with
        category: CodedIndexType,
        /// The offending tag value
        tag: u32,
    },

    /// A reference points past the end of its target table.
    #[error("Reference to row {row} of table {table:?} does not exist")]
    DanglingReference {
        /// The table the reference targets
        table: TableId,
        /// The 1-based row as stored in the file
        row: u32,
    },

    /// A signature blob ended before the grammar was satisfied.
    #[error("Signature truncated at offset {offset}")]
    SignatureTruncated {
        /// Cursor position at which more bytes were required
        offset: usize,
    },

    /// A signature blob has bytes left after the declared productions.
    #[error("Signature has trailing bytes - consumed {consumed} of {len}")]
    SignatureTrailingBytes {
        /// Amount of bytes the grammar consumed
        consumed: usize,
        /// Total size of the blob
        len: usize,
    },

    /// An opcode byte (or two-byte sequence) that is not part of the CIL instruction set.
    #[error("Unsupported opcode 0x{opcode:04X} at offset 0x{offset:X}")]
    UnsupportedOpcode {
        /// Offset of the opcode within the method body
        offset: u32,
        /// The opcode value, two-byte opcodes are reported as `0xFExx`
        opcode: u16,
    },

    /// The method body ended in the middle of a header or instruction.
    #[error("Method body truncated at offset 0x{offset:X}")]
    MethodBodyTruncated {
        /// Offset within the code at which more bytes were required
        offset: u32,
    },

    /// Recursion limit reached.
    ///
    /// Nested signatures are decoded recursively; the depth is bounded by
    /// [`crate::metadata::config::LoaderConfig::max_signature_depth`].
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}
