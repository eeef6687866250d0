//! Cursor based reader for metadata structures, signature blobs and CIL byte streams.
//!
//! [`Parser`] wraps a byte slice together with a position and offers the primitive reads the
//! rest of the crate builds on: fixed-width little-endian values, the ECMA-335 compressed
//! integer encodings (II.23.2) and NUL-terminated strings.
//!
//! # Compressed integers
//!
//! | Pattern                               | Range                 |
//! |---------------------------------------|-----------------------|
//! | `0xxxxxxx`                            | `0x00..=0x7F`         |
//! | `10xxxxxx xxxxxxxx`                   | `0x80..=0x3FFF`       |
//! | `110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx` | `0x4000..=0x1FFFFFFF` |
//!
//! # Example
//!
//! ```rust,ignore
//! use clrscope::file::parser::Parser;
//!
//! let mut parser = Parser::new(&[0x03, 0x80, 0x80, 0xC0, 0x00, 0x40, 0x00]);
//! assert_eq!(parser.read_compressed_uint()?, 0x03);
//! assert_eq!(parser.read_compressed_uint()?, 0x80);
//! assert_eq!(parser.read_compressed_uint()?, 0x4000);
//! # Ok::<(), clrscope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    Result,
};

/// A position tracking reader over a borrowed byte slice
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the underlying buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if there are unread bytes left
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Amount of unread bytes
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the cursor to an absolute position
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies beyond the buffer
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Skip `step` bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if that would move past the buffer
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(pos) => self.seek(pos),
            None => Err(out_of_bounds_error!()),
        }
    }

    /// Current cursor position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The complete underlying buffer
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Look at the next byte without consuming it
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the buffer
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(out_of_bounds_error!())
    }

    /// Run `f`, restoring the cursor if it fails
    ///
    /// # Errors
    /// Whatever `f` returns
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved_position = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = saved_position;
        }
        result
    }

    /// Advance to the next multiple of `alignment`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the padding would move past the buffer
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Read a little-endian `T` and advance
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes are left
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at(self.data, &mut self.position)
    }

    /// Borrow the next `length` bytes and advance past them
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes are left
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let Some(end) = self.position.checked_add(length) else {
            return Err(out_of_bounds_error!());
        };

        let Some(bytes) = self.data.get(self.position..end) else {
            return Err(out_of_bounds_error!());
        };

        self.position = end;
        Ok(bytes)
    }

    /// Read an ECMA-335 compressed unsigned integer (II.23.2)
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the encoding is cut short, or
    /// [`crate::Error::Malformed`] for a `111xxxxx` lead byte
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        if (first_byte & 0xE0) == 0xC0 {
            let rest = self.read_bytes(3)?;
            return Ok(((u32::from(first_byte) & 0x1F) << 24)
                | (u32::from(rest[0]) << 16)
                | (u32::from(rest[1]) << 8)
                | u32::from(rest[2]));
        }

        Err(malformed_error!(
            "Invalid compressed uint lead byte - 0x{:02X}",
            first_byte
        ))
    }

    /// Read an ECMA-335 compressed signed integer
    ///
    /// The value is rotated left by one with the sign in bit 0, then sign extended from the
    /// width of its encoding (7, 14 or 29 bits).
    ///
    /// # Errors
    /// Same as [`Parser::read_compressed_uint`]
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let start = self.position;
        let unsigned = self.read_compressed_uint()?;
        let sign_base: i32 = match self.position - start {
            1 => -0x40,
            2 => -0x2000,
            _ => -0x1000_0000,
        };

        #[allow(clippy::cast_possible_wrap)]
        let magnitude = (unsigned >> 1) as i32;
        if unsigned & 1 == 0 {
            Ok(magnitude)
        } else {
            Ok(sign_base + magnitude)
        }
    }

    /// Read a NUL-terminated UTF-8 string, consuming the terminator
    ///
    /// A string that runs to the end of the buffer without a terminator is accepted.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let rest = &self.data[self.position.min(self.data.len())..];
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());

        let string = std::str::from_utf8(&rest[..len])
            .map_err(|e| malformed_error!("Invalid UTF-8 at offset {} - {}", self.position, e))?
            .to_string();

        self.position += (len + 1).min(rest.len());
        Ok(string)
    }
}
