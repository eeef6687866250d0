//! The `#US` heap (ECMA-335 II.24.2.4).
//!
//! String literals referenced by `ldstr`. Each entry is a compressed length `n`, followed by
//! `n - 1` bytes of UTF-16LE and one trailing byte which is set if any character needs special
//! handling beyond 8-bit ASCII.
//!
//! ```text
//! 0x00                                      <- offset 0, empty string
//! 0x0B 0x48 0x00 0x65 0x00 ... 0x6F 0x00 0x00 <- offset 1, "Hello", flag byte 0
//! ```

use widestring::U16String;

use crate::{file::parser::Parser, metadata::streams::HeapKind, Error, Result};

/// The `#US` heap
///
/// # Examples
///
/// ```rust
/// use clrscope::metadata::streams::UserStrings;
///
/// let heap = UserStrings::from(vec![0x00, 0x05, b'H', 0x00, b'i', 0x00, 0x00])?;
/// assert_eq!(heap.get(1)?.to_string_lossy(), "Hi");
/// # Ok::<(), clrscope::Error>(())
/// ```
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.4
#[derive(Debug, Clone, Default)]
pub struct UserStrings {
    data: Vec<u8>,
}

impl UserStrings {
    /// Take ownership of the raw heap bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a non-empty heap does not start with a NUL byte
    pub fn from(data: Vec<u8>) -> Result<UserStrings> {
        if data.first().is_some_and(|first| *first != 0) {
            return Err(malformed_error!("#US heap does not start with a NUL byte"));
        }

        Ok(UserStrings { data })
    }

    /// Size of the heap in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the image carries no `#US` heap
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The UTF-16 string starting at `offset`
    ///
    /// # Arguments
    /// * 'offset' - Byte offset of the entry, the row of a `0x70` string token
    ///
    /// # Errors
    /// Returns [`crate::Error::HeapRead`] if the entry exceeds the heap or has an invalid length
    pub fn get(&self, offset: usize) -> Result<U16String> {
        self.entry(offset).map(|(string, _)| string)
    }

    fn entry(&self, offset: usize) -> Result<(U16String, usize)> {
        if offset == 0 {
            return Ok((U16String::new(), 1));
        }

        let error = || Error::HeapRead {
            heap: HeapKind::UserString,
            offset,
        };

        let rest = self.data.get(offset..).ok_or_else(error)?;
        let mut parser = Parser::new(rest);
        let len = parser.read_compressed_uint().map_err(|_| error())? as usize;
        let bytes = parser.read_bytes(len).map_err(|_| error())?;

        // An entry is either empty or an even number of UTF-16 bytes plus the flag byte
        if len != 0 && len % 2 != 1 {
            return Err(error());
        }

        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok((U16String::from_vec(units), parser.pos()))
    }

    /// Iterate over all `(offset, string)` entries, skipping the leading empty string
    #[must_use]
    pub fn iter(&self) -> UserStringsIterator<'_> {
        UserStringsIterator {
            strings: self,
            position: 1,
        }
    }
}

impl<'a> IntoIterator for &'a UserStrings {
    type Item = Result<(usize, U16String)>;
    type IntoIter = UserStringsIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`UserStrings`] heap
pub struct UserStringsIterator<'a> {
    strings: &'a UserStrings,
    position: usize,
}

impl Iterator for UserStringsIterator<'_> {
    type Item = Result<(usize, U16String)>;

    fn next(&mut self) -> Option<Self::Item> {
        // Trailing zero padding after the last entry is not an entry
        if self.strings.data[self.position.min(self.strings.data.len())..]
            .iter()
            .all(|b| *b == 0)
        {
            return None;
        }

        let start = self.position;
        match self.strings.entry(start) {
            Ok((string, consumed)) => {
                self.position += consumed;
                Some(Ok((start, string)))
            }
            Err(error) => {
                self.position = self.strings.data.len();
                Some(Err(error))
            }
        }
    }
}
