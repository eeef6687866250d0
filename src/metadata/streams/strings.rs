//! The `#Strings` heap (ECMA-335 II.24.2.3).
//!
//! A sequence of NUL-terminated UTF-8 strings addressed by byte offset. The heap starts with
//! a single NUL byte, so offset 0 always denotes the empty string. Table columns referencing
//! this heap store such offsets (identifiers, namespaces, culture names).
//!
//! # Example
//!
//! ```rust
//! use clrscope::metadata::streams::Strings;
//!
//! let heap = Strings::from(b"\0<Module>\0System\0".to_vec())?;
//! assert_eq!(heap.get(1)?, "<Module>");
//! assert_eq!(heap.get(10)?, "System");
//! assert_eq!(heap.get(0)?, "");
//! # Ok::<(), clrscope::Error>(())
//! ```

use crate::{metadata::streams::HeapKind, Error, Result};

/// The `#Strings` heap, identifiers referenced by name columns of the metadata tables
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.3
#[derive(Debug, Clone, Default)]
pub struct Strings {
    data: Vec<u8>,
}

impl Strings {
    /// Take ownership of the raw heap bytes
    ///
    /// # Arguments
    /// * 'data' - The content of the `#Strings` stream, empty if the image has none
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a non-empty heap does not start with a NUL byte
    pub fn from(data: Vec<u8>) -> Result<Strings> {
        if data.first().is_some_and(|first| *first != 0) {
            return Err(malformed_error!("#Strings heap does not start with a NUL byte"));
        }

        Ok(Strings { data })
    }

    /// Size of the heap in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the image carries no `#Strings` heap
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The string starting at `offset`
    ///
    /// # Arguments
    /// * 'offset' - Byte offset into the heap, as stored in a table column
    ///
    /// # Errors
    /// Returns [`crate::Error::HeapRead`] if `offset` lies outside the heap, the string is not
    /// terminated, or it is not valid UTF-8
    pub fn get(&self, offset: usize) -> Result<&str> {
        if offset == 0 {
            return Ok("");
        }

        let error = || Error::HeapRead {
            heap: HeapKind::String,
            offset,
        };

        let rest = self.data.get(offset..).ok_or_else(error)?;
        let len = rest.iter().position(|&b| b == 0).ok_or_else(error)?;

        std::str::from_utf8(&rest[..len]).map_err(|_| error())
    }

    /// Iterate over all `(offset, string)` entries, skipping the leading empty string
    #[must_use]
    pub fn iter(&self) -> StringsIterator<'_> {
        StringsIterator {
            strings: self,
            position: 1,
        }
    }
}

impl<'a> IntoIterator for &'a Strings {
    type Item = Result<(usize, &'a str)>;
    type IntoIter = StringsIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`Strings`] heap
pub struct StringsIterator<'a> {
    strings: &'a Strings,
    position: usize,
}

impl<'a> Iterator for StringsIterator<'a> {
    type Item = Result<(usize, &'a str)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.strings.data.len() {
            return None;
        }

        let start = self.position;
        match self.strings.get(start) {
            Ok(string) => {
                self.position += string.len() + 1;
                Some(Ok((start, string)))
            }
            Err(error) => {
                self.position = self.strings.data.len();
                Some(Err(error))
            }
        }
    }
}
