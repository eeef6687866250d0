//! The `#Blob` heap (ECMA-335 II.24.2.4).
//!
//! Binary entries, each prefixed by its length as a compressed unsigned integer. Offset 0
//! holds the empty blob. Signatures, constant values, custom attribute values, public keys and
//! marshalling descriptors are all stored here.
//!
//! ```text
//! 0x00                 <- offset 0, empty blob
//! 0x03 0x20 0x00 0x01  <- offset 1, 3 bytes: method signature `instance void ()`
//! ```

use crate::{file::parser::Parser, metadata::streams::HeapKind, Error, Result};

/// The `#Blob` heap
///
/// # Examples
///
/// ```rust
/// use clrscope::metadata::streams::Blob;
///
/// let heap = Blob::from(vec![0x00, 0x03, 0x20, 0x00, 0x01])?;
/// assert_eq!(heap.get(1)?, &[0x20, 0x00, 0x01]);
/// assert!(heap.get(0)?.is_empty());
/// # Ok::<(), clrscope::Error>(())
/// ```
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.4
#[derive(Debug, Clone, Default)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    /// Take ownership of the raw heap bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a non-empty heap does not start with a NUL byte
    pub fn from(data: Vec<u8>) -> Result<Blob> {
        if data.first().is_some_and(|first| *first != 0) {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Size of the heap in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the image carries no `#Blob` heap
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The blob starting at `offset`, without its length prefix
    ///
    /// # Arguments
    /// * 'offset' - Byte offset of the length prefix, as stored in a table column
    ///
    /// # Errors
    /// Returns [`crate::Error::HeapRead`] if the prefix or the payload exceed the heap
    pub fn get(&self, offset: usize) -> Result<&[u8]> {
        self.entry(offset).map(|(data, _)| data)
    }

    /// Payload at `offset` and the total size of the entry including its prefix
    fn entry(&self, offset: usize) -> Result<(&[u8], usize)> {
        if offset == 0 {
            return Ok((&[], 1));
        }

        let error = || Error::HeapRead {
            heap: HeapKind::Blob,
            offset,
        };

        let rest = self.data.get(offset..).ok_or_else(error)?;
        let mut parser = Parser::new(rest);
        let len = parser.read_compressed_uint().map_err(|_| error())? as usize;
        let payload = parser.read_bytes(len).map_err(|_| error())?;

        Ok((payload, parser.pos()))
    }

    /// Iterate over all `(offset, blob)` entries, skipping the leading empty blob
    #[must_use]
    pub fn iter(&self) -> BlobIterator<'_> {
        BlobIterator {
            blob: self,
            position: 1,
        }
    }
}

impl<'a> IntoIterator for &'a Blob {
    type Item = Result<(usize, &'a [u8])>;
    type IntoIter = BlobIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`Blob`] heap
pub struct BlobIterator<'a> {
    blob: &'a Blob,
    position: usize,
}

impl<'a> Iterator for BlobIterator<'a> {
    type Item = Result<(usize, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.blob.data.len() {
            return None;
        }

        let start = self.position;
        match self.blob.entry(start) {
            Ok((data, consumed)) => {
                self.position += consumed;
                Some(Ok((start, data)))
            }
            Err(error) => {
                self.position = self.blob.data.len();
                Some(Err(error))
            }
        }
    }
}
