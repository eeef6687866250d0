//! The `#GUID` heap (ECMA-335 II.24.2.5).
//!
//! A packed array of 16-byte GUIDs. Unlike the other heaps it is addressed by a 1-based
//! index rather than a byte offset: index `n` refers to bytes `[(n-1)*16, n*16)`. Index 0
//! denotes the all-zero GUID.

use crate::{metadata::streams::HeapKind, Error, Result};

/// The `#GUID` heap
///
/// # Examples
///
/// ```rust
/// use clrscope::metadata::streams::Guid;
///
/// let heap = Guid::from(vec![0xAB; 32])?;
/// assert_eq!(heap.len(), 2);
/// assert_eq!(heap.get(2)?.to_bytes(), [0xAB; 16]);
/// assert_eq!(heap.get(0)?, uguid::Guid::ZERO);
/// assert!(heap.get(3).is_err());
/// # Ok::<(), clrscope::Error>(())
/// ```
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.5
#[derive(Debug, Clone, Default)]
pub struct Guid {
    data: Vec<u8>,
}

impl Guid {
    /// Take ownership of the raw heap bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap size is not a multiple of 16
    pub fn from(data: Vec<u8>) -> Result<Guid> {
        if data.len() % 16 != 0 {
            return Err(malformed_error!(
                "#GUID heap size {} is not a multiple of 16",
                data.len()
            ));
        }

        Ok(Guid { data })
    }

    /// Number of GUIDs in the heap
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / 16
    }

    /// True if the heap holds no GUIDs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The GUID at the 1-based `index`
    ///
    /// # Arguments
    /// * 'index' - 1-based GUID number, 0 for the all-zero GUID
    ///
    /// # Errors
    /// Returns [`crate::Error::HeapRead`] if `index` exceeds the heap
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index == 0 {
            return Ok(uguid::Guid::ZERO);
        }

        let start = (index - 1) * 16;
        let Some(bytes) = self.data.get(start..start + 16) else {
            return Err(Error::HeapRead {
                heap: HeapKind::Guid,
                offset: index,
            });
        };

        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(bytes);
        Ok(uguid::Guid::from_bytes(buffer))
    }

    /// Iterate over all `(index, guid)` entries
    pub fn iter(&self) -> impl Iterator<Item = (usize, uguid::Guid)> + '_ {
        self.data.chunks_exact(16).enumerate().map(|(i, chunk)| {
            let mut buffer = [0u8; 16];
            buffer.copy_from_slice(chunk);
            (i + 1, uguid::Guid::from_bytes(buffer))
        })
    }
}
