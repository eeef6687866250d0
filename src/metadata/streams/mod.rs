//! Metadata heaps and the stream directory.
//!
//! The metadata root is followed by a directory of named streams. Four of them are heaps,
//! offset-addressed stores that the tables reference:
//!
//! | Stream     | Type            | Addressed by            | Entry format                         |
//! |------------|-----------------|-------------------------|--------------------------------------|
//! | `#Strings` | [`Strings`]     | byte offset             | NUL-terminated UTF-8                 |
//! | `#Blob`    | [`Blob`]        | byte offset             | compressed length + bytes            |
//! | `#GUID`    | [`Guid`]        | 1-based index           | 16 bytes                             |
//! | `#US`      | [`UserStrings`] | byte offset             | compressed length + UTF-16LE + flag  |
//!
//! [`HeapStore`] bundles all four for an image. A heap that is missing from the image behaves
//! like an empty heap: offset 0 still resolves to the empty value, everything else fails with
//! [`crate::Error::HeapRead`].

use std::fmt;

mod blob;
mod guid;
mod streamheader;
mod strings;
mod userstrings;

pub use blob::{Blob, BlobIterator};
pub use guid::Guid;
pub use streamheader::StreamHeader;
pub use strings::{Strings, StringsIterator};
pub use userstrings::{UserStrings, UserStringsIterator};

use crate::Result;

/// The four kinds of heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapKind {
    /// `#Strings`
    String,
    /// `#Blob`
    Blob,
    /// `#GUID`
    Guid,
    /// `#US`
    UserString,
}

impl HeapKind {
    /// The stream name of this heap
    #[must_use]
    pub fn stream_name(self) -> &'static str {
        match self {
            HeapKind::String => "#Strings",
            HeapKind::Blob => "#Blob",
            HeapKind::Guid => "#GUID",
            HeapKind::UserString => "#US",
        }
    }
}

impl fmt::Display for HeapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stream_name())
    }
}

/// The heaps of one image.
///
/// Heaps the image lacks are empty; looking up offset 0 in them still succeeds, any other
/// offset fails with [`crate::Error::HeapRead`].
///
/// # Reference
/// * ECMA-335 II.24.2.2 - Stream header
#[derive(Debug, Clone, Default)]
pub struct HeapStore {
    pub(crate) strings: Strings,
    pub(crate) blobs: Blob,
    pub(crate) guids: Guid,
    pub(crate) user_strings: UserStrings,
}

impl HeapStore {
    /// Assemble a store from the raw bytes of each heap, `None` for heaps the image lacks
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if one of the heaps is structurally invalid
    pub fn new(
        strings: Option<Vec<u8>>,
        blobs: Option<Vec<u8>>,
        guids: Option<Vec<u8>>,
        user_strings: Option<Vec<u8>>,
    ) -> Result<HeapStore> {
        Ok(HeapStore {
            strings: Strings::from(strings.unwrap_or_default())?,
            blobs: Blob::from(blobs.unwrap_or_default())?,
            guids: Guid::from(guids.unwrap_or_default())?,
            user_strings: UserStrings::from(user_strings.unwrap_or_default())?,
        })
    }

    /// The string at `offset` of `#Strings`
    ///
    /// # Errors
    /// Returns [`crate::Error::HeapRead`] for an invalid offset
    pub fn string_at(&self, offset: u32) -> Result<&str> {
        self.strings.get(offset as usize)
    }

    /// The blob at `offset` of `#Blob`
    ///
    /// # Errors
    /// Returns [`crate::Error::HeapRead`] for an invalid offset
    pub fn blob_at(&self, offset: u32) -> Result<&[u8]> {
        self.blobs.get(offset as usize)
    }

    /// The GUID at the 1-based `index` of `#GUID`
    ///
    /// # Errors
    /// Returns [`crate::Error::HeapRead`] for an invalid index
    pub fn guid_at(&self, index: u32) -> Result<uguid::Guid> {
        self.guids.get(index as usize)
    }

    /// The string literal at `offset` of `#US`, unpaired surrogates are replaced
    ///
    /// # Errors
    /// Returns [`crate::Error::HeapRead`] for an invalid offset
    pub fn user_string_at(&self, offset: u32) -> Result<String> {
        Ok(self.user_strings.get(offset as usize)?.to_string_lossy())
    }

    /// The `#Strings` heap
    #[must_use]
    pub fn strings(&self) -> &Strings {
        &self.strings
    }

    /// The `#Blob` heap
    #[must_use]
    pub fn blobs(&self) -> &Blob {
        &self.blobs
    }

    /// The `#GUID` heap
    #[must_use]
    pub fn guids(&self) -> &Guid {
        &self.guids
    }

    /// The `#US` heap
    #[must_use]
    pub fn user_strings(&self) -> &UserStrings {
        &self.user_strings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_heaps_are_empty() {
        let heaps = HeapStore::new(None, None, None, None).unwrap();

        assert_eq!(heaps.string_at(0).unwrap(), "");
        assert!(heaps.blob_at(0).unwrap().is_empty());
        assert_eq!(heaps.guid_at(0).unwrap(), uguid::Guid::ZERO);
        assert_eq!(heaps.user_string_at(0).unwrap(), "");

        assert!(matches!(
            heaps.string_at(1),
            Err(crate::Error::HeapRead {
                heap: HeapKind::String,
                offset: 1
            })
        ));
        assert!(heaps.blob_at(1).is_err());
        assert!(heaps.guid_at(1).is_err());
        assert!(heaps.user_string_at(1).is_err());
    }

    #[test]
    fn lookups() {
        let heaps = HeapStore::new(
            Some(b"\0Foo\0".to_vec()),
            Some(vec![0x00, 0x02, 0x06, 0x08]),
            Some(vec![0x11; 16]),
            Some(vec![0x00, 0x05, 0x48, 0x00, 0x69, 0x00, 0x00]),
        )
        .unwrap();

        assert_eq!(heaps.string_at(1).unwrap(), "Foo");
        assert_eq!(heaps.blob_at(1).unwrap(), &[0x06, 0x08]);
        assert_eq!(heaps.guid_at(1).unwrap().to_bytes(), [0x11; 16]);
        assert_eq!(heaps.user_string_at(1).unwrap(), "Hi");
        assert_eq!(HeapKind::UserString.to_string(), "#US");
    }
}
