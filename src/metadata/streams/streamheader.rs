use crate::{file::io::read_le, Result};

/// Longest stream name including its terminator
const MAX_NAME_LEN: usize = 32;

/// An entry of the stream directory that follows the metadata root (ECMA-335 II.24.2.2).
///
/// ```text
/// offset  u32   offset of the stream, relative to the metadata root
/// size    u32   size of the stream in bytes
/// name    char  NUL-terminated ASCII, padded to the next 4 byte boundary, at most 32 bytes
/// ```
///
/// Any name is accepted here; deciding which streams are recognised is left to the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream data, relative to the start of the metadata root
    pub offset: u32,
    /// Size of the stream data in bytes
    pub size: u32,
    /// Name of the stream, e.g. `#Strings` or `#~`
    pub name: String,
}

impl StreamHeader {
    /// Parse a stream header from the start of `data`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too short, or
    /// [`crate::Error::Malformed`] if the name is not terminated within 32 bytes
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let name_area = &data[8..data.len().min(8 + MAX_NAME_LEN)];
        let Some(name_len) = name_area.iter().position(|&b| b == 0) else {
            return Err(malformed_error!("Stream header name is not terminated"));
        };

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name: name_area[..name_len].iter().map(|&b| char::from(b)).collect(),
        })
    }

    /// Number of bytes this header occupies in the stream directory
    #[must_use]
    pub fn header_size(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}
