//! The metadata root (ECMA-335 II.24.2.1).
//!
//! ```text
//! offset  size  field
//! 0       4     signature, 0x424A5342 ("BSJB")
//! 4       2     major version, 1
//! 6       2     minor version, 1
//! 8       4     reserved, 0
//! 12      4     length of the version string, padded to a multiple of 4
//! 16      n     version string, NUL-terminated UTF-8, e.g. "v4.0.30319"
//! 16+n    2     flags, 0
//! 18+n    2     number of streams
//! 20+n          stream headers
//! ```

use crate::{
    file::{io::read_le, parser::Parser},
    metadata::streams::StreamHeader,
    Result,
};

/// Magic number of the metadata root
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The parsed metadata root and its stream directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Always [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version of the metadata format
    pub major_version: u16,
    /// Minor version of the metadata format
    pub minor_version: u16,
    /// Reserved
    pub reserved: u32,
    /// Size of the padded version string area
    pub length: u32,
    /// The runtime version the image was built for, without padding
    pub version: String,
    /// Reserved
    pub flags: u16,
    /// The stream directory, in file order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the root from the start of the metadata blob. All streams must lie within `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is truncated, or
    /// [`crate::Error::Malformed`] for a bad signature, an empty stream directory or a stream
    /// outside the metadata
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(out_of_bounds_error!());
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "Metadata signature does not match - {:#010x}",
                signature
            ));
        }

        let mut parser = Parser::new(data);
        parser.seek(4)?;

        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let reserved = parser.read_le::<u32>()?;
        let length = parser.read_le::<u32>()?;

        let version_area = parser.read_bytes(length as usize)?;
        let version_end = version_area
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(version_area.len());
        let version = String::from_utf8_lossy(&version_area[..version_end]).into_owned();

        // The length is supposed to be padded already, tolerate images where it is not
        parser.align(4)?;

        let flags = parser.read_le::<u16>()?;
        let stream_count = parser.read_le::<u16>()?;
        if stream_count == 0 {
            return Err(malformed_error!("Metadata root declares no streams"));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count));
        for _ in 0..stream_count {
            let header = StreamHeader::from(&data[parser.pos()..])?;
            parser.advance_by(header.header_size())?;

            let end = u64::from(header.offset) + u64::from(header.size);
            if end > data.len() as u64 {
                return Err(malformed_error!(
                    "Stream {} ({:#x} + {:#x}) exceeds the metadata ({:#x} bytes)",
                    header.name,
                    header.offset,
                    header.size,
                    data.len()
                ));
            }

            tracing::trace!(
                "stream {} at {:#x}, {} bytes",
                header.name,
                header.offset,
                header.size
            );
            stream_headers.push(header);
        }

        Ok(Root {
            signature,
            major_version,
            minor_version,
            reserved,
            length,
            version,
            flags,
            stream_headers,
        })
    }

    /// The first stream header called `name`
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }
}
