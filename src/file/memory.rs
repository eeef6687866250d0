//! Flat in-memory image.
//!
//! [`Memory`] owns a byte buffer and serves two roles: it is the [`Backend`] behind a
//! [`crate::File`] created with [`crate::File::from_mem`], and it is itself an
//! [`ImageAccessor`] for images that are already laid out flat, where an RVA is simply an
//! offset into the buffer. The latter covers extracted metadata blobs and synthetic images.

use super::{Backend, ImageAccessor};
use crate::{Error, Result};

/// An owned byte buffer, addressed directly by offset
#[derive(Debug, Clone)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Wrap `data`
    #[must_use]
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl ImageAccessor for Memory {
    fn read_bytes(&self, rva: u32, len: u32) -> Result<Vec<u8>> {
        self.data_slice(rva as usize, len as usize)
            .map(<[u8]>::to_vec)
            .map_err(|_| Error::ImageRead { rva, len })
    }

    fn read_ansi_cstr(&self, rva: u32) -> Result<String> {
        super::read_cstr_from(&self.data, rva as usize, rva)
    }
}
