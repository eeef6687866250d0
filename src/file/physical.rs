//! Memory-mapped file backend.
//!
//! [`Physical`] maps an image from disk with `memmap2`, so that only the pages the metadata
//! loader actually touches get paged in. The mapping is read-only and shared, which makes the
//! backend safe for concurrent readers.

use super::Backend;
use crate::Result;

use memmap2::Mmap;
use std::{fs, path::Path};

/// A read-only memory mapping of a file on disk
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Open and map the file at `path`
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can not be opened or mapped
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;

        // The mapping is read-only, concurrent modification of the file on disk is the
        // caller's responsibility.
        let mmap = unsafe { Mmap::map(&file) }?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}
