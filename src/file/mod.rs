//! Access to the raw bytes of a binary image.
//!
//! The metadata loader never deals with file offsets or section tables itself. Everything it
//! needs is expressed through the [`ImageAccessor`] trait: read `len` bytes at a relative
//! virtual address, read a fixed-layout structure, or read a NUL-terminated ANSI string. Two
//! accessors ship with the crate:
//!
//! - [`File`] - a PE image parsed with `goblin`, translating RVAs through its section table.
//!   It is backed either by a memory mapping ([`File::from_file`]) or by an owned buffer
//!   ([`File::from_mem`]).
//! - [`Memory`] - a flat buffer in which an RVA is a plain offset. Useful for metadata that has
//!   already been extracted from its container, or for images that are mapped as loaded.
//!
//! # Examples
//!
//! ```rust,no_run
//! use clrscope::{File, ImageAccessor};
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("tests/samples/assembly.dll"))?;
//! let (clr_rva, clr_size) = file.clr()?;
//! let header = file.read_bytes(clr_rva, clr_size)?;
//! println!("CLR header is {} bytes", header.len());
//! # Ok::<(), clrscope::Error>(())
//! ```
//!
//! # References
//!
//! - Microsoft PE/COFF Specification
//! - ECMA-335 6th Edition, Partition II - PE File Format

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::{section_table::SectionTable, PE};
use ouroboros::self_referencing;
use physical::Physical;

pub use memory::Memory;

/// Source of the bytes behind a [`File`]. Implementations must be safe for concurrent reads.
pub trait Backend: Send + Sync {
    /// The entire data buffer
    fn data(&self) -> &[u8];

    /// Total length of the data buffer
    fn len(&self) -> usize {
        self.data().len()
    }

    /// True if the buffer holds no data
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounds-checked slice of the buffer
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the requested range exceeds the buffer
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        self.data()
            .get(offset..offset_end)
            .ok_or(out_of_bounds_error!())
    }
}

/// A fixed-layout structure that can be read from an image with [`ImageAccessor::read_struct`]
pub trait ImageStruct: Sized {
    /// Size of the structure in bytes
    const SIZE: usize;

    /// Decode the structure from exactly [`ImageStruct::SIZE`] bytes
    ///
    /// # Errors
    /// Returns an error if the bytes do not form a valid structure
    fn read(data: &[u8]) -> Result<Self>;
}

/// Random access to a binary image by relative virtual address.
///
/// All addresses are RVAs in a flat readable address space. How an RVA maps onto the backing
/// storage is entirely up to the implementation; the metadata loader only ever asks for byte
/// ranges.
///
/// Implementations must be safe for concurrent reads, a loaded
/// [`crate::metadata::image::MetadataImage`] may be shared between threads.
pub trait ImageAccessor: Send + Sync {
    /// Read `len` bytes starting at `rva`
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageRead`] if the range is not backed by image data
    fn read_bytes(&self, rva: u32, len: u32) -> Result<Vec<u8>>;

    /// Read a NUL-terminated ANSI string starting at `rva`
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageRead`] if `rva` is not backed by image data
    fn read_ansi_cstr(&self, rva: u32) -> Result<String>;

    /// Read a fixed-layout structure starting at `rva`
    ///
    /// # Errors
    /// Returns [`crate::Error::ImageRead`] if the range is not backed by image data, or the
    /// error of [`ImageStruct::read`]
    fn read_struct<T: ImageStruct>(&self, rva: u32) -> Result<T>
    where
        Self: Sized,
    {
        let Ok(len) = u32::try_from(T::SIZE) else {
            return Err(crate::Error::ImageRead { rva, len: u32::MAX });
        };

        T::read(&self.read_bytes(rva, len)?)
    }
}

/// Read a NUL-terminated string at `offset` of `data`, mapping every byte to its Latin-1 char.
/// A string that runs to the end of `data` is accepted.
fn read_cstr_from(data: &[u8], offset: usize, rva: u32) -> Result<String> {
    let Some(rest) = data.get(offset..) else {
        return Err(crate::Error::ImageRead { rva, len: 1 });
    };

    let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    if len == 0 && rest.is_empty() {
        return Err(crate::Error::ImageRead { rva, len: 1 });
    }

    Ok(rest[..len].iter().map(|&b| char::from(b)).collect())
}

#[self_referencing]
/// A PE image containing a CLR runtime header.
///
/// The parsed `goblin` view borrows from the backing buffer, both are owned together. Loading
/// fails if the image has no optional header or no CLR runtime header data directory.
///
/// # Examples
///
/// ```rust,no_run
/// use clrscope::File;
///
/// let data = std::fs::read("tests/samples/assembly.dll")?;
/// let file = File::from_mem(data)?;
///
/// for section in file.sections() {
///     println!("{:?} at RVA 0x{:x}", section.name(), section.virtual_address);
/// }
/// # Ok::<(), clrscope::Error>(())
/// ```
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed PE structure, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Map the file at `file` and parse it
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file can not be read,
    /// [`crate::Error::Empty`] for an empty file, and [`crate::Error::GoblinErr`] or
    /// [`crate::Error::Malformed`] if it is not a PE image with a CLR header
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Parse an image from an owned buffer
    ///
    /// # Errors
    /// See [`File::from_file`]
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.is_empty() {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| {
            let data = data.as_ref();
            match PE::parse(data.data()) {
                Ok(pe) => match pe.header.optional_header {
                    Some(optional_header) => {
                        if optional_header
                            .data_directories
                            .get_clr_runtime_header()
                            .is_none()
                        {
                            Err(malformed_error!(
                                "File does not have a CLR runtime header directory"
                            ))
                        } else {
                            Ok(pe)
                        }
                    }
                    None => Err(malformed_error!("File does not have an OptionalHeader")),
                },
                Err(error) => Err(GoblinErr(error)),
            }
        })
    }

    /// Total size of the loaded image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.with_data(|data| data.len())
    }

    /// True if the image has a length of zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The preferred load address of the image
    #[must_use]
    pub fn imagebase(&self) -> u64 {
        self.with_pe(|pe| pe.image_base)
    }

    /// The raw bytes of the image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// RVA and size of the CLR runtime header
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the directory is missing
    pub fn clr(&self) -> Result<(u32, u32)> {
        self.with_pe(|pe| {
            let Some(optional_header) = pe.header.optional_header.as_ref() else {
                return Err(malformed_error!("File does not have an OptionalHeader"));
            };

            let clr_dir = optional_header
                .data_directories
                .get_clr_runtime_header()
                .as_ref()
                .map(|dir| (dir.virtual_address, dir.size));

            match clr_dir {
                Some(dir) => Ok(dir),
                None => Err(malformed_error!("CLR runtime header directory is missing")),
            }
        })
    }

    /// The section headers of the image
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.with_pe(|pe| pe.sections.iter())
    }

    /// Translate an RVA into a file offset through the section table
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains `rva`
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        self.with_pe(|pe| {
            for section in &pe.sections {
                let extent = section.virtual_size.max(section.size_of_raw_data);
                let Some(section_max) = section.virtual_address.checked_add(extent) else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        extent
                    ));
                };

                if section.virtual_address <= rva && section_max > rva {
                    return Ok((rva - section.virtual_address) as usize
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - 0x{:X}",
                rva
            ))
        })
    }
}

impl ImageAccessor for File {
    fn read_bytes(&self, rva: u32, len: u32) -> Result<Vec<u8>> {
        let offset = self
            .rva_to_offset(rva)
            .map_err(|_| crate::Error::ImageRead { rva, len })?;

        self.with_data(|data| {
            data.data_slice(offset, len as usize)
                .map(<[u8]>::to_vec)
                .map_err(|_| crate::Error::ImageRead { rva, len })
        })
    }

    fn read_ansi_cstr(&self, rva: u32) -> Result<String> {
        let offset = self
            .rva_to_offset(rva)
            .map_err(|_| crate::Error::ImageRead { rva, len: 1 })?;

        self.with_data(|data| read_cstr_from(data.data(), offset, rva))
    }
}
