//! The CLR runtime header (ECMA-335 II.25.3.3), found through the PE data directory 14.
//!
//! It is the entry point into everything managed: the location of the metadata root, the
//! managed resources and the strong name signature, and the token of the entry point method.

use bitflags::bitflags;

use crate::{
    file::{parser::Parser, ImageStruct},
    metadata::token::Token,
    Result,
};

bitflags! {
    /// Runtime flags of an image (`COMIMAGE_FLAGS_*`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ComImageFlags: u32 {
        /// The image contains only IL code
        const IL_ONLY = 0x0000_0001;
        /// The image can only be loaded into a 32-bit process
        const REQUIRED_32BIT = 0x0000_0002;
        /// The image is a library of IL only, not executable
        const IL_LIBRARY = 0x0000_0004;
        /// The image is signed with a strong name
        const STRONG_NAME_SIGNED = 0x0000_0008;
        /// The entry point is an RVA to a native function, not a method token
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// The debugger should track this image
        const TRACK_DEBUG_DATA = 0x0001_0000;
        /// The image prefers to run as a 32-bit process
        const PREFER_32BIT = 0x0002_0000;
    }
}

/// An `(rva, size)` pair pointing at a region of the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RvaRange {
    /// Start of the region
    pub rva: u32,
    /// Size of the region in bytes
    pub size: u32,
}

impl RvaRange {
    fn read(parser: &mut Parser<'_>) -> Result<RvaRange> {
        Ok(RvaRange {
            rva: parser.read_le::<u32>()?,
            size: parser.read_le::<u32>()?,
        })
    }

    /// True if the pair does not point anywhere
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rva == 0 || self.size == 0
    }
}

/// The parsed `IMAGE_COR20_HEADER`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of the header, 72
    pub cb: u32,
    /// Major version of the runtime required to run this image
    pub major_runtime_version: u16,
    /// Minor version of the runtime required to run this image
    pub minor_runtime_version: u16,
    /// Location of the metadata root
    pub metadata: RvaRange,
    /// Runtime flags
    pub flags: ComImageFlags,
    /// Entry point method token, or a native RVA with [`ComImageFlags::NATIVE_ENTRYPOINT`]
    pub entry_point: Token,
    /// Managed resources
    pub resources: RvaRange,
    /// Strong name signature hash
    pub strong_name_signature: RvaRange,
    /// Reserved, always empty
    pub code_manager_table: RvaRange,
    /// VTable fixups for mixed-mode images
    pub vtable_fixups: RvaRange,
    /// Reserved, always empty
    pub export_address_table_jumps: RvaRange,
    /// Precompiled image information, only set for ngen images
    pub managed_native_header: RvaRange,
}

impl ImageStruct for Cor20Header {
    const SIZE: usize = 72;

    /// Parse the header from `data`
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too short, or
    /// [`crate::Error::Malformed`] if the size field is wrong or there is no metadata
    fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < Self::SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb as usize != Self::SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected {}, got {}",
                Self::SIZE,
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let metadata = RvaRange::read(&mut parser)?;
        if metadata.is_empty() {
            return Err(malformed_error!("CLR header has no metadata"));
        }

        let flags = ComImageFlags::from_bits_retain(parser.read_le::<u32>()?);
        let entry_point = Token::new(parser.read_le::<u32>()?);

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            metadata,
            flags,
            entry_point,
            resources: RvaRange::read(&mut parser)?,
            strong_name_signature: RvaRange::read(&mut parser)?,
            code_manager_table: RvaRange::read(&mut parser)?,
            vtable_fixups: RvaRange::read(&mut parser)?,
            export_address_table_jumps: RvaRange::read(&mut parser)?,
            managed_native_header: RvaRange::read(&mut parser)?,
        })
    }
}
