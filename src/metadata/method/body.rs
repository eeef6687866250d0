//! Method body headers (ECMA-335 II.25.4).
//!
//! A body starts with either a one byte tiny header (code size in the upper 6 bits, no locals,
//! max stack 8) or a 12 byte fat header. Fat bodies may be followed by extra data sections,
//! 4-byte aligned after the code, which in practice only ever hold exception clauses.
//!
//! ```text
//! fat header
//! offset  size  field
//! 0       2     flags (low 12 bits) | header size in dwords (high 4 bits)
//! 2       2     max stack
//! 4       4     code size
//! 8       4     local variable signature token, 0 if none
//! ```

use bitflags::bitflags;

use crate::{
    file::{parser::Parser, ImageAccessor},
    metadata::{
        method::{ExceptionHandler, ExceptionHandlerFlags},
        token::Token,
    },
    Error, Result,
};

bitflags! {
    /// Flags of a method body header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodBodyFlags: u16 {
        /// Tiny header format
        const TINY_FORMAT = 0x2;
        /// Fat header format
        const FAT_FORMAT = 0x3;
        /// Extra data sections follow the code
        const MORE_SECTS = 0x8;
        /// Zero-initialize all locals
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    /// Flags of an extra data section
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u8 {
        /// The section holds exception clauses
        const EHTABLE = 0x1;
        /// Reserved
        const OPT_ILTABLE = 0x2;
        /// 24 byte clauses and a 3 byte section size
        const FAT_FORMAT = 0x40;
        /// Another section follows
        const MORE_SECTS = 0x80;
    }
}

const FORMAT_MASK: u8 = 0x03;
const TINY_MAX_STACK: u16 = 8;
const FAT_HEADER_SIZE: usize = 12;
const SMALL_CLAUSE_SIZE: usize = 12;
const FAT_CLAUSE_SIZE: usize = 24;

/// The header format of a method body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFormat {
    /// One byte header
    Tiny,
    /// Twelve byte header, optionally followed by data sections
    Fat,
}

/// A parsed method body header and its exception clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Header format
    pub format: HeaderFormat,
    /// Header flags, the format bits included
    pub flags: MethodBodyFlags,
    /// Size of the header in bytes, where the code starts
    pub size_header: usize,
    /// Size of the code in bytes
    pub size_code: usize,
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// `StandAloneSig` token of the locals, null if there are none
    pub local_var_sig_token: Token,
    /// Exception clauses in declaration order
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// The body of a method without code, e.g. an abstract method or one with RVA 0
    #[must_use]
    pub fn empty() -> MethodBody {
        MethodBody {
            format: HeaderFormat::Tiny,
            flags: MethodBodyFlags::TINY_FORMAT,
            size_header: 0,
            size_code: 0,
            max_stack: 0,
            local_var_sig_token: Token::new(0),
            exception_handlers: Vec::new(),
        }
    }

    /// Parse a body header, with its code and data sections, from the start of `data`
    ///
    /// # Errors
    /// Returns [`Error::MethodBodyTruncated`] if `data` ends before the code or a data section
    /// does, or [`Error::Malformed`] for an unknown header format
    pub fn from(data: &[u8]) -> Result<MethodBody> {
        let mut parser = Parser::new(data);
        Self::parse(&mut parser).map_err(|error| match error {
            Error::OutOfBounds => Error::MethodBodyTruncated {
                offset: u32::try_from(parser.pos()).unwrap_or(u32::MAX),
            },
            error => error,
        })
    }

    fn parse(parser: &mut Parser<'_>) -> Result<MethodBody> {
        let first_byte = parser.peek_byte()?;
        match first_byte & FORMAT_MASK {
            0x2 => {
                parser.advance_by(1)?;
                let size_code = usize::from(first_byte >> 2);
                parser.advance_by(size_code)?;

                Ok(MethodBody {
                    format: HeaderFormat::Tiny,
                    flags: MethodBodyFlags::TINY_FORMAT,
                    size_header: 1,
                    size_code,
                    max_stack: TINY_MAX_STACK,
                    local_var_sig_token: Token::new(0),
                    exception_handlers: Vec::new(),
                })
            }
            0x3 => {
                let flags_and_size = parser.read_le::<u16>()?;
                let max_stack = parser.read_le::<u16>()?;
                let size_code = parser.read_le::<u32>()? as usize;
                let local_var_sig_token = Token::new(parser.read_le::<u32>()?);

                let size_header = usize::from(flags_and_size >> 12) * 4;
                if size_header < FAT_HEADER_SIZE {
                    return Err(malformed_error!(
                        "Fat method header declares {} bytes",
                        size_header
                    ));
                }

                parser.seek(size_header)?;
                parser.advance_by(size_code)?;

                let flags = MethodBodyFlags::from_bits_truncate(flags_and_size & 0x0FFF);
                let exception_handlers = if flags.contains(MethodBodyFlags::MORE_SECTS) {
                    Self::parse_sections(parser)?
                } else {
                    Vec::new()
                };

                Ok(MethodBody {
                    format: HeaderFormat::Fat,
                    flags,
                    size_header,
                    size_code,
                    max_stack,
                    local_var_sig_token,
                    exception_handlers,
                })
            }
            _ => Err(malformed_error!(
                "MethodHeader is neither FAT nor TINY - 0x{:02X}",
                first_byte
            )),
        }
    }

    fn parse_sections(parser: &mut Parser<'_>) -> Result<Vec<ExceptionHandler>> {
        let mut handlers = Vec::new();

        loop {
            parser.align(4)?;
            let section_flags = SectionFlags::from_bits_truncate(parser.read_le::<u8>()?);
            let is_fat = section_flags.contains(SectionFlags::FAT_FORMAT);

            let section_size = if is_fat {
                let low = u32::from(parser.read_le::<u16>()?);
                let high = u32::from(parser.read_le::<u8>()?);
                ((high << 16) | low) as usize
            } else {
                let size = usize::from(parser.read_le::<u8>()?);
                parser.advance_by(2)?;
                size
            };

            if section_size < 4 {
                return Err(malformed_error!(
                    "Method data section of {} bytes is smaller than its header",
                    section_size
                ));
            }

            if section_flags.contains(SectionFlags::EHTABLE) {
                let clause_size = if is_fat {
                    FAT_CLAUSE_SIZE
                } else {
                    SMALL_CLAUSE_SIZE
                };

                for _ in 0..(section_size - 4) / clause_size {
                    handlers.push(if is_fat {
                        ExceptionHandler {
                            flags: ExceptionHandlerFlags::from_bits_truncate(
                                parser.read_le::<u32>()?,
                            ),
                            try_offset: parser.read_le::<u32>()?,
                            try_length: parser.read_le::<u32>()?,
                            handler_offset: parser.read_le::<u32>()?,
                            handler_length: parser.read_le::<u32>()?,
                            class_token_or_filter: parser.read_le::<u32>()?,
                        }
                    } else {
                        ExceptionHandler {
                            flags: ExceptionHandlerFlags::from_bits_truncate(u32::from(
                                parser.read_le::<u16>()?,
                            )),
                            try_offset: u32::from(parser.read_le::<u16>()?),
                            try_length: u32::from(parser.read_le::<u8>()?),
                            handler_offset: u32::from(parser.read_le::<u16>()?),
                            handler_length: u32::from(parser.read_le::<u8>()?),
                            class_token_or_filter: parser.read_le::<u32>()?,
                        }
                    });
                }

                // sizes that are not a multiple of the clause size leave padding behind
                let padding = (section_size - 4) % clause_size;
                parser.advance_by(padding)?;
            } else {
                tracing::warn!(
                    "skipping method data section with flags {:?}",
                    section_flags
                );
                parser.advance_by(section_size - 4)?;
            }

            if !section_flags.contains(SectionFlags::MORE_SECTS) {
                return Ok(handlers);
            }
        }
    }

    /// Read the body at `rva` and return it together with its raw bytes, header included.
    ///
    /// An `rva` of 0 yields [`MethodBody::empty`].
    ///
    /// # Errors
    /// Returns [`Error::ImageRead`] if the body lies outside the image, and the errors of
    /// [`MethodBody::from`]
    pub fn read(accessor: &dyn ImageAccessor, rva: u32) -> Result<(MethodBody, Vec<u8>)> {
        if rva == 0 {
            return Ok((MethodBody::empty(), Vec::new()));
        }

        let len = Self::measure(accessor, rva)?;
        let data = accessor.read_bytes(rva, len)?;
        Ok((MethodBody::from(&data)?, data))
    }

    /// Total length of the body at `rva`, data sections included
    fn measure(accessor: &dyn ImageAccessor, rva: u32) -> Result<u32> {
        let read_at = |offset: u32, len: u32| -> Result<Vec<u8>> {
            let at = rva
                .checked_add(offset)
                .ok_or(Error::ImageRead { rva, len: offset })?;
            accessor.read_bytes(at, len)
        };
        let overflow = || malformed_error!("Method body at RVA 0x{:08X} is too large", rva);

        let first = read_at(0, 1)?;
        let first_byte = first.first().copied().ok_or(Error::ImageRead { rva, len: 1 })?;

        match first_byte & FORMAT_MASK {
            0x2 => Ok(1 + u32::from(first_byte >> 2)),
            0x3 => {
                let header = read_at(0, FAT_HEADER_SIZE as u32)?;
                let flags_and_size = crate::file::io::read_le::<u16>(&header)?;
                let size_code = crate::file::io::read_le::<u32>(&header[4..])?;

                let mut len = (u32::from(flags_and_size >> 12) * 4)
                    .checked_add(size_code)
                    .ok_or_else(overflow)?;

                if MethodBodyFlags::from_bits_truncate(flags_and_size)
                    .contains(MethodBodyFlags::MORE_SECTS)
                {
                    loop {
                        len = len.checked_add(3).ok_or_else(overflow)? & !3;

                        let section = read_at(len, 4)?;
                        let section_flags = SectionFlags::from_bits_truncate(section[0]);
                        let section_size = if section_flags.contains(SectionFlags::FAT_FORMAT) {
                            u32::from_le_bytes([section[1], section[2], section[3], 0])
                        } else {
                            u32::from(section[1])
                        };

                        if section_size < 4 {
                            // MethodBody::from reports this one
                            len = len.checked_add(4).ok_or_else(overflow)?;
                            break;
                        }

                        len = len.checked_add(section_size).ok_or_else(overflow)?;
                        if !section_flags.contains(SectionFlags::MORE_SECTS) {
                            break;
                        }
                    }
                }

                Ok(len)
            }
            _ => Err(malformed_error!(
                "MethodHeader at RVA 0x{:08X} is neither FAT nor TINY - 0x{:02X}",
                rva,
                first_byte
            )),
        }
    }

    /// Total size of header and code
    #[must_use]
    pub fn size(&self) -> usize {
        self.size_header + self.size_code
    }

    /// True for a fat header with the `INIT_LOCALS` flag
    #[must_use]
    pub fn is_init_local(&self) -> bool {
        self.format == HeaderFormat::Fat && self.flags.contains(MethodBodyFlags::INIT_LOCALS)
    }

    /// The code bytes within the raw body `data` this header was parsed from
    ///
    /// # Errors
    /// Returns [`Error::MethodBodyTruncated`] if `data` is shorter than the header declares
    pub fn code<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        data.get(self.size_header..self.size()).ok_or(Error::MethodBodyTruncated {
            offset: u32::try_from(data.len()).unwrap_or(u32::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::Memory, metadata::method::ExceptionClauseKind};

    #[test]
    fn tiny() {
        // ldarg.0, ldfld 0x04000001, ret
        #[rustfmt::skip]
        let data = [
            0x1E,
            0x02, 0x7B, 0x01, 0x00, 0x00, 0x04, 0x2A,
        ];

        let body = MethodBody::from(&data).unwrap();
        assert_eq!(body.format, HeaderFormat::Tiny);
        assert_eq!(body.size_code, 7);
        assert_eq!(body.size_header, 1);
        assert_eq!(body.size(), 8);
        assert_eq!(body.max_stack, 8);
        assert!(body.local_var_sig_token.is_null());
        assert!(!body.is_init_local());
        assert_eq!(body.code(&data).unwrap(), &data[1..]);
    }

    #[test]
    fn fat_small_section() {
        #[rustfmt::skip]
        let data = [
            0x1B, 0x30, 0x02, 0x00,
            0x04, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x11,
            0x00, 0x00, 0x00, 0x2A,

            0x01, 0x10, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
        ];

        let body = MethodBody::from(&data).unwrap();
        assert_eq!(body.format, HeaderFormat::Fat);
        assert!(body.is_init_local());
        assert_eq!(body.max_stack, 2);
        assert_eq!(body.size_header, 12);
        assert_eq!(body.size_code, 4);
        assert_eq!(body.local_var_sig_token, Token::new(0x1100_0001));
        assert_eq!(body.code(&data).unwrap(), &[0x00, 0x00, 0x00, 0x2A]);

        assert_eq!(body.exception_handlers.len(), 1);
        let handler = &body.exception_handlers[0];
        assert_eq!(handler.kind(), ExceptionClauseKind::Finally);
        assert_eq!(handler.try_offset, 0);
        assert_eq!(handler.try_length, 1);
        assert_eq!(handler.handler_offset, 1);
        assert_eq!(handler.handler_length, 2);
        assert!(handler.protects(0));
        assert!(!handler.protects(1));
        assert_eq!(handler.class_token(), None);
    }

    #[test]
    fn fat_fat_section() {
        #[rustfmt::skip]
        let data = [
            0x1B, 0x30, 0x01, 0x00,
            0x06, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0xDE, 0x00, 0x00, 0x2A,
            0x00, 0x00,

            0x41, 0x1C, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x01,
        ];

        let body = MethodBody::from(&data).unwrap();
        assert_eq!(body.size(), 18);
        assert_eq!(body.exception_handlers.len(), 1);

        let handler = &body.exception_handlers[0];
        assert_eq!(handler.kind(), ExceptionClauseKind::Catch);
        assert_eq!(handler.try_length, 4);
        assert_eq!(handler.handler_offset, 4);
        assert_eq!(handler.class_token(), Some(Token::new(0x0100_0001)));
        assert_eq!(handler.filter_offset(), None);
    }

    #[test]
    fn read_through_accessor() {
        let mut image = vec![0xCC; 8];
        #[rustfmt::skip]
        image.extend_from_slice(&[
            0x1B, 0x30, 0x02, 0x00,
            0x04, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x2A,

            0x01, 0x10, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
        ]);
        image.extend_from_slice(&[0xCC; 8]);
        let memory = Memory::new(image);

        let (body, data) = MethodBody::read(&memory, 8).unwrap();
        assert_eq!(data.len(), 32);
        assert_eq!(body.exception_handlers.len(), 1);

        let (empty, data) = MethodBody::read(&memory, 0).unwrap();
        assert_eq!(empty, MethodBody::empty());
        assert!(data.is_empty());

        if MethodBody::read(&memory, 0x1000).is_ok() {
            panic!("This should not be valid!")
        }
    }

    #[test]
    fn crafted_invalid() {
        // tiny header claims 7 bytes of code
        assert!(matches!(
            MethodBody::from(&[0x1E, 0x00, 0x2A]),
            Err(Error::MethodBodyTruncated { .. })
        ));

        // fat header cut short
        assert!(matches!(
            MethodBody::from(&[0x03, 0x30, 0x08, 0x00, 0x10]),
            Err(Error::MethodBodyTruncated { .. })
        ));

        // neither tiny nor fat
        if MethodBody::from(&[0x01, 0x00]).is_ok() {
            panic!("This should not be valid!")
        }

        // fat header smaller than 12 bytes
        #[rustfmt::skip]
        let small = [
            0x03, 0x20, 0x08, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];
        if MethodBody::from(&small).is_ok() {
            panic!("This should not be valid!")
        }

        if MethodBody::from(&[]).is_ok() {
            panic!("This should not be valid!")
        }
    }
}
