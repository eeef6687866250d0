//! CIL instruction decoding.
//!
//! Decoding is linear: every byte of the code is consumed by exactly one instruction and an
//! unknown opcode stops the stream, since skipping it would desynchronize everything after.
//! Operands that refer to metadata are passed through an [`OperandResolver`]; the unit
//! resolver `()` leaves them raw.
//!
//! ```rust
//! use clrscope::disassembler::{Instructions, Operand};
//!
//! // br.s +2, nop, nop, ret
//! let code = [0x2B, 0x02, 0x00, 0x00, 0x2A];
//! let instructions = Instructions::new(&code, &()).collect::<Result<Vec<_>, _>>()?;
//!
//! assert_eq!(instructions.len(), 4);
//! assert_eq!(instructions[0].operand, Operand::BranchTargets(vec![4]));
//! # Ok::<(), clrscope::Error>(())
//! ```

use std::iter::FusedIterator;

use crate::{
    disassembler::{lookup, ArgumentRef, Instruction, Operand, OperandType, TWO_BYTE_PREFIX},
    file::parser::Parser,
    metadata::token::Token,
    Error, Result,
};

/// Turns raw operands into metadata aware ones.
///
/// The default methods leave everything unresolved.
pub trait OperandResolver {
    /// Check a metadata token operand
    ///
    /// # Errors
    /// Implementations return an error for tokens that do not address an existing row
    fn token(&self, token: Token) -> Result<Token> {
        Ok(token)
    }

    /// The literal behind an `ldstr` token, `None` to keep the raw token
    ///
    /// # Errors
    /// Implementations return [`Error::HeapRead`] for an invalid offset
    fn user_string(&self, _token: Token) -> Result<Option<String>> {
        Ok(None)
    }

    /// Describe the argument slot `index`
    ///
    /// # Errors
    /// Implementations may reject indices the method does not have
    fn argument(&self, index: u16) -> Result<ArgumentRef> {
        Ok(ArgumentRef::unresolved(index))
    }
}

impl OperandResolver for () {}

fn code_offset(position: usize) -> u32 {
    u32::try_from(position).unwrap_or(u32::MAX)
}

fn branch_target(next: u32, displacement: i32, offset: u32) -> Result<u32> {
    let target = i64::from(next) + i64::from(displacement);
    u32::try_from(target).map_err(|_| {
        malformed_error!(
            "Branch at IL_{:04x} targets {} which is outside the method",
            offset,
            target
        )
    })
}

/// Decode the instruction at the cursor of `parser`, advancing past it.
///
/// Offsets are relative to the start of the parser's buffer, which is expected to hold the
/// method's code without its header.
///
/// # Errors
/// Returns [`Error::UnsupportedOpcode`] for an unassigned opcode,
/// [`Error::MethodBodyTruncated`] if the code ends within the instruction, and the errors of
/// `resolver`
pub fn decode_instruction<R>(parser: &mut Parser<'_>, resolver: &R) -> Result<Instruction>
where
    R: OperandResolver + ?Sized,
{
    let offset = code_offset(parser.pos());
    decode(parser, resolver, offset).map_err(|error| match error {
        Error::OutOfBounds => Error::MethodBodyTruncated {
            offset: code_offset(parser.pos()),
        },
        error => error,
    })
}

fn decode<R>(parser: &mut Parser<'_>, resolver: &R, offset: u32) -> Result<Instruction>
where
    R: OperandResolver + ?Sized,
{
    let first_byte = parser.read_le::<u8>()?;
    let opcode = if first_byte == TWO_BYTE_PREFIX {
        u16::from_be_bytes([TWO_BYTE_PREFIX, parser.read_le::<u8>()?])
    } else {
        u16::from(first_byte)
    };

    let Some(info) = lookup(opcode) else {
        return Err(Error::UnsupportedOpcode { offset, opcode });
    };

    let operand = match info.operand {
        OperandType::None => Operand::None,
        OperandType::ShortBranch => {
            let displacement = i32::from(parser.read_le::<i8>()?);
            let next = code_offset(parser.pos());
            Operand::BranchTargets(vec![branch_target(next, displacement, offset)?])
        }
        OperandType::Branch => {
            let displacement = parser.read_le::<i32>()?;
            let next = code_offset(parser.pos());
            Operand::BranchTargets(vec![branch_target(next, displacement, offset)?])
        }
        OperandType::Switch => {
            let count = parser.read_le::<u32>()? as usize;
            let table_size = count.checked_mul(4).ok_or(out_of_bounds_error!())?;
            if table_size > parser.remaining() {
                return Err(out_of_bounds_error!());
            }

            let next = code_offset(parser.pos() + table_size);
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                targets.push(branch_target(next, parser.read_le::<i32>()?, offset)?);
            }
            Operand::BranchTargets(targets)
        }
        OperandType::Token => Operand::Token(resolver.token(Token::new(parser.read_le()?))?),
        OperandType::String => {
            let token = Token::new(parser.read_le::<u32>()?);
            match resolver.user_string(token)? {
                Some(literal) => Operand::String(literal),
                None => Operand::Token(token),
            }
        }
        OperandType::Int8 => Operand::Int8(parser.read_le::<i8>()?),
        OperandType::UInt8 => Operand::UInt8(parser.read_le::<u8>()?),
        OperandType::Int32 => Operand::Int32(parser.read_le::<i32>()?),
        OperandType::Int64 => Operand::Int64(parser.read_le::<i64>()?),
        OperandType::Float32 => Operand::Float32(parser.read_le::<f32>()?),
        OperandType::Float64 => Operand::Float64(parser.read_le::<f64>()?),
        OperandType::ShortLocal => Operand::Local(u16::from(parser.read_le::<u8>()?)),
        OperandType::Local => Operand::Local(parser.read_le::<u16>()?),
        OperandType::ImplicitLocal(index) => Operand::Local(u16::from(index)),
        OperandType::ShortArgument => {
            Operand::Argument(resolver.argument(u16::from(parser.read_le::<u8>()?))?)
        }
        OperandType::Argument => Operand::Argument(resolver.argument(parser.read_le::<u16>()?)?),
        OperandType::ImplicitArgument(index) => {
            Operand::Argument(resolver.argument(u16::from(index))?)
        }
    };

    Ok(Instruction {
        offset,
        opcode,
        mnemonic: info.name,
        size: code_offset(parser.pos()) - offset,
        flow_type: info.flow,
        operand,
    })
}

/// Lazy instruction stream over a method's code.
///
/// The stream ends after the last instruction or after the first error. Creating a new
/// `Instructions` over the same code starts from the beginning again.
pub struct Instructions<'a, R: ?Sized> {
    parser: Parser<'a>,
    resolver: &'a R,
    failed: bool,
}

impl<'a, R: OperandResolver + ?Sized> Instructions<'a, R> {
    /// Decode `code` with `resolver`
    #[must_use]
    pub fn new(code: &'a [u8], resolver: &'a R) -> Self {
        Instructions {
            parser: Parser::new(code),
            resolver,
            failed: false,
        }
    }
}

impl<R: OperandResolver + ?Sized> Iterator for Instructions<'_, R> {
    type Item = Result<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.parser.has_more_data() {
            return None;
        }

        let result = decode_instruction(&mut self.parser, self.resolver);
        self.failed = result.is_err();
        Some(result)
    }
}

impl<R: OperandResolver + ?Sized> FusedIterator for Instructions<'_, R> {}

/// Decode all of `code`
///
/// # Errors
/// Returns the first error of [`decode_instruction`]
pub fn decode_stream<R>(code: &[u8], resolver: &R) -> Result<Vec<Instruction>>
where
    R: OperandResolver + ?Sized,
{
    Instructions::new(code, resolver).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disassembler::FlowType;

    #[test]
    fn decode_instruction_basic() {
        // ldloc.s 10
        let mut parser = Parser::new(&[0x11, 0x10]);

        let result = decode_instruction(&mut parser, &()).unwrap();
        assert_eq!(result.offset, 0);
        assert_eq!(result.size, 2);
        assert_eq!(result.opcode, 0x11);
        assert_eq!(result.mnemonic, "ldloc.s");
        assert_eq!(result.flow_type, FlowType::Sequential);
        assert_eq!(result.operand, Operand::Local(0x10));
    }

    #[test]
    fn decode_instruction_two_byte() {
        let mut parser = Parser::new(&[0xFE, 0x01, 0xFE, 0x0C, 0x34, 0x12]);

        let ceq = decode_instruction(&mut parser, &()).unwrap();
        assert_eq!(ceq.opcode, 0xFE01);
        assert_eq!(ceq.mnemonic, "ceq");
        assert_eq!(ceq.size, 2);

        let ldloc = decode_instruction(&mut parser, &()).unwrap();
        assert_eq!(ldloc.offset, 2);
        assert_eq!(ldloc.size, 4);
        assert_eq!(ldloc.operand, Operand::Local(0x1234));
    }

    #[test]
    fn branch_resolution() {
        // br.s +2 lands after the two nops
        let instructions = decode_stream(&[0x2B, 0x02, 0x00, 0x00, 0x2A], &()).unwrap();

        assert_eq!(instructions[0].mnemonic, "br.s");
        assert_eq!(instructions[0].flow_type, FlowType::UnconditionalBranch);
        assert_eq!(instructions[0].branch_targets(), &[4]);
        assert_eq!(instructions[3].offset, 4);

        // brtrue -6 at offset 1 jumps back to 0
        #[rustfmt::skip]
        let code = [
            0x00,
            0x3A, 0xFA, 0xFF, 0xFF, 0xFF,
        ];
        let instructions = decode_stream(&code, &()).unwrap();
        assert_eq!(instructions[1].flow_type, FlowType::ConditionalBranch);
        assert_eq!(instructions[1].branch_targets(), &[0]);

        // br.s -3 from offset 0
        if decode_stream(&[0x2B, 0xFD], &()).is_ok() {
            panic!("This should not be valid!")
        }
    }

    #[test]
    fn switch_targets() {
        #[rustfmt::skip]
        let code = [
            0x45, 0x02, 0x00, 0x00, 0x00,
            0x0A, 0x00, 0x00, 0x00,
            0xFF, 0xFF, 0xFF, 0xFF,
        ];

        let switch = decode_stream(&code, &()).unwrap().remove(0);
        assert_eq!(switch.mnemonic, "switch");
        assert_eq!(switch.flow_type, FlowType::Switch);
        assert_eq!(switch.size, 13);
        assert_eq!(switch.branch_targets(), &[23, 12]);

        // case count larger than the code
        assert!(matches!(
            decode_stream(&[0x45, 0xFF, 0xFF, 0xFF, 0x7F, 0x00], &()),
            Err(Error::MethodBodyTruncated { .. })
        ));
    }

    #[test]
    fn constants_and_tokens() {
        #[rustfmt::skip]
        let code = [
            0x1F, 0xFE,
            0x20, 0x78, 0x56, 0x34, 0x12,
            0x21, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80,
            0x22, 0x00, 0x00, 0xC0, 0x3F,
            0x23, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x40,
            0xD0, 0x01, 0x00, 0x00, 0x02,
            0x72, 0x01, 0x00, 0x00, 0x70,
            0x03,
        ];

        let operands: Vec<Operand> = decode_stream(&code, &())
            .unwrap()
            .into_iter()
            .map(|instruction| instruction.operand)
            .collect();

        assert_eq!(
            operands,
            vec![
                Operand::Int8(-2),
                Operand::Int32(0x1234_5678),
                Operand::Int64(i64::MIN + 1),
                Operand::Float32(1.5),
                Operand::Float64(2.5),
                Operand::Token(Token::new(0x0200_0001)),
                Operand::Token(Token::new(0x7000_0001)),
                Operand::Argument(ArgumentRef::unresolved(1)),
            ]
        );
    }

    #[test]
    fn unsupported_opcode() {
        assert!(matches!(
            decode_stream(&[0x00, 0xFE, 0xFF], &()),
            Err(Error::UnsupportedOpcode {
                offset: 1,
                opcode: 0xFEFF
            })
        ));
        assert!(matches!(
            decode_stream(&[0x24], &()),
            Err(Error::UnsupportedOpcode {
                offset: 0,
                opcode: 0x24
            })
        ));
    }

    #[test]
    fn truncated() {
        assert!(matches!(
            decode_stream(&[0x20, 0x01, 0x02], &()),
            Err(Error::MethodBodyTruncated { offset: 1 })
        ));
        assert!(matches!(
            decode_stream(&[0x00, 0xFE], &()),
            Err(Error::MethodBodyTruncated { offset: 2 })
        ));
    }

    #[test]
    fn stream_is_fused_and_restartable() {
        let code = [0x00, 0xFF, 0x2A];

        let mut stream = Instructions::new(&code, &());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());

        let first: Vec<_> = Instructions::new(&[0x00, 0x2A], &()).flatten().collect();
        let second: Vec<_> = Instructions::new(&[0x00, 0x2A], &()).flatten().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    struct Named;

    impl OperandResolver for Named {
        fn user_string(&self, token: Token) -> Result<Option<String>> {
            Ok(Some(format!("literal {}", token.row())))
        }

        fn argument(&self, index: u16) -> Result<ArgumentRef> {
            Ok(ArgumentRef {
                index,
                is_this: index == 0,
                param: None,
                name: None,
            })
        }
    }

    #[test]
    fn resolver_is_consulted() {
        let instructions = decode_stream(&[0x72, 0x05, 0x00, 0x00, 0x70, 0x02], &Named).unwrap();

        assert_eq!(instructions[0].operand, Operand::String("literal 5".to_string()));
        match &instructions[1].operand {
            Operand::Argument(argument) => assert!(argument.is_this),
            other => panic!("unexpected operand {other:?}"),
        }
    }
}
