//! CIL disassembler.
//!
//! Decodes the code of a method body into [`Instruction`]s. Each opcode has a fixed operand
//! shape, listed in the static [`INSTRUCTIONS`] and [`INSTRUCTIONS_FE`] tables; two-byte
//! opcodes (prefix `0xFE`) are identified by their `0xFExx` form throughout.
//!
//! Operands can be decoded raw or resolved against an image through an [`OperandResolver`]:
//! - branch displacements always become absolute code offsets
//! - metadata tokens are checked against the tables
//! - `ldstr` tokens are replaced by the literal from `#US`
//! - argument indices are matched with the method's declared parameters
//!
//! Decoding is lazy. [`Instructions`] yields one `Result` per instruction and stops after the
//! first error, since an undecodable opcode leaves no way to find the next instruction.
//!
//! # Example
//! ```rust
//! use clrscope::disassembler::{decode_stream, Operand};
//!
//! // br.s IL_0004, nop, nop, ret
//! let code = [0x2B, 0x02, 0x00, 0x00, 0x2A];
//! let instructions = decode_stream(&code, &())?;
//!
//! assert_eq!(instructions[0].operand, Operand::BranchTargets(vec![4]));
//! assert_eq!(instructions[3].to_string(), "IL_0004: ret");
//! # Ok::<(), clrscope::Error>(())
//! ```

mod decoder;
mod instruction;
mod method;
mod opcodes;

pub use decoder::{decode_instruction, decode_stream, Instructions, OperandResolver};
pub use instruction::{ArgumentRef, Instruction, Operand};
pub use method::MethodCode;
pub use opcodes::{
    lookup, FlowType, OpCodeInfo, OperandType, INSTRUCTIONS, INSTRUCTIONS_FE, TWO_BYTE_PREFIX,
};
