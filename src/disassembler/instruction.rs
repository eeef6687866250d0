use std::fmt;

use crate::{disassembler::FlowType, metadata::token::Token};

/// An argument slot referenced by `ldarg`, `starg` and friends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentRef {
    /// The raw argument index of the instruction
    pub index: u16,
    /// True if the index addresses the implicit `this` of an instance method
    pub is_this: bool,
    /// The 0-based `Param` row declaring this argument, if the method declares one
    pub param: Option<u32>,
    /// The declared parameter name
    pub name: Option<String>,
}

impl ArgumentRef {
    /// An argument without any metadata attached
    #[must_use]
    pub fn unresolved(index: u16) -> Self {
        ArgumentRef {
            index,
            is_this: false,
            param: None,
            name: None,
        }
    }
}

/// The decoded operand of an instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Absolute code offsets, one for branches and one per case for `switch`
    BranchTargets(Vec<u32>),
    /// A metadata token, the top byte selects the table and the low 24 bits the 1-based row
    Token(Token),
    /// `ldc.i4.s`
    Int8(i8),
    /// `unaligned.` and `no.`
    UInt8(u8),
    /// `ldc.i4`
    Int32(i32),
    /// `ldc.i8`
    Int64(i64),
    /// `ldc.r4`
    Float32(f32),
    /// `ldc.r8`
    Float64(f64),
    /// A local variable index
    Local(u16),
    /// An argument slot
    Argument(ArgumentRef),
    /// A resolved `ldstr` literal
    String(String),
}

/// One decoded CIL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset of the opcode within the method's code
    pub offset: u32,
    /// The opcode, two-byte opcodes in their `0xFExx` form
    pub opcode: u16,
    /// The IL assembly mnemonic
    pub mnemonic: &'static str,
    /// Encoded size, opcode and operand included
    pub size: u32,
    /// Control flow behavior
    pub flow_type: FlowType,
    /// The decoded operand
    pub operand: Operand,
}

impl Instruction {
    /// Offset of the instruction that follows in the byte stream
    #[must_use]
    pub fn next_offset(&self) -> u32 {
        self.offset + self.size
    }

    /// The branch targets of a branch, `leave` or `switch`, empty for everything else
    #[must_use]
    pub fn branch_targets(&self) -> &[u32] {
        match &self.operand {
            Operand::BranchTargets(targets) => targets.as_slice(),
            _ => &[],
        }
    }

    /// True if control can reach the next instruction in the byte stream
    #[must_use]
    pub fn falls_through(&self) -> bool {
        !matches!(
            self.flow_type,
            FlowType::UnconditionalBranch | FlowType::Return | FlowType::Throw
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.mnemonic)?;

        match &self.operand {
            Operand::None => Ok(()),
            Operand::BranchTargets(targets) => {
                let labels: Vec<String> =
                    targets.iter().map(|t| format!("IL_{t:04x}")).collect();
                if self.flow_type == FlowType::Switch {
                    write!(f, " ({})", labels.join(", "))
                } else {
                    write!(f, " {}", labels.join(", "))
                }
            }
            Operand::Token(token) => write!(f, " {token}"),
            Operand::Int8(value) => write!(f, " {value}"),
            Operand::UInt8(value) => write!(f, " {value}"),
            Operand::Int32(value) => write!(f, " {value}"),
            Operand::Int64(value) => write!(f, " {value}"),
            Operand::Float32(value) => write!(f, " {value}"),
            Operand::Float64(value) => write!(f, " {value}"),
            Operand::Local(index) => write!(f, " V_{index}"),
            Operand::Argument(argument) => match (&argument.name, argument.is_this) {
                (_, true) => f.write_str(" this"),
                (Some(name), false) => write!(f, " {name}"),
                (None, false) => write!(f, " A_{}", argument.index),
            },
            Operand::String(value) => write!(f, " {value:?}"),
        }
    }
}
