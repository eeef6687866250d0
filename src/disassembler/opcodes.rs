//! The CIL opcode table (ECMA-335 Partition III).
//!
//! One-byte opcodes index [`INSTRUCTIONS`] directly. `0xFE` introduces a two-byte opcode whose
//! second byte indexes [`INSTRUCTIONS_FE`]. Unassigned slots are `None`.

/// How the operand following an opcode is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand
    None,
    /// `i1` relative branch displacement
    ShortBranch,
    /// `i4` relative branch displacement
    Branch,
    /// `u4` case count followed by that many `i4` displacements
    Switch,
    /// 4 byte metadata token
    Token,
    /// 4 byte `#US` token
    String,
    /// `i1` constant
    Int8,
    /// `u1` constant
    UInt8,
    /// `i4` constant
    Int32,
    /// `i8` constant
    Int64,
    /// `r4` constant
    Float32,
    /// `r8` constant
    Float64,
    /// `u1` local index
    ShortLocal,
    /// `u2` local index
    Local,
    /// `u1` argument index
    ShortArgument,
    /// `u2` argument index
    Argument,
    /// Local index encoded in the opcode, e.g. `ldloc.2`
    ImplicitLocal(u8),
    /// Argument index encoded in the opcode, e.g. `ldarg.1`
    ImplicitArgument(u8),
}

/// How an instruction affects control flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Falls through to the next instruction
    Sequential,
    /// Branches or falls through
    ConditionalBranch,
    /// Always branches
    UnconditionalBranch,
    /// Jump table
    Switch,
    /// Calls another method and continues
    Call,
    /// Leaves the method or a handler
    Return,
    /// Raises an exception
    Throw,
    /// Prefix that modifies the next instruction
    Meta,
}

/// Static description of one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCodeInfo {
    /// The mnemonic, as written in IL assembly
    pub name: &'static str,
    /// The operand encoding
    pub operand: OperandType,
    /// The control flow behavior
    pub flow: FlowType,
}

const fn op(name: &'static str, operand: OperandType, flow: FlowType) -> Option<OpCodeInfo> {
    Some(OpCodeInfo {
        name,
        operand,
        flow,
    })
}

/// The prefix byte of two-byte opcodes
pub const TWO_BYTE_PREFIX: u8 = 0xFE;

/// Look up `opcode`, two-byte opcodes in their `0xFExx` form
#[must_use]
pub fn lookup(opcode: u16) -> Option<&'static OpCodeInfo> {
    let [high, low] = opcode.to_be_bytes();
    let slot = match high {
        0x00 => INSTRUCTIONS.get(usize::from(low)),
        TWO_BYTE_PREFIX => INSTRUCTIONS_FE.get(usize::from(low)),
        _ => None,
    };
    slot.and_then(Option::as_ref)
}

/// One-byte opcodes
pub static INSTRUCTIONS: [Option<OpCodeInfo>; 0xE1] = [
    op("nop", OperandType::None, FlowType::Sequential), // 0x00
    op("break", OperandType::None, FlowType::Sequential), // 0x01
    op("ldarg.0", OperandType::ImplicitArgument(0), FlowType::Sequential), // 0x02
    op("ldarg.1", OperandType::ImplicitArgument(1), FlowType::Sequential), // 0x03
    op("ldarg.2", OperandType::ImplicitArgument(2), FlowType::Sequential), // 0x04
    op("ldarg.3", OperandType::ImplicitArgument(3), FlowType::Sequential), // 0x05
    op("ldloc.0", OperandType::ImplicitLocal(0), FlowType::Sequential), // 0x06
    op("ldloc.1", OperandType::ImplicitLocal(1), FlowType::Sequential), // 0x07
    op("ldloc.2", OperandType::ImplicitLocal(2), FlowType::Sequential), // 0x08
    op("ldloc.3", OperandType::ImplicitLocal(3), FlowType::Sequential), // 0x09
    op("stloc.0", OperandType::ImplicitLocal(0), FlowType::Sequential), // 0x0A
    op("stloc.1", OperandType::ImplicitLocal(1), FlowType::Sequential), // 0x0B
    op("stloc.2", OperandType::ImplicitLocal(2), FlowType::Sequential), // 0x0C
    op("stloc.3", OperandType::ImplicitLocal(3), FlowType::Sequential), // 0x0D
    op("ldarg.s", OperandType::ShortArgument, FlowType::Sequential), // 0x0E
    op("ldarga.s", OperandType::ShortArgument, FlowType::Sequential), // 0x0F
    op("starg.s", OperandType::ShortArgument, FlowType::Sequential), // 0x10
    op("ldloc.s", OperandType::ShortLocal, FlowType::Sequential), // 0x11
    op("ldloca.s", OperandType::ShortLocal, FlowType::Sequential), // 0x12
    op("stloc.s", OperandType::ShortLocal, FlowType::Sequential), // 0x13
    op("ldnull", OperandType::None, FlowType::Sequential), // 0x14
    op("ldc.i4.m1", OperandType::None, FlowType::Sequential), // 0x15
    op("ldc.i4.0", OperandType::None, FlowType::Sequential), // 0x16
    op("ldc.i4.1", OperandType::None, FlowType::Sequential), // 0x17
    op("ldc.i4.2", OperandType::None, FlowType::Sequential), // 0x18
    op("ldc.i4.3", OperandType::None, FlowType::Sequential), // 0x19
    op("ldc.i4.4", OperandType::None, FlowType::Sequential), // 0x1A
    op("ldc.i4.5", OperandType::None, FlowType::Sequential), // 0x1B
    op("ldc.i4.6", OperandType::None, FlowType::Sequential), // 0x1C
    op("ldc.i4.7", OperandType::None, FlowType::Sequential), // 0x1D
    op("ldc.i4.8", OperandType::None, FlowType::Sequential), // 0x1E
    op("ldc.i4.s", OperandType::Int8, FlowType::Sequential), // 0x1F
    op("ldc.i4", OperandType::Int32, FlowType::Sequential), // 0x20
    op("ldc.i8", OperandType::Int64, FlowType::Sequential), // 0x21
    op("ldc.r4", OperandType::Float32, FlowType::Sequential), // 0x22
    op("ldc.r8", OperandType::Float64, FlowType::Sequential), // 0x23
    None, // 0x24
    op("dup", OperandType::None, FlowType::Sequential), // 0x25
    op("pop", OperandType::None, FlowType::Sequential), // 0x26
    op("jmp", OperandType::Token, FlowType::Call), // 0x27
    op("call", OperandType::Token, FlowType::Call), // 0x28
    op("calli", OperandType::Token, FlowType::Call), // 0x29
    op("ret", OperandType::None, FlowType::Return), // 0x2A
    op("br.s", OperandType::ShortBranch, FlowType::UnconditionalBranch), // 0x2B
    op("brfalse.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x2C
    op("brtrue.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x2D
    op("beq.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x2E
    op("bge.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x2F
    op("bgt.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x30
    op("ble.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x31
    op("blt.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x32
    op("bne.un.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x33
    op("bge.un.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x34
    op("bgt.un.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x35
    op("ble.un.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x36
    op("blt.un.s", OperandType::ShortBranch, FlowType::ConditionalBranch), // 0x37
    op("br", OperandType::Branch, FlowType::UnconditionalBranch), // 0x38
    op("brfalse", OperandType::Branch, FlowType::ConditionalBranch), // 0x39
    op("brtrue", OperandType::Branch, FlowType::ConditionalBranch), // 0x3A
    op("beq", OperandType::Branch, FlowType::ConditionalBranch), // 0x3B
    op("bge", OperandType::Branch, FlowType::ConditionalBranch), // 0x3C
    op("bgt", OperandType::Branch, FlowType::ConditionalBranch), // 0x3D
    op("ble", OperandType::Branch, FlowType::ConditionalBranch), // 0x3E
    op("blt", OperandType::Branch, FlowType::ConditionalBranch), // 0x3F
    op("bne.un", OperandType::Branch, FlowType::ConditionalBranch), // 0x40
    op("bge.un", OperandType::Branch, FlowType::ConditionalBranch), // 0x41
    op("bgt.un", OperandType::Branch, FlowType::ConditionalBranch), // 0x42
    op("ble.un", OperandType::Branch, FlowType::ConditionalBranch), // 0x43
    op("blt.un", OperandType::Branch, FlowType::ConditionalBranch), // 0x44
    op("switch", OperandType::Switch, FlowType::Switch), // 0x45
    op("ldind.i1", OperandType::None, FlowType::Sequential), // 0x46
    op("ldind.u1", OperandType::None, FlowType::Sequential), // 0x47
    op("ldind.i2", OperandType::None, FlowType::Sequential), // 0x48
    op("ldind.u2", OperandType::None, FlowType::Sequential), // 0x49
    op("ldind.i4", OperandType::None, FlowType::Sequential), // 0x4A
    op("ldind.u4", OperandType::None, FlowType::Sequential), // 0x4B
    op("ldind.i8", OperandType::None, FlowType::Sequential), // 0x4C
    op("ldind.i", OperandType::None, FlowType::Sequential), // 0x4D
    op("ldind.r4", OperandType::None, FlowType::Sequential), // 0x4E
    op("ldind.r8", OperandType::None, FlowType::Sequential), // 0x4F
    op("ldind.ref", OperandType::None, FlowType::Sequential), // 0x50
    op("stind.ref", OperandType::None, FlowType::Sequential), // 0x51
    op("stind.i1", OperandType::None, FlowType::Sequential), // 0x52
    op("stind.i2", OperandType::None, FlowType::Sequential), // 0x53
    op("stind.i4", OperandType::None, FlowType::Sequential), // 0x54
    op("stind.i8", OperandType::None, FlowType::Sequential), // 0x55
    op("stind.r4", OperandType::None, FlowType::Sequential), // 0x56
    op("stind.r8", OperandType::None, FlowType::Sequential), // 0x57
    op("add", OperandType::None, FlowType::Sequential), // 0x58
    op("sub", OperandType::None, FlowType::Sequential), // 0x59
    op("mul", OperandType::None, FlowType::Sequential), // 0x5A
    op("div", OperandType::None, FlowType::Sequential), // 0x5B
    op("div.un", OperandType::None, FlowType::Sequential), // 0x5C
    op("rem", OperandType::None, FlowType::Sequential), // 0x5D
    op("rem.un", OperandType::None, FlowType::Sequential), // 0x5E
    op("and", OperandType::None, FlowType::Sequential), // 0x5F
    op("or", OperandType::None, FlowType::Sequential), // 0x60
    op("xor", OperandType::None, FlowType::Sequential), // 0x61
    op("shl", OperandType::None, FlowType::Sequential), // 0x62
    op("shr", OperandType::None, FlowType::Sequential), // 0x63
    op("shr.un", OperandType::None, FlowType::Sequential), // 0x64
    op("neg", OperandType::None, FlowType::Sequential), // 0x65
    op("not", OperandType::None, FlowType::Sequential), // 0x66
    op("conv.i1", OperandType::None, FlowType::Sequential), // 0x67
    op("conv.i2", OperandType::None, FlowType::Sequential), // 0x68
    op("conv.i4", OperandType::None, FlowType::Sequential), // 0x69
    op("conv.i8", OperandType::None, FlowType::Sequential), // 0x6A
    op("conv.r4", OperandType::None, FlowType::Sequential), // 0x6B
    op("conv.r8", OperandType::None, FlowType::Sequential), // 0x6C
    op("conv.u4", OperandType::None, FlowType::Sequential), // 0x6D
    op("conv.u8", OperandType::None, FlowType::Sequential), // 0x6E
    op("callvirt", OperandType::Token, FlowType::Call), // 0x6F
    op("cpobj", OperandType::Token, FlowType::Sequential), // 0x70
    op("ldobj", OperandType::Token, FlowType::Sequential), // 0x71
    op("ldstr", OperandType::String, FlowType::Sequential), // 0x72
    op("newobj", OperandType::Token, FlowType::Call), // 0x73
    op("castclass", OperandType::Token, FlowType::Sequential), // 0x74
    op("isinst", OperandType::Token, FlowType::Sequential), // 0x75
    op("conv.r.un", OperandType::None, FlowType::Sequential), // 0x76
    None, // 0x77
    None, // 0x78
    op("unbox", OperandType::Token, FlowType::Sequential), // 0x79
    op("throw", OperandType::None, FlowType::Throw), // 0x7A
    op("ldfld", OperandType::Token, FlowType::Sequential), // 0x7B
    op("ldflda", OperandType::Token, FlowType::Sequential), // 0x7C
    op("stfld", OperandType::Token, FlowType::Sequential), // 0x7D
    op("ldsfld", OperandType::Token, FlowType::Sequential), // 0x7E
    op("ldsflda", OperandType::Token, FlowType::Sequential), // 0x7F
    op("stsfld", OperandType::Token, FlowType::Sequential), // 0x80
    op("stobj", OperandType::Token, FlowType::Sequential), // 0x81
    op("conv.ovf.i1.un", OperandType::None, FlowType::Sequential), // 0x82
    op("conv.ovf.i2.un", OperandType::None, FlowType::Sequential), // 0x83
    op("conv.ovf.i4.un", OperandType::None, FlowType::Sequential), // 0x84
    op("conv.ovf.i8.un", OperandType::None, FlowType::Sequential), // 0x85
    op("conv.ovf.u1.un", OperandType::None, FlowType::Sequential), // 0x86
    op("conv.ovf.u2.un", OperandType::None, FlowType::Sequential), // 0x87
    op("conv.ovf.u4.un", OperandType::None, FlowType::Sequential), // 0x88
    op("conv.ovf.u8.un", OperandType::None, FlowType::Sequential), // 0x89
    op("conv.ovf.i.un", OperandType::None, FlowType::Sequential), // 0x8A
    op("conv.ovf.u.un", OperandType::None, FlowType::Sequential), // 0x8B
    op("box", OperandType::Token, FlowType::Sequential), // 0x8C
    op("newarr", OperandType::Token, FlowType::Sequential), // 0x8D
    op("ldlen", OperandType::None, FlowType::Sequential), // 0x8E
    op("ldelema", OperandType::Token, FlowType::Sequential), // 0x8F
    op("ldelem.i1", OperandType::None, FlowType::Sequential), // 0x90
    op("ldelem.u1", OperandType::None, FlowType::Sequential), // 0x91
    op("ldelem.i2", OperandType::None, FlowType::Sequential), // 0x92
    op("ldelem.u2", OperandType::None, FlowType::Sequential), // 0x93
    op("ldelem.i4", OperandType::None, FlowType::Sequential), // 0x94
    op("ldelem.u4", OperandType::None, FlowType::Sequential), // 0x95
    op("ldelem.i8", OperandType::None, FlowType::Sequential), // 0x96
    op("ldelem.i", OperandType::None, FlowType::Sequential), // 0x97
    op("ldelem.r4", OperandType::None, FlowType::Sequential), // 0x98
    op("ldelem.r8", OperandType::None, FlowType::Sequential), // 0x99
    op("ldelem.ref", OperandType::None, FlowType::Sequential), // 0x9A
    op("stelem.i", OperandType::None, FlowType::Sequential), // 0x9B
    op("stelem.i1", OperandType::None, FlowType::Sequential), // 0x9C
    op("stelem.i2", OperandType::None, FlowType::Sequential), // 0x9D
    op("stelem.i4", OperandType::None, FlowType::Sequential), // 0x9E
    op("stelem.i8", OperandType::None, FlowType::Sequential), // 0x9F
    op("stelem.r4", OperandType::None, FlowType::Sequential), // 0xA0
    op("stelem.r8", OperandType::None, FlowType::Sequential), // 0xA1
    op("stelem.ref", OperandType::None, FlowType::Sequential), // 0xA2
    op("ldelem", OperandType::Token, FlowType::Sequential), // 0xA3
    op("stelem", OperandType::Token, FlowType::Sequential), // 0xA4
    op("unbox.any", OperandType::Token, FlowType::Sequential), // 0xA5
    None, // 0xA6
    None, // 0xA7
    None, // 0xA8
    None, // 0xA9
    None, // 0xAA
    None, // 0xAB
    None, // 0xAC
    None, // 0xAD
    None, // 0xAE
    None, // 0xAF
    None, // 0xB0
    None, // 0xB1
    None, // 0xB2
    op("conv.ovf.i1", OperandType::None, FlowType::Sequential), // 0xB3
    op("conv.ovf.u1", OperandType::None, FlowType::Sequential), // 0xB4
    op("conv.ovf.i2", OperandType::None, FlowType::Sequential), // 0xB5
    op("conv.ovf.u2", OperandType::None, FlowType::Sequential), // 0xB6
    op("conv.ovf.i4", OperandType::None, FlowType::Sequential), // 0xB7
    op("conv.ovf.u4", OperandType::None, FlowType::Sequential), // 0xB8
    op("conv.ovf.i8", OperandType::None, FlowType::Sequential), // 0xB9
    op("conv.ovf.u8", OperandType::None, FlowType::Sequential), // 0xBA
    None, // 0xBB
    None, // 0xBC
    None, // 0xBD
    None, // 0xBE
    None, // 0xBF
    None, // 0xC0
    None, // 0xC1
    op("refanyval", OperandType::Token, FlowType::Sequential), // 0xC2
    op("ckfinite", OperandType::None, FlowType::Sequential), // 0xC3
    None, // 0xC4
    None, // 0xC5
    op("mkrefany", OperandType::Token, FlowType::Sequential), // 0xC6
    None, // 0xC7
    None, // 0xC8
    None, // 0xC9
    None, // 0xCA
    None, // 0xCB
    None, // 0xCC
    None, // 0xCD
    None, // 0xCE
    None, // 0xCF
    op("ldtoken", OperandType::Token, FlowType::Sequential), // 0xD0
    op("conv.u2", OperandType::None, FlowType::Sequential), // 0xD1
    op("conv.u1", OperandType::None, FlowType::Sequential), // 0xD2
    op("conv.i", OperandType::None, FlowType::Sequential), // 0xD3
    op("conv.ovf.i", OperandType::None, FlowType::Sequential), // 0xD4
    op("conv.ovf.u", OperandType::None, FlowType::Sequential), // 0xD5
    op("add.ovf", OperandType::None, FlowType::Sequential), // 0xD6
    op("add.ovf.un", OperandType::None, FlowType::Sequential), // 0xD7
    op("mul.ovf", OperandType::None, FlowType::Sequential), // 0xD8
    op("mul.ovf.un", OperandType::None, FlowType::Sequential), // 0xD9
    op("sub.ovf", OperandType::None, FlowType::Sequential), // 0xDA
    op("sub.ovf.un", OperandType::None, FlowType::Sequential), // 0xDB
    op("endfinally", OperandType::None, FlowType::Return), // 0xDC
    op("leave", OperandType::Branch, FlowType::UnconditionalBranch), // 0xDD
    op("leave.s", OperandType::ShortBranch, FlowType::UnconditionalBranch), // 0xDE
    op("stind.i", OperandType::None, FlowType::Sequential), // 0xDF
    op("conv.u", OperandType::None, FlowType::Sequential), // 0xE0
];

/// Two-byte opcodes, indexed by the byte after [`TWO_BYTE_PREFIX`]
pub static INSTRUCTIONS_FE: [Option<OpCodeInfo>; 0x1F] = [
    op("arglist", OperandType::None, FlowType::Sequential), // 0xFE00
    op("ceq", OperandType::None, FlowType::Sequential), // 0xFE01
    op("cgt", OperandType::None, FlowType::Sequential), // 0xFE02
    op("cgt.un", OperandType::None, FlowType::Sequential), // 0xFE03
    op("clt", OperandType::None, FlowType::Sequential), // 0xFE04
    op("clt.un", OperandType::None, FlowType::Sequential), // 0xFE05
    op("ldftn", OperandType::Token, FlowType::Sequential), // 0xFE06
    op("ldvirtftn", OperandType::Token, FlowType::Sequential), // 0xFE07
    None, // 0xFE08
    op("ldarg", OperandType::Argument, FlowType::Sequential), // 0xFE09
    op("ldarga", OperandType::Argument, FlowType::Sequential), // 0xFE0A
    op("starg", OperandType::Argument, FlowType::Sequential), // 0xFE0B
    op("ldloc", OperandType::Local, FlowType::Sequential), // 0xFE0C
    op("ldloca", OperandType::Local, FlowType::Sequential), // 0xFE0D
    op("stloc", OperandType::Local, FlowType::Sequential), // 0xFE0E
    op("localloc", OperandType::None, FlowType::Sequential), // 0xFE0F
    None, // 0xFE10
    op("endfilter", OperandType::None, FlowType::Return), // 0xFE11
    op("unaligned.", OperandType::UInt8, FlowType::Meta), // 0xFE12
    op("volatile.", OperandType::None, FlowType::Meta), // 0xFE13
    op("tail.", OperandType::None, FlowType::Meta), // 0xFE14
    op("initobj", OperandType::Token, FlowType::Sequential), // 0xFE15
    op("constrained.", OperandType::Token, FlowType::Meta), // 0xFE16
    op("cpblk", OperandType::None, FlowType::Sequential), // 0xFE17
    op("initblk", OperandType::None, FlowType::Sequential), // 0xFE18
    op("no.", OperandType::UInt8, FlowType::Meta), // 0xFE19
    op("rethrow", OperandType::None, FlowType::Throw), // 0xFE1A
    None, // 0xFE1B
    op("sizeof", OperandType::Token, FlowType::Sequential), // 0xFE1C
    op("refanytype", OperandType::None, FlowType::Sequential), // 0xFE1D
    op("readonly.", OperandType::None, FlowType::Meta), // 0xFE1E
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_shape() {
        assert_eq!(INSTRUCTIONS.iter().flatten().count(), 191);
        assert_eq!(INSTRUCTIONS_FE.iter().flatten().count(), 28);

        assert_eq!(lookup(0x2A).unwrap().name, "ret");
        assert_eq!(lookup(0xFE01).unwrap().name, "ceq");
        assert_eq!(lookup(0xFE0C).unwrap().operand, OperandType::Local);
        assert_eq!(lookup(0x45).unwrap().flow, FlowType::Switch);
        assert!(lookup(0x24).is_none());
        assert!(lookup(0xFEFF).is_none());
        assert!(lookup(0xFE1B).is_none());
        assert!(lookup(0x0120).is_none());
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = INSTRUCTIONS
            .iter()
            .chain(INSTRUCTIONS_FE.iter())
            .flatten()
            .map(|info| info.name)
            .collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }
}
