use bitflags::bitflags;

use crate::{metadata::tables::CodedReference, Result};

/// Element type tags of the signature encoding (ECMA-335 II.23.1.16)
#[allow(non_snake_case, missing_docs)]
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDefOrRef coded index
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDefOrRef coded index
    pub const CLASS: u8 = 0x12;
    // Generic parameter of a type, followed by its number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 ... loCount lo1 ...
    pub const ARRAY: u8 = 0x14;
    // Followed by the generic type, the argument count and the arguments
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter of a method, followed by its number
    pub const MVAR: u8 = 0x1e;
    // Required modifier, followed by TypeDefOrRef coded index
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier, followed by TypeDefOrRef coded index
    pub const CMOD_OPT: u8 = 0x20;
    // Start of the vararg part of a call site signature
    pub const SENTINEL: u8 = 0x41;
    // Local variable is pinned
    pub const PINNED: u8 = 0x45;
}

/// The innermost type of a [`TypeSignature`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// `void`, only valid as a return type
    Void,
    /// `bool`
    Boolean,
    /// `char`
    Char,
    /// `sbyte`
    I1,
    /// `byte`
    U1,
    /// `short`
    I2,
    /// `ushort`
    U2,
    /// `int`
    I4,
    /// `uint`
    U4,
    /// `long`
    I8,
    /// `ulong`
    U8,
    /// `float`
    R4,
    /// `double`
    R8,
    /// `string`
    String,
    /// `object`
    Object,
    /// `System.TypedReference`
    TypedByRef,
    /// `nint`
    I,
    /// `nuint`
    U,
    /// A value type, see [`TypeSignature::type_ref`]
    ValueType,
    /// A reference type, see [`TypeSignature::type_ref`]
    Class,
    /// Generic parameter of the enclosing type, see [`TypeSignature::generic_param`]
    Var,
    /// Generic parameter of the enclosing method, see [`TypeSignature::generic_param`]
    MVar,
    /// General array, see [`TypeSignature::element`] and [`TypeSignature::array_shape`]
    Array,
    /// Function pointer, see [`TypeSignature::fn_ptr`]
    FnPtr,
}

impl ElementType {
    /// The element type for a primitive tag, `None` for tags that are not primitives
    #[must_use]
    pub fn primitive(tag: u8) -> Option<ElementType> {
        Some(match tag {
            ELEMENT_TYPE::VOID => ElementType::Void,
            ELEMENT_TYPE::BOOLEAN => ElementType::Boolean,
            ELEMENT_TYPE::CHAR => ElementType::Char,
            ELEMENT_TYPE::I1 => ElementType::I1,
            ELEMENT_TYPE::U1 => ElementType::U1,
            ELEMENT_TYPE::I2 => ElementType::I2,
            ELEMENT_TYPE::U2 => ElementType::U2,
            ELEMENT_TYPE::I4 => ElementType::I4,
            ELEMENT_TYPE::U4 => ElementType::U4,
            ELEMENT_TYPE::I8 => ElementType::I8,
            ELEMENT_TYPE::U8 => ElementType::U8,
            ELEMENT_TYPE::R4 => ElementType::R4,
            ELEMENT_TYPE::R8 => ElementType::R8,
            ELEMENT_TYPE::STRING => ElementType::String,
            ELEMENT_TYPE::OBJECT => ElementType::Object,
            ELEMENT_TYPE::TYPEDBYREF => ElementType::TypedByRef,
            ELEMENT_TYPE::I => ElementType::I,
            ELEMENT_TYPE::U => ElementType::U,
            _ => return None,
        })
    }

    /// The tag this element type is encoded with
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            ElementType::Void => ELEMENT_TYPE::VOID,
            ElementType::Boolean => ELEMENT_TYPE::BOOLEAN,
            ElementType::Char => ELEMENT_TYPE::CHAR,
            ElementType::I1 => ELEMENT_TYPE::I1,
            ElementType::U1 => ELEMENT_TYPE::U1,
            ElementType::I2 => ELEMENT_TYPE::I2,
            ElementType::U2 => ELEMENT_TYPE::U2,
            ElementType::I4 => ELEMENT_TYPE::I4,
            ElementType::U4 => ELEMENT_TYPE::U4,
            ElementType::I8 => ELEMENT_TYPE::I8,
            ElementType::U8 => ELEMENT_TYPE::U8,
            ElementType::R4 => ELEMENT_TYPE::R4,
            ElementType::R8 => ELEMENT_TYPE::R8,
            ElementType::String => ELEMENT_TYPE::STRING,
            ElementType::Object => ELEMENT_TYPE::OBJECT,
            ElementType::TypedByRef => ELEMENT_TYPE::TYPEDBYREF,
            ElementType::I => ELEMENT_TYPE::I,
            ElementType::U => ELEMENT_TYPE::U,
            ElementType::ValueType => ELEMENT_TYPE::VALUETYPE,
            ElementType::Class => ELEMENT_TYPE::CLASS,
            ElementType::Var => ELEMENT_TYPE::VAR,
            ElementType::MVar => ELEMENT_TYPE::MVAR,
            ElementType::Array => ELEMENT_TYPE::ARRAY,
            ElementType::FnPtr => ELEMENT_TYPE::FNPTR,
        }
    }
}

/// A `CMOD_REQD` or `CMOD_OPT` modifier, e.g. `modreq(IsVolatile)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomModifier {
    /// `modreq` if set, else `modopt`
    pub required: bool,
    /// The modifier type
    pub modifier_type: CodedReference,
}

/// Shape of a general `ARRAY`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArrayShape {
    /// Number of dimensions
    pub rank: u32,
    /// Sizes of the leading dimensions that specify one
    pub sizes: Vec<u32>,
    /// Lower bounds of the leading dimensions that specify one
    pub lower_bounds: Vec<i32>,
}

/// A decoded type.
///
/// The type is kept flat: prefixes are counted instead of nested. Read it inside out as
/// `base`, with `generic_args` if `generic`, wrapped in `pointer_depth` pointers, in
/// `array_rank` single dimensional arrays and finally, if `by_ref`, a managed reference.
/// `int*[]` is `{ base: I4, pointer_depth: 1, array_rank: 1 }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSignature {
    /// The innermost type
    pub base: ElementType,
    /// Custom modifiers, in encoding order
    pub modifiers: Vec<CustomModifier>,
    /// Passed by reference (`ref`, `out`, `in`)
    pub by_ref: bool,
    /// Number of `SZARRAY` prefixes, `int[][]` has 2
    pub array_rank: u32,
    /// Number of `PTR` prefixes
    pub pointer_depth: u32,
    /// A generic instantiation of `type_ref` with `generic_args`
    pub generic: bool,
    /// The class or value type, for [`ElementType::Class`] and [`ElementType::ValueType`]
    pub type_ref: Option<CodedReference>,
    /// Parameter number, for [`ElementType::Var`] and [`ElementType::MVar`]
    pub generic_param: Option<u32>,
    /// Type arguments of a generic instantiation
    pub generic_args: Vec<TypeSignature>,
    /// Dimensions, for [`ElementType::Array`]
    pub array_shape: Option<ArrayShape>,
    /// Element type, for [`ElementType::Array`]
    pub element: Option<Box<TypeSignature>>,
    /// Target signature, for [`ElementType::FnPtr`]
    pub fn_ptr: Option<Box<Signature>>,
}

impl TypeSignature {
    /// A plain type of `base` without any prefix
    #[must_use]
    pub fn new(base: ElementType) -> Self {
        TypeSignature {
            base,
            modifiers: Vec::new(),
            by_ref: false,
            array_rank: 0,
            pointer_depth: 0,
            generic: false,
            type_ref: None,
            generic_param: None,
            generic_args: Vec::new(),
            array_shape: None,
            element: None,
            fn_ptr: None,
        }
    }

    /// True for single dimensional or general arrays
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.array_rank > 0 || self.base == ElementType::Array
    }

    /// True if the type is an unmanaged pointer
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// True if any of the modifiers is required
    #[must_use]
    pub fn has_required_modifier(&self) -> bool {
        self.modifiers.iter().any(|modifier| modifier.required)
    }

    /// True for a bare `void`
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.base == ElementType::Void && self.array_rank == 0 && self.pointer_depth == 0
    }
}

/// The kind of a signature, the low nibble of its first byte (ECMA-335 II.23.2.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Managed calling convention
    Default,
    /// `cdecl`
    C,
    /// `stdcall`
    StdCall,
    /// `thiscall`
    ThisCall,
    /// `fastcall`
    FastCall,
    /// Managed vararg
    VarArg,
    /// Field signature
    Field,
    /// Local variable signature
    LocalSig,
    /// Property signature
    Property,
    /// Unmanaged, with the convention in a modifier
    Unmanaged,
    /// Generic method instantiation
    GenericInst,
}

bitflags! {
    /// Flags in the high nibble of the first signature byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CallingConventionFlags: u8 {
        /// Method has generic parameters, their count follows
        const GENERIC = 0x10;
        /// Method has an implicit `this`
        const HAS_THIS = 0x20;
        /// `this` is declared explicitly as the first parameter
        const EXPLICIT_THIS = 0x40;
    }
}

/// The first byte of a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallingConvention {
    /// What kind of signature follows
    pub kind: CallKind,
    /// `GENERIC`, `HASTHIS`, `EXPLICITTHIS`
    pub flags: CallingConventionFlags,
}

impl CallingConvention {
    /// Split a calling convention byte
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an undefined kind
    pub fn from_byte(byte: u8) -> Result<CallingConvention> {
        let kind = match byte & 0x0F {
            0x00 => CallKind::Default,
            0x01 => CallKind::C,
            0x02 => CallKind::StdCall,
            0x03 => CallKind::ThisCall,
            0x04 => CallKind::FastCall,
            0x05 => CallKind::VarArg,
            0x06 => CallKind::Field,
            0x07 => CallKind::LocalSig,
            0x08 => CallKind::Property,
            0x09 => CallKind::Unmanaged,
            0x0A => CallKind::GenericInst,
            other => {
                return Err(malformed_error!(
                    "Invalid calling convention kind - 0x{:02X}",
                    other
                ))
            }
        };

        Ok(CallingConvention {
            kind,
            flags: CallingConventionFlags::from_bits_truncate(byte),
        })
    }

    /// The encoded byte
    #[must_use]
    pub fn to_byte(self) -> u8 {
        let kind = match self.kind {
            CallKind::Default => 0x00,
            CallKind::C => 0x01,
            CallKind::StdCall => 0x02,
            CallKind::ThisCall => 0x03,
            CallKind::FastCall => 0x04,
            CallKind::VarArg => 0x05,
            CallKind::Field => 0x06,
            CallKind::LocalSig => 0x07,
            CallKind::Property => 0x08,
            CallKind::Unmanaged => 0x09,
            CallKind::GenericInst => 0x0A,
        };

        kind | self.flags.bits()
    }

    /// True if the method takes an implicit `this`
    #[must_use]
    pub fn has_this(self) -> bool {
        self.flags.contains(CallingConventionFlags::HAS_THIS)
            && !self.flags.contains(CallingConventionFlags::EXPLICIT_THIS)
    }
}

/// A method, property or field signature.
///
/// For a field signature `args_count` is 0 and `return_type` is the type of the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Kind and flags
    pub calling_convention: CallingConvention,
    /// Number of generic parameters, 0 unless [`CallingConventionFlags::GENERIC`]
    pub generic_param_count: u32,
    /// Number of declared parameters, including the vararg part
    pub args_count: u32,
    /// Return type; property type for properties, field type for fields
    pub return_type: TypeSignature,
    /// Fixed parameters
    pub params: Vec<TypeSignature>,
    /// Parameters after the `SENTINEL` of a vararg call site
    pub varargs: Vec<TypeSignature>,
}

/// One local variable of a [`LocalSignature`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    /// Pinned for the lifetime of the method
    pub pinned: bool,
    /// Type of the variable
    pub ty: TypeSignature,
}

/// A `LOCAL_SIG` blob, the locals of a method body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalSignature {
    /// The local variables, by index
    pub locals: Vec<LocalVariable>,
}

/// A `GENERICINST` blob of the `MethodSpec` table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodSpecSignature {
    /// The type arguments of the instantiation
    pub generic_args: Vec<TypeSignature>,
}

/// The contents of a `StandAloneSig` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StandAloneSignature {
    /// Local variables of a method body
    Locals(LocalSignature),
    /// Call site signature of a `calli`
    Method(Signature),
}
