//! Flag columns of the metadata tables (ECMA-335 II.23.1).
//!
//! Values are kept with `from_bits_retain`, so bits unknown to this library survive a round
//! trip through the typed projections.

use bitflags::bitflags;

bitflags! {
    /// `TypeDef.Flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeAttributes: u32 {
        /// Mask for the visibility bits
        const VISIBILITY_MASK = 0x0000_0007;
        /// Class is not public scope
        const NOT_PUBLIC = 0x0000_0000;
        /// Class is public scope
        const PUBLIC = 0x0000_0001;
        /// Class is nested with public visibility
        const NESTED_PUBLIC = 0x0000_0002;
        /// Class is nested with private visibility
        const NESTED_PRIVATE = 0x0000_0003;
        /// Class is nested with family visibility
        const NESTED_FAMILY = 0x0000_0004;
        /// Class is nested with assembly visibility
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Class is nested with family and assembly visibility
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Class is nested with family or assembly visibility
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
        /// Mask for the layout bits
        const LAYOUT_MASK = 0x0000_0018;
        /// Fields are laid out sequentially
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Layout is supplied explicitly
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Class is abstract
        const ABSTRACT = 0x0000_0080;
        /// Class cannot be extended
        const SEALED = 0x0000_0100;
        /// Class name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Class is imported
        const IMPORT = 0x0000_1000;
        /// Reserved, serializable
        const SERIALIZABLE = 0x0000_2000;
        /// Mask for the string format bits
        const STRING_FORMAT_MASK = 0x0003_0000;
        /// LPSTR is interpreted as UNICODE
        const UNICODE_CLASS = 0x0001_0000;
        /// LPSTR is interpreted automatically
        const AUTO_CLASS = 0x0002_0000;
        /// Type initializer may run before the first static field access
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// The runtime should check the name encoding
        const RT_SPECIAL_NAME = 0x0000_0800;
        /// Class has security associated with it
        const HAS_SECURITY = 0x0004_0000;
    }
}

bitflags! {
    /// `Field.Flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAttributes: u16 {
        /// Mask for the access bits
        const FIELD_ACCESS_MASK = 0x0007;
        /// Member not referenceable
        const COMPILER_CONTROLLED = 0x0000;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized
        const INIT_ONLY = 0x0020;
        /// Value is a compile time constant
        const LITERAL = 0x0040;
        /// Reserved, not serialized
        const NOT_SERIALIZED = 0x0080;
        /// Field is special
        const SPECIAL_NAME = 0x0200;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// The runtime should check the name encoding
        const RT_SPECIAL_NAME = 0x0400;
        /// Field has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
        /// Field has an RVA
        const HAS_FIELD_RVA = 0x0100;
    }
}

bitflags! {
    /// `MethodDef.Flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAttributes: u16 {
        /// Mask for the access bits
        const MEMBER_ACCESS_MASK = 0x0007;
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Method can only be overridden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// Reserved, unmanaged export
        const UNMANAGED_EXPORT = 0x0008;
        /// The runtime should check the name encoding
        const RT_SPECIAL_NAME = 0x1000;
        /// Method has security associated with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

bitflags! {
    /// `MethodDef.ImplFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodImplAttributes: u16 {
        /// Mask for the code type bits
        const CODE_TYPE_MASK = 0x0003;
        /// Method implementation is native
        const NATIVE = 0x0001;
        /// Reserved, optimized IL
        const OPTIL = 0x0002;
        /// Method implementation is provided by the runtime
        const RUNTIME = 0x0003;
        /// Method implementation is unmanaged
        const UNMANAGED = 0x0004;
        /// Method cannot be inlined
        const NO_INLINING = 0x0008;
        /// Method is defined, used in merge scenarios
        const FORWARD_REF = 0x0010;
        /// Method is single threaded through the body
        const SYNCHRONIZED = 0x0020;
        /// Method will not be optimized when generating native code
        const NO_OPTIMIZATION = 0x0040;
        /// Method signature is exported exactly as declared
        const PRESERVE_SIG = 0x0080;
        /// Method should be inlined if possible
        const AGGRESSIVE_INLINING = 0x0100;
        /// Reserved, internal call
        const INTERNAL_CALL = 0x1000;
    }
}

bitflags! {
    /// `Param.Flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParamAttributes: u16 {
        /// Parameter is `[In]`
        const IN = 0x0001;
        /// Parameter is `[Out]`
        const OUT = 0x0002;
        /// Parameter is optional
        const OPTIONAL = 0x0010;
        /// Parameter has a default value
        const HAS_DEFAULT = 0x1000;
        /// Parameter has marshalling information
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

bitflags! {
    /// `Event.EventFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventAttributes: u16 {
        /// Event is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime should check the name encoding
        const RT_SPECIAL_NAME = 0x0400;
    }
}

bitflags! {
    /// `Property.Flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyAttributes: u16 {
        /// Property is special
        const SPECIAL_NAME = 0x0200;
        /// The runtime should check the name encoding
        const RT_SPECIAL_NAME = 0x0400;
        /// Property has a default value
        const HAS_DEFAULT = 0x1000;
    }
}

bitflags! {
    /// `MethodSemantics.Semantics`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodSemanticsAttributes: u16 {
        /// Property setter
        const SETTER = 0x0001;
        /// Property getter
        const GETTER = 0x0002;
        /// Other method for a property or event
        const OTHER = 0x0004;
        /// Event add method
        const ADD_ON = 0x0008;
        /// Event remove method
        const REMOVE_ON = 0x0010;
        /// Event fire method
        const FIRE = 0x0020;
    }
}

bitflags! {
    /// `Assembly.Flags` and `AssemblyRef.Flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AssemblyFlags: u32 {
        /// The assembly reference holds the full public key, not its token
        const PUBLIC_KEY = 0x0001;
        /// The implementation of this assembly may be retargeted at runtime
        const RETARGETABLE = 0x0100;
        /// JIT tracking is disabled
        const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
        /// JIT tracking is enabled
        const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
    }
}

bitflags! {
    /// `GenericParam.Flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GenericParamAttributes: u16 {
        /// Mask for the variance bits
        const VARIANCE_MASK = 0x0003;
        /// Parameter is covariant
        const COVARIANT = 0x0001;
        /// Parameter is contravariant
        const CONTRAVARIANT = 0x0002;
        /// Mask for the constraint bits
        const SPECIAL_CONSTRAINT_MASK = 0x001C;
        /// Argument must be a reference type
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// Argument must be a non-nullable value type
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// Argument must have a public default constructor
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

bitflags! {
    /// `ManifestResource.Flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ManifestResourceAttributes: u32 {
        /// Mask for the visibility bits
        const VISIBILITY_MASK = 0x0007;
        /// The resource is exported from the assembly
        const PUBLIC = 0x0001;
        /// The resource is private to the assembly
        const PRIVATE = 0x0002;
    }
}

bitflags! {
    /// `ImplMap.MappingFlags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PInvokeAttributes: u16 {
        /// PInvoke uses the member name as specified
        const NO_MANGLE = 0x0001;
        /// Mask for the character set bits
        const CHAR_SET_MASK = 0x0006;
        /// Strings are marshalled as ANSI
        const CHAR_SET_ANSI = 0x0002;
        /// Strings are marshalled as UTF-16
        const CHAR_SET_UNICODE = 0x0004;
        /// Character set is chosen automatically
        const CHAR_SET_AUTO = 0x0006;
        /// The callee sets the last error
        const SUPPORTS_LAST_ERROR = 0x0040;
        /// Mask for the calling convention bits
        const CALL_CONV_MASK = 0x0700;
        /// Platform default calling convention
        const CALL_CONV_PLATFORMAPI = 0x0100;
        /// `cdecl`
        const CALL_CONV_CDECL = 0x0200;
        /// `stdcall`
        const CALL_CONV_STDCALL = 0x0300;
        /// `thiscall`
        const CALL_CONV_THISCALL = 0x0400;
        /// `fastcall`
        const CALL_CONV_FASTCALL = 0x0500;
    }
}

bitflags! {
    /// `File.Flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileAttributes: u32 {
        /// The file is not a resource file
        const CONTAINS_META_DATA = 0x0000;
        /// The file is a resource file or other non-metadata file
        const CONTAINS_NO_META_DATA = 0x0001;
    }
}

impl TypeAttributes {
    /// True if the type is an interface
    #[must_use]
    pub fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }

    /// True if the visibility bits denote a nested type
    #[must_use]
    pub fn is_nested(self) -> bool {
        (self & Self::VISIBILITY_MASK).bits() >= Self::NESTED_PUBLIC.bits()
    }
}

impl MethodAttributes {
    /// True if the method has an implicit `this` argument
    #[must_use]
    pub fn is_instance(self) -> bool {
        !self.contains(Self::STATIC)
    }
}
