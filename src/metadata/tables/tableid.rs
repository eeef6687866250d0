use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Identifiers of the metadata tables defined by ECMA-335 II.22.
///
/// The discriminant of each variant is the table number used in the `valid` bitmask of the
/// tables header, and the top byte of every metadata token that addresses a row of that table.
///
/// ## Categories
///
/// - **Core type system**: `Module`, `TypeRef`, `TypeDef`, `Field`, `MethodDef`, `Param`
/// - **Relationships**: `InterfaceImpl`, `NestedClass`, `ClassLayout`, `FieldLayout`,
///   `MethodImpl`, `MethodSemantics`, `EventMap`, `PropertyMap`
/// - **Attributes and marshalling**: `Constant`, `CustomAttribute`, `FieldMarshal`,
///   `DeclSecurity`, `ImplMap`, `FieldRVA`
/// - **Signatures and generics**: `StandAloneSig`, `TypeSpec`, `MethodSpec`, `GenericParam`,
///   `GenericParamConstraint`
/// - **Assembly manifest**: `Assembly*`, `AssemblyRef*`, `File`, `ExportedType`,
///   `ManifestResource`, `ModuleRef`
/// - **Unoptimized streams only**: `FieldPtr`, `MethodPtr`, `ParamPtr`, `EventPtr`,
///   `PropertyPtr`, `EncLog`, `EncMap`
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, EnumIter, EnumCount)]
#[repr(u8)]
pub enum TableId {
    /// Module information (0x00), exactly one row
    Module = 0x00,
    /// References to types defined in other modules or assemblies (0x01)
    TypeRef = 0x01,
    /// Type definitions (0x02)
    TypeDef = 0x02,
    /// Indirection into the `Field` table (0x03)
    FieldPtr = 0x03,
    /// Field definitions (0x04)
    Field = 0x04,
    /// Indirection into the `MethodDef` table (0x05)
    MethodPtr = 0x05,
    /// Method definitions (0x06)
    MethodDef = 0x06,
    /// Indirection into the `Param` table (0x07)
    ParamPtr = 0x07,
    /// Parameter definitions (0x08)
    Param = 0x08,
    /// Interfaces implemented by a type (0x09)
    InterfaceImpl = 0x09,
    /// References to fields and methods of other types (0x0A)
    MemberRef = 0x0A,
    /// Compile time constant values (0x0B)
    Constant = 0x0B,
    /// Custom attribute instances (0x0C)
    CustomAttribute = 0x0C,
    /// Marshalling descriptors (0x0D)
    FieldMarshal = 0x0D,
    /// Declarative security permission sets (0x0E)
    DeclSecurity = 0x0E,
    /// Explicit type layouts (0x0F)
    ClassLayout = 0x0F,
    /// Explicit field offsets (0x10)
    FieldLayout = 0x10,
    /// Standalone signatures, e.g. local variables (0x11)
    StandAloneSig = 0x11,
    /// Maps a type to its events (0x12)
    EventMap = 0x12,
    /// Indirection into the `Event` table (0x13)
    EventPtr = 0x13,
    /// Event definitions (0x14)
    Event = 0x14,
    /// Maps a type to its properties (0x15)
    PropertyMap = 0x15,
    /// Indirection into the `Property` table (0x16)
    PropertyPtr = 0x16,
    /// Property definitions (0x17)
    Property = 0x17,
    /// Links accessor methods to their property or event (0x18)
    MethodSemantics = 0x18,
    /// Explicit method overrides (0x19)
    MethodImpl = 0x19,
    /// References to other modules of the assembly (0x1A)
    ModuleRef = 0x1A,
    /// Type specifications (0x1B)
    TypeSpec = 0x1B,
    /// P/Invoke mappings (0x1C)
    ImplMap = 0x1C,
    /// Initial data of fields (0x1D)
    FieldRVA = 0x1D,
    /// Edit-and-continue log (0x1E)
    EncLog = 0x1E,
    /// Edit-and-continue token map (0x1F)
    EncMap = 0x1F,
    /// The current assembly's manifest (0x20)
    Assembly = 0x20,
    /// Deprecated (0x21)
    AssemblyProcessor = 0x21,
    /// Deprecated (0x22)
    AssemblyOS = 0x22,
    /// References to other assemblies (0x23)
    AssemblyRef = 0x23,
    /// Deprecated (0x24)
    AssemblyRefProcessor = 0x24,
    /// Deprecated (0x25)
    AssemblyRefOS = 0x25,
    /// Files of a multi-file assembly (0x26)
    File = 0x26,
    /// Types exported from other modules (0x27)
    ExportedType = 0x27,
    /// Embedded or linked resources (0x28)
    ManifestResource = 0x28,
    /// Nesting relationships (0x29)
    NestedClass = 0x29,
    /// Generic parameters of types and methods (0x2A)
    GenericParam = 0x2A,
    /// Generic method instantiations (0x2B)
    MethodSpec = 0x2B,
    /// Constraints on generic parameters (0x2C)
    GenericParamConstraint = 0x2C,
}

impl TableId {
    /// Look up the table for a table number, `None` for numbers without a known table
    #[must_use]
    pub fn from_u8(value: u8) -> Option<TableId> {
        TableId::iter().nth(value as usize)
    }

    /// The table number, also used as the top byte of tokens
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The `*Ptr` table that may redirect rows of this table in an unoptimized stream
    #[must_use]
    pub fn pointer_table(self) -> Option<TableId> {
        match self {
            TableId::Field => Some(TableId::FieldPtr),
            TableId::MethodDef => Some(TableId::MethodPtr),
            TableId::Param => Some(TableId::ParamPtr),
            TableId::Event => Some(TableId::EventPtr),
            TableId::Property => Some(TableId::PropertyPtr),
            _ => None,
        }
    }
}
