use crate::{
    metadata::{
        identity::{AssemblyIdentity, AssemblyVersion},
        streams::HeapStore,
        tables::{
            rows::{
                blob, check_table, string, AssemblyFlags, FileAttributes,
                ManifestResourceAttributes, RowProjection, TypeAttributes,
            },
            CodedReference, Row, TableId,
        },
        token::Token,
    },
    Result,
};

fn identity(name: &str, version: AssemblyVersion, culture: &str, key: &[u8]) -> AssemblyIdentity {
    AssemblyIdentity {
        name: name.to_string(),
        version,
        culture: (!culture.is_empty()).then(|| culture.to_string()),
        public_key_or_token: (!key.is_empty()).then(|| key.to_vec()),
    }
}

fn version(row: &Row<'_>, first: usize) -> Result<AssemblyVersion> {
    Ok(AssemblyVersion {
        major: row.u16(first)?,
        minor: row.u16(first + 1)?,
        build: row.u16(first + 2)?,
        revision: row.u16(first + 3)?,
    })
}

/// The `Assembly` table (0x20), the manifest of the current assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly<'a> {
    /// Token of this row
    pub token: Token,
    /// Hash algorithm of the file hashes in the manifest
    pub hash_alg_id: u32,
    /// Four part version
    pub version: AssemblyVersion,
    /// Assembly flags
    pub flags: AssemblyFlags,
    /// Full public key, empty for unsigned assemblies
    pub public_key: &'a [u8],
    /// Simple name
    pub name: &'a str,
    /// Culture, empty for neutral assemblies
    pub culture: &'a str,
}

impl Assembly<'_> {
    /// The identity this assembly is referenced by
    #[must_use]
    pub fn identity(&self) -> AssemblyIdentity {
        identity(self.name, self.version, self.culture, self.public_key)
    }
}

impl<'a> RowProjection<'a> for Assembly<'a> {
    const TABLE: TableId = TableId::Assembly;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(Assembly {
            token: row.token(),
            hash_alg_id: row.u32(0)?,
            version: version(row, 1)?,
            flags: AssemblyFlags::from_bits_retain(row.u32(5)?),
            public_key: blob(row, 6, heaps)?,
            name: string(row, 7, heaps)?,
            culture: string(row, 8, heaps)?,
        })
    }
}

/// The `AssemblyRef` table (0x23), assemblies this module depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRef<'a> {
    /// Token of this row
    pub token: Token,
    /// Four part version
    pub version: AssemblyVersion,
    /// Assembly flags, [`AssemblyFlags::PUBLIC_KEY`] if `public_key_or_token` is a full key
    pub flags: AssemblyFlags,
    /// Public key or its 8 byte token
    pub public_key_or_token: &'a [u8],
    /// Simple name
    pub name: &'a str,
    /// Culture, empty for neutral assemblies
    pub culture: &'a str,
    /// Hash of the referenced assembly
    pub hash_value: &'a [u8],
}

impl AssemblyRef<'_> {
    /// The identity of the referenced assembly
    #[must_use]
    pub fn identity(&self) -> AssemblyIdentity {
        identity(self.name, self.version, self.culture, self.public_key_or_token)
    }
}

impl<'a> RowProjection<'a> for AssemblyRef<'a> {
    const TABLE: TableId = TableId::AssemblyRef;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(AssemblyRef {
            token: row.token(),
            version: version(row, 0)?,
            flags: AssemblyFlags::from_bits_retain(row.u32(4)?),
            public_key_or_token: blob(row, 5, heaps)?,
            name: string(row, 6, heaps)?,
            culture: string(row, 7, heaps)?,
            hash_value: blob(row, 8, heaps)?,
        })
    }
}

/// The `AssemblyProcessor` table (0x21), unused by current runtimes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyProcessor {
    /// Token of this row
    pub token: Token,
    /// Processor architecture
    pub processor: u32,
}

impl RowProjection<'_> for AssemblyProcessor {
    const TABLE: TableId = TableId::AssemblyProcessor;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(AssemblyProcessor {
            token: row.token(),
            processor: row.u32(0)?,
        })
    }
}

/// The `AssemblyOS` table (0x22), unused by current runtimes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOs {
    /// Token of this row
    pub token: Token,
    /// Platform id
    pub platform_id: u32,
    /// Major OS version
    pub major_version: u32,
    /// Minor OS version
    pub minor_version: u32,
}

impl RowProjection<'_> for AssemblyOs {
    const TABLE: TableId = TableId::AssemblyOS;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(AssemblyOs {
            token: row.token(),
            platform_id: row.u32(0)?,
            major_version: row.u32(1)?,
            minor_version: row.u32(2)?,
        })
    }
}

/// The `AssemblyRefProcessor` table (0x24)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRefProcessor {
    /// Token of this row
    pub token: Token,
    /// Processor architecture
    pub processor: u32,
    /// The reference, 0-based `AssemblyRef` row
    pub assembly_ref: Option<u32>,
}

impl RowProjection<'_> for AssemblyRefProcessor {
    const TABLE: TableId = TableId::AssemblyRefProcessor;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(AssemblyRefProcessor {
            token: row.token(),
            processor: row.u32(0)?,
            assembly_ref: row.table_index(1)?,
        })
    }
}

/// The `AssemblyRefOS` table (0x25)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyRefOs {
    /// Token of this row
    pub token: Token,
    /// Platform id
    pub platform_id: u32,
    /// Major OS version
    pub major_version: u32,
    /// Minor OS version
    pub minor_version: u32,
    /// The reference, 0-based `AssemblyRef` row
    pub assembly_ref: Option<u32>,
}

impl RowProjection<'_> for AssemblyRefOs {
    const TABLE: TableId = TableId::AssemblyRefOS;

    fn project(row: &Row<'_>, _heaps: &HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(AssemblyRefOs {
            token: row.token(),
            platform_id: row.u32(0)?,
            major_version: row.u32(1)?,
            minor_version: row.u32(2)?,
            assembly_ref: row.table_index(3)?,
        })
    }
}

/// The `File` table (0x26), other files of a multi-file assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile<'a> {
    /// Token of this row
    pub token: Token,
    /// File flags
    pub flags: FileAttributes,
    /// File name, without a path
    pub name: &'a str,
    /// Hash of the file contents
    pub hash_value: &'a [u8],
}

impl<'a> RowProjection<'a> for ManifestFile<'a> {
    const TABLE: TableId = TableId::File;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(ManifestFile {
            token: row.token(),
            flags: FileAttributes::from_bits_retain(row.u32(0)?),
            name: string(row, 1, heaps)?,
            hash_value: blob(row, 2, heaps)?,
        })
    }
}

/// The `ExportedType` table (0x27), types forwarded or exported from other modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedType<'a> {
    /// Token of this row
    pub token: Token,
    /// Type attributes
    pub flags: TypeAttributes,
    /// Hint, the `TypeDef` token in the defining module
    pub type_def_id: u32,
    /// Simple name
    pub name: &'a str,
    /// Namespace
    pub namespace: &'a str,
    /// Where the type is defined: a `File`, `AssemblyRef` or enclosing `ExportedType`
    pub implementation: CodedReference,
}

impl<'a> RowProjection<'a> for ExportedType<'a> {
    const TABLE: TableId = TableId::ExportedType;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(ExportedType {
            token: row.token(),
            flags: TypeAttributes::from_bits_retain(row.u32(0)?),
            type_def_id: row.u32(1)?,
            name: string(row, 2, heaps)?,
            namespace: string(row, 3, heaps)?,
            implementation: row.coded(4)?,
        })
    }
}

/// The `ManifestResource` table (0x28)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestResource<'a> {
    /// Token of this row
    pub token: Token,
    /// Offset into the resource section, or into the file named by `implementation`
    pub offset: u32,
    /// Visibility flags
    pub flags: ManifestResourceAttributes,
    /// Resource name
    pub name: &'a str,
    /// Null for resources embedded in this image
    pub implementation: CodedReference,
}

impl<'a> RowProjection<'a> for ManifestResource<'a> {
    const TABLE: TableId = TableId::ManifestResource;

    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self> {
        check_table(row, Self::TABLE)?;

        Ok(ManifestResource {
            token: row.token(),
            offset: row.u32(0)?,
            flags: ManifestResourceAttributes::from_bits_retain(row.u32(1)?),
            name: string(row, 2, heaps)?,
            implementation: row.coded(3)?,
        })
    }
}
