//! Coded indices (ECMA-335 II.24.2.6).
//!
//! A coded index multiplexes a row reference across several tables. The low `tag_bits` bits of
//! the stored value select the target table from the category's fixed, ordered member list; the
//! remaining bits hold the 1-based row, with `0` meaning "no reference".
//!
//! ```text
//! HasConstant (2 tag bits): Field = 0, Param = 1, Property = 2
//!
//! raw 0x000E  =>  tag 2 (Property), row 3  =>  Property row index 2 (0-based)
//! raw 0x0000  =>  null reference
//! ```

use strum::{EnumCount, EnumIter};

use crate::{
    metadata::{tables::TableId, token::Token},
    Error, Result,
};

/// The coded index categories.
///
/// Each category names a fixed, ordered list of tables a column of that kind may point into;
/// the position within the list is the tag value.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef`, `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param`, `Property`
    HasConstant,
    /// Any table that may carry a custom attribute
    HasCustomAttribute,
    /// `Field`, `Param`
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef`, `Assembly`
    HasDeclSecurity,
    /// `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef`, `TypeSpec`
    MemberRefParent,
    /// `Event`, `Property`
    HasSemantics,
    /// `MethodDef`, `MemberRef`
    MethodDefOrRef,
    /// `Field`, `MethodDef`
    MemberForwarded,
    /// `File`, `AssemblyRef`, `ExportedType`
    Implementation,
    /// `MethodDef` (tag 2), `MemberRef` (tag 3); tags 0, 1 and 4 are unused
    CustomAttributeType,
    /// `Module`, `ModuleRef`, `AssemblyRef`, `TypeRef`
    ResolutionScope,
    /// `TypeDef`, `MethodDef`
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The member tables of this category in tag order. Unused tags are `None`.
    #[must_use]
    pub fn tables(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &[
                Some(TableId::MethodDef),
                Some(TableId::Field),
                Some(TableId::TypeRef),
                Some(TableId::TypeDef),
                Some(TableId::Param),
                Some(TableId::InterfaceImpl),
                Some(TableId::MemberRef),
                Some(TableId::Module),
                // Labelled 'Permission' in the standard, no such table exists
                Some(TableId::DeclSecurity),
                Some(TableId::Property),
                Some(TableId::Event),
                Some(TableId::StandAloneSig),
                Some(TableId::ModuleRef),
                Some(TableId::TypeSpec),
                Some(TableId::Assembly),
                Some(TableId::AssemblyRef),
                Some(TableId::File),
                Some(TableId::ExportedType),
                Some(TableId::ManifestResource),
                Some(TableId::GenericParam),
                Some(TableId::GenericParamConstraint),
                Some(TableId::MethodSpec),
            ],
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => &[Some(TableId::MethodDef), Some(TableId::MemberRef)],
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
        }
    }

    /// Number of low bits that hold the tag
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        match self.tables().len() {
            0..=2 => 1,
            3..=4 => 2,
            5..=8 => 3,
            9..=16 => 4,
            _ => 5,
        }
    }

    /// Decode a raw coded index value of this category.
    ///
    /// A row of `0` yields a null reference regardless of the tag.
    ///
    /// # Arguments
    /// * 'raw' - The column value, tag in the low bits
    ///
    /// # Examples
    ///
    /// ```rust
    /// use clrscope::metadata::tables::{CodedIndexType, TableId};
    ///
    /// let reference = CodedIndexType::HasConstant.decode(0x000E)?;
    /// assert_eq!(reference.get(), Some((TableId::Property, 2)));
    /// assert!(CodedIndexType::HasConstant.decode(0)?.is_null());
    /// # Ok::<(), clrscope::Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns [`crate::Error::UnknownCodedTag`] if the tag selects no member table
    pub fn decode(self, raw: u32) -> Result<CodedReference> {
        let bits = self.tag_bits();
        let tag = raw & ((1 << bits) - 1);
        let row = raw >> bits;

        if row == 0 {
            return Ok(CodedReference::null(self));
        }

        match self.tables().get(tag as usize).copied().flatten() {
            Some(table) => Ok(CodedReference {
                category: self,
                target: Some(table),
                row: Some(row - 1),
            }),
            None => Err(Error::UnknownCodedTag {
                category: self,
                tag,
            }),
        }
    }

    /// Encode a reference to the 1-based `row` of `table`, `None` if `table` is not a member
    #[must_use]
    pub fn encode(self, table: TableId, row: u32) -> Option<u32> {
        let tag = self.tables().iter().position(|slot| *slot == Some(table))?;
        Some((row << self.tag_bits()) | tag as u32)
    }
}

/// A decoded coded index.
///
/// `row` is 0-based; a null reference has neither a target nor a row. Whether the referenced
/// row actually exists is checked by the row accessor that produced the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodedReference {
    /// The category the value was decoded with
    pub category: CodedIndexType,
    /// The table selected by the tag
    pub target: Option<TableId>,
    /// The 0-based row within `target`
    pub row: Option<u32>,
}

impl CodedReference {
    /// A reference to nothing
    #[must_use]
    pub fn null(category: CodedIndexType) -> Self {
        CodedReference {
            category,
            target: None,
            row: None,
        }
    }

    /// True if this reference points nowhere
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row.is_none()
    }

    /// The `(table, 0-based row)` pair, `None` for a null reference
    #[must_use]
    pub fn get(&self) -> Option<(TableId, u32)> {
        Some((self.target?, self.row?))
    }

    /// The metadata token of the referenced row, `None` for a null reference
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        let (table, row) = self.get()?;
        Some(Token::from_parts(table.as_u8(), row + 1))
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn tag_bits() {
        assert_eq!(CodedIndexType::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasCustomAttribute.tag_bits(), 5);
        assert_eq!(CodedIndexType::HasFieldMarshal.tag_bits(), 1);
        assert_eq!(CodedIndexType::MemberRefParent.tag_bits(), 3);
        assert_eq!(CodedIndexType::CustomAttributeType.tag_bits(), 3);
        assert_eq!(CodedIndexType::ResolutionScope.tag_bits(), 2);
    }

    #[test]
    fn decode_has_constant() {
        let reference = CodedIndexType::HasConstant.decode(0x000E).unwrap();
        assert_eq!(reference.get(), Some((TableId::Property, 2)));
        assert_eq!(reference.token(), Some(Token::new(0x1700_0003)));
    }

    #[test]
    fn decode_null() {
        let reference = CodedIndexType::HasConstant.decode(0).unwrap();
        assert!(reference.is_null());
        assert_eq!(reference.target, None);
        assert_eq!(reference.token(), None);

        // unused tag, but the row is zero
        assert!(CodedIndexType::CustomAttributeType.decode(0x1).unwrap().is_null());
    }

    #[test]
    fn decode_unknown_tag() {
        // HasConstant has 3 members, tag 3 is out of range
        assert!(matches!(
            CodedIndexType::HasConstant.decode(0x0007),
            Err(Error::UnknownCodedTag {
                category: CodedIndexType::HasConstant,
                tag: 3
            })
        ));

        // CustomAttributeType tag 0 is unused
        if CodedIndexType::CustomAttributeType.decode(0x0008).is_ok() {
            panic!("This should not be valid!")
        }

        let reference = CodedIndexType::CustomAttributeType.decode(0x000B).unwrap();
        assert_eq!(reference.get(), Some((TableId::MemberRef, 0)));
    }

    #[test]
    fn round_trip() {
        for category in CodedIndexType::iter() {
            for table in category.tables().iter().flatten() {
                for row in [1_u32, 2, 0x7FF] {
                    let raw = category.encode(*table, row).unwrap();
                    let reference = category.decode(raw).unwrap();
                    assert_eq!(reference.category, category);
                    assert_eq!(reference.get(), Some((*table, row - 1)));
                }

                assert!(category.decode(category.encode(*table, 0).unwrap()).unwrap().is_null());
            }
        }

        assert_eq!(
            CodedIndexType::TypeDefOrRef.encode(TableId::MethodDef, 1),
            None
        );
    }
}
