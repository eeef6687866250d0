//! Typed projections of table rows.
//!
//! A [`Row`] only knows column kinds; a projection interprets one row of a specific table,
//! resolving heap references against the image's [`HeapStore`]. Projections never hold on to
//! other rows: cross-table links stay as [`crate::metadata::tables::CodedReference`]s, row
//! indices or [`crate::metadata::tables::OwnedRange`]s and are followed on demand. Blob
//! columns are decoded through [`crate::MetadataImage::signature_decoder`], which applies the
//! image's configured nesting limit.
//!
//! ```rust,no_run
//! use clrscope::{metadata::tables::TypeDef, MetadataImage};
//!
//! let image = MetadataImage::from_file(std::path::Path::new("tests/samples/app.dll"))?;
//! for typedef in image.iter::<TypeDef>() {
//!     match typedef {
//!         Ok(typedef) => println!("{}.{}", typedef.namespace, typedef.name),
//!         Err(error) => eprintln!("skipping broken row: {error}"),
//!     }
//! }
//! # Ok::<(), clrscope::Error>(())
//! ```

mod assembly;
mod attributes;
mod events;
mod flags;
mod generics;
mod members;
mod module;
mod ptr;
mod typedef;

pub use assembly::*;
pub use attributes::*;
pub use events::*;
pub use flags::*;
pub use generics::*;
pub use members::*;
pub use module::*;
pub use ptr::*;
pub use typedef::*;

use crate::{
    metadata::{
        streams::HeapStore,
        tables::{Row, TableId},
    },
    Result,
};

/// A typed view of one row of the table `TABLE`
pub trait RowProjection<'a>: Sized {
    /// The table this projection reads
    const TABLE: TableId;

    /// Interpret `row`, which must belong to `Self::TABLE`
    ///
    /// # Errors
    /// Returns an error if a column fails to decode or a heap reference is invalid
    fn project(row: &Row<'_>, heaps: &'a HeapStore) -> Result<Self>;
}

pub(crate) fn check_table(row: &Row<'_>, table: TableId) -> Result<()> {
    if row.table_id() == table {
        Ok(())
    } else {
        Err(malformed_error!(
            "Row of {:?} cannot be read as {:?}",
            row.table_id(),
            table
        ))
    }
}

pub(crate) fn string<'a>(row: &Row<'_>, column: usize, heaps: &'a HeapStore) -> Result<&'a str> {
    heaps.string_at(row.heap(column)?)
}

pub(crate) fn blob<'a>(row: &Row<'_>, column: usize, heaps: &'a HeapStore) -> Result<&'a [u8]> {
    heaps.blob_at(row.heap(column)?)
}

pub(crate) fn guid(row: &Row<'_>, column: usize, heaps: &HeapStore) -> Result<uguid::Guid> {
    heaps.guid_at(row.heap(column)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        file::Memory,
        metadata::{
            config::LoaderConfig, identity::AssemblyVersion, image::MetadataImage, token::Token,
        },
        test::MetadataBuilder,
        Error,
    };

    const INTERFACEIMPL: u8 = 0x09;
    const ASSEMBLYREF: u8 = 0x23;
    const NESTEDCLASS: u8 = 0x29;
    const GENERICPARAM: u8 = 0x2A;
    const FIELDPTR: u8 = 0x03;

    fn cells(cells: &[u16]) -> Vec<u8> {
        cells.iter().flat_map(|cell| cell.to_le_bytes()).collect()
    }

    /// `<Module>`, `Outer<T>` implementing `IFoo`, `Inner` nested in `Outer`, method `M<U>`
    fn generic_types() -> MetadataImage {
        let mut builder = MetadataBuilder::new();
        let module = builder.string("<Module>");
        let outer = builder.string("Outer");
        let inner = builder.string("Inner");
        let ifoo = builder.string("IFoo");
        let method = builder.string("M");
        let field = builder.string("f");
        let t = builder.string("T");
        let u = builder.string("U");
        let int_field = builder.blob(&[0x06, 0x08]);
        let void_method = builder.blob(&[0x10, 0x01, 0x00, 0x01]);

        builder.typeref(0, ifoo, 0);
        builder.typedef(0, module, 0, 0, 1, 1);
        builder.typedef(0x0010_0001, outer, 0, 0, 1, 1);
        builder.typedef(0x0010_0002, inner, 0, 0, 2, 2);
        builder.field(0x0001, field, int_field);
        builder.method(0, 0x0016, method, void_method, 1);
        builder.member_ref(9, field, int_field);

        // TypeOrMethodDef: TypeDef row 2 -> 2 << 1, MethodDef row 1 -> (1 << 1) | 1
        builder.row(GENERICPARAM, cells(&[0, 0, 4, t]));
        builder.row(GENERICPARAM, cells(&[0, 0, 3, u]));
        builder.row(NESTEDCLASS, cells(&[3, 2]));
        builder.row(INTERFACEIMPL, cells(&[2, 5]));

        MetadataImage::from_metadata(builder.build()).unwrap()
    }

    #[test]
    fn generic_params_and_nesting() {
        let image = generic_types();

        let type_param = image.get::<GenericParam>(0).unwrap();
        assert_eq!(type_param.token, Token::new(0x2A00_0001));
        assert_eq!(type_param.name, "T");
        assert_eq!(type_param.owner.get(), Some((TableId::TypeDef, 1)));

        let method_param = image.get::<GenericParam>(1).unwrap();
        assert_eq!(method_param.name, "U");
        assert_eq!(method_param.owner.token(), Some(Token::new(0x0600_0001)));

        let nested = image.get::<NestedClass>(0).unwrap();
        assert_eq!(nested.nested_class, Some(2));
        assert_eq!(nested.enclosing_class, Some(1));

        let implementation = image.get::<InterfaceImpl>(0).unwrap();
        assert_eq!(implementation.class, Some(1));
        assert_eq!(implementation.interface.get(), Some((TableId::TypeRef, 0)));

        let method = image.get::<MethodDef>(0).unwrap();
        assert_eq!(method.signature(&image).unwrap().generic_param_count, 1);

        let member = image.get::<MemberRef>(0).unwrap();
        assert!(member.is_field());
        assert_eq!(member.class.get(), Some((TableId::TypeRef, 0)));
    }

    #[test]
    fn signatures_follow_the_configured_depth() {
        let mut builder = MetadataBuilder::new();
        let name = builder.string("deep");
        let mut nested = vec![0x06];
        for _ in 0..60 {
            nested.extend_from_slice(&[0x15, 0x12, 0x09, 0x01]);
        }
        nested.push(0x08);
        let signature = builder.blob(&nested);
        builder.field(0x0001, name, signature);

        let data = builder.build();
        let size = data.len() as u32;

        let image = MetadataImage::from_metadata(data.clone()).unwrap();
        let field = image.get::<Field>(0).unwrap();
        assert!(matches!(
            field.signature(&image),
            Err(Error::RecursionLimit(50))
        ));

        let lenient = MetadataImage::from_accessor_with_config(
            Memory::new(data),
            0,
            size,
            LoaderConfig::lenient(),
        )
        .unwrap();
        let field = lenient.get::<Field>(0).unwrap();
        let decoded = field.signature(&lenient).unwrap();
        assert!(decoded.return_type.generic);
        assert_eq!(decoded.return_type.generic_args.len(), 1);
    }

    #[test]
    fn projection_checks_the_table() {
        let image = generic_types();
        let row = image.tables().row(TableId::TypeDef, 0).unwrap();

        assert!(TypeDef::project(&row, image.heaps()).is_ok());
        if Field::project(&row, image.heaps()).is_ok() {
            panic!("This should not be valid!")
        }
    }

    #[test]
    fn assembly_ref_identity() {
        let mut builder = MetadataBuilder::new();
        let name = builder.string("mscorlib");
        #[rustfmt::skip]
        let token = builder.blob(&[0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89]);

        let mut row = cells(&[4, 0, 0, 0]);
        row.extend_from_slice(&0_u32.to_le_bytes());
        row.extend(cells(&[token, name, 0, 0]));
        builder.row(ASSEMBLYREF, row);

        let image = MetadataImage::from_metadata(builder.build()).unwrap();
        let reference = image.get::<AssemblyRef>(0).unwrap();
        assert_eq!(reference.name, "mscorlib");
        assert!(reference.hash_value.is_empty());

        let identity = reference.identity();
        assert_eq!(identity.version, AssemblyVersion::new(4, 0, 0, 0));
        assert_eq!(identity.culture, None);
        assert_eq!(identity.public_key_or_token.as_deref().map(<[u8]>::len), Some(8));
    }

    #[test]
    fn pointer_rows() {
        let mut builder = MetadataBuilder::new();
        builder.uncompressed();
        let first = builder.string("a");
        let second = builder.string("b");
        let signature = builder.blob(&[0x06, 0x08]);
        builder.field(0x0001, first, signature);
        builder.field(0x0001, second, signature);
        builder.row(FIELDPTR, cells(&[2]));
        builder.row(FIELDPTR, cells(&[1]));

        let image = MetadataImage::from_metadata(builder.build()).unwrap();
        let pointers: Vec<FieldPtr> = image.iter::<FieldPtr>().collect::<Result<_>>().unwrap();
        assert_eq!(pointers[0].target, Some(1));
        assert_eq!(pointers[1].target, Some(0));
        assert_eq!(pointers[1].token, Token::new(0x0300_0002));
    }
}
