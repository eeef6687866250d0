//! End-to-end tests over synthetic images, loaded through the public API only.

#[allow(dead_code)]
#[path = "../src/test/builder.rs"]
mod builder;

use builder::MetadataBuilder;
use clrscope::{
    disassembler::{FlowType, Operand},
    metadata::{
        signatures::ElementType,
        tables::{
            Constant, Field, MemberRef, MethodDef, Module, OwnedRange, TableId, TypeDef, TypeRef,
        },
    },
    Error, ImageAccessor, LoaderConfig, MetadataImage, Memory,
};
use rayon::prelude::*;

const CONSTANT: u8 = 0x0B;

fn load(builder: &MetadataBuilder) -> MetadataImage {
    let (data, rva, size) = builder.build_image();
    MetadataImage::from_accessor(Memory::new(data), rva, size).unwrap()
}

/// `<Module>`, `Demo.Program` with fields a, b and `Main`, `Demo.Helper` with field c and `Run`
fn two_types() -> MetadataBuilder {
    let mut builder = MetadataBuilder::new();

    let system = builder.string("System");
    let object = builder.string("Object");
    let demo = builder.string("Demo");
    let module = builder.string("<Module>");
    let program = builder.string("Program");
    let helper = builder.string("Helper");
    let int_field = builder.blob(&[0x06, 0x08]);
    let void_method = builder.blob(&[0x00, 0x00, 0x01]);
    let mvid = builder.guid([0xAB; 16]);
    let module_name = builder.string("demo.dll");

    builder.module(module_name, mvid);
    builder.typeref(0, object, system);

    // extends TypeDefOrRef: TypeRef row 1 -> (1 << 2) | 1
    builder.typedef(0, module, 0, 0, 1, 1);
    builder.typedef(0x0010_0001, program, demo, 5, 1, 1);
    builder.typedef(0x0010_0001, helper, demo, 5, 3, 2);

    for name in ["a", "b", "c"] {
        let name = builder.string(name);
        builder.field(0x0001, name, int_field);
    }
    for name in ["Main", "Run"] {
        let name = builder.string(name);
        builder.method(0, 0x0016, name, void_method, 1);
    }

    builder
}

fn assert_partition(ranges: impl Iterator<Item = OwnedRange>, count: u32) {
    let mut covered: Vec<u32> = ranges.flat_map(|range| range.iter()).collect();
    covered.sort_unstable();
    assert_eq!(covered, (0..count).collect::<Vec<_>>());
}

#[test]
fn types_members_and_owned_ranges() {
    let image = load(&two_types());

    assert_eq!(image.tables().row_count(TableId::TypeDef), 3);
    for table in image.tables().present() {
        assert_eq!(table.rows().count() as u32, table.row_count());
    }

    let module = image.get::<Module>(0).unwrap();
    assert_eq!(module.name, "demo.dll");
    assert_eq!(module.mvid.to_bytes(), [0xAB; 16]);

    let types: Vec<TypeDef> = image
        .iter::<TypeDef>()
        .collect::<clrscope::Result<_>>()
        .unwrap();
    assert_eq!(types[1].fullname(), "Demo.Program");
    assert_eq!(types[0].fields.iter().collect::<Vec<_>>(), Vec::<u32>::new());
    assert_eq!(types[1].fields.iter().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(types[2].fields.iter().collect::<Vec<_>>(), vec![2]);
    assert_eq!(types[1].methods.iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(types[2].methods.iter().collect::<Vec<_>>(), vec![1]);

    // The ranges partition the target tables without gaps or overlap
    assert_partition(types.iter().map(|t| t.fields), image.tables().row_count(TableId::Field));
    assert_partition(
        types.iter().map(|t| t.methods),
        image.tables().row_count(TableId::MethodDef),
    );

    let field = image.get::<Field>(types[2].fields.start).unwrap();
    assert_eq!(field.name, "c");
    assert_eq!(field.signature(&image).unwrap().return_type.base, ElementType::I4);

    let method = image.get::<MethodDef>(types[2].methods.start).unwrap();
    assert_eq!(method.name, "Run");
    assert!(method.params.is_empty());

    let base = image.resolve(&types[1].extends).unwrap().unwrap();
    assert_eq!(base.table_id(), TableId::TypeRef);
    let base = image.get::<TypeRef>(base.index()).unwrap();
    assert_eq!((base.namespace, base.name), ("System", "Object"));

    assert!(image.resolve(&types[0].extends).unwrap().is_none());
}

#[test]
fn null_and_dangling_coded_references() {
    let mut builder = two_types();
    let value = builder.blob(&42_i32.to_le_bytes());

    // HasConstant: Field row n -> n << 2
    for parent in [0_u16, 3 << 2, 9 << 2] {
        let mut row = vec![0x08, 0x00];
        row.extend_from_slice(&parent.to_le_bytes());
        row.extend_from_slice(&value.to_le_bytes());
        builder.row(CONSTANT, row);
    }

    let image = load(&builder);
    let constants: Vec<clrscope::Result<Constant>> = image.iter::<Constant>().collect();
    assert_eq!(constants.len(), 3);

    let null = constants[0].as_ref().unwrap();
    assert!(null.parent.is_null());
    assert!(image.resolve(&null.parent).unwrap().is_none());

    let owned = constants[1].as_ref().unwrap();
    let parent = image.resolve(&owned.parent).unwrap().unwrap();
    assert_eq!(image.get::<Field>(parent.index()).unwrap().name, "c");
    assert_eq!(owned.value, &42_i32.to_le_bytes());

    // The broken row fails on its own, its siblings above are unaffected
    assert!(matches!(
        constants[2],
        Err(Error::DanglingReference {
            table: TableId::Field,
            row: 9
        })
    ));
}

#[test]
fn disassemble_hello_world() {
    let mut builder = MetadataBuilder::new();
    let system = builder.string("System");
    let console = builder.string("Console");
    let write_line = builder.string("WriteLine");
    let main = builder.string("Main");
    let args = builder.string("args");
    let void_string = builder.blob(&[0x00, 0x01, 0x01, 0x0E]);
    let void_strings = builder.blob(&[0x00, 0x01, 0x01, 0x1D, 0x0E]);
    let hello = builder.user_string("Hello, World!");

    builder.typeref(0, console, system);
    // MemberRefParent: TypeRef row 1 -> (1 << 3) | 1
    builder.member_ref(9, write_line, void_string);

    #[rustfmt::skip]
    let rva = builder.body(&[
        0x2E,
        0x72, hello as u8, 0x00, 0x00, 0x70,    // ldstr
        0x28, 0x01, 0x00, 0x00, 0x0A,           // call
        0x2A,                                   // ret
    ]);
    builder.method(rva, 0x0016, main, void_strings, 1);
    builder.param(0, 1, args);

    let image = load(&builder);
    let method = image.get::<MethodDef>(0).unwrap();
    let signature = method.signature(&image).unwrap();
    assert_eq!(signature.params.len(), 1);
    assert!(signature.params[0].is_array());

    let code = image.disassemble(0).unwrap();
    let listing: Vec<String> = code
        .instructions()
        .map(|instruction| instruction.map(|i| i.to_string()))
        .collect::<clrscope::Result<_>>()
        .unwrap();
    assert_eq!(
        listing,
        [
            "IL_0000: ldstr \"Hello, World!\"",
            "IL_0005: call 0x0a000001",
            "IL_000a: ret",
        ]
    );

    // Restartable: a second pass yields the same instructions
    let first: Vec<_> = code.instructions().flatten().collect();
    let second: Vec<_> = code.instructions().flatten().collect();
    assert_eq!(first, second);
    assert_eq!(first[1].flow_type, FlowType::Call);
    assert_eq!(first[2].flow_type, FlowType::Return);

    let Operand::Token(token) = first[1].operand else {
        panic!("call without a token operand");
    };
    let callee = image.get::<MemberRef>(token.row() - 1).unwrap();
    assert_eq!(callee.name, "WriteLine");
    let class = image.resolve(&callee.class).unwrap().unwrap();
    assert_eq!(image.get::<TypeRef>(class.index()).unwrap().name, "Console");
}

#[test]
fn failures_stay_local() {
    let mut builder = MetadataBuilder::new();
    let truncated = builder.blob(&[0x06]);
    let valid = builder.blob(&[0x06, 0x0E]);
    let void_method = builder.blob(&[0x00, 0x00, 0x01]);
    let broken = builder.string("Broken");
    let fine = builder.string("Fine");

    builder.field(0x0001, broken, truncated);
    builder.field(0x0001, fine, valid);

    // nop, then an undefined two-byte opcode
    let bad = builder.body(&[0x0E, 0x00, 0xFE, 0xFF]);
    let good = builder.body(&[0x06, 0x2A]);
    builder.method(bad, 0x0016, broken, void_method, 1);
    builder.method(good, 0x0016, fine, void_method, 1);

    let image = load(&builder);

    let signatures: Vec<_> = image
        .iter::<Field>()
        .map(|field| field.and_then(|field| field.signature(&image)))
        .collect();
    assert!(matches!(
        signatures[0],
        Err(Error::SignatureTruncated { .. })
    ));
    assert_eq!(
        signatures[1].as_ref().unwrap().return_type.base,
        ElementType::String
    );

    let broken = image.disassemble(0).unwrap();
    let mut instructions = broken.instructions();
    assert!(instructions.next().unwrap().is_ok());
    assert!(matches!(
        instructions.next(),
        Some(Err(Error::UnsupportedOpcode {
            offset: 1,
            opcode: 0xFEFF
        }))
    ));
    assert!(instructions.next().is_none());

    let fine = image.disassemble(1).unwrap();
    assert_eq!(fine.instructions().count(), 1);
}

#[test]
fn concurrent_readers() {
    let image = load(&two_types());

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let names: Vec<String> = image
                    .iter::<TypeDef>()
                    .map(|typedef| typedef.unwrap().fullname())
                    .collect();
                assert_eq!(names, ["<Module>", "Demo.Program", "Demo.Helper"]);
                assert!(image.disassemble(0).unwrap().code().is_empty());
            });
        }
    });

    let fields = image.tables().table(TableId::Field).unwrap();
    assert_eq!(fields.par_rows().filter(|row| row.is_ok()).count(), 3);
}

#[test]
fn damaged_inputs_do_not_panic() {
    let data = two_types().build();
    let size = data.len() as u32;

    for len in 0..data.len() {
        let _ = MetadataImage::from_metadata(data[..len].to_vec());
    }
    assert!(MetadataImage::from_metadata(data.clone()).is_ok());

    if MetadataImage::from_mem(vec![0_u8; 256]).is_ok() {
        panic!("This should not be valid!")
    }

    let accessor = Memory::new(data);
    assert!(accessor.read_bytes(size, 1).is_err());
    if MetadataImage::from_accessor_with_config(accessor, 0, size + 4, LoaderConfig::strict())
        .is_ok()
    {
        panic!("This should not be valid!")
    }
}
