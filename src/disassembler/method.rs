use crate::{
    disassembler::{ArgumentRef, Instructions, OperandResolver},
    metadata::{
        image::MetadataImage,
        method::{ExceptionHandler, MethodBody},
        tables::{MethodDef, Param, RowProjection},
        token::{Token, USER_STRING_TOKEN},
    },
    Error, Result,
};

/// A declared parameter of the disassembled method
#[derive(Debug, Clone)]
struct DeclaredParam {
    sequence: u16,
    row: u32,
    name: String,
}

/// The framed body of one method, ready to be disassembled.
///
/// Resolves operands against the image it was read from: tokens are checked against the
/// tables, `ldstr` literals are read from `#US` and argument slots are matched with the
/// method's `Param` rows.
pub struct MethodCode<'a> {
    /// Token of the `MethodDef` row
    pub token: Token,
    /// The parsed body header and exception clauses
    pub body: MethodBody,
    data: Vec<u8>,
    has_this: bool,
    params: Vec<DeclaredParam>,
    image: &'a MetadataImage,
}

impl<'a> MethodCode<'a> {
    pub(crate) fn new(image: &'a MetadataImage, method: &MethodDef<'_>) -> Result<Self> {
        let (body, data) = MethodBody::read(image.accessor(), method.rva)?;

        let mut params = Vec::with_capacity(method.params.len() as usize);
        for row in image.tables().range_rows(&method.params) {
            let row = row?;
            let param = Param::project(&row, image.heaps())?;
            params.push(DeclaredParam {
                sequence: param.sequence,
                row: row.index(),
                name: param.name.to_string(),
            });
        }

        tracing::debug!(
            "method {} at RVA {:#x}: {} bytes of code, {} exception clauses",
            method.token,
            method.rva,
            body.size_code,
            body.exception_handlers.len()
        );

        Ok(MethodCode {
            token: method.token,
            body,
            data,
            has_this: method.flags.is_instance(),
            params,
            image,
        })
    }

    /// The code bytes, without header and data sections. Empty for methods without a body.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        self.data
            .get(self.body.size_header..self.body.size())
            .unwrap_or(&[])
    }

    /// The instructions of the method, resolved against the image
    #[must_use]
    pub fn instructions(&self) -> Instructions<'_, Self> {
        Instructions::new(self.code(), self)
    }

    /// The exception clauses of the body
    #[must_use]
    pub fn exception_handlers(&self) -> &[ExceptionHandler] {
        &self.body.exception_handlers
    }

    /// True if argument 0 is the implicit `this`
    #[must_use]
    pub fn has_this(&self) -> bool {
        self.has_this
    }
}

impl OperandResolver for MethodCode<'_> {
    fn token(&self, token: Token) -> Result<Token> {
        let Some(table) = token.table_id() else {
            return Err(malformed_error!("Token {} addresses no metadata table", token));
        };

        if token.row() == 0 || token.row() > self.image.tables().row_count(table) {
            return Err(Error::DanglingReference {
                table,
                row: token.row(),
            });
        }

        Ok(token)
    }

    fn user_string(&self, token: Token) -> Result<Option<String>> {
        if token.table() != USER_STRING_TOKEN {
            return Err(malformed_error!("ldstr operand {} is not a string token", token));
        }

        self.image.heaps().user_string_at(token.row()).map(Some)
    }

    fn argument(&self, index: u16) -> Result<ArgumentRef> {
        if self.has_this && index == 0 {
            return Ok(ArgumentRef {
                index,
                is_this: true,
                param: None,
                name: None,
            });
        }

        let sequence = if self.has_this {
            index
        } else {
            index.saturating_add(1)
        };

        let declared = self.params.iter().find(|param| param.sequence == sequence);
        Ok(ArgumentRef {
            index,
            is_this: false,
            param: declared.map(|param| param.row),
            name: declared.map(|param| param.name.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        disassembler::Operand,
        file::Memory,
        metadata::{image::MetadataImage, method::ExceptionClauseKind},
        test::MetadataBuilder,
        Error,
    };

    fn image(builder: &MetadataBuilder) -> MetadataImage {
        let (data, rva, size) = builder.build_image();
        MetadataImage::from_accessor(Memory::new(data), rva, size).unwrap()
    }

    #[test]
    fn static_method_arguments_and_strings() {
        let mut builder = MetadataBuilder::new();
        let hello = builder.user_string("hello");
        let name = builder.string("Greet");
        let first = builder.string("who");
        let signature = builder.blob(&[0x00, 0x01, 0x01, 0x0E]);

        #[rustfmt::skip]
        let rva = builder.body(&[
            0x1E,                           // tiny, 7 bytes
            0x72, hello as u8, 0, 0, 0x70,  // ldstr
            0x02,                           // ldarg.0
            0x2A,                           // ret
        ]);
        builder.method(rva, 0x0016, name, signature, 1);
        builder.param(0, 1, first);

        let image = image(&builder);
        let code = image.disassemble(0).unwrap();
        assert!(!code.has_this());
        assert_eq!(code.code().len(), 7);

        let instructions: Vec<_> = code.instructions().collect::<crate::Result<_>>().unwrap();
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].operand, Operand::String("hello".to_string()));
        match &instructions[1].operand {
            Operand::Argument(argument) => {
                assert!(!argument.is_this);
                assert_eq!(argument.param, Some(0));
                assert_eq!(argument.name.as_deref(), Some("who"));
            }
            other => panic!("unexpected operand {other:?}"),
        }
        assert_eq!(instructions[2].mnemonic, "ret");
    }

    #[test]
    fn instance_method_this_and_tokens() {
        let mut builder = MetadataBuilder::new();
        let name = builder.string("Run");
        let value = builder.string("value");
        let signature = builder.blob(&[0x20, 0x01, 0x01, 0x08]);

        #[rustfmt::skip]
        let rva = builder.body(&[
            0x32,                           // tiny, 12 bytes
            0x02,                           // ldarg.0
            0x03,                           // ldarg.1
            0x28, 0x01, 0x00, 0x00, 0x06,   // call 0x06000001
            0x28, 0x05, 0x00, 0x00, 0x06,   // call 0x06000005
        ]);
        builder.method(rva, 0x0006, name, signature, 1);
        builder.param(0, 1, value);

        let image = image(&builder);
        let code = image.disassemble(0).unwrap();
        assert!(code.has_this());

        let mut instructions = code.instructions();
        match instructions.next().unwrap().unwrap().operand {
            Operand::Argument(argument) => assert!(argument.is_this),
            other => panic!("unexpected operand {other:?}"),
        }
        match instructions.next().unwrap().unwrap().operand {
            Operand::Argument(argument) => assert_eq!(argument.name.as_deref(), Some("value")),
            other => panic!("unexpected operand {other:?}"),
        }
        assert!(instructions.next().unwrap().is_ok());
        assert!(matches!(
            instructions.next(),
            Some(Err(Error::DanglingReference { row: 5, .. }))
        ));
        assert!(instructions.next().is_none());
    }

    #[test]
    fn fat_body_with_clauses_and_locals() {
        let mut builder = MetadataBuilder::new();
        let name = builder.string("Guarded");
        let signature = builder.blob(&[0x00, 0x00, 0x01]);
        let locals = builder.blob(&[0x07, 0x01, 0x08]);
        builder.standalone_sig(locals);

        #[rustfmt::skip]
        let rva = builder.body(&[
            0x1B, 0x30, 0x02, 0x00,         // fat, MORE_SECTS | INIT_LOCALS, max stack 2
            0x06, 0x00, 0x00, 0x00,         // code size
            0x01, 0x00, 0x00, 0x11,         // locals 0x11000001
            0x00,                           // nop
            0xDE, 0x02,                     // leave.s IL_0005
            0x00,                           // nop
            0xDC,                           // endfinally
            0x2A,                           // ret
            0x00, 0x00,
            0x01, 0x10, 0x00, 0x00,         // small EH section, 1 clause
            0x02, 0x00, 0x00, 0x00, 0x03, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ]);
        builder.method(rva, 0x0016, name, signature, 1);

        let image = image(&builder);
        let code = image.disassemble(0).unwrap();
        assert!(code.body.is_init_local());
        assert_eq!(code.body.max_stack, 2);
        assert_eq!(code.exception_handlers().len(), 1);
        assert_eq!(code.exception_handlers()[0].kind(), ExceptionClauseKind::Finally);

        let instructions = crate::disassembler::decode_stream(code.code(), &code).unwrap();
        assert_eq!(instructions.len(), 5);
        assert_eq!(instructions[1].branch_targets(), &[5]);
    }

    #[test]
    fn invalid_locals_token() {
        let mut builder = MetadataBuilder::new();
        let name = builder.string("Broken");
        let signature = builder.blob(&[0x00, 0x00, 0x01]);

        #[rustfmt::skip]
        let rva = builder.body(&[
            0x13, 0x30, 0x01, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x07, 0x00, 0x00, 0x11,         // StandAloneSig 7 does not exist
            0x2A,
        ]);
        builder.method(rva, 0x0016, name, signature, 1);

        let image = image(&builder);
        if image.disassemble(0).is_ok() {
            panic!("This should not be valid!")
        }

        let (data, rva, size) = builder.build_image();
        let lenient = MetadataImage::from_accessor_with_config(
            Memory::new(data),
            rva,
            size,
            crate::metadata::config::LoaderConfig::lenient(),
        )
        .unwrap();
        assert_eq!(lenient.disassemble(0).unwrap().instructions().count(), 1);
    }

    #[test]
    fn exception_clause_outside_code() {
        let mut builder = MetadataBuilder::new();
        let name = builder.string("Overrun");
        let signature = builder.blob(&[0x00, 0x00, 0x01]);

        #[rustfmt::skip]
        let rva = builder.body(&[
            0x1B, 0x30, 0x01, 0x00,         // fat, MORE_SECTS | INIT_LOCALS, max stack 1
            0x02, 0x00, 0x00, 0x00,         // code size
            0x00, 0x00, 0x00, 0x00,         // no locals
            0x00,                           // nop
            0x2A,                           // ret
            0x00, 0x00,
            0x01, 0x10, 0x00, 0x00,         // small EH section, 1 clause
            0x02, 0x00, 0x00, 0x00, 0x01, 0x04, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00,
        ]);
        builder.method(rva, 0x0016, name, signature, 1);

        let image = image(&builder);
        if image.disassemble(0).is_ok() {
            panic!("This should not be valid!")
        }

        let (data, rva, size) = builder.build_image();
        let lenient = MetadataImage::from_accessor_with_config(
            Memory::new(data),
            rva,
            size,
            crate::metadata::config::LoaderConfig::lenient(),
        )
        .unwrap();
        let code = lenient.disassemble(0).unwrap();
        assert_eq!(code.exception_handlers()[0].handler_offset, 4);
        assert_eq!(code.instructions().count(), 2);
    }

    #[test]
    fn abstract_method_has_no_code() {
        let mut builder = MetadataBuilder::new();
        let name = builder.string("Abstract");
        let signature = builder.blob(&[0x20, 0x00, 0x01]);
        builder.method(0, 0x05C6, name, signature, 1);

        let image = image(&builder);
        let code = image.disassemble(0).unwrap();
        assert!(code.code().is_empty());
        assert_eq!(code.instructions().count(), 0);
    }
}
