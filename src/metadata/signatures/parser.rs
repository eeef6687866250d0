use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            ArrayShape, CallKind, CallingConvention, CallingConventionFlags, CustomModifier,
            ElementType, LocalSignature, LocalVariable, MethodSpecSignature, Signature,
            StandAloneSignature, TypeSignature, ELEMENT_TYPE,
        },
        tables::CodedIndexType,
    },
    Error, Result,
};

/// Nesting depth used when no [`crate::metadata::config::LoaderConfig`] is involved
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Position of a type prefix; prefixes must appear in increasing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prefix {
    None,
    ByRef,
    SzArray,
    Ptr,
}

/// Decoder for one signature blob.
///
/// Each `decode_*` method consumes the decoder and requires the blob to be used up exactly:
/// running out of bytes yields [`Error::SignatureTruncated`], leftover bytes yield
/// [`Error::SignatureTrailingBytes`].
///
/// ```rust
/// use clrscope::metadata::signatures::{ElementType, SignatureDecoder};
///
/// let field = SignatureDecoder::new(&[0x06, 0x1D, 0x0E]).decode()?;
/// assert_eq!(field.return_type.base, ElementType::String);
/// assert_eq!(field.return_type.array_rank, 1);
/// # Ok::<(), clrscope::Error>(())
/// ```
pub struct SignatureDecoder<'a> {
    parser: Parser<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> SignatureDecoder<'a> {
    /// Create a decoder over `blob`
    #[must_use]
    pub fn new(blob: &'a [u8]) -> Self {
        SignatureDecoder {
            parser: Parser::new(blob),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit the nesting depth of types
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Decode a method, property or field signature
    ///
    /// # Errors
    /// Returns [`Error::SignatureTruncated`], [`Error::SignatureTrailingBytes`],
    /// [`Error::RecursionLimit`] or [`Error::Malformed`] for an invalid blob
    pub fn decode(mut self) -> Result<Signature> {
        let result = self.method_or_field();
        self.finish(result)
    }

    /// Decode a `LOCAL_SIG` blob
    ///
    /// # Errors
    /// See [`SignatureDecoder::decode`]
    pub fn decode_local_var(mut self) -> Result<LocalSignature> {
        let result = self.local_var();
        self.finish(result)
    }

    /// Decode a `TypeSpec` blob, a single type
    ///
    /// # Errors
    /// See [`SignatureDecoder::decode`]
    pub fn decode_type_spec(mut self) -> Result<TypeSignature> {
        let result = self.type_signature();
        self.finish(result)
    }

    /// Decode a `MethodSpec` instantiation blob
    ///
    /// # Errors
    /// See [`SignatureDecoder::decode`]
    pub fn decode_method_spec(mut self) -> Result<MethodSpecSignature> {
        let result = self.method_spec();
        self.finish(result)
    }

    /// Decode a `StandAloneSig` blob, either locals or a call site
    ///
    /// # Errors
    /// See [`SignatureDecoder::decode`]
    pub fn decode_standalone(self) -> Result<StandAloneSignature> {
        if self.parser.data().first().is_some_and(|first| first & 0x0F == 0x07) {
            Ok(StandAloneSignature::Locals(self.decode_local_var()?))
        } else {
            Ok(StandAloneSignature::Method(self.decode()?))
        }
    }

    fn finish<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                if self.parser.has_more_data() {
                    Err(Error::SignatureTrailingBytes {
                        consumed: self.parser.pos(),
                        len: self.parser.len(),
                    })
                } else {
                    Ok(value)
                }
            }
            Err(Error::OutOfBounds) => Err(Error::SignatureTruncated {
                offset: self.parser.pos(),
            }),
            Err(error) => Err(error),
        }
    }

    fn compressed_uint(&mut self) -> Result<u32> {
        self.parser.read_compressed_uint()
    }

    fn capacity(&self, count: u32) -> usize {
        (count as usize).min(self.parser.remaining())
    }

    fn method_or_field(&mut self) -> Result<Signature> {
        let calling_convention = CallingConvention::from_byte(self.parser.read_le::<u8>()?)?;

        match calling_convention.kind {
            CallKind::Field => Ok(Signature {
                calling_convention,
                generic_param_count: 0,
                args_count: 0,
                return_type: self.type_signature()?,
                params: Vec::new(),
                varargs: Vec::new(),
            }),
            CallKind::LocalSig | CallKind::GenericInst => Err(malformed_error!(
                "Expected a method, property or field signature, found {:?}",
                calling_convention.kind
            )),
            _ => {
                let generic_param_count = if calling_convention
                    .flags
                    .contains(CallingConventionFlags::GENERIC)
                {
                    self.compressed_uint()?
                } else {
                    0
                };

                let args_count = self.compressed_uint()?;
                let return_type = self.type_signature()?;

                let mut params = Vec::with_capacity(self.capacity(args_count));
                let mut varargs = Vec::new();
                let mut sentinel = false;
                for _ in 0..args_count {
                    if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                        self.parser.advance_by(1)?;
                        sentinel = true;
                    }

                    let param = self.type_signature()?;
                    if sentinel {
                        varargs.push(param);
                    } else {
                        params.push(param);
                    }
                }

                Ok(Signature {
                    calling_convention,
                    generic_param_count,
                    args_count,
                    return_type,
                    params,
                    varargs,
                })
            }
        }
    }

    fn local_var(&mut self) -> Result<LocalSignature> {
        let convention = self.parser.read_le::<u8>()?;
        if convention != 0x07 {
            return Err(malformed_error!(
                "Expected a local variable signature, found 0x{:02X}",
                convention
            ));
        }

        let count = self.compressed_uint()?;
        let mut locals = Vec::with_capacity(self.capacity(count));
        for _ in 0..count {
            let mut modifiers = self.custom_modifiers()?;

            let pinned = self.parser.peek_byte()? == ELEMENT_TYPE::PINNED;
            if pinned {
                self.parser.advance_by(1)?;
            }

            let mut ty = self.type_signature()?;
            if !modifiers.is_empty() {
                modifiers.append(&mut ty.modifiers);
                ty.modifiers = modifiers;
            }

            locals.push(LocalVariable { pinned, ty });
        }

        Ok(LocalSignature { locals })
    }

    fn method_spec(&mut self) -> Result<MethodSpecSignature> {
        let convention = self.parser.read_le::<u8>()?;
        if convention != 0x0A {
            return Err(malformed_error!(
                "Expected a method instantiation, found 0x{:02X}",
                convention
            ));
        }

        let count = self.compressed_uint()?;
        let mut generic_args = Vec::with_capacity(self.capacity(count));
        for _ in 0..count {
            generic_args.push(self.type_signature()?);
        }

        Ok(MethodSpecSignature { generic_args })
    }

    fn custom_modifiers(&mut self) -> Result<Vec<CustomModifier>> {
        let mut modifiers = Vec::new();

        while self.parser.has_more_data() {
            let tag = self.parser.peek_byte()?;
            if tag != ELEMENT_TYPE::CMOD_REQD && tag != ELEMENT_TYPE::CMOD_OPT {
                break;
            }

            self.parser.advance_by(1)?;
            modifiers.push(self.custom_modifier(tag)?);
        }

        Ok(modifiers)
    }

    fn custom_modifier(&mut self, tag: u8) -> Result<CustomModifier> {
        Ok(CustomModifier {
            required: tag == ELEMENT_TYPE::CMOD_REQD,
            modifier_type: CodedIndexType::TypeDefOrRef.decode(self.compressed_uint()?)?,
        })
    }

    fn type_signature(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(Error::RecursionLimit(self.max_depth));
        }

        let result = self.type_signature_inner();
        self.depth -= 1;
        result
    }

    fn type_signature_inner(&mut self) -> Result<TypeSignature> {
        let mut modifiers = Vec::new();
        let mut by_ref = false;
        let mut array_rank = 0;
        let mut pointer_depth = 0;
        let mut prefix = Prefix::None;

        let tag = loop {
            let offset = self.parser.pos();
            let tag = self.parser.read_le::<u8>()?;

            let next = match tag {
                ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                    modifiers.push(self.custom_modifier(tag)?);
                    continue;
                }
                ELEMENT_TYPE::BYREF => Prefix::ByRef,
                ELEMENT_TYPE::SZARRAY => Prefix::SzArray,
                ELEMENT_TYPE::PTR => Prefix::Ptr,
                _ => break tag,
            };

            // BYREF at most once, then any number of SZARRAY, then any number of PTR
            if next < prefix || (next == Prefix::ByRef && by_ref) {
                return Err(malformed_error!(
                    "Type prefix 0x{:02X} out of order at offset {}",
                    tag,
                    offset
                ));
            }

            prefix = next;
            match next {
                Prefix::ByRef => by_ref = true,
                Prefix::SzArray => array_rank += 1,
                _ => pointer_depth += 1,
            }
        };

        let generic = tag == ELEMENT_TYPE::GENERICINST;
        let tag = if generic {
            // PTR is accepted on either side of GENERICINST
            let mut inner = self.parser.read_le::<u8>()?;
            while inner == ELEMENT_TYPE::PTR {
                pointer_depth += 1;
                inner = self.parser.read_le::<u8>()?;
            }
            if inner != ELEMENT_TYPE::CLASS && inner != ELEMENT_TYPE::VALUETYPE {
                return Err(malformed_error!(
                    "GENERICINST - Next byte is not CLASS or VALUETYPE - 0x{:02X}",
                    inner
                ));
            }
            inner
        } else {
            tag
        };

        let mut signature = match ElementType::primitive(tag) {
            Some(base) => TypeSignature::new(base),
            None => self.constructed(tag)?,
        };

        if generic {
            let count = self.compressed_uint()?;
            signature.generic_args.reserve(self.capacity(count));
            for _ in 0..count {
                let argument = self.type_signature()?;
                signature.generic_args.push(argument);
            }
        }

        signature.modifiers = modifiers;
        signature.by_ref = by_ref;
        signature.array_rank = array_rank;
        signature.pointer_depth = pointer_depth;
        signature.generic = generic;
        Ok(signature)
    }

    fn constructed(&mut self, tag: u8) -> Result<TypeSignature> {
        match tag {
            ELEMENT_TYPE::CLASS | ELEMENT_TYPE::VALUETYPE => {
                let base = if tag == ELEMENT_TYPE::CLASS {
                    ElementType::Class
                } else {
                    ElementType::ValueType
                };

                let mut signature = TypeSignature::new(base);
                signature.type_ref =
                    Some(CodedIndexType::TypeDefOrRef.decode(self.compressed_uint()?)?);
                Ok(signature)
            }
            ELEMENT_TYPE::VAR | ELEMENT_TYPE::MVAR => {
                let base = if tag == ELEMENT_TYPE::VAR {
                    ElementType::Var
                } else {
                    ElementType::MVar
                };

                let mut signature = TypeSignature::new(base);
                signature.generic_param = Some(self.compressed_uint()?);
                Ok(signature)
            }
            ELEMENT_TYPE::ARRAY => {
                let element = self.type_signature()?;
                let rank = self.compressed_uint()?;

                let num_sizes = self.compressed_uint()?;
                let mut sizes = Vec::with_capacity(self.capacity(num_sizes));
                for _ in 0..num_sizes {
                    sizes.push(self.compressed_uint()?);
                }

                let num_lower_bounds = self.compressed_uint()?;
                let mut lower_bounds = Vec::with_capacity(self.capacity(num_lower_bounds));
                for _ in 0..num_lower_bounds {
                    lower_bounds.push(self.parser.read_compressed_int()?);
                }

                let mut signature = TypeSignature::new(ElementType::Array);
                signature.element = Some(Box::new(element));
                signature.array_shape = Some(ArrayShape {
                    rank,
                    sizes,
                    lower_bounds,
                });
                Ok(signature)
            }
            ELEMENT_TYPE::FNPTR => {
                self.depth += 1;
                let target = self.method_or_field();
                self.depth -= 1;

                let mut signature = TypeSignature::new(ElementType::FnPtr);
                signature.fn_ptr = Some(Box::new(target?));
                Ok(signature)
            }
            _ => Err(malformed_error!(
                "Unsupported ELEMENT_TYPE - 0x{:02X} at offset {}",
                tag,
                self.parser.pos() - 1
            )),
        }
    }
}
