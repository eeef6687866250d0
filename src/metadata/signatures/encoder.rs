//! Canonical signature writer used to check the decoder against its own output.

use crate::metadata::{
    signatures::{
        CallKind, CustomModifier, ElementType, LocalSignature, Signature, TypeSignature,
        ELEMENT_TYPE,
    },
    tables::{CodedIndexType, CodedReference},
};

pub(crate) fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) {
    if value < 0x80 {
        buffer.push(value as u8);
    } else if value < 0x4000 {
        buffer.extend_from_slice(&((value as u16) | 0x8000).to_be_bytes());
    } else {
        buffer.extend_from_slice(&(value | 0xC000_0000).to_be_bytes());
    }
}

pub(crate) fn write_compressed_int(value: i32, buffer: &mut Vec<u8>) {
    let rotate = |value: i32, bias: i32| -> u32 {
        if value >= 0 {
            (value as u32) << 1
        } else {
            (((value + bias) as u32) << 1) | 1
        }
    };

    if (-0x40..0x40).contains(&value) {
        buffer.push(rotate(value, 0x40) as u8);
    } else if (-0x2000..0x2000).contains(&value) {
        buffer.extend_from_slice(&((rotate(value, 0x2000) as u16) | 0x8000).to_be_bytes());
    } else {
        buffer.extend_from_slice(&(rotate(value, 0x1000_0000) | 0xC000_0000).to_be_bytes());
    }
}

fn write_type_def_or_ref(reference: &CodedReference, buffer: &mut Vec<u8>) {
    let raw = match reference.get() {
        Some((table, row)) => CodedIndexType::TypeDefOrRef
            .encode(table, row + 1)
            .unwrap_or_default(),
        None => 0,
    };
    write_compressed_uint(raw, buffer);
}

fn write_modifier(modifier: &CustomModifier, buffer: &mut Vec<u8>) {
    buffer.push(if modifier.required {
        ELEMENT_TYPE::CMOD_REQD
    } else {
        ELEMENT_TYPE::CMOD_OPT
    });
    write_type_def_or_ref(&modifier.modifier_type, buffer);
}

/// Modifiers, `BYREF`, `SZARRAY`s, `PTR`s, `GENERICINST`, base type, generic arguments
pub(crate) fn encode_type(ty: &TypeSignature, buffer: &mut Vec<u8>) {
    for modifier in &ty.modifiers {
        write_modifier(modifier, buffer);
    }
    if ty.by_ref {
        buffer.push(ELEMENT_TYPE::BYREF);
    }
    for _ in 0..ty.array_rank {
        buffer.push(ELEMENT_TYPE::SZARRAY);
    }
    for _ in 0..ty.pointer_depth {
        buffer.push(ELEMENT_TYPE::PTR);
    }
    if ty.generic {
        buffer.push(ELEMENT_TYPE::GENERICINST);
    }

    buffer.push(ty.base.tag());
    match ty.base {
        ElementType::Class | ElementType::ValueType => {
            if let Some(reference) = &ty.type_ref {
                write_type_def_or_ref(reference, buffer);
            }
        }
        ElementType::Var | ElementType::MVar => {
            write_compressed_uint(ty.generic_param.unwrap_or_default(), buffer);
        }
        ElementType::Array => {
            if let Some(element) = &ty.element {
                encode_type(element, buffer);
            }
            if let Some(shape) = &ty.array_shape {
                write_compressed_uint(shape.rank, buffer);
                write_compressed_uint(shape.sizes.len() as u32, buffer);
                for size in &shape.sizes {
                    write_compressed_uint(*size, buffer);
                }
                write_compressed_uint(shape.lower_bounds.len() as u32, buffer);
                for bound in &shape.lower_bounds {
                    write_compressed_int(*bound, buffer);
                }
            }
        }
        ElementType::FnPtr => {
            if let Some(target) = &ty.fn_ptr {
                encode_signature(target, buffer);
            }
        }
        _ => {}
    }

    if ty.generic {
        write_compressed_uint(ty.generic_args.len() as u32, buffer);
        for argument in &ty.generic_args {
            encode_type(argument, buffer);
        }
    }
}

pub(crate) fn encode_signature(signature: &Signature, buffer: &mut Vec<u8>) {
    buffer.push(signature.calling_convention.to_byte());
    if signature.calling_convention.kind == CallKind::Field {
        encode_type(&signature.return_type, buffer);
        return;
    }

    if signature.generic_param_count > 0 {
        write_compressed_uint(signature.generic_param_count, buffer);
    }
    write_compressed_uint(signature.args_count, buffer);
    encode_type(&signature.return_type, buffer);
    for param in &signature.params {
        encode_type(param, buffer);
    }
    if !signature.varargs.is_empty() {
        buffer.push(ELEMENT_TYPE::SENTINEL);
        for param in &signature.varargs {
            encode_type(param, buffer);
        }
    }
}

pub(crate) fn encode_locals(locals: &LocalSignature, buffer: &mut Vec<u8>) {
    buffer.push(0x07);
    write_compressed_uint(locals.locals.len() as u32, buffer);
    for local in &locals.locals {
        // modifiers go before PINNED
        for modifier in &local.ty.modifiers {
            write_modifier(modifier, buffer);
        }
        if local.pinned {
            buffer.push(ELEMENT_TYPE::PINNED);
        }

        let mut ty = local.ty.clone();
        ty.modifiers.clear();
        encode_type(&ty, buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::parser::Parser, metadata::signatures::SignatureDecoder};

    #[test]
    fn compressed_integers() {
        for value in [0_u32, 3, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1FFF_FFFF] {
            let mut buffer = Vec::new();
            write_compressed_uint(value, &mut buffer);
            assert_eq!(Parser::new(&buffer).read_compressed_uint().unwrap(), value);
        }

        let mut buffer = Vec::new();
        write_compressed_int(-3, &mut buffer);
        assert_eq!(buffer, [0x7B]);

        for value in [0, 3, -1, -64, 63, 64, -65, 8191, -8192, 8192, -8193, -0x1000_0000] {
            let mut buffer = Vec::new();
            write_compressed_int(value, &mut buffer);
            assert_eq!(Parser::new(&buffer).read_compressed_int().unwrap(), value);
        }
    }

    #[test]
    fn canonical_output_is_stable() {
        #[rustfmt::skip]
        let blobs: [&[u8]; 4] = [
            // instance !!0 <1> (int32&, class TypeRef[2], string[] ...)
            &[0x30, 0x01, 0x03, 0x1E, 0x00, 0x10, 0x08, 0x12, 0x09, 0x41, 0x1D, 0x0E],
            // field modopt(TypeRef[1]) valuetype List<int32>*[]
            &[0x06, 0x20, 0x05, 0x1D, 0x0F, 0x15, 0x11, 0x0C, 0x01, 0x08],
            // field int32[-1...,4]
            &[0x06, 0x14, 0x08, 0x02, 0x01, 0x04, 0x01, 0x7F],
            // field method int32 *(string)
            &[0x06, 0x1B, 0x00, 0x01, 0x08, 0x0E],
        ];

        for blob in blobs {
            let decoded = SignatureDecoder::new(blob).decode().unwrap();

            let mut encoded = Vec::new();
            encode_signature(&decoded, &mut encoded);
            assert_eq!(encoded, blob);
            assert_eq!(SignatureDecoder::new(&encoded).decode().unwrap(), decoded);
        }

        // modreq before PINNED
        let blob = [0x07, 0x02, 0x1F, 0x09, 0x45, 0x10, 0x08, 0x1C];
        let locals = SignatureDecoder::new(&blob).decode_local_var().unwrap();
        let mut encoded = Vec::new();
        encode_locals(&locals, &mut encoded);
        assert_eq!(encoded, blob);
    }
}
