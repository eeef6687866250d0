//! Signature blobs (ECMA-335 II.23.2).
//!
//! Signatures describe the shape of fields, methods, properties, locals and generic
//! instantiations. They live in the `#Blob` heap and are referenced from the `Signature`,
//! `Type` or `Instantiation` columns of the owning rows.
//!
//! A blob is decoded with a [`SignatureDecoder`], picking the entry point that matches the
//! owning table:
//!
//! | Owner                         | Entry point                                |
//! |-------------------------------|--------------------------------------------|
//! | `Field`, `MethodDef`, `MemberRef`, `Property` | [`SignatureDecoder::decode`] |
//! | `StandAloneSig`               | [`SignatureDecoder::decode_standalone`]    |
//! | `TypeSpec`                    | [`SignatureDecoder::decode_type_spec`]     |
//! | `MethodSpec`                  | [`SignatureDecoder::decode_method_spec`]   |
//!
//! Types are flattened into [`TypeSignature`]: the prefixes `BYREF`, `SZARRAY` and `PTR` become
//! a flag and two counters on the base type, while multi-dimensional arrays and function
//! pointers keep a nested signature.
//!
//! # Examples
//!
//! ```rust
//! use clrscope::metadata::signatures::{ElementType, SignatureDecoder};
//!
//! // instance int32 (string, int32[]&)
//! let method = SignatureDecoder::new(&[0x20, 0x02, 0x08, 0x0E, 0x10, 0x1D, 0x08]).decode()?;
//! assert!(method.calling_convention.has_this());
//! assert_eq!(method.return_type.base, ElementType::I4);
//! assert!(method.params[1].by_ref);
//! assert_eq!(method.params[1].array_rank, 1);
//! # Ok::<(), clrscope::Error>(())
//! ```

#[cfg(test)]
pub(crate) mod encoder;
mod parser;
mod types;

pub use parser::*;
pub use types::*;
