//! # clrscope Prelude
//!
//! The types most programs working with `clrscope` need, for a single glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all clrscope operations
pub use crate::Error;

/// The result type used throughout clrscope
pub use crate::Result;

/// Loader configuration
pub use crate::LoaderConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The loaded metadata of an image
pub use crate::MetadataImage;

/// Image accessors
pub use crate::{File, ImageAccessor, Memory, Parser};

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata tokens
pub use crate::metadata::token::Token;

/// Tables, rows and coded references
pub use crate::metadata::tables::{
    CodedIndexType, CodedReference, OwnedRange, Row, RowProjection, TableId, TableSet,
};

/// Frequently used row projections
pub use crate::metadata::tables::{
    Assembly, AssemblyRef, Field, MemberRef, MethodDef, Module, Param, StandAloneSig, TypeDef,
    TypeRef, TypeSpec,
};

/// Signatures
pub use crate::metadata::signatures::{
    ElementType, LocalSignature, Signature, SignatureDecoder, TypeSignature,
};

/// Method bodies
pub use crate::metadata::method::{ExceptionHandler, MethodBody};

// ================================================================================================
// Disassembler
// ================================================================================================

/// Instruction decoding
pub use crate::disassembler::{
    decode_instruction, decode_stream, FlowType, Instruction, Instructions, MethodCode, Operand,
    OperandResolver,
};
