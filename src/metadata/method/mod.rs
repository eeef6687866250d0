//! Method bodies: header, code and exception clauses.
//!
//! The disassembler in [`crate::disassembler`] works on the code bytes this module carves out
//! of a body; [`MethodBody`] itself only understands the framing around them.

mod body;
mod exceptions;

pub use body::*;
pub use exceptions::*;
