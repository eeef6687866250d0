// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![warn(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # clrscope
//!
//! Read-only access to the ECMA-335 metadata and CIL code of .NET images. Built in pure Rust,
//! `clrscope` parses the metadata root, heaps and tables of an image, decodes signature blobs
//! and disassembles method bodies, without requiring Windows or the .NET runtime.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clrscope::{metadata::tables::{MethodDef, TypeDef}, MetadataImage};
//! use std::path::Path;
//!
//! let image = MetadataImage::from_file(Path::new("tests/samples/app.dll"))?;
//!
//! for typedef in image.iter::<TypeDef>() {
//!     let typedef = typedef?;
//!     println!("{}", typedef.fullname());
//!
//!     for index in typedef.methods.iter() {
//!         let method = image.get::<MethodDef>(index)?;
//!         println!("  {} {:?}", method.name, method.signature(&image)?);
//!     }
//! }
//! # Ok::<(), clrscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - the [`ImageAccessor`] abstraction, PE-backed [`File`] and flat [`Memory`]
//! - [`metadata`] - root, heaps, tables, typed row projections, signatures and method bodies
//! - [`disassembler`] - the CIL opcode table and instruction decoder
//! - [`Error`] and [`Result`] - error handling
//!
//! Everything hangs off a [`MetadataImage`]. It is immutable once loaded, and all views into it
//! (rows, projections, decoded signatures, instruction streams) are computed on demand. A
//! failure while reading one row, one signature or one method body is local to that item:
//! callers report it and carry on with the next one.
//!
//! ## Memory-based Analysis
//!
//! ```rust,no_run
//! use clrscope::MetadataImage;
//!
//! let data: Vec<u8> = std::fs::read("assembly.dll")?;
//! let image = MetadataImage::from_mem(data)?;
//! println!("metadata version {}", image.root().version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! use clrscope::{Error, MetadataImage};
//!
//! match MetadataImage::from_file(std::path::Path::new("tests/samples/broken.dll")) {
//!     Ok(_) => println!("Successfully loaded"),
//!     Err(Error::NotSupported) => println!("File format not supported"),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed file: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run metadata --release
//! ```
//!
//! ### References
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

#[macro_use]
pub(crate) mod error;

/// Access to the bytes of binary images
pub mod file;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust,no_run
/// use clrscope::prelude::*;
///
/// let image = MetadataImage::from_file("tests/samples/app.dll".as_ref())?;
/// let methods = image.iter::<MethodDef>().count();
/// # Ok::<(), clrscope::Error>(())
/// ```
pub mod prelude;

/// CIL instruction decoding based on ECMA-335 Partition III
pub mod disassembler;

/// Parsing of ECMA-335 metadata: root, heaps, tables, signatures and method bodies
pub mod metadata;

/// `clrscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `clrscope` Error type
///
/// ```rust,no_run
/// use clrscope::{Error, MetadataImage};
///
/// let image = MetadataImage::from_file(std::path::Path::new("tests/samples/app.dll"))?;
/// match image.disassemble(0) {
///     Ok(code) => println!("{} bytes of code", code.code().len()),
///     Err(Error::UnsupportedOpcode { offset, opcode }) => {
///         println!("undefined opcode {opcode:#x} at IL_{offset:04x}")
///     }
///     Err(e) => println!("Error: {}", e),
/// }
/// # Ok::<(), clrscope::Error>(())
/// ```
pub use error::Error;

/// The loaded metadata of an image, see [`metadata::image::MetadataImage`]
pub use metadata::image::MetadataImage;

/// Loader configuration, see [`metadata::config::LoaderConfig`]
pub use metadata::config::LoaderConfig;

/// The heaps of an image
pub use metadata::streams::{Blob, Guid, HeapStore, StreamHeader, Strings, UserStrings};

/// Image access and the cursor used by all decoders
pub use file::{parser::Parser, File, ImageAccessor, Memory};
