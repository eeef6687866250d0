//! ECMA-335 metadata of .NET images.
//!
//! The metadata of an image is a single blob, located through the CLR runtime header. It
//! starts with a [`root::Root`] that lists named streams: the tables stream (`#~`, or `#-`
//! for unoptimized images) and four heaps the tables point into.
//!
//! # Key Components
//!
//! - [`image::MetadataImage`] - the loaded metadata, entry point for everything below
//! - [`streams`] - the `#Strings`, `#Blob`, `#GUID` and `#US` heaps
//! - [`tables`] - table schemas, rows, coded references and typed row projections
//! - [`signatures`] - decoding of signature blobs into type trees
//! - [`method`] - method body headers and exception clauses
//! - [`token`] - metadata tokens as found in CIL operands
//!
//! # Examples
//!
//! ```rust,no_run
//! use clrscope::{metadata::tables::TypeDef, MetadataImage};
//!
//! let image = MetadataImage::from_file("tests/samples/app.dll".as_ref())?;
//! for typedef in image.iter::<TypeDef>().flatten() {
//!     println!("{} owns {} methods", typedef.fullname(), typedef.methods.len());
//! }
//! # Ok::<(), clrscope::Error>(())
//! ```

/// Loader configuration
pub mod config;
/// The CLR runtime header
pub mod cor20header;
/// Assembly identities and reference lookup
pub mod identity;
/// The loaded metadata of an image
pub mod image;
/// Method body headers and exception clauses
pub mod method;
/// The metadata root and stream directory
pub mod root;
/// Signature blobs
pub mod signatures;
/// Metadata heaps
pub mod streams;
/// Metadata tables
pub mod tables;
/// Metadata tokens
pub mod token;
