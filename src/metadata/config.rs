//! Loader configuration.
//!
//! [`LoaderConfig`] controls how tolerant [`crate::MetadataImage`] is towards images that bend
//! the format. Obfuscators and some compilers emit streams with unusual names, duplicate
//! streams or unoptimized `#-` tables; the presets trade strictness for coverage.
//!
//! ```rust,no_run
//! use clrscope::{metadata::config::LoaderConfig, MetadataImage};
//!
//! let image = MetadataImage::from_file_with_config(
//!     std::path::Path::new("tests/samples/obfuscated.dll"),
//!     LoaderConfig::lenient(),
//! )?;
//! # Ok::<(), clrscope::Error>(())
//! ```

/// Options applied while loading and inspecting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Reject streams whose names are not one of `#~`, `#-`, `#Strings`, `#US`, `#Blob` or
    /// `#GUID`, instead of skipping them
    pub strict_stream_names: bool,
    /// Accept an unoptimized `#-` tables stream
    pub allow_uncompressed_tables: bool,
    /// Maximum nesting depth of a type signature
    pub max_signature_depth: usize,
    /// Before disassembling, check that the locals token addresses a `StandAloneSig` row and
    /// that every exception clause lies within the code
    pub validate_method_bodies: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            strict_stream_names: false,
            allow_uncompressed_tables: true,
            max_signature_depth: 50,
            validate_method_bodies: true,
        }
    }
}

impl LoaderConfig {
    /// Only accept images that follow ECMA-335 to the letter
    #[must_use]
    pub fn strict() -> Self {
        LoaderConfig {
            strict_stream_names: true,
            allow_uncompressed_tables: false,
            max_signature_depth: 50,
            validate_method_bodies: true,
        }
    }

    /// Accept as much as possible, for obfuscated or damaged images
    #[must_use]
    pub fn lenient() -> Self {
        LoaderConfig {
            strict_stream_names: false,
            allow_uncompressed_tables: true,
            max_signature_depth: 128,
            validate_method_bodies: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let default = LoaderConfig::default();
        assert!(!default.strict_stream_names);
        assert!(default.allow_uncompressed_tables);

        let strict = LoaderConfig::strict();
        assert!(strict.strict_stream_names);
        assert!(!strict.allow_uncompressed_tables);

        let lenient = LoaderConfig::lenient();
        assert!(lenient.max_signature_depth > default.max_signature_depth);
        assert!(!lenient.validate_method_bodies);
    }
}
