//! Assembly identities and reference lookup.
//!
//! An [`AssemblyIdentity`] is what an `AssemblyRef` row asks for and what an `Assembly` row
//! provides: a simple name, a four part version, an optional culture and an optional public key
//! or key token. [`locate_reference`] maps an identity to a candidate file on disk; loading and
//! matching that file is up to the caller.
//!
//! ```rust,no_run
//! use clrscope::metadata::{identity::locate_reference, tables::AssemblyRef};
//! use clrscope::MetadataImage;
//! use std::path::PathBuf;
//!
//! let image = MetadataImage::from_file(std::path::Path::new("tests/samples/app.dll"))?;
//! let search = [PathBuf::from("tests/samples")];
//! for reference in image.iter::<AssemblyRef>().flatten() {
//!     let identity = reference.identity();
//!     match locate_reference(&identity, &search) {
//!         Some(path) => println!("{identity} -> {}", path.display()),
//!         None => println!("{identity} -> not found"),
//!     }
//! }
//! # Ok::<(), clrscope::Error>(())
//! ```

use std::{
    fmt::{self, Write},
    path::{Path, PathBuf},
};

use crate::Result;

/// A four part assembly version, `major.minor.build.revision`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a version from its four parts
    #[must_use]
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse `1.2.3.4`; missing trailing parts are 0
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the string is not a dotted version
    pub fn parse(version: &str) -> Result<Self> {
        let parts: Vec<&str> = version.split('.').collect();
        if parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version));
        }

        let mut components = [0_u16; 4];
        for (component, part) in components.iter_mut().zip(&parts) {
            *component = part
                .trim()
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// The identity of an assembly
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple name, e.g. `System.Runtime`
    pub name: String,
    /// Four part version
    pub version: AssemblyVersion,
    /// Culture, `None` for neutral assemblies
    pub culture: Option<String>,
    /// Public key, or its 8 byte token, `None` for unsigned assemblies
    pub public_key_or_token: Option<Vec<u8>>,
}

impl AssemblyIdentity {
    /// Parse a display name such as
    /// `System.Runtime, Version=8.0.0.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a`
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty name or invalid components
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = match parts.next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(malformed_error!("Assembly name is empty - {}", display_name)),
        };

        let mut identity = AssemblyIdentity {
            name,
            version: AssemblyVersion::default(),
            culture: None,
            public_key_or_token: None,
        };

        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                return Err(malformed_error!("Invalid display name component: {}", part));
            };

            match key.trim() {
                "Version" => identity.version = AssemblyVersion::parse(value)?,
                "Culture" => {
                    identity.culture = match value.trim() {
                        "neutral" | "" => None,
                        culture => Some(culture.to_string()),
                    }
                }
                "PublicKeyToken" | "PublicKey" => {
                    identity.public_key_or_token = match value.trim() {
                        "null" => None,
                        hex => Some(parse_hex(hex)?),
                    }
                }
                // ProcessorArchitecture, Retargetable, ... do not take part in lookup
                _ => {}
            }
        }

        Ok(identity)
    }

    /// True if the identity carries a public key or token
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.public_key_or_token.is_some()
    }
}

fn parse_hex(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(malformed_error!("Odd number of hex digits - {}", hex));
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| malformed_error!("Invalid hex digits - {}", hex))
        })
        .collect()
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, Version={}, Culture={}",
            self.name,
            self.version,
            self.culture.as_deref().unwrap_or("neutral")
        )?;

        match &self.public_key_or_token {
            Some(key) => {
                let label = if key.len() == 8 {
                    "PublicKeyToken"
                } else {
                    "PublicKey"
                };

                let mut hex = String::with_capacity(key.len() * 2);
                for byte in key {
                    let _ = write!(hex, "{byte:02x}");
                }
                write!(f, ", {label}={hex}")
            }
            None => f.write_str(", PublicKeyToken=null"),
        }
    }
}

/// The first existing `<name>.dll` or `<name>.exe` for `identity` in `search_dirs`.
///
/// Directories are searched in order, `.dll` before `.exe` within each directory. The version,
/// culture and key of the candidate are not checked.
#[must_use]
pub fn locate_reference(identity: &AssemblyIdentity, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    search_dirs.iter().find_map(|dir| {
        ["dll", "exe"].iter().find_map(|extension| {
            let candidate = dir.join(format!("{}.{}", identity.name, extension));
            is_file(&candidate).then_some(candidate)
        })
    })
}

fn is_file(path: &Path) -> bool {
    path.metadata().is_ok_and(|metadata| metadata.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrip() {
        let identity = AssemblyIdentity {
            name: "System.Runtime".to_string(),
            version: AssemblyVersion::new(8, 0, 0, 0),
            culture: None,
            public_key_or_token: Some(vec![0xb0, 0x3f, 0x5f, 0x7f, 0x11, 0xd5, 0x0a, 0x3a]),
        };

        let display = identity.to_string();
        assert_eq!(
            display,
            "System.Runtime, Version=8.0.0.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a"
        );
        assert_eq!(AssemblyIdentity::parse(&display).unwrap(), identity);
    }

    #[test]
    fn parse_partial() {
        let identity = AssemblyIdentity::parse("Foo, Version=1.2, Culture=de-DE").unwrap();
        assert_eq!(identity.version, AssemblyVersion::new(1, 2, 0, 0));
        assert_eq!(identity.culture.as_deref(), Some("de-DE"));
        assert!(!identity.is_strong_named());

        if AssemblyIdentity::parse("").is_ok() {
            panic!("This should not be valid!")
        }
        if AssemblyIdentity::parse("Foo, Version=1.x").is_ok() {
            panic!("This should not be valid!")
        }
        if AssemblyIdentity::parse("Foo, PublicKeyToken=abc").is_ok() {
            panic!("This should not be valid!")
        }
    }

    #[test]
    fn locate() {
        let dir = std::env::temp_dir().join(format!("clrscope-locate-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Present.exe"), b"MZ").unwrap();

        let present = AssemblyIdentity::parse("Present").unwrap();
        let missing = AssemblyIdentity::parse("Missing").unwrap();
        let search = vec![PathBuf::from("/nonexistent/clrscope"), dir.clone()];

        assert_eq!(
            locate_reference(&present, &search),
            Some(dir.join("Present.exe"))
        );
        assert_eq!(locate_reference(&missing, &search), None);

        std::fs::write(dir.join("Present.dll"), b"MZ").unwrap();
        assert_eq!(
            locate_reference(&present, &search),
            Some(dir.join("Present.dll"))
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
