// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Pointer file implementation
//!
//! Pointer files are small text records that replace large files in the Git
//! repository. They name the real content by its SHA-256 and size; the bytes
//! themselves live in the local object store.
//!
//! ## Format
//!
//! ```text
//! version https://git-lfs.github.com/spec/v1
//! ext-0-foo sha256:<64 hex>
//! oid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393
//! size 12345
//! ```
//!
//! `ext-*` lines are optional. Every line ends with a single `\n`. Anything
//! that parses but differs byte-for-byte from [`Pointer::encode`] is
//! *non-canonical*: still usable, but reported by `fsck --pointers`.

use crate::error::PointerError;
use crate::oid::ObjectId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Current pointer specification version
pub const LATEST_VERSION: &str = "https://git-lfs.github.com/spec/v1";

/// Older version URLs that still decode
pub const LEGACY_VERSIONS: &[&str] = &["https://hawser.github.com/spec/v1"];

/// Maximum size of a pointer blob
///
/// Canonical pointer text never comes close to this; anything larger is an
/// ordinary blob and is never read for parsing.
pub const MAX_POINTER_SIZE: usize = 1024;

/// Hash algorithm named in `oid` lines
pub const OID_TYPE: &str = "sha256";

const POINTER_KEYS: [&str; 3] = ["version", "oid", "size"];

/// A pointer extension line (`ext-<priority>-<name> sha256:<oid>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerExtension {
    /// Extension name
    pub name: String,

    /// Single-digit priority, also the sort key
    pub priority: u8,

    /// SHA-256 of the content before this extension ran
    pub oid: String,
}

impl PointerExtension {
    fn parse(key: &str, value: &str) -> Result<Self, PointerError> {
        let invalid = || PointerError::InvalidExtension(format!("{} {}", key, value));

        let rest = key.strip_prefix("ext-").ok_or_else(invalid)?;
        let (priority, name) = rest.split_once('-').ok_or_else(invalid)?;
        if priority.len() != 1
            || name.is_empty()
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid());
        }
        let priority = priority
            .parse::<u8>()
            .map_err(|_| invalid())?;
        let oid = parse_oid(value).map_err(|_| invalid())?;

        Ok(Self {
            name: name.to_string(),
            priority,
            oid,
        })
    }
}

/// A decoded pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    /// SHA-256 of the real content (64 lowercase hex)
    pub oid: String,

    /// Size of the real content in bytes
    pub size: u64,

    /// Extensions, sorted by priority
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<PointerExtension>,
}

impl Pointer {
    /// Creates a pointer with no extensions
    pub fn new(oid: impl Into<String>, size: u64) -> Self {
        Self {
            oid: oid.into(),
            size,
            extensions: Vec::new(),
        }
    }

    /// Builds the pointer that stands in for `content`
    ///
    /// # Example
    ///
    /// ```rust
    /// use lfs_git::Pointer;
    ///
    /// let pointer = Pointer::from_content(b"hello");
    /// assert_eq!(pointer.size, 5);
    /// assert_eq!(pointer.oid.len(), 64);
    /// ```
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self::new(hex::encode(digest), content.len() as u64)
    }

    /// Decodes pointer text
    ///
    /// # Errors
    ///
    /// Returns a [`PointerError`] describing the first problem found.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lfs_git::Pointer;
    ///
    /// let text = "version https://git-lfs.github.com/spec/v1\n\
    ///             oid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393\n\
    ///             size 12345\n";
    /// let pointer = Pointer::decode(text.as_bytes())?;
    /// assert_eq!(pointer.size, 12345);
    /// # Ok::<(), lfs_git::PointerError>(())
    /// ```
    pub fn decode(data: &[u8]) -> Result<Self, PointerError> {
        if data.len() > MAX_POINTER_SIZE {
            return Err(PointerError::TooLarge(data.len()));
        }
        if data.is_empty() {
            return Err(PointerError::Empty);
        }
        let text = std::str::from_utf8(data).map_err(|_| PointerError::NotText)?;

        let mut values: [Option<&str>; 3] = [None; 3];
        let mut position = 0;
        let mut extensions: Vec<PointerExtension> = Vec::new();

        for raw in text.split('\n') {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.is_empty() {
                continue;
            }

            let (key, value) = line
                .split_once(' ')
                .ok_or_else(|| PointerError::InvalidLine(line.to_string()))?;

            if position >= POINTER_KEYS.len() {
                return Err(PointerError::ExtraLine(line.to_string()));
            }

            let expected = POINTER_KEYS[position];
            if key != expected {
                // Extensions sit between the version and oid lines
                if position == 1 && key.starts_with("ext-") {
                    let ext = PointerExtension::parse(key, value)?;
                    if extensions.iter().any(|e| e.priority == ext.priority) {
                        return Err(PointerError::InvalidExtension(line.to_string()));
                    }
                    extensions.push(ext);
                    continue;
                }
                return Err(PointerError::UnexpectedKey {
                    expected: expected.to_string(),
                    got: key.to_string(),
                });
            }

            values[position] = Some(value);
            position += 1;
        }

        let version = values[0].ok_or(PointerError::MissingField("version"))?;
        if version != LATEST_VERSION && !LEGACY_VERSIONS.contains(&version) {
            return Err(PointerError::UnknownVersion(version.to_string()));
        }

        let oid = parse_oid(values[1].ok_or(PointerError::MissingField("oid"))?)?;
        let size = parse_size(values[2].ok_or(PointerError::MissingField("size"))?)?;

        extensions.sort_by_key(|e| e.priority);

        Ok(Self {
            oid,
            size,
            extensions,
        })
    }

    /// Canonical text form
    pub fn encode(&self) -> String {
        let mut out = format!("version {}\n", LATEST_VERSION);
        for ext in &self.extensions {
            out.push_str(&format!(
                "ext-{}-{} {}:{}\n",
                ext.priority, ext.name, OID_TYPE, ext.oid
            ));
        }
        out.push_str(&format!("oid {}:{}\nsize {}\n", OID_TYPE, self.oid, self.size));
        out
    }

    /// Whether `data` is exactly the canonical encoding of this pointer
    pub fn is_canonical_encoding(&self, data: &[u8]) -> bool {
        self.encode().as_bytes() == data
    }

    /// Returns the OID with its hash-type prefix
    pub fn oid_with_prefix(&self) -> String {
        format!("{}:{}", OID_TYPE, self.oid)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn parse_oid(value: &str) -> Result<String, PointerError> {
    let hash = value
        .strip_prefix(OID_TYPE)
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| PointerError::InvalidOid(value.to_string()))?;

    let lower_hex = hash
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if hash.len() != 64 || !lower_hex {
        return Err(PointerError::InvalidOid(value.to_string()));
    }
    Ok(hash.to_string())
}

fn parse_size(value: &str) -> Result<u64, PointerError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PointerError::InvalidSize(value.to_string()));
    }
    value
        .parse::<u64>()
        .map_err(|_| PointerError::InvalidSize(value.to_string()))
}

/// A pointer plus where it was found
///
/// One is created per distinct blob during a scan and handed to the scan
/// callback; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrappedPointer {
    /// Git blob holding the pointer text
    pub sha1: ObjectId,

    /// Path the blob was found at (may be empty when unknown)
    pub name: String,

    /// Ref or revision the blob was found through, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,

    /// Whether the blob bytes are exactly the canonical encoding
    pub canonical: bool,

    /// The decoded pointer
    #[serde(flatten)]
    pub pointer: Pointer,
}

impl WrappedPointer {
    /// Decodes `data` read from blob `sha1` and records canonicality
    pub fn from_blob(
        sha1: ObjectId,
        name: impl Into<String>,
        data: &[u8],
    ) -> Result<Self, PointerError> {
        let pointer = Pointer::decode(data)?;
        let canonical = pointer.is_canonical_encoding(data);
        Ok(Self {
            sha1,
            name: name.into(),
            ref_name: None,
            canonical,
            pointer,
        })
    }

    /// Attach the ref this pointer was reached from
    pub fn with_ref(mut self, ref_name: impl Into<String>) -> Self {
        self.ref_name = Some(ref_name.into());
        self
    }

    /// Content OID
    pub fn oid(&self) -> &str {
        &self.pointer.oid
    }

    /// Content size
    pub fn size(&self) -> u64 {
        self.pointer.size
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const VALID_OID: &str = "4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393";

    fn canonical_text(size: u64) -> String {
        format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize {}\n",
            VALID_OID, size
        )
    }

    #[test]
    fn test_new_pointer() {
        let pointer = Pointer::new(VALID_OID, 12345);
        assert_eq!(pointer.oid, VALID_OID);
        assert_eq!(pointer.size, 12345);
        assert!(pointer.extensions.is_empty());
    }

    #[test]
    fn test_encode() {
        let pointer = Pointer::new(VALID_OID, 12345);
        assert_eq!(pointer.encode(), canonical_text(12345));
        assert_eq!(pointer.to_string(), canonical_text(12345));
    }

    #[test]
    fn test_decode_canonical() {
        let text = canonical_text(12345);
        let pointer = Pointer::decode(text.as_bytes()).unwrap();
        assert_eq!(pointer, Pointer::new(VALID_OID, 12345));
        assert!(pointer.is_canonical_encoding(text.as_bytes()));
    }

    #[test]
    fn test_carriage_return_is_non_canonical() {
        let text = canonical_text(12345).replace('\n', "\r\n");
        let pointer = Pointer::decode(text.as_bytes()).unwrap();
        assert_eq!(pointer.oid, VALID_OID);
        assert!(!pointer.is_canonical_encoding(text.as_bytes()));
    }

    #[test]
    fn test_legacy_version_is_non_canonical() {
        let text = format!(
            "version https://hawser.github.com/spec/v1\noid sha256:{}\nsize 3\n",
            VALID_OID
        );
        let wrapped =
            WrappedPointer::from_blob(ObjectId::from_hex(&"1".repeat(40)).unwrap(), "a.bin", text.as_bytes())
                .unwrap();
        assert!(!wrapped.canonical);
        assert_eq!(wrapped.size(), 3);
    }

    #[test]
    fn test_missing_trailing_newline_is_non_canonical() {
        let text = canonical_text(7);
        let trimmed = text.trim_end();
        let pointer = Pointer::decode(trimmed.as_bytes()).unwrap();
        assert!(!pointer.is_canonical_encoding(trimmed.as_bytes()));
    }

    #[test]
    fn test_extensions_sorted_and_encoded() {
        let other = "a".repeat(64);
        let text = format!(
            "version https://git-lfs.github.com/spec/v1\n\
             ext-1-bar sha256:{other}\n\
             ext-0-foo sha256:{other}\n\
             oid sha256:{VALID_OID}\nsize 10\n"
        );
        let pointer = Pointer::decode(text.as_bytes()).unwrap();
        assert_eq!(pointer.extensions.len(), 2);
        assert_eq!(pointer.extensions[0].name, "foo");
        assert_eq!(pointer.extensions[1].priority, 1);
        // Sorted re-encoding differs from the unsorted input
        assert!(!pointer.is_canonical_encoding(text.as_bytes()));
        let reencoded = pointer.encode();
        assert!(Pointer::decode(reencoded.as_bytes())
            .unwrap()
            .is_canonical_encoding(reencoded.as_bytes()));
    }

    #[test]
    fn test_duplicate_extension_priority() {
        let other = "a".repeat(64);
        let text = format!(
            "version https://git-lfs.github.com/spec/v1\n\
             ext-0-foo sha256:{other}\n\
             ext-0-bar sha256:{other}\n\
             oid sha256:{VALID_OID}\nsize 10\n"
        );
        assert!(matches!(
            Pointer::decode(text.as_bytes()),
            Err(PointerError::InvalidExtension(_))
        ));
    }

    #[test]
    fn test_missing_oid() {
        let text = "version https://git-lfs.github.com/spec/v1\nsize 12345\n";
        assert!(matches!(
            Pointer::decode(text.as_bytes()),
            Err(PointerError::UnexpectedKey { .. })
        ));
    }

    #[test]
    fn test_missing_size() {
        let text = format!("version https://git-lfs.github.com/spec/v1\noid sha256:{}\n", VALID_OID);
        assert_eq!(
            Pointer::decode(text.as_bytes()),
            Err(PointerError::MissingField("size"))
        );
    }

    #[test]
    fn test_missing_version() {
        let text = format!("oid sha256:{}\nsize 12345\n", VALID_OID);
        assert!(matches!(
            Pointer::decode(text.as_bytes()),
            Err(PointerError::UnexpectedKey { .. })
        ));
    }

    #[test]
    fn test_unknown_version() {
        let text = format!("version https://example.com/v9\noid sha256:{}\nsize 1\n", VALID_OID);
        assert!(matches!(
            Pointer::decode(text.as_bytes()),
            Err(PointerError::UnknownVersion(_))
        ));
    }

    #[test]
    fn test_invalid_oid() {
        let upper = format!("sha256:{}", VALID_OID.to_uppercase());
        for oid in ["md5:abc", "sha256:notahash", upper.as_str()] {
            let text = format!("version {}\noid {}\nsize 1\n", LATEST_VERSION, oid);
            assert!(
                matches!(Pointer::decode(text.as_bytes()), Err(PointerError::InvalidOid(_))),
                "{oid} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_size() {
        for size in ["-1", "+1", "abc", "1.5"] {
            let text = format!("version {}\noid sha256:{}\nsize {}\n", LATEST_VERSION, VALID_OID, size);
            assert!(
                matches!(Pointer::decode(text.as_bytes()), Err(PointerError::InvalidSize(_))),
                "{size} should be rejected"
            );
        }
    }

    #[test]
    fn test_extra_line_rejected() {
        let text = format!("{}extra line\n", canonical_text(1));
        assert!(matches!(
            Pointer::decode(text.as_bytes()),
            Err(PointerError::ExtraLine(_))
        ));
    }

    #[test]
    fn test_plain_content_rejected() {
        assert!(Pointer::decode(b"This is just regular file content").is_err());
        assert_eq!(Pointer::decode(b""), Err(PointerError::Empty));
        assert_eq!(Pointer::decode(&[0xff, 0xfe, 0x00]), Err(PointerError::NotText));
    }

    #[test]
    fn test_too_large() {
        let large = canonical_text(1) + &"x".repeat(MAX_POINTER_SIZE);
        assert!(matches!(
            Pointer::decode(large.as_bytes()),
            Err(PointerError::TooLarge(_))
        ));
    }

    #[test]
    fn test_from_content() {
        let pointer = Pointer::from_content(b"");
        assert_eq!(
            pointer.oid,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(pointer.size, 0);
    }

    #[test]
    fn test_oid_with_prefix() {
        let pointer = Pointer::new(VALID_OID, 1);
        assert_eq!(pointer.oid_with_prefix(), format!("sha256:{}", VALID_OID));
    }

    proptest! {
        #[test]
        fn prop_canonical_reencodes_identically(oid in "[0-9a-f]{64}", size in any::<u64>()) {
            let text = Pointer::new(oid, size).encode();
            let parsed = Pointer::decode(text.as_bytes()).unwrap();
            prop_assert_eq!(parsed.encode(), text.clone());
            prop_assert!(parsed.is_canonical_encoding(text.as_bytes()));
        }
    }
}
