// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 MediaGit Contributors

//! Test fixture management.
//!
//! Builds object content and pointer text without going through the crates
//! under test, so fixtures stay independent of the code they exercise.

use sha2::{Digest, Sha256};

/// Pointer version line written by fixtures
pub const POINTER_VERSION: &str = "https://git-lfs.github.com/spec/v1";

/// Test fixture management utilities.
pub struct TestFixtures;

impl TestFixtures {
    /// SHA-256 hex of `content`, the object id it is stored under.
    pub fn oid(content: &[u8]) -> String {
        hex::encode(Sha256::digest(content))
    }

    /// Canonical pointer text for an object id and size.
    pub fn pointer_text_for(oid: &str, size: u64) -> String {
        format!("version {}\noid sha256:{}\nsize {}\n", POINTER_VERSION, oid, size)
    }

    /// Canonical pointer text for `content`.
    pub fn pointer_text(content: &[u8]) -> String {
        Self::pointer_text_for(&Self::oid(content), content.len() as u64)
    }

    /// Pointer text for `content` that parses but is not canonical.
    ///
    /// Uses CRLF line endings.
    pub fn non_canonical_pointer_text(content: &[u8]) -> String {
        Self::pointer_text(content).replace('\n', "\r\n")
    }

    /// Deterministic content of exactly `size` bytes derived from `seed`.
    pub fn sized_content(seed: &str, size: usize) -> Vec<u8> {
        seed.bytes()
            .chain(b"-".iter().copied())
            .cycle()
            .take(size)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_of_known_content() {
        assert_eq!(
            TestFixtures::oid(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_pointer_text_layout() {
        let text = TestFixtures::pointer_text(b"hello");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("version "));
        assert!(lines[1].starts_with("oid sha256:"));
        assert_eq!(lines[2], "size 5");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_non_canonical_differs() {
        let canonical = TestFixtures::pointer_text(b"x");
        let crlf = TestFixtures::non_canonical_pointer_text(b"x");
        assert_ne!(canonical, crlf);
        assert!(crlf.contains("\r\n"));
    }

    #[test]
    fn test_sized_content() {
        let data = TestFixtures::sized_content("ab", 7);
        assert_eq!(data, b"ab-ab-a");
        assert_eq!(TestFixtures::sized_content("big", 2048).len(), 2048);
    }
}
