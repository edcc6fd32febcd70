// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Git object identifiers
//!
//! Hex object names as printed by `git rev-list`, `git ls-tree` and
//! `git cat-file`. SHA-1 repositories use 40 hex characters, SHA-256
//! repositories use 64.

use crate::error::{GitError, GitResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hex length of a SHA-1 object name
pub const SHA1_HEX_LEN: usize = 40;

/// Hex length of a SHA-256 object name
pub const SHA256_HEX_LEN: usize = 64;

/// Identifier of an object (commit, tree or blob) in the git object database
///
/// # Examples
///
/// ```
/// use lfs_git::ObjectId;
///
/// let id = ObjectId::from_hex("4b825dc642cb6eb9a060e54bf8d69288fbee4904")?;
/// assert_eq!(id.short(), "4b825dc");
/// # Ok::<(), lfs_git::GitError>(())
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Validate and wrap a hex object name
    ///
    /// Upper-case input is normalised to lower case, matching git's output.
    pub fn from_hex(hex: &str) -> GitResult<Self> {
        let valid_len = hex.len() == SHA1_HEX_LEN || hex.len() == SHA256_HEX_LEN;
        if !valid_len || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GitError::InvalidObjectId(hex.to_string()));
        }
        Ok(ObjectId(hex.to_ascii_lowercase()))
    }

    /// The full hex name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated name for display
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl FromStr for ObjectId {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::from_hex(s)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}
