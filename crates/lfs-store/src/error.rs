// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Error types for the object store

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for object store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error types for object store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// String is not 64 lowercase hex characters
    #[error("invalid object id: {0:?}")]
    InvalidOid(String),

    /// Filesystem operation failed
    #[error("{action} {path}: {source}")]
    Io {
        /// What was being attempted
        action: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Store walk failed
    #[error("failed to walk object store: {0}")]
    Walk(#[from] walkdir::Error),

    /// Scoped check could not enumerate pointers
    #[error(transparent)]
    Scan(#[from] lfs_git::GitError),
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the error came from resolving a user-supplied ref or range
    pub fn is_scope_error(&self) -> bool {
        matches!(self, StoreError::Scan(err) if err.is_scope_error())
    }
}
