// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Error types for pointer parsing and history scanning

use thiserror::Error;

/// Result type for Git operations
pub type GitResult<T> = Result<T, GitError>;

/// Reasons a blob failed to decode as a pointer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    /// Blob is larger than any pointer can be
    #[error("pointer data is {0} bytes, larger than any valid pointer")]
    TooLarge(usize),

    /// Blob has no content at all
    #[error("empty data is not a pointer")]
    Empty,

    /// Blob is not valid UTF-8 text
    #[error("pointer data is not valid UTF-8")]
    NotText,

    /// A line could not be split into `key value`
    #[error("invalid line format: {0:?}")]
    InvalidLine(String),

    /// Keys appeared out of order, or an unknown key was found
    #[error("expected key {expected:?}, got {got:?}")]
    UnexpectedKey {
        /// Key required at this position
        expected: String,
        /// Key actually found
        got: String,
    },

    /// Data continued after the `size` line
    #[error("extra line after size: {0:?}")]
    ExtraLine(String),

    /// Version line names an unknown specification
    #[error("unknown pointer version: {0:?}")]
    UnknownVersion(String),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Object id is not `sha256:<64 lowercase hex>`
    #[error("invalid oid: {0:?}")]
    InvalidOid(String),

    /// Size is not a non-negative decimal integer
    #[error("invalid size: {0:?}")]
    InvalidSize(String),

    /// Extension line is malformed or duplicated
    #[error("invalid extension: {0:?}")]
    InvalidExtension(String),
}

/// Error types for Git integration operations
#[derive(Debug, Error)]
pub enum GitError {
    /// A blob at a path that requires a pointer does not hold one
    #[error("{path:?} (treeish {rev}, blob {sha}) should have been a pointer but was not: {reason}")]
    NotAPointer {
        /// Path the blob was found at
        path: String,
        /// Revision whose tree contained the blob
        rev: String,
        /// Git blob id
        sha: String,
        /// Why parsing failed
        reason: PointerError,
    },

    /// Pointer parse failure outside of a tree scan
    #[error("blob {sha} ({name}) is not a valid pointer: {reason}")]
    PointerParse {
        /// Git blob id
        sha: String,
        /// Best known path name
        name: String,
        /// Why parsing failed
        reason: PointerError,
    },

    /// Invalid object id
    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    /// A git subprocess could not be started
    #[error("failed to start git {command}: {source}")]
    Spawn {
        /// Git subcommand
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A git subprocess exited with a failure status
    #[error("git {command} failed ({status}): {stderr}")]
    CommandFailed {
        /// Git subcommand
        command: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// A git subprocess produced output this crate cannot interpret
    #[error("unexpected output from git {command}: {line:?}")]
    Protocol {
        /// Git subcommand
        command: String,
        /// Offending output line
        line: String,
    },

    /// A reference or revision could not be resolved
    #[error("Invalid ref argument: {0}")]
    InvalidRef(String),

    /// A range's left endpoint is not an ancestor of its right endpoint
    #[error("Invalid range {left}..{right}: {left} is not an ancestor of {right}")]
    InvalidRange {
        /// Left (older) endpoint
        left: String,
        /// Right (newer) endpoint
        right: String,
    },

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Repository not initialized
    #[error("Not in a Git repository: {0}")]
    RepositoryNotFound(String),

    /// .gitattributes could not be read or parsed
    #[error("Failed to read .gitattributes: {0}")]
    Gitattributes(String),

    /// A pipeline task panicked or was aborted
    #[error("scan task failed: {0}")]
    TaskFailed(String),

    /// The scan was cancelled before completion
    #[error("scan cancelled")]
    Cancelled,
}

impl GitError {
    /// Whether this error is a per-object finding rather than a fault of the run
    pub fn is_per_object(&self) -> bool {
        matches!(self, GitError::NotAPointer { .. } | GitError::PointerParse { .. })
    }

    /// Whether this error comes from a bad ref or range argument
    pub fn is_scope_error(&self) -> bool {
        matches!(self, GitError::InvalidRef(_) | GitError::InvalidRange { .. })
    }
}

impl From<tokio::task::JoinError> for GitError {
    fn from(err: tokio::task::JoinError) -> Self {
        GitError::TaskFailed(err.to_string())
    }
}
