// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Pointer validity checking
//!
//! Walks the tree of every commit in a scope and reports pointers that are
//! not byte-for-byte canonical, and blobs at tracked paths that are not
//! pointers at all. Unlike [`crate::fsck`] this never looks at stored bytes.

use crate::error::StoreResult;
use lfs_git::{GitError, GitResult, GitScanner, RefScope, ScanRefsOptions, WrappedPointer};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// A problem found in history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerFinding {
    /// A pointer parsed but its bytes differ from the canonical encoding
    NonCanonical {
        /// Content OID the pointer names
        oid: String,
        /// Git blob holding the pointer
        sha: String,
    },

    /// A tracked path holds something other than a pointer
    UnexpectedGitObject {
        /// Path in the tree
        path: String,
        /// Commit whose tree holds the path
        rev: String,
        /// Why it is not a pointer
        reason: String,
    },
}

impl PointerFinding {
    /// Report line for this finding
    pub fn line(&self) -> String {
        match self {
            PointerFinding::NonCanonical { oid, sha } => format!(
                "pointer: nonCanonicalPointer: Pointer for {} (blob {}) was not canonical",
                oid, sha
            ),
            PointerFinding::UnexpectedGitObject { path, rev, .. } => format!(
                "pointer: unexpectedGitObject: {:?} (treeish {}) should have been a pointer but was not",
                path, rev
            ),
        }
    }
}

/// Result of a pointer validity check
#[derive(Debug, Clone, Default, Serialize)]
pub struct PointerReport {
    /// Pointers that parsed
    pub pointers_checked: u64,

    /// Problems, in the order they were found
    pub findings: Vec<PointerFinding>,
}

impl PointerReport {
    /// Whether nothing was found
    pub fn is_ok(&self) -> bool {
        self.findings.is_empty()
    }

    /// One line per finding
    pub fn lines(&self) -> Vec<String> {
        self.findings.iter().map(PointerFinding::line).collect()
    }

    fn record(
        &mut self,
        item: GitResult<WrappedPointer>,
        seen: &mut HashSet<String>,
    ) -> GitResult<()> {
        match item {
            Ok(pointer) => {
                self.pointers_checked += 1;
                if !pointer.canonical && seen.insert(pointer.sha1.to_string()) {
                    self.findings.push(PointerFinding::NonCanonical {
                        oid: pointer.oid().to_string(),
                        sha: pointer.sha1.to_string(),
                    });
                }
                Ok(())
            }
            Err(GitError::NotAPointer {
                path, rev, reason, ..
            }) => {
                self.findings.push(PointerFinding::UnexpectedGitObject {
                    path,
                    rev,
                    reason: reason.to_string(),
                });
                Ok(())
            }
            Err(GitError::PointerParse { sha, name, reason }) => {
                debug!(%sha, %name, %reason, "Unparsable blob outside a tree scan");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Check pointer validity across every commit in `scope`
///
/// `scanner` should carry the repository's attributes; without them only
/// non-canonical pointers can be found.
#[instrument(skip_all, fields(scope = %scope.name))]
pub async fn check_pointers(
    scanner: &GitScanner,
    scope: &RefScope,
    opts: &ScanRefsOptions,
) -> StoreResult<PointerReport> {
    let mut report = PointerReport::default();
    let mut seen = HashSet::new();
    let mut unexpected = None;

    scanner
        .scan_refs_by_tree(&scope.include, &scope.exclude, opts, |item| {
            if let Err(err) = report.record(item, &mut seen) {
                unexpected.get_or_insert(err);
            }
        })
        .await?;
    if let Some(err) = unexpected {
        return Err(err.into());
    }

    info!(
        pointers = report.pointers_checked,
        findings = report.findings.len(),
        "Pointer check complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfs_git::{ObjectId, Pointer, PointerError};

    const BLOB: &str = "0123456789abcdef0123456789abcdef01234567";

    fn crlf_pointer() -> WrappedPointer {
        let text = Pointer::from_content(b"x").encode().replace('\n', "\r\n");
        WrappedPointer::from_blob(ObjectId::from_hex(BLOB).unwrap(), "a.dat", text.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_non_canonical_reported_once_per_blob() {
        let mut report = PointerReport::default();
        let mut seen = HashSet::new();
        report.record(Ok(crlf_pointer()), &mut seen).unwrap();
        report.record(Ok(crlf_pointer()), &mut seen).unwrap();

        assert_eq!(report.pointers_checked, 2);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(
            report.lines()[0],
            format!(
                "pointer: nonCanonicalPointer: Pointer for {} (blob {}) was not canonical",
                Pointer::from_content(b"x").oid,
                BLOB
            )
        );
    }

    #[test]
    fn test_not_a_pointer_line() {
        let mut report = PointerReport::default();
        report
            .record(
                Err(GitError::NotAPointer {
                    path: "big.dat".to_string(),
                    rev: "abc123".to_string(),
                    sha: BLOB.to_string(),
                    reason: PointerError::TooLarge(2048),
                }),
                &mut HashSet::new(),
            )
            .unwrap();

        assert_eq!(
            report.lines(),
            vec![
                "pointer: unexpectedGitObject: \"big.dat\" (treeish abc123) should have been a pointer but was not"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_faults_are_passed_through() {
        let mut report = PointerReport::default();
        let err = report
            .record(Err(GitError::Cancelled), &mut HashSet::new())
            .unwrap_err();
        assert!(matches!(err, GitError::Cancelled));
        assert!(report.is_ok());
    }
}
