// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Per-revision tree scanning
//!
//! Lists a revision's full tree with `git ls-tree -r -l -z` and checks every
//! tracked, pointer-sized blob in it. Used by the tree-mode scan, where a
//! tracked path holding something other than a pointer is itself a finding.

use crate::attributes::AttributeMatcher;
use crate::cat_file::ObjectReader;
use crate::error::{GitError, GitResult, PointerError};
use crate::filter::PathFilter;
use crate::names::NameMap;
use crate::oid::ObjectId;
use crate::pointer::{WrappedPointer, MAX_POINTER_SIZE};
use crate::repo::GitRepo;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// Git file mode of a symbolic link
pub const MODE_SYMLINK: &str = "120000";

/// Git file mode of a submodule (gitlink)
pub const MODE_GITLINK: &str = "160000";

/// One record of `git ls-tree -r -l -z`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Octal file mode
    pub mode: String,
    /// Object type
    pub kind: String,
    /// Object id
    pub sha: ObjectId,
    /// Blob size; `None` for trees and submodules
    pub size: Option<u64>,
    /// Path from the repository root
    pub path: String,
}

impl TreeEntry {
    /// A regular or executable file
    pub fn is_file_blob(&self) -> bool {
        self.kind == "blob" && self.mode != MODE_SYMLINK
    }

    /// A symbolic link
    pub fn is_symlink(&self) -> bool {
        self.mode == MODE_SYMLINK
    }

    /// A submodule commit
    pub fn is_submodule(&self) -> bool {
        self.mode == MODE_GITLINK || self.kind == "commit"
    }
}

/// Parse NUL-terminated `<mode> <type> <sha> <size>\t<path>` records
pub fn parse_ls_tree(output: &[u8]) -> GitResult<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    for record in output.split(|b| *b == 0).filter(|r| !r.is_empty()) {
        let record = String::from_utf8_lossy(record);
        let protocol = || GitError::Protocol {
            command: "ls-tree".to_string(),
            line: record.to_string(),
        };

        let (meta, path) = record.split_once('\t').ok_or_else(protocol)?;
        let mut fields = meta.split_whitespace();
        let (Some(mode), Some(kind), Some(sha), Some(size)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(protocol());
        };

        let size = match size {
            "-" => None,
            n => Some(n.parse::<u64>().map_err(|_| protocol())?),
        };
        entries.push(TreeEntry {
            mode: mode.to_string(),
            kind: kind.to_string(),
            sha: ObjectId::from_hex(sha).map_err(|_| protocol())?,
            size,
            path: path.to_string(),
        });
    }
    Ok(entries)
}

/// List every entry reachable from `rev`'s root tree
pub async fn list_tree(repo: &GitRepo, rev: &str) -> GitResult<Vec<TreeEntry>> {
    let output = repo
        .output(&["ls-tree", "-r", "-l", "-z", "--full-tree", rev])
        .await?;
    parse_ls_tree(&output)
}

/// Where a tree-mode scan learns which paths are tracked
#[derive(Debug, Clone)]
pub enum AttributeSource {
    /// One matcher for every revision
    Fixed(Arc<AttributeMatcher>),
    /// Each revision's committed `.gitattributes` files, with these rules
    /// (typically `info/attributes`) applied on top
    Committed(Arc<AttributeMatcher>),
}

/// State shared by all workers of one tree-mode scan
#[derive(Debug)]
pub struct TreeScanContext {
    /// Object id → path table
    pub names: Arc<NameMap>,
    /// When set, only tracked paths are considered and non-pointers are findings
    pub attributes: Option<AttributeSource>,
    /// Include/exclude filter
    pub filter: Arc<PathFilter>,
    seen: Mutex<HashSet<ObjectId>>,
}

impl TreeScanContext {
    /// Fresh context for one scan
    pub fn new(
        names: Arc<NameMap>,
        attributes: Option<AttributeSource>,
        filter: Arc<PathFilter>,
    ) -> Self {
        Self {
            names,
            attributes,
            filter,
            seen: Mutex::new(HashSet::new()),
        }
    }

    fn already_reported(&self, sha: &ObjectId) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(sha)
    }

    /// Returns false if another worker claimed `sha` first
    fn claim(&self, sha: &ObjectId) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sha.clone())
    }

    fn is_candidate(&self, attributes: Option<&AttributeMatcher>, path: &str) -> bool {
        let tracked = match attributes {
            Some(attributes) => attributes.is_tracked(path),
            None => true,
        };
        tracked && self.filter.allows(path)
    }

    fn strict(&self) -> bool {
        self.attributes.is_some()
    }
}

/// Scan one revision's tree, sending pointers and findings to `results`
///
/// A pointer blob is sent at most once across all workers sharing `ctx`.
/// With attributes configured, every tracked path whose blob is not a
/// pointer is sent as [`GitError::NotAPointer`], once per path.
#[instrument(skip_all, fields(rev = %rev))]
pub async fn scan_tree_for_pointers(
    repo: &GitRepo,
    rev: &ObjectId,
    ctx: &TreeScanContext,
    results: &mpsc::Sender<GitResult<WrappedPointer>>,
) -> GitResult<()> {
    let entries = list_tree(repo, rev.as_str()).await?;
    let mut reader: Option<ObjectReader> = None;
    let mut delivered = 0usize;

    let committed;
    let attributes = match &ctx.attributes {
        None => None,
        Some(AttributeSource::Fixed(matcher)) => Some(matcher.as_ref()),
        Some(AttributeSource::Committed(overrides)) => {
            committed = committed_attributes(repo, &entries, overrides, &mut reader).await?;
            Some(&committed)
        }
    };

    for entry in &entries {
        if entry.is_submodule() || !entry.is_file_blob() {
            continue;
        }
        if !ctx.is_candidate(attributes, &entry.path) {
            continue;
        }
        ctx.names.set(&entry.sha, &entry.path);

        let size = entry.size.unwrap_or(0);
        if size == 0 || ctx.already_reported(&entry.sha) {
            continue;
        }

        let not_a_pointer = |reason: PointerError| GitError::NotAPointer {
            path: entry.path.clone(),
            rev: rev.to_string(),
            sha: entry.sha.to_string(),
            reason,
        };

        if size >= MAX_POINTER_SIZE as u64 {
            if ctx.strict() {
                let len = usize::try_from(size).unwrap_or(usize::MAX);
                if results.send(Err(not_a_pointer(PointerError::TooLarge(len)))).await.is_err() {
                    break;
                }
            }
            continue;
        }

        if reader.is_none() {
            reader = Some(ObjectReader::start(repo)?);
        }
        let Some(active) = reader.as_mut() else {
            continue;
        };
        let Some((_, data)) = active.read(&entry.sha).await? else {
            debug!(sha = %entry.sha, "Blob listed in tree but missing");
            continue;
        };

        let item = match WrappedPointer::from_blob(entry.sha.clone(), entry.path.clone(), &data) {
            Ok(pointer) => {
                if !ctx.claim(&entry.sha) {
                    continue;
                }
                delivered += 1;
                Ok(pointer.with_ref(rev.as_str()))
            }
            Err(PointerError::Empty) => continue,
            Err(reason) => {
                if !ctx.strict() {
                    continue;
                }
                Err(not_a_pointer(reason))
            }
        };
        if results.send(item).await.is_err() {
            debug!("Tree scan consumer went away");
            break;
        }
    }

    if let Some(reader) = reader {
        reader.close().await?;
    }
    debug!(pointers = delivered, "Scanned tree");
    Ok(())
}

/// Build the matcher for one revision from the `.gitattributes` blobs in its
/// tree, shallowest first, then `overrides`
async fn committed_attributes(
    repo: &GitRepo,
    entries: &[TreeEntry],
    overrides: &AttributeMatcher,
    reader: &mut Option<ObjectReader>,
) -> GitResult<AttributeMatcher> {
    let mut files: Vec<(&str, &TreeEntry)> = entries
        .iter()
        .filter(|e| e.is_file_blob())
        .filter_map(|e| attributes_dir(&e.path).map(|dir| (dir, e)))
        .collect();
    files.sort_by(|a, b| dir_depth(a.0).cmp(&dir_depth(b.0)).then_with(|| a.0.cmp(b.0)));

    let mut matcher = AttributeMatcher::new();
    for (dir, entry) in files {
        if reader.is_none() {
            *reader = Some(ObjectReader::start(repo)?);
        }
        let Some(active) = reader.as_mut() else {
            continue;
        };
        let Some((_, data)) = active.read(&entry.sha).await? else {
            debug!(path = %entry.path, "Attributes blob missing");
            continue;
        };
        matcher.add_source(&String::from_utf8_lossy(&data), dir);
    }
    matcher.extend(overrides);
    Ok(matcher)
}

/// Directory a `.gitattributes` path applies to, `None` for other paths
fn attributes_dir(path: &str) -> Option<&str> {
    if path == ".gitattributes" {
        Some("")
    } else {
        path.strip_suffix("/.gitattributes")
    }
}

fn dir_depth(dir: &str) -> usize {
    if dir.is_empty() {
        0
    } else {
        dir.matches('/').count() + 1
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ls_tree() {
        let blob = "a".repeat(40);
        let link = "b".repeat(40);
        let module = "c".repeat(40);
        let raw = format!(
            "100644 blob {blob}     132\tdir/file with space.dat\0\
             120000 blob {link}       7\tlink.dat\0\
             160000 commit {module}       -\tvendor/lib\0"
        );
        let entries = parse_ls_tree(raw.as_bytes()).unwrap();
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].path, "dir/file with space.dat");
        assert_eq!(entries[0].size, Some(132));
        assert!(entries[0].is_file_blob());

        assert!(entries[1].is_symlink());
        assert!(!entries[1].is_file_blob());

        assert!(entries[2].is_submodule());
        assert_eq!(entries[2].size, None);
    }

    #[test]
    fn test_parse_ls_tree_rejects_garbage() {
        assert!(parse_ls_tree(b"100644 blob\tpath\0").is_err());
        assert!(parse_ls_tree(b"no tab here\0").is_err());
    }

    #[test]
    fn test_context_candidate_rules() {
        let mut attributes = AttributeMatcher::new();
        attributes.add_source("*.dat filter=lfs\nskip/*.dat -filter\n", "");
        let filter = PathFilter::new(Vec::<String>::new(), ["ignored"]).unwrap();
        let attributes = Arc::new(attributes);
        let ctx = TreeScanContext::new(
            Arc::new(NameMap::new()),
            Some(AttributeSource::Fixed(Arc::clone(&attributes))),
            Arc::new(filter),
        );
        let matcher = Some(attributes.as_ref());

        assert!(ctx.is_candidate(matcher, "a.dat"));
        assert!(!ctx.is_candidate(matcher, "skip/a.dat"));
        assert!(!ctx.is_candidate(matcher, "ignored/a.dat"));
        assert!(!ctx.is_candidate(matcher, "a.txt"));
        assert!(ctx.strict());
    }

    #[test]
    fn test_attributes_dir() {
        assert_eq!(attributes_dir(".gitattributes"), Some(""));
        assert_eq!(attributes_dir("media/raw/.gitattributes"), Some("media/raw"));
        assert_eq!(attributes_dir("media/not.gitattributes"), None);
        assert_eq!(attributes_dir("a.dat"), None);
        assert_eq!(dir_depth(""), 0);
        assert_eq!(dir_depth("media"), 1);
        assert_eq!(dir_depth("media/raw"), 2);
    }

    #[test]
    fn test_claim_once() {
        let ctx = TreeScanContext::new(
            Arc::new(NameMap::new()),
            None,
            Arc::new(PathFilter::allow_all()),
        );
        let sha = ObjectId::from_hex(&"d".repeat(40)).unwrap();
        assert!(!ctx.already_reported(&sha));
        assert!(ctx.claim(&sha));
        assert!(!ctx.claim(&sha));
        assert!(ctx.already_reported(&sha));
    }
}
