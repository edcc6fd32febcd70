// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Track-pattern attributes
//!
//! Decides which paths are eligible for pointer handling (`filter=lfs`) and
//! which are lockable, from the working tree's `.gitattributes` files and
//! `$GIT_DIR/info/attributes`. As in git, the last matching line wins, deeper
//! files override shallower ones and `info/attributes` overrides everything.
//! A negated attribute (`-filter`, `!filter`) opts a path out again.

use crate::error::{GitError, GitResult};
use crate::filter::PathPattern;
use crate::lockable::NameSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Filter driver name that marks a path as tracked
pub const FILTER_DRIVER_NAME: &str = "lfs";

#[derive(Debug, Clone)]
struct AttributeRule {
    pattern: PathPattern,
    tracked: Option<bool>,
    lockable: Option<bool>,
}

/// Ordered attribute rules for tracked and lockable paths
#[derive(Debug, Clone, Default)]
pub struct AttributeMatcher {
    rules: Vec<AttributeRule>,
}

impl AttributeMatcher {
    /// A matcher with no rules; nothing is tracked
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.gitattributes` under `work_tree` plus `git_dir/info/attributes`
    pub fn from_work_tree(work_tree: &Path, git_dir: &Path) -> GitResult<Self> {
        let mut files: Vec<(usize, String, std::path::PathBuf)> = Vec::new();

        for entry in WalkDir::new(work_tree)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
        {
            let entry = entry.map_err(|e| GitError::Gitattributes(e.to_string()))?;
            if !entry.file_type().is_file() || entry.file_name() != ".gitattributes" {
                continue;
            }
            let dir = entry
                .path()
                .parent()
                .and_then(|p| p.strip_prefix(work_tree).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            files.push((entry.depth(), dir, entry.path().to_path_buf()));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let mut matcher = Self::new();
        for (_, base, path) in files {
            let content = fs::read_to_string(&path)
                .map_err(|e| GitError::Gitattributes(format!("{}: {}", path.display(), e)))?;
            matcher.add_source(&content, &base);
        }

        let info = git_dir.join("info").join("attributes");
        if info.is_file() {
            let content = fs::read_to_string(&info)
                .map_err(|e| GitError::Gitattributes(format!("{}: {}", info.display(), e)))?;
            matcher.add_source(&content, "");
        }

        debug!(rules = matcher.rules.len(), "Loaded attribute rules");
        Ok(matcher)
    }

    /// Append the rules in `content`, declared in directory `base`
    pub fn add_source(&mut self, content: &str, base: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("[attr]") {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(raw_pattern) = tokens.next() else {
                continue;
            };
            if raw_pattern.starts_with('!') {
                // Negative patterns are forbidden in gitattributes
                continue;
            }

            let mut rule_tracked = None;
            let mut rule_lockable = None;
            for attr in tokens {
                match attr {
                    "-filter" | "!filter" => rule_tracked = Some(false),
                    "lockable" => rule_lockable = Some(true),
                    "-lockable" | "!lockable" => rule_lockable = Some(false),
                    _ => {
                        if let Some(driver) = attr.strip_prefix("filter=") {
                            rule_tracked = Some(driver == FILTER_DRIVER_NAME);
                        }
                    }
                }
            }
            if rule_tracked.is_none() && rule_lockable.is_none() {
                continue;
            }

            match PathPattern::with_base(raw_pattern, base) {
                Ok(pattern) => self.rules.push(AttributeRule {
                    pattern,
                    tracked: rule_tracked,
                    lockable: rule_lockable,
                }),
                Err(e) => warn!(pattern = raw_pattern, error = %e, "Skipping invalid attribute pattern"),
            }
        }
    }

    /// Append `other`'s rules after this matcher's, so they take precedence
    pub fn extend(&mut self, other: &AttributeMatcher) {
        self.rules.extend(other.rules.iter().cloned());
    }

    /// Whether `path` is tracked for pointer handling
    pub fn is_tracked(&self, path: &str) -> bool {
        self.last_match(path, |r| r.tracked)
    }

    /// Whether `path` requires an exclusive lock
    pub fn is_lockable(&self, path: &str) -> bool {
        self.last_match(path, |r| r.lockable)
    }

    /// Whether any rule can mark a path as tracked
    pub fn tracks_anything(&self) -> bool {
        self.rules.iter().any(|r| r.tracked == Some(true))
    }

    fn last_match(&self, path: &str, attr: impl Fn(&AttributeRule) -> Option<bool>) -> bool {
        self.rules
            .iter()
            .rev()
            .filter(|r| r.pattern.matches(path))
            .find_map(&attr)
            .unwrap_or(false)
    }
}

impl NameSet for AttributeMatcher {
    fn contains(&self, name: &str) -> bool {
        self.is_lockable(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tracked_and_negated() {
        let mut matcher = AttributeMatcher::new();
        matcher.add_source(
            "*.dat filter=lfs diff=lfs merge=lfs -text\n\
             excluded/*.dat !filter !diff !merge\n",
            "",
        );
        assert!(matcher.is_tracked("a.dat"));
        assert!(matcher.is_tracked("deep/a.dat"));
        assert!(!matcher.is_tracked("excluded/a.dat"));
        assert!(!matcher.is_tracked("a.txt"));
    }

    #[test]
    fn test_other_filter_untracks() {
        let mut matcher = AttributeMatcher::new();
        matcher.add_source("*.bin filter=lfs\nspecial.bin filter=crypt\n", "");
        assert!(matcher.is_tracked("a.bin"));
        assert!(!matcher.is_tracked("special.bin"));
    }

    #[test]
    fn test_lockable() {
        let mut matcher = AttributeMatcher::new();
        matcher.add_source("*.psd filter=lfs lockable\nfree.psd -lockable\n", "");
        assert!(matcher.contains("art/cover.psd"));
        assert!(!matcher.contains("free.psd"));
        assert!(!matcher.contains("notes.txt"));
    }

    #[test]
    fn test_comments_and_macros_ignored() {
        let mut matcher = AttributeMatcher::new();
        matcher.add_source("# *.dat filter=lfs\n[attr]binary -diff\n!*.x filter=lfs\n", "");
        assert!(!matcher.tracks_anything());
    }

    #[test]
    fn test_from_work_tree_nested_override() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join(".gitattributes"), "*.dat filter=lfs\n").unwrap();
        fs::create_dir_all(root.join("plain")).unwrap();
        fs::write(root.join("plain/.gitattributes"), "*.dat -filter\n").unwrap();
        fs::create_dir_all(root.join(".git/info")).unwrap();
        fs::write(root.join(".git/info/attributes"), "local.dat -filter\n").unwrap();

        let matcher = AttributeMatcher::from_work_tree(root, &root.join(".git")).unwrap();
        assert!(matcher.is_tracked("a.dat"));
        assert!(!matcher.is_tracked("plain/a.dat"));
        assert!(!matcher.is_tracked("local.dat"));
    }
}
