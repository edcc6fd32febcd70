// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 MediaGit Contributors

//! Test repository helper for integration tests.
//!
//! Provides a TestRepo struct that manages a real git repository in a
//! temporary directory, plus the large-file object store inside it.

use crate::fixtures::TestFixtures;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A git repository with automatic cleanup.
///
/// # Example
/// ```ignore
/// use lfs_test_utils::TestRepo;
///
/// let repo = TestRepo::initialized();
/// repo.track("*.dat");
/// let oid = repo.add_object("a.dat", b"large content");
/// repo.add(&[".gitattributes", "a.dat"]);
/// repo.commit("Add a.dat");
/// ```
pub struct TestRepo {
    temp_dir: TempDir,
}

impl TestRepo {
    /// Create a new empty test directory (not initialized as a repo).
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a new test directory and `git init` it on branch `main`.
    pub fn initialized() -> Self {
        let repo = Self::new();
        repo.git(&["init", "-q"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo.git(&["config", "core.autocrlf", "false"]);
        repo
    }

    /// Create a repository with one commit holding a README.
    pub fn with_initial_commit() -> Self {
        let repo = Self::initialized();
        repo.write_file("README.md", b"# Test Repository\n");
        repo.add(&["README.md"]);
        repo.commit("Initial commit");
        repo
    }

    /// Get the path to the repository directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the .git directory.
    pub fn git_dir(&self) -> PathBuf {
        self.temp_dir.path().join(".git")
    }

    /// Large-file storage root, `.git/lfs`.
    pub fn lfs_dir(&self) -> PathBuf {
        self.git_dir().join("lfs")
    }

    /// Bucketed store path of an object.
    pub fn object_path(&self, oid: &str) -> PathBuf {
        self.lfs_dir()
            .join("objects")
            .join(&oid[0..2])
            .join(&oid[2..4])
            .join(oid)
    }

    /// Quarantine path of an object.
    pub fn bad_path(&self, oid: &str) -> PathBuf {
        self.lfs_dir().join("bad").join(oid)
    }

    /// Run git in the repository, panicking on failure; returns trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Write a file to the working tree.
    pub fn write_file(&self, name: &str, content: &[u8]) {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, content).expect("Failed to write file");
    }

    /// Append a tracking rule for `pattern` to the root `.gitattributes`.
    pub fn track(&self, pattern: &str) {
        self.append_attributes(&format!("{} filter=lfs diff=lfs merge=lfs -text", pattern));
    }

    /// Append a raw line to the root `.gitattributes`.
    pub fn append_attributes(&self, line: &str) {
        let path = self.path().join(".gitattributes");
        let mut content = fs::read_to_string(&path).unwrap_or_default();
        content.push_str(line);
        content.push('\n');
        fs::write(&path, content).expect("Failed to write .gitattributes");
    }

    /// Write the canonical pointer for `content` at `name`; returns the oid.
    pub fn write_pointer(&self, name: &str, content: &[u8]) -> String {
        self.write_file(name, TestFixtures::pointer_text(content).as_bytes());
        TestFixtures::oid(content)
    }

    /// Put `content` into the object store; returns the oid.
    pub fn store_object(&self, content: &[u8]) -> String {
        let oid = TestFixtures::oid(content);
        let path = self.object_path(&oid);
        fs::create_dir_all(path.parent().expect("object path has a parent"))
            .expect("Failed to create object directory");
        fs::write(&path, content).expect("Failed to write object");
        oid
    }

    /// Write a pointer at `name` and store its content; returns the oid.
    pub fn add_object(&self, name: &str, content: &[u8]) -> String {
        self.store_object(content);
        self.write_pointer(name, content)
    }

    /// Append garbage to a stored object so its hash no longer matches.
    pub fn corrupt_object(&self, oid: &str) {
        let path = self.object_path(oid);
        let mut data = fs::read(&path).expect("Failed to read object");
        data.extend_from_slice(b"corruption");
        fs::write(&path, data).expect("Failed to corrupt object");
    }

    /// Create a symbolic link `name` pointing at `target`.
    #[cfg(unix)]
    pub fn symlink(&self, target: &str, name: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::os::unix::fs::symlink(target, path).expect("Failed to create symlink");
    }

    /// Stage paths.
    pub fn add(&self, paths: &[&str]) {
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        self.git(&args);
    }

    /// Commit staged changes; returns the new commit id.
    pub fn commit(&self, message: &str) -> String {
        self.git(&["commit", "-q", "--allow-empty", "-m", message]);
        self.rev_parse("HEAD")
    }

    /// Write, stage and commit one file; returns the new commit id.
    pub fn add_and_commit(&self, name: &str, content: &[u8], message: &str) -> String {
        self.write_file(name, content);
        self.add(&[name]);
        self.commit(message)
    }

    /// Resolve a revision to its full id.
    pub fn rev_parse(&self, rev: &str) -> String {
        self.git(&["rev-parse", rev])
    }

    /// Blob id of `path` at `rev`.
    pub fn blob_id(&self, rev: &str, path: &str) -> String {
        self.rev_parse(&format!("{}:{}", rev, path))
    }

    /// Create and switch to a new branch.
    pub fn create_branch(&self, name: &str) {
        self.git(&["checkout", "-q", "-b", name]);
    }

    /// Switch to an existing branch.
    pub fn switch_branch(&self, name: &str) {
        self.git(&["checkout", "-q", name]);
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_creation() {
        let repo = TestRepo::new();
        assert!(repo.path().exists());
    }

    #[test]
    fn test_initialized_has_git_dir() {
        let repo = TestRepo::initialized();
        assert!(repo.git_dir().is_dir());
    }

    #[test]
    fn test_store_object_layout() {
        let repo = TestRepo::new();
        let oid = repo.store_object(b"content");
        let path = repo.object_path(&oid);
        assert!(path.ends_with(format!("{}/{}/{}", &oid[0..2], &oid[2..4], oid)));
        assert_eq!(fs::read(path).unwrap(), b"content");
    }

    #[test]
    fn test_corrupt_object_changes_bytes() {
        let repo = TestRepo::new();
        let oid = repo.store_object(b"content");
        repo.corrupt_object(&oid);
        assert_ne!(TestFixtures::oid(&fs::read(repo.object_path(&oid)).unwrap()), oid);
    }

    #[test]
    fn test_commit_returns_head() {
        let repo = TestRepo::initialized();
        let sha = repo.add_and_commit("a.txt", b"a\n", "add a");
        assert_eq!(sha.len(), 40);
        assert_eq!(repo.rev_parse("HEAD"), sha);
    }
}
