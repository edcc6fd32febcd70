// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 MediaGit Contributors

//! CLI command helpers for testing the `git-lfs` binary.
//!
//! Provides convenient wrappers around assert_cmd.

use assert_cmd::Command;
use std::path::Path;

/// Creates a new `git-lfs` Command for testing.
///
/// Logging is pinned to `warn` so stray environment filters cannot add
/// output to stderr.
///
/// # Example
/// ```ignore
/// use lfs_test_utils::git_lfs;
///
/// git_lfs()
///     .arg("fsck")
///     .current_dir(repo.path())
///     .assert()
///     .success();
/// ```
#[allow(deprecated)] // cargo_bin is deprecated but still works for our use case
pub fn git_lfs() -> Command {
    let mut cmd = Command::cargo_bin("git-lfs").expect("git-lfs binary not found");
    cmd.env("GIT_LFS_LOG", "warn").env_remove("RUST_LOG");
    cmd
}

/// Fluent API wrapper for common `git-lfs` command patterns.
pub struct LfsCommand {
    cmd: Command,
}

impl LfsCommand {
    /// Create a new LfsCommand.
    pub fn new() -> Self {
        Self { cmd: git_lfs() }
    }

    /// Set the working directory for the command.
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cmd.current_dir(dir);
        self
    }

    /// Add an argument to the command.
    pub fn arg(mut self, arg: &str) -> Self {
        self.cmd.arg(arg);
        self
    }

    /// Add multiple arguments to the command.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    /// Get the underlying Command for custom assertions.
    pub fn into_inner(self) -> Command {
        self.cmd
    }

    /// Run `git-lfs fsck <args>` in `dir` without asserting the outcome.
    pub fn fsck(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
        Self::new().in_dir(dir).arg("fsck").args(args).into_inner().assert()
    }

    /// Run `git-lfs ls-files <args>` in `dir` without asserting the outcome.
    pub fn ls_files(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
        Self::new().in_dir(dir).arg("ls-files").args(args).into_inner().assert()
    }
}

impl Default for LfsCommand {
    fn default() -> Self {
        Self::new()
    }
}
