// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 MediaGit Contributors

//! Custom test assertions for the object store.

use crate::fixtures::TestFixtures;
use crate::repo::TestRepo;
use std::fs;

/// Assert that an object sits at its bucketed path.
pub fn assert_object_present(repo: &TestRepo, oid: &str) {
    let path = repo.object_path(oid);
    assert!(path.is_file(), "object {} should exist at {:?}", oid, path);
}

/// Assert that an object was moved out of the store into the quarantine area.
pub fn assert_quarantined(repo: &TestRepo, oid: &str) {
    assert!(
        !repo.object_path(oid).exists(),
        "object {} should have left the store",
        oid
    );
    assert!(
        repo.bad_path(oid).is_file(),
        "object {} should be in the quarantine area",
        oid
    );
}

/// Assert that the bytes at an object's bucketed path no longer hash to its oid.
pub fn assert_hash_mismatch(repo: &TestRepo, oid: &str) {
    let data = fs::read(repo.object_path(oid)).expect("Failed to read object");
    assert_ne!(
        TestFixtures::oid(&data),
        oid,
        "object {} should still be corrupt",
        oid
    );
}

/// Assert that a `git-lfs` command succeeds.
#[macro_export]
macro_rules! assert_lfs_success {
    ($repo:expr, $($arg:expr),+ $(,)?) => {
        $crate::git_lfs()
            $(.arg($arg))+
            .current_dir($repo.path())
            .assert()
            .success()
    };
}

/// Assert that a `git-lfs` command exits with `code`.
#[macro_export]
macro_rules! assert_lfs_code {
    ($repo:expr, $code:expr, $($arg:expr),+ $(,)?) => {
        $crate::git_lfs()
            $(.arg($arg))+
            .current_dir($repo.path())
            .assert()
            .code($code)
    };
}

/// Assert that a `git-lfs` command output contains a specific string.
#[macro_export]
macro_rules! assert_lfs_output_contains {
    ($repo:expr, $expected:expr, $($arg:expr),+ $(,)?) => {
        $crate::git_lfs()
            $(.arg($arg))+
            .current_dir($repo.path())
            .assert()
            .success()
            .stdout($crate::predicates::prelude::predicate::str::contains($expected))
    };
}
