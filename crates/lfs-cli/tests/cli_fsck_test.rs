// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 MediaGit Contributors

//! CLI fsck Command Tests
//!
//! Runs `git-lfs fsck` against real repositories and checks report lines,
//! exit codes and the state of the object store afterwards.

use lfs_test_utils::{
    assert_hash_mismatch, assert_lfs_code, assert_object_present, assert_quarantined,
    LfsCommand, TestFixtures, TestRepo,
};
use predicates::prelude::*;

/// Repository tracking `*.dat` with one committed, stored object.
fn repo_with_object(content: &[u8]) -> (TestRepo, String) {
    let repo = TestRepo::initialized();
    repo.track("*.dat");
    let oid = repo.add_object("a.dat", content);
    repo.add(&[".gitattributes", "a.dat"]);
    repo.commit("Add a.dat");
    (repo, oid)
}

// ============================================================================
// Object checks
// ============================================================================

#[test]
fn test_fsck_clean_store_prints_ok() {
    let (repo, oid) = repo_with_object(b"clean content");

    LfsCommand::fsck(repo.path(), &[])
        .success()
        .stdout("Git LFS fsck OK\n");

    assert_object_present(&repo, &oid);
}

#[test]
fn test_fsck_quarantines_corrupt_object() {
    let (repo, oid) = repo_with_object(b"soon to be corrupt");
    repo.corrupt_object(&oid);

    let expected = format!("objects: corruptObject: {} ({}) is corrupt", oid, oid);
    let bad_dir = repo.lfs_dir().join("bad");
    LfsCommand::fsck(repo.path(), &[])
        .code(1)
        .stdout(predicate::str::contains(expected))
        .stdout(predicate::str::contains(format!(
            "objects: repair: moving corrupt objects to {}",
            bad_dir.display()
        )))
        .stdout(predicate::str::contains("Git LFS fsck OK").not());

    assert_quarantined(&repo, &oid);

    // Nothing left to repair on the second run
    LfsCommand::fsck(repo.path(), &[])
        .success()
        .stdout("Git LFS fsck OK\n");
}

#[test]
fn test_fsck_dry_run_leaves_store_untouched() {
    let (repo, oid) = repo_with_object(b"dry run content");
    repo.corrupt_object(&oid);

    LfsCommand::fsck(repo.path(), &["--dry-run"])
        .code(1)
        .stdout(predicate::str::contains("corruptObject"))
        .stdout(predicate::str::contains("objects: repair").not());

    assert_object_present(&repo, &oid);
    assert_hash_mismatch(&repo, &oid);
    assert!(!repo.bad_path(&oid).exists());
}

#[test]
fn test_fsck_ref_scope_names_the_path() {
    let (repo, oid) = repo_with_object(b"named content");
    repo.corrupt_object(&oid);

    LfsCommand::fsck(repo.path(), &["HEAD"])
        .code(1)
        .stdout(predicate::str::contains(format!(
            "objects: corruptObject: a.dat ({}) is corrupt",
            oid
        )));

    assert_quarantined(&repo, &oid);
}

#[test]
fn test_fsck_range_skips_older_objects() {
    let (repo, old_oid) = repo_with_object(b"older object");
    let first = repo.rev_parse("HEAD");
    repo.add_object("b.dat", b"newer object");
    repo.add(&["b.dat"]);
    repo.commit("Add b.dat");
    repo.corrupt_object(&old_oid);

    let range = format!("{}..HEAD", first);
    LfsCommand::fsck(repo.path(), &[range.as_str()])
        .success()
        .stdout("Git LFS fsck OK\n");

    assert_object_present(&repo, &old_oid);
}

#[test]
fn test_fsck_reports_missing_object() {
    let repo = TestRepo::initialized();
    repo.track("*.dat");
    let oid = repo.write_pointer("never-fetched.dat", b"not downloaded");
    repo.add(&[".gitattributes", "never-fetched.dat"]);
    repo.commit("Add pointer only");

    LfsCommand::fsck(repo.path(), &["HEAD"])
        .code(1)
        .stdout(predicate::str::contains(format!(
            "objects: missingObject: never-fetched.dat ({}) is missing",
            oid
        )));

    assert!(!repo.bad_path(&oid).exists());
}

#[test]
fn test_fsck_json_report() {
    let (repo, oid) = repo_with_object(b"json content");
    repo.corrupt_object(&oid);

    let assert = LfsCommand::fsck(repo.path(), &["--json", "--dry-run"]).code(1);
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(report["objects"]["corrupt_objects"], 1);
    assert_eq!(report["objects"]["dry_run"], true);
    assert_eq!(report["objects"]["results"][0]["oid"], oid.as_str());
    assert_eq!(report["objects"]["results"][0]["status"], "corrupt");
    assert!(report.get("pointers").is_none());
    assert_eq!(report["scope_errors"].as_array().unwrap().len(), 0);
}

// ============================================================================
// Pointer checks
// ============================================================================

#[test]
fn test_fsck_pointers_reports_non_canonical_and_plain_files() {
    let repo = TestRepo::initialized();
    repo.track("*.dat");
    let content = b"crlf content";
    repo.write_file(
        "crlf.dat",
        TestFixtures::non_canonical_pointer_text(content).as_bytes(),
    );
    repo.write_file("plain.dat", b"not a pointer\n");
    repo.add(&[".gitattributes", "crlf.dat", "plain.dat"]);
    repo.commit("Add defects");

    let blob = repo.blob_id("HEAD", "crlf.dat");
    LfsCommand::fsck(repo.path(), &["--pointers"])
        .code(1)
        .stdout(predicate::str::contains(format!(
            "pointer: nonCanonicalPointer: Pointer for {} (blob {}) was not canonical",
            TestFixtures::oid(content),
            blob
        )))
        .stdout(predicate::str::contains(
            "pointer: unexpectedGitObject: \"plain.dat\"",
        ));
}

#[test]
fn test_fsck_pointers_clean_history() {
    let (repo, _) = repo_with_object(b"canonical");

    LfsCommand::fsck(repo.path(), &["--pointers", "--objects"])
        .success()
        .stdout("Git LFS fsck OK\n");
}

#[test]
fn test_fsck_pointers_uses_committed_attributes() {
    let repo = TestRepo::initialized();
    repo.track("*.dat");
    repo.write_file("plain.dat", b"tracked when committed\n");
    repo.add(&[".gitattributes", "plain.dat"]);
    let tracked = repo.commit("Track *.dat");
    repo.git(&["rm", "-q", ".gitattributes"]);
    repo.commit("Untrack *.dat");

    LfsCommand::fsck(repo.path(), &["--pointers", tracked.as_str()])
        .code(1)
        .stdout(predicate::str::contains(format!(
            "pointer: unexpectedGitObject: \"plain.dat\" (treeish {})",
            tracked
        )));

    // Tracking rules that exist only in the working tree do not apply
    let untracked = TestRepo::initialized();
    untracked.add_and_commit("plain.bin", b"plain\n", "Add plain.bin");
    untracked.track("*.bin");
    LfsCommand::fsck(untracked.path(), &["--pointers"])
        .success()
        .stdout("Git LFS fsck OK\n");
}

// ============================================================================
// Scope errors and exit codes
// ============================================================================

#[test]
fn test_fsck_inverted_range_exits_2() {
    let (repo, _) = repo_with_object(b"first");
    let first = repo.rev_parse("HEAD");
    repo.add_and_commit("notes.txt", b"notes\n", "Second");

    let inverted = format!("HEAD..{}", first);
    assert_lfs_code!(repo, 2, "fsck", inverted.as_str())
        .stdout(predicate::str::contains("Git LFS fsck OK").not())
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_fsck_unknown_ref_exits_2_even_with_findings() {
    let (repo, oid) = repo_with_object(b"corrupt and scoped");
    repo.corrupt_object(&oid);

    assert_lfs_code!(repo, 2, "fsck", "--dry-run", "HEAD", "no-such-branch")
        .stdout(predicate::str::contains("corruptObject"));
}

#[test]
fn test_fsck_outside_repository_exits_128() {
    let dir = TestRepo::new();

    assert_lfs_code!(dir, 128, "fsck").stderr(predicate::str::contains(
        "Not in a git repository.",
    ));
}
