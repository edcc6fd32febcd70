// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Integrity and pointer checks against real git repositories

use lfs_git::{GitRepo, GitScanner, ScanRefsOptions};
use lfs_store::{
    check_pointers, IntegrityChecker, IntegrityOptions, ObjectOutcome, ObjectStore,
    PointerFinding,
};
use lfs_test_utils::{assert_hash_mismatch, assert_object_present, assert_quarantined, TestFixtures, TestRepo};
use std::sync::Arc;

struct Fixture {
    git: Arc<GitRepo>,
    store: ObjectStore,
}

impl Fixture {
    fn open(repo: &TestRepo) -> Self {
        let git = GitRepo::discover(repo.path()).expect("Failed to discover repository");
        let store = ObjectStore::new(git.default_lfs_dir());
        Self {
            git: Arc::new(git),
            store,
        }
    }

    fn scanner(&self) -> GitScanner {
        GitScanner::new(Arc::clone(&self.git))
    }

    fn checker(&self, dry_run: bool) -> IntegrityChecker {
        IntegrityChecker::new(self.store.clone(), IntegrityOptions { dry_run })
    }
}

#[tokio::test]
async fn test_scoped_check_names_and_quarantines_corrupt_object() {
    let repo = TestRepo::initialized();
    repo.track("*.dat");
    let good = repo.add_object("good.dat", b"good content");
    let bad = repo.add_object("media/bad.dat", b"bad content");
    repo.add(&[".gitattributes", "good.dat", "media/bad.dat"]);
    repo.commit("Add objects");
    repo.corrupt_object(&bad);

    let fixture = Fixture::open(&repo);
    let scope = fixture.git.resolve_scope("HEAD").unwrap();
    let report = fixture
        .checker(false)
        .check_scope(&fixture.scanner(), &scope, &ScanRefsOptions::default())
        .await
        .unwrap();

    assert_eq!(report.objects_checked, 2);
    assert_eq!(report.corrupt_objects, 1);
    assert_eq!(
        report.lines()[0],
        format!("objects: corruptObject: media/bad.dat ({}) is corrupt", bad)
    );
    assert_object_present(&repo, &good);
    assert_quarantined(&repo, &bad);
}

#[tokio::test]
async fn test_dry_run_keeps_corrupt_object() {
    let repo = TestRepo::initialized();
    let bad = repo.add_object("a.dat", b"content");
    repo.add(&["a.dat"]);
    repo.commit("Add a");
    repo.corrupt_object(&bad);

    let fixture = Fixture::open(&repo);
    let report = fixture.checker(true).check_store().await.unwrap();

    assert_eq!(report.corrupt_objects, 1);
    assert!(report.dry_run);
    assert_object_present(&repo, &bad);
    assert_hash_mismatch(&repo, &bad);
    assert!(!repo.lfs_dir().join("bad").exists());
}

#[tokio::test]
async fn test_range_scope_checks_only_new_objects() {
    let repo = TestRepo::initialized();
    let old = repo.add_object("old.dat", b"old content");
    repo.add(&["old.dat"]);
    let c1 = repo.commit("Old object");
    let new = repo.add_object("new.dat", b"new content");
    repo.add(&["new.dat"]);
    let c2 = repo.commit("New object");
    repo.corrupt_object(&old);

    let fixture = Fixture::open(&repo);
    let opts = ScanRefsOptions::default();

    let range = fixture.git.resolve_scope(&format!("{}..{}", c1, c2)).unwrap();
    let report = fixture
        .checker(true)
        .check_scope(&fixture.scanner(), &range, &opts)
        .await
        .unwrap();
    assert!(report.is_ok());
    let checked: Vec<String> = report.results.iter().map(|r| r.oid.to_hex()).collect();
    assert_eq!(checked, vec![new]);

    let everything = fixture.git.resolve_scope("HEAD").unwrap();
    let report = fixture
        .checker(true)
        .check_scope(&fixture.scanner(), &everything, &opts)
        .await
        .unwrap();
    assert_eq!(report.corrupt_objects, 1);
    assert_eq!(report.findings().next().unwrap().oid.to_hex(), old);
}

#[tokio::test]
async fn test_unfetched_object_is_missing_not_corrupt() {
    let repo = TestRepo::initialized();
    let oid = repo.write_pointer("a.dat", b"never downloaded");
    repo.add(&["a.dat"]);
    repo.commit("Pointer only");

    let fixture = Fixture::open(&repo);
    let scope = fixture.git.resolve_scope("HEAD").unwrap();
    let report = fixture
        .checker(false)
        .check_scope(&fixture.scanner(), &scope, &ScanRefsOptions::default())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].outcome, ObjectOutcome::Missing);
    assert_eq!(report.results[0].oid.to_hex(), oid);
    assert_eq!(report.quarantined_objects, 0);
}

#[tokio::test]
async fn test_pointer_check_reports_defects() {
    let repo = TestRepo::initialized();
    repo.track("*.dat");
    repo.write_file(
        "crlf.dat",
        TestFixtures::non_canonical_pointer_text(b"crlf content").as_bytes(),
    );
    repo.write_file("plain.dat", b"not a pointer\n");
    repo.add(&[".gitattributes", "crlf.dat", "plain.dat"]);
    repo.commit("Add defects");
    repo.add_and_commit("notes.txt", b"notes\n", "Second commit");

    let fixture = Fixture::open(&repo);
    let attributes = fixture.git.attributes().unwrap();
    let scanner = fixture.scanner().with_attributes(attributes);
    let scope = fixture.git.resolve_scope("HEAD").unwrap();

    let report = check_pointers(&scanner, &scope, &ScanRefsOptions::default())
        .await
        .unwrap();

    let non_canonical: Vec<_> = report
        .findings
        .iter()
        .filter(|f| matches!(f, PointerFinding::NonCanonical { .. }))
        .collect();
    assert_eq!(non_canonical.len(), 1);
    let crlf_blob = repo.blob_id("HEAD", "crlf.dat");
    assert!(matches!(
        non_canonical[0],
        PointerFinding::NonCanonical { sha, .. } if *sha == crlf_blob
    ));

    let unexpected: Vec<_> = report
        .findings
        .iter()
        .filter_map(|f| match f {
            PointerFinding::UnexpectedGitObject { path, .. } => Some(path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(unexpected, vec!["plain.dat", "plain.dat"]);
}

#[tokio::test]
async fn test_clean_repository_passes_both_checks() {
    let repo = TestRepo::initialized();
    repo.track("*.dat");
    repo.add_object("a.dat", b"a");
    repo.add(&[".gitattributes", "a.dat"]);
    repo.commit("Add a");

    let fixture = Fixture::open(&repo);
    let attributes = fixture.git.attributes().unwrap();
    let scanner = fixture.scanner().with_attributes(attributes);
    let scope = fixture.git.resolve_scope("HEAD").unwrap();
    let opts = ScanRefsOptions::default();

    let objects = fixture.checker(false).check_scope(&scanner, &scope, &opts).await.unwrap();
    let pointers = check_pointers(&scanner, &scope, &opts).await.unwrap();

    assert!(objects.is_ok());
    assert!(pointers.is_ok());
    assert_eq!(pointers.pointers_checked, 1);
}

#[tokio::test]
async fn test_pointer_check_follows_attributes_of_each_commit() {
    let repo = TestRepo::initialized();
    repo.track("*.dat");
    repo.write_file("plain.dat", b"tracked when committed\n");
    repo.add(&[".gitattributes", "plain.dat"]);
    let tracked = repo.commit("Track *.dat");
    repo.git(&["rm", "-q", ".gitattributes"]);
    repo.commit("Untrack *.dat");

    let fixture = Fixture::open(&repo);
    let overrides = fixture.git.info_attributes().unwrap();
    let scanner = fixture.scanner().with_committed_attributes(overrides);
    let opts = ScanRefsOptions::default();

    // Only the commit that still tracked *.dat is reported
    let scope = fixture.git.resolve_scope("HEAD").unwrap();
    let report = check_pointers(&scanner, &scope, &opts).await.unwrap();
    assert_eq!(report.findings.len(), 1);
    assert!(matches!(
        &report.findings[0],
        PointerFinding::UnexpectedGitObject { path, rev, .. }
            if path == "plain.dat" && *rev == tracked
    ));

    // The rules no longer exist in the working tree, yet the old commit fails
    let scope = fixture.git.resolve_scope(&tracked).unwrap();
    let report = check_pointers(&scanner, &scope, &opts).await.unwrap();
    assert!(!report.is_ok());
}

#[tokio::test]
async fn test_info_attributes_override_committed_rules() {
    let repo = TestRepo::initialized();
    repo.write_file("plain.bin", b"never committed as tracked\n");
    repo.add(&["plain.bin"]);
    repo.commit("Add plain.bin");
    repo.write_file(
        ".git/info/attributes",
        b"*.bin filter=lfs diff=lfs merge=lfs -text\n",
    );

    let fixture = Fixture::open(&repo);
    let overrides = fixture.git.info_attributes().unwrap();
    let scanner = fixture.scanner().with_committed_attributes(overrides);
    let scope = fixture.git.resolve_scope("HEAD").unwrap();

    let report = check_pointers(&scanner, &scope, &ScanRefsOptions::default())
        .await
        .unwrap();
    assert!(matches!(
        report.findings.as_slice(),
        [PointerFinding::UnexpectedGitObject { path, .. }] if path == "plain.bin"
    ));
}
