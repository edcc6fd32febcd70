// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Object store integrity checking (fsck)
//!
//! Recomputes the SHA-256 of stored objects and compares it with the OID
//! their path promises. Corrupt objects are moved to the quarantine area
//! unless the check runs dry.
//!
//! Two enumeration modes:
//!
//! - **Store walk** ([`IntegrityChecker::check_store`]): every object file
//!   physically present under `objects/`
//! - **Scoped** ([`IntegrityChecker::check_scope`]): exactly the pointers a
//!   flat scan finds for a ref or range; objects the scope needs but the
//!   store lacks are reported as missing

use crate::error::StoreResult;
use crate::oid::ContentOid;
use crate::store::ObjectStore;
use lfs_git::{GitScanner, RefScope, ScanRefsOptions, WrappedPointer};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// What verifying one object found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ObjectOutcome {
    /// Bytes hash to the expected OID
    Ok,

    /// Bytes do not hash to the expected OID, or the size disagrees with
    /// the pointer
    Corrupt {
        /// OID the bytes actually hash to
        actual_oid: ContentOid,
        /// Bytes on disk
        actual_size: u64,
    },

    /// A pointer needs the object but the store has no file for it
    Missing,

    /// The file exists but could not be read
    Unreadable {
        /// Error description
        reason: String,
    },
}

/// Per-object integrity result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityResult {
    /// Expected OID
    pub oid: ContentOid,

    /// Bucketed path checked
    pub path: PathBuf,

    /// Path of the pointer in the working tree, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Verification outcome
    #[serde(flatten)]
    pub outcome: ObjectOutcome,

    /// Whether the object was moved to the quarantine area
    pub quarantined: bool,

    /// Why moving a corrupt object to the quarantine area failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_error: Option<String>,
}

impl IntegrityResult {
    /// Whether the object's bytes are bad
    pub fn is_corrupt(&self) -> bool {
        matches!(self.outcome, ObjectOutcome::Corrupt { .. })
    }

    /// Whether this result should be reported
    pub fn is_finding(&self) -> bool {
        self.outcome != ObjectOutcome::Ok
    }

    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.oid.to_hex())
    }

    /// Report line for a finding, `None` when the object is fine
    pub fn line(&self) -> Option<String> {
        let name = self.display_name();
        match &self.outcome {
            ObjectOutcome::Ok => None,
            ObjectOutcome::Corrupt { .. } => Some(format!(
                "objects: corruptObject: {} ({}) is corrupt",
                name, self.oid
            )),
            ObjectOutcome::Missing => Some(format!(
                "objects: missingObject: {} ({}) is missing",
                name, self.oid
            )),
            ObjectOutcome::Unreadable { reason } => Some(format!(
                "objects: openError: {} ({}) could not be checked: {}",
                name, self.oid, reason
            )),
        }
    }
}

/// Summary of an integrity check
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    /// Every object checked, in check order
    pub results: Vec<IntegrityResult>,

    /// Objects verified
    pub objects_checked: u64,

    /// Objects whose bytes did not match
    pub corrupt_objects: u64,

    /// Objects referenced but absent
    pub missing_objects: u64,

    /// Objects that could not be read
    pub unreadable_objects: u64,

    /// Objects moved to the quarantine area
    pub quarantined_objects: u64,

    /// Corrupt objects that could not be moved
    pub quarantine_failures: u64,

    /// Quarantine destination
    pub bad_dir: PathBuf,

    /// Whether repair was suppressed
    pub dry_run: bool,
}

impl IntegrityReport {
    fn new(bad_dir: PathBuf, dry_run: bool) -> Self {
        Self {
            results: Vec::new(),
            objects_checked: 0,
            corrupt_objects: 0,
            missing_objects: 0,
            unreadable_objects: 0,
            quarantined_objects: 0,
            quarantine_failures: 0,
            bad_dir,
            dry_run,
        }
    }

    fn add_result(&mut self, result: IntegrityResult) {
        self.objects_checked += 1;
        match result.outcome {
            ObjectOutcome::Ok => {}
            ObjectOutcome::Corrupt { .. } => self.corrupt_objects += 1,
            ObjectOutcome::Missing => self.missing_objects += 1,
            ObjectOutcome::Unreadable { .. } => self.unreadable_objects += 1,
        }
        self.results.push(result);
    }

    /// Number of reported problems
    pub fn total_findings(&self) -> u64 {
        self.corrupt_objects + self.missing_objects + self.unreadable_objects
    }

    /// Whether nothing was found
    pub fn is_ok(&self) -> bool {
        self.total_findings() == 0
    }

    /// Results that are not `Ok`
    pub fn findings(&self) -> impl Iterator<Item = &IntegrityResult> {
        self.results.iter().filter(|r| r.is_finding())
    }

    /// Human-readable report: one line per finding, then the repair summary
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.results.iter().filter_map(|r| r.line()).collect();
        if self.quarantined_objects > 0 {
            lines.push(format!(
                "objects: repair: moving corrupt objects to {}",
                self.bad_dir.display()
            ));
        }
        for result in &self.results {
            if let Some(reason) = &result.quarantine_error {
                lines.push(format!(
                    "objects: repair: could not move {} ({}) to {}: {}",
                    result.display_name(),
                    result.oid,
                    self.bad_dir.display(),
                    reason
                ));
            }
        }
        lines
    }
}

/// Options for an integrity check
#[derive(Debug, Clone, Default)]
pub struct IntegrityOptions {
    /// Report corruption without moving anything
    pub dry_run: bool,
}

/// An object to verify, with what the pointer says about it
#[derive(Debug, Clone)]
struct Expected {
    oid: ContentOid,
    size: Option<u64>,
    name: Option<String>,
}

/// Object store integrity checker
#[derive(Debug, Clone)]
pub struct IntegrityChecker {
    store: ObjectStore,
    options: IntegrityOptions,
}

impl IntegrityChecker {
    /// Checker over `store`
    pub fn new(store: ObjectStore, options: IntegrityOptions) -> Self {
        Self { store, options }
    }

    /// The store being checked
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Verify every object file in the store
    #[instrument(skip(self), fields(dry_run = self.options.dry_run))]
    pub async fn check_store(&self) -> StoreResult<IntegrityReport> {
        info!("Checking every stored object");
        let expected = self
            .store
            .list_objects()?
            .into_iter()
            .map(|object| Expected {
                oid: object.oid,
                size: None,
                name: None,
            });
        self.run(expected).await
    }

    /// Verify the objects named by `pointers`
    ///
    /// Pointers sharing a content OID are checked once, under the first name.
    #[instrument(skip_all, fields(dry_run = self.options.dry_run))]
    pub async fn check_pointers<I>(&self, pointers: I) -> StoreResult<IntegrityReport>
    where
        I: IntoIterator<Item = WrappedPointer>,
    {
        let mut seen = HashSet::new();
        let mut expected = Vec::new();
        for pointer in pointers {
            let oid = match ContentOid::from_hex(pointer.oid()) {
                Ok(oid) => oid,
                Err(e) => {
                    warn!(sha = %pointer.sha1, error = %e, "Pointer OID is not a store OID");
                    continue;
                }
            };
            if !seen.insert(oid) {
                continue;
            }
            expected.push(Expected {
                oid,
                size: Some(pointer.size()),
                name: (!pointer.name.is_empty()).then(|| pointer.name.clone()),
            });
        }
        self.run(expected).await
    }

    /// Verify the objects a ref or range needs
    ///
    /// Pointers that fail to parse are not objects and are left to the
    /// pointer validity check.
    pub async fn check_scope(
        &self,
        scanner: &GitScanner,
        scope: &RefScope,
        opts: &ScanRefsOptions,
    ) -> StoreResult<IntegrityReport> {
        let pointers = collect_pointers(scanner, scope, opts).await?;
        info!(scope = %scope.name, pointers = pointers.len(), "Checking objects in scope");
        self.check_pointers(pointers).await
    }

    async fn run<I>(&self, expected: I) -> StoreResult<IntegrityReport>
    where
        I: IntoIterator<Item = Expected>,
    {
        let mut report = IntegrityReport::new(self.store.bad_dir(), self.options.dry_run);

        for object in expected {
            let path = self.store.object_path(&object.oid);
            let outcome = self.verify(&object).await;
            let mut result = IntegrityResult {
                oid: object.oid,
                path,
                name: object.name,
                outcome,
                quarantined: false,
                quarantine_error: None,
            };

            if result.is_corrupt() {
                if self.options.dry_run {
                    info!(oid = %result.oid, "Dry run, leaving corrupt object in place");
                } else {
                    match self.store.quarantine(&result.oid).await {
                        Ok(_) => {
                            result.quarantined = true;
                            report.quarantined_objects += 1;
                        }
                        Err(e) => {
                            warn!(oid = %result.oid, error = %e, "Could not quarantine corrupt object");
                            result.quarantine_error = Some(e.to_string());
                            report.quarantine_failures += 1;
                        }
                    }
                }
            }
            report.add_result(result);
        }

        info!(
            checked = report.objects_checked,
            corrupt = report.corrupt_objects,
            missing = report.missing_objects,
            quarantined = report.quarantined_objects,
            quarantine_failures = report.quarantine_failures,
            "Integrity check complete"
        );
        Ok(report)
    }

    async fn verify(&self, object: &Expected) -> ObjectOutcome {
        let path = self.store.object_path(&object.oid);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return ObjectOutcome::Unreadable {
                    reason: "not a regular file".to_string(),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Nothing to store for empty content
                if object.size == Some(0) {
                    return ObjectOutcome::Ok;
                }
                debug!(oid = %object.oid, "Object missing from store");
                return ObjectOutcome::Missing;
            }
            Err(e) => {
                return ObjectOutcome::Unreadable {
                    reason: e.to_string(),
                }
            }
        }

        let (actual_oid, actual_size) = match ContentOid::from_file(&path).await {
            Ok(hashed) => hashed,
            Err(e) => {
                return ObjectOutcome::Unreadable {
                    reason: e.to_string(),
                }
            }
        };

        let size_mismatch = matches!(object.size, Some(size) if size != actual_size);
        if actual_oid == object.oid && !size_mismatch {
            debug!(oid = %object.oid, "Object verified");
            ObjectOutcome::Ok
        } else {
            warn!(oid = %object.oid, actual = %actual_oid, "Object is corrupt");
            ObjectOutcome::Corrupt {
                actual_oid,
                actual_size,
            }
        }
    }
}

/// Run a flat scan over `scope` and keep the pointers it finds
pub async fn collect_pointers(
    scanner: &GitScanner,
    scope: &RefScope,
    opts: &ScanRefsOptions,
) -> StoreResult<Vec<WrappedPointer>> {
    let mut pointers = Vec::new();
    scanner
        .scan_refs(&scope.include, &scope.exclude, opts, |item| match item {
            Ok(pointer) => pointers.push(pointer),
            Err(e) => debug!(error = %e, "Skipping unparsable blob"),
        })
        .await?;
    Ok(pointers)
}
