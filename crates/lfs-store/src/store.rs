// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! On-disk object store layout
//!
//! ```text
//! <lfs>/objects/ab/cd/abcd...   stored objects
//! <lfs>/bad/abcd...             quarantined objects
//! ```

use crate::error::{StoreError, StoreResult};
use crate::oid::ContentOid;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// An object file found while walking the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// OID taken from the file name
    pub oid: ContentOid,
    /// Absolute path of the file
    pub path: PathBuf,
}

/// The local content-addressed object store
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Store rooted at an `lfs` directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The `lfs` directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<lfs>/objects`
    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    /// `<lfs>/bad`
    pub fn bad_dir(&self) -> PathBuf {
        self.root.join("bad")
    }

    /// Bucketed path of an object, whether or not it exists
    pub fn object_path(&self, oid: &ContentOid) -> PathBuf {
        self.objects_dir().join(oid.bucket_path())
    }

    /// Quarantine path of an object
    pub fn bad_path(&self, oid: &ContentOid) -> PathBuf {
        self.bad_dir().join(oid.to_hex())
    }

    /// Whether the object file exists
    pub fn contains(&self, oid: &ContentOid) -> bool {
        self.object_path(oid).is_file()
    }

    /// Every object file sitting at its own bucketed path, sorted by OID
    ///
    /// Files elsewhere under `objects/` (temp files, misplaced objects) are
    /// skipped with a warning. A missing `objects/` directory is an empty
    /// store.
    pub fn list_objects(&self) -> StoreResult<Vec<StoredObject>> {
        let objects_dir = self.objects_dir();
        if !objects_dir.is_dir() {
            debug!(path = %objects_dir.display(), "No objects directory");
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&objects_dir).min_depth(3).max_depth(3) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let oid = entry
                .file_name()
                .to_str()
                .and_then(|name| ContentOid::from_hex(name).ok());
            match oid {
                Some(oid) if path == self.object_path(&oid) => objects.push(StoredObject {
                    oid,
                    path: path.to_path_buf(),
                }),
                _ => warn!(path = %path.display(), "Skipping file outside its bucket"),
            }
        }

        objects.sort_by(|a, b| a.oid.cmp(&b.oid));
        debug!(count = objects.len(), "Listed stored objects");
        Ok(objects)
    }

    /// Move an object into the quarantine area, keeping its OID as file name
    ///
    /// The quarantine directory is created on demand. Relies on a single
    /// filesystem rename; no other locking is done.
    pub async fn quarantine(&self, oid: &ContentOid) -> StoreResult<PathBuf> {
        let bad_dir = self.bad_dir();
        tokio::fs::create_dir_all(&bad_dir)
            .await
            .map_err(|e| StoreError::io("create", &bad_dir, e))?;

        let from = self.object_path(oid);
        let to = self.bad_path(oid);
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| StoreError::io("quarantine", &from, e))?;

        warn!(oid = %oid, to = %to.display(), "Quarantined corrupt object");
        Ok(to)
    }
}
