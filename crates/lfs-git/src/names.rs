// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Shared object-id → path table
//!
//! The rev-list enumerator records the path each blob was first seen at so
//! later stages can name blobs without asking git again. In tree mode several
//! per-revision workers write concurrently, so all access goes through the
//! lock.

use crate::oid::ObjectId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Thread-safe map from object id to best-known path
#[derive(Debug, Default)]
pub struct NameMap {
    names: RwLock<HashMap<ObjectId, String>>,
}

impl NameMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` for `id`, keeping an existing non-empty entry
    pub fn set(&self, id: &ObjectId, name: &str) {
        if name.is_empty() {
            return;
        }
        let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
        names
            .entry(id.clone())
            .or_insert_with(|| name.to_string());
    }

    /// Best-known name for `id`
    pub fn get(&self, id: &ObjectId) -> Option<String> {
        let names = self.names.read().unwrap_or_else(PoisonError::into_inner);
        names.get(id).cloned()
    }

    /// Number of recorded names
    pub fn len(&self) -> usize {
        self.names.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no names have been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
