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

//! Configuration schema

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default bound for pipeline channels
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Default number of concurrent tree workers
pub const DEFAULT_TREE_CONCURRENCY: usize = 8;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Object store location
    pub storage: StorageConfig,

    /// Which paths scans report
    pub fetch: FetchConfig,

    /// Scan pipeline tuning
    pub scan: ScanConfig,
}

/// Object store location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides `<git-dir>/lfs`; relative paths are taken from the git dir
    pub lfs_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The store root for a repository whose git dir is `git_dir`
    pub fn resolve_lfs_dir(&self, git_dir: &Path) -> PathBuf {
        match &self.lfs_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => git_dir.join(dir),
            None => git_dir.join("lfs"),
        }
    }
}

/// Path patterns limiting what scans report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Only paths matching one of these (empty means everything)
    pub include: Vec<String>,

    /// Paths matching any of these are dropped
    pub exclude: Vec<String>,
}

/// Scan pipeline tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Bound of every pipeline channel
    pub channel_capacity: usize,

    /// Revisions scanned at once in tree mode
    pub tree_concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            tree_concurrency: DEFAULT_TREE_CONCURRENCY,
        }
    }
}

/// Split a comma-separated pattern list, dropping blanks
pub fn split_patterns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
