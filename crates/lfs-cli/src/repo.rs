//! Repository context shared by commands
//!
//! Discovers the git repository, loads configuration from its git config
//! and the environment, and builds scanners and stores from it.

use anyhow::{Context, Result};
use lfs_config::{Config, ConfigLoader};
use lfs_git::{GitRepo, GitScanner, PathFilter, RefScope, ScanRefsOptions};
use lfs_store::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs about the current repository
#[derive(Debug, Clone)]
pub struct LfsContext {
    /// The discovered repository
    pub repo: Arc<GitRepo>,
    /// Merged `lfs.*` settings
    pub config: Config,
    /// Local object store under the LFS directory
    pub store: ObjectStore,
}

impl LfsContext {
    /// Discover the repository containing `start`
    ///
    /// The `GitError::RepositoryNotFound` from discovery is kept in the error
    /// chain so `main` can map it to exit code 128.
    pub async fn open(start: &Path) -> Result<Self> {
        let repo = GitRepo::discover(start)?;
        let entries = repo
            .config_entries()
            .await
            .context("Failed to read git config")?;
        let config = ConfigLoader::new()
            .load(&entries)
            .context("Invalid large-file configuration")?;
        let store = ObjectStore::new(config.storage.resolve_lfs_dir(repo.git_dir()));
        debug!(store = %store.root().display(), "Opened repository");

        Ok(Self {
            repo: Arc::new(repo),
            config,
            store,
        })
    }

    /// Scanner honouring the configured fetch filter and pipeline tuning
    pub fn scanner(&self) -> Result<GitScanner> {
        let filter = PathFilter::new(&self.config.fetch.include, &self.config.fetch.exclude)
            .context("Invalid fetch include/exclude pattern")?;
        Ok(GitScanner::new(Arc::clone(&self.repo))
            .with_filter(filter)
            .with_channel_capacity(self.config.scan.channel_capacity)
            .with_tree_concurrency(self.config.scan.tree_concurrency))
    }

    /// Scanner that also knows which paths must hold pointers
    ///
    /// Tracked paths come from the `.gitattributes` committed in each
    /// scanned revision, with `info/attributes` applied on top.
    pub fn strict_scanner(&self) -> Result<GitScanner> {
        let overrides = self
            .repo
            .info_attributes()
            .context("Failed to read info/attributes")?;
        Ok(self.scanner()?.with_committed_attributes(overrides))
    }

    /// Fresh scan options; each scan gets its own name map
    pub fn scan_options(&self) -> ScanRefsOptions {
        ScanRefsOptions {
            channel_capacity: self.config.scan.channel_capacity,
            ..ScanRefsOptions::default()
        }
    }

    /// Resolve a `<ref>` or `<a>..<b>` argument
    pub fn resolve(&self, arg: &str) -> lfs_git::GitResult<RefScope> {
        self.repo.resolve_scope(arg)
    }
}
