// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Scan coordination
//!
//! [`GitScanner`] wires the enumerator, the batch reader and the pointer
//! parser into one pipeline and hands every distinct pointer to a callback.
//!
//! Two shapes are available:
//!
//! - **Flat** ([`GitScanner::scan_refs`] and friends): every object reachable
//!   in the range goes through `cat-file --batch-check` then `--batch`.
//! - **Tree** ([`GitScanner::scan_refs_by_tree`]): one worker per revision
//!   lists that revision's tree and checks the tracked paths in it. This is
//!   what pointer validation uses, since a tracked path that does not hold a
//!   pointer is only visible per tree.
//!
//! Per-object parse failures reach the callback as `Err` values and never
//! stop the scan. Stage failures are returned from the scan call itself.

use crate::attributes::AttributeMatcher;
use crate::cat_file::{cat_file_batch, cat_file_batch_check, BatchContext};
use crate::channel::{first_error, DEFAULT_CHANNEL_CAPACITY};
use crate::error::{GitError, GitResult};
use crate::filter::PathFilter;
use crate::lockable::LockableMatcher;
use crate::pointer::WrappedPointer;
use crate::repo::GitRepo;
use crate::rev_list::{rev_list_shas, ScanRefsOptions, ScanningMode};
use crate::tree::{scan_tree_for_pointers, AttributeSource, TreeScanContext};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// Error channel capacity shared by all tree workers of one scan
pub const TREE_ERROR_CAPACITY: usize = 20;

/// Default number of revisions scanned at once in tree mode
pub const DEFAULT_TREE_CONCURRENCY: usize = 8;

/// Callback for lockable path notifications
pub type LockableCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Finds pointers in history
#[derive(Clone)]
pub struct GitScanner {
    repo: Arc<GitRepo>,
    filter: Arc<PathFilter>,
    lockable: LockableMatcher,
    found_lockable: Option<LockableCallback>,
    attributes: Option<AttributeSource>,
    channel_capacity: usize,
    tree_concurrency: usize,
}

impl fmt::Debug for GitScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitScanner")
            .field("repo", &self.repo)
            .field("filter", &self.filter)
            .field("lockable", &self.lockable)
            .field("attributes", &self.attributes.is_some())
            .field("channel_capacity", &self.channel_capacity)
            .field("tree_concurrency", &self.tree_concurrency)
            .finish()
    }
}

impl GitScanner {
    /// Scanner over `repo` with no filtering and no lock tracking
    pub fn new(repo: Arc<GitRepo>) -> Self {
        Self {
            repo,
            filter: Arc::new(PathFilter::allow_all()),
            lockable: LockableMatcher::None,
            found_lockable: None,
            attributes: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            tree_concurrency: DEFAULT_TREE_CONCURRENCY,
        }
    }

    /// Only report pointers whose path passes `filter`
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Report blobs at lockable paths to `callback`
    pub fn with_lockable<F>(mut self, matcher: LockableMatcher, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.lockable = matcher;
        self.found_lockable = Some(Arc::new(callback));
        self
    }

    /// Restrict pointer candidates to tracked paths
    ///
    /// In tree mode this also turns non-pointer blobs at tracked paths into
    /// [`GitError::NotAPointer`] findings.
    pub fn with_attributes(mut self, attributes: AttributeMatcher) -> Self {
        self.attributes = Some(AttributeSource::Fixed(Arc::new(attributes)));
        self
    }

    /// Like [`with_attributes`](Self::with_attributes), but tree-mode scans
    /// judge each revision by the `.gitattributes` files committed in it,
    /// with `overrides` applied on top
    ///
    /// Flat scans have no single tree to read attributes from and do not
    /// restrict candidates.
    pub fn with_committed_attributes(mut self, overrides: AttributeMatcher) -> Self {
        self.attributes = Some(AttributeSource::Committed(Arc::new(overrides)));
        self
    }

    fn fixed_attributes(&self) -> Option<Arc<AttributeMatcher>> {
        match &self.attributes {
            Some(AttributeSource::Fixed(matcher)) => Some(Arc::clone(matcher)),
            _ => None,
        }
    }

    /// Capacity of the channels between stages
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Upper bound on concurrently scanned revisions in tree mode
    pub fn with_tree_concurrency(mut self, workers: usize) -> Self {
        self.tree_concurrency = workers.max(1);
        self
    }

    /// The repository being scanned
    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// Pointers reachable from `include` and not from `exclude`
    #[instrument(skip(self, opts, callback))]
    pub async fn scan_refs<F>(
        &self,
        include: &[String],
        exclude: &[String],
        opts: &ScanRefsOptions,
        mut callback: F,
    ) -> GitResult<()>
    where
        F: FnMut(GitResult<WrappedPointer>),
    {
        let mut opts = opts.clone();
        opts.commits_only = false;
        opts.channel_capacity = self.channel_capacity;

        let revs = rev_list_shas(&self.repo, include, exclude, &opts)?;
        let (rev_rx, rev_stage) = revs.into_parts();

        let ctx = BatchContext {
            names: Arc::clone(&opts.names),
            lockable: self.lockable.clone(),
            tracked: self.fixed_attributes(),
            channel_capacity: self.channel_capacity,
        };
        let check = cat_file_batch_check(&self.repo, rev_rx, &ctx)?;
        let batch = cat_file_batch(&self.repo, check.candidates, &ctx)?;

        let mut pointers = batch.pointers;
        let mut large_lockable = check.lockable;
        let mut small_lockable = batch.lockable;
        let (mut pointers_open, mut large_open, mut small_open) = (true, true, true);
        let mut delivered = 0usize;

        loop {
            tokio::select! {
                item = pointers.recv(), if pointers_open => match item {
                    Some(Ok(mut pointer)) => {
                        if pointer.name.is_empty() {
                            if let Some(name) = opts.names.get(&pointer.sha1) {
                                pointer.name = name;
                            }
                        }
                        if self.filter.allows(&pointer.name) {
                            delivered += 1;
                            callback(Ok(pointer));
                        } else {
                            debug!(path = %pointer.name, "Pointer filtered out");
                        }
                    }
                    Some(Err(err)) => callback(Err(err)),
                    None => pointers_open = false,
                },
                name = large_lockable.recv(), if large_open => match name {
                    Some(name) => self.notify_lockable(&name),
                    None => large_open = false,
                },
                name = small_lockable.recv(), if small_open => match name {
                    Some(name) => self.notify_lockable(&name),
                    None => small_open = false,
                },
                else => break,
            }
        }

        let result = first_error([
            rev_stage.wait().await,
            check.stage.wait().await,
            batch.stage.wait().await,
        ]);
        info!(pointers = delivered, "Flat scan finished");
        result?;

        if opts.cancel.is_cancelled() {
            return Err(GitError::Cancelled);
        }
        Ok(())
    }

    fn notify_lockable(&self, name: &str) {
        if !self.filter.allows(name) {
            return;
        }
        if let Some(callback) = &self.found_lockable {
            callback(name);
        }
    }

    /// Pointers reachable from `left` and not from `right`
    pub async fn scan_left_right<F>(
        &self,
        left: &str,
        right: Option<&str>,
        opts: &ScanRefsOptions,
        callback: F,
    ) -> GitResult<()>
    where
        F: FnMut(GitResult<WrappedPointer>),
    {
        let include = vec![left.to_string()];
        let exclude: Vec<String> = right.map(str::to_string).into_iter().collect();
        self.scan_multi_left_right(&include, &exclude, opts, callback)
            .await
    }

    /// Pointers reachable from any of `include` and none of `exclude`
    pub async fn scan_multi_left_right<F>(
        &self,
        include: &[String],
        exclude: &[String],
        opts: &ScanRefsOptions,
        callback: F,
    ) -> GitResult<()>
    where
        F: FnMut(GitResult<WrappedPointer>),
    {
        let opts = ScanRefsOptions {
            mode: ScanningMode::ScanRefs,
            ..opts.clone()
        };
        self.scan_refs(include, exclude, &opts, callback).await
    }

    /// Pointers reachable from every ref
    pub async fn scan_all<F>(&self, opts: &ScanRefsOptions, callback: F) -> GitResult<()>
    where
        F: FnMut(GitResult<WrappedPointer>),
    {
        let opts = ScanRefsOptions {
            mode: ScanningMode::ScanAll,
            ..opts.clone()
        };
        self.scan_refs(&[], &[], &opts, callback).await
    }

    /// Pointers reachable from `left` that `remote` does not have yet
    ///
    /// `right`, when given, is excluded as well.
    pub async fn scan_range_to_remote<F>(
        &self,
        left: &str,
        right: Option<&str>,
        remote: &str,
        opts: &ScanRefsOptions,
        callback: F,
    ) -> GitResult<()>
    where
        F: FnMut(GitResult<WrappedPointer>),
    {
        let include = vec![left.to_string()];
        let exclude: Vec<String> = right.map(str::to_string).into_iter().collect();
        let opts = ScanRefsOptions {
            mode: ScanningMode::ScanRangeToRemote,
            remote: Some(remote.to_string()),
            ..opts.clone()
        };
        self.scan_refs(&include, &exclude, &opts, callback).await
    }

    /// Pointers in the tree of every commit in the range
    ///
    /// The callback runs on the calling task; workers only send results.
    #[instrument(skip(self, opts, callback))]
    pub async fn scan_refs_by_tree<F>(
        &self,
        include: &[String],
        exclude: &[String],
        opts: &ScanRefsOptions,
        mut callback: F,
    ) -> GitResult<()>
    where
        F: FnMut(GitResult<WrappedPointer>),
    {
        let mut opts = opts.clone();
        opts.commits_only = true;
        opts.channel_capacity = self.channel_capacity;

        let revs = rev_list_shas(&self.repo, include, exclude, &opts)?;
        let (mut rev_rx, rev_stage) = revs.into_parts();

        let (results_tx, mut results_rx) = mpsc::channel(self.channel_capacity);
        let (err_tx, mut err_rx) = mpsc::channel::<GitError>(TREE_ERROR_CAPACITY);
        let ctx = Arc::new(TreeScanContext::new(
            Arc::clone(&opts.names),
            self.attributes.clone(),
            Arc::clone(&self.filter),
        ));
        let repo = Arc::clone(&self.repo);
        let cancel = opts.cancel.clone();
        let concurrency = self.tree_concurrency;

        let dispatcher = tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(concurrency));
            let mut workers = JoinSet::new();
            let mut revisions = 0usize;

            loop {
                let rev = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    rev = rev_rx.recv() => match rev {
                        Some(rev) => rev,
                        None => break,
                    },
                };
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                revisions += 1;

                let repo = Arc::clone(&repo);
                let ctx = Arc::clone(&ctx);
                let results = results_tx.clone();
                let errors = err_tx.clone();
                workers.spawn(async move {
                    let _permit = permit;
                    if let Err(e) = scan_tree_for_pointers(&repo, &rev, &ctx, &results).await {
                        report_worker_error(&errors, e);
                    }
                });
            }
            drop(rev_rx);
            drop(results_tx);

            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    report_worker_error(&err_tx, e.into());
                }
            }
            debug!(revisions, "Tree workers finished");
        });

        let mut delivered = 0usize;
        while let Some(item) = results_rx.recv().await {
            delivered += 1;
            callback(item);
        }
        dispatcher.await?;

        let mut worker_error = None;
        while let Some(err) = err_rx.recv().await {
            if worker_error.is_none() {
                worker_error = Some(err);
            } else {
                warn!(error = %err, "Additional tree worker error");
            }
        }
        info!(results = delivered, "Tree scan finished");

        if let Some(err) = worker_error {
            return Err(err);
        }
        rev_stage.wait().await?;
        if opts.cancel.is_cancelled() {
            return Err(GitError::Cancelled);
        }
        Ok(())
    }
}

/// Record a worker failure without ever blocking the worker
fn report_worker_error(errors: &mpsc::Sender<GitError>, err: GitError) {
    if let Err(mpsc::error::TrySendError::Full(err)) = errors.try_send(err) {
        warn!(error = %err, "Tree error channel full, dropping error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_worker_error_never_blocks() {
        let (tx, mut rx) = mpsc::channel(TREE_ERROR_CAPACITY);
        for i in 0..(TREE_ERROR_CAPACITY + 5) {
            report_worker_error(&tx, GitError::InvalidRef(i.to_string()));
        }
        drop(tx);

        let mut received = Vec::new();
        while let Ok(err) = rx.try_recv() {
            received.push(err);
        }
        assert_eq!(received.len(), TREE_ERROR_CAPACITY);
        assert!(matches!(&received[0], GitError::InvalidRef(name) if name == "0"));
    }
}
