// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Pipeline stage plumbing
//!
//! Every stage is one tokio task that owns the senders of its output
//! channels. Dropping those senders when the task returns is what closes the
//! channels, so a reader can never observe a write after close.

use crate::error::{GitError, GitResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Default capacity of result channels between stages
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Error channel capacity for a single subprocess stage
///
/// One slot for the process's own failure plus room for close-time failures.
pub const STAGE_ERROR_CAPACITY: usize = 5;

/// Completion handle of a running stage
#[derive(Debug)]
pub struct Stage {
    name: &'static str,
    errors: mpsc::Receiver<GitError>,
    task: JoinHandle<()>,
}

impl Stage {
    /// Wrap a spawned task and the receiving end of its error channel
    pub fn new(name: &'static str, errors: mpsc::Receiver<GitError>, task: JoinHandle<()>) -> Self {
        Self { name, errors, task }
    }

    /// Wait for the stage to finish and return its first error
    ///
    /// Only call this once the stage's result channels are drained (or
    /// dropped), otherwise the task may be blocked on a full channel.
    pub async fn wait(mut self) -> GitResult<()> {
        let mut first = None;
        while let Some(err) = self.errors.recv().await {
            if first.is_none() {
                first = Some(err);
            } else {
                warn!(stage = self.name, error = %err, "Additional stage error");
            }
        }

        if let Err(join_err) = self.task.await {
            let err = GitError::from(join_err);
            if first.is_none() {
                first = Some(err);
            } else {
                warn!(stage = self.name, error = %err, "Stage task failed after error");
            }
        }

        first.map_or(Ok(()), Err)
    }
}

/// A stream of results plus the stage producing them
#[derive(Debug)]
pub struct ChannelWrapper<T> {
    /// Results in production order
    pub results: mpsc::Receiver<T>,
    stage: Stage,
}

impl<T> ChannelWrapper<T> {
    /// Pair a result receiver with its producing stage
    pub fn new(results: mpsc::Receiver<T>, stage: Stage) -> Self {
        Self { results, stage }
    }

    /// Split into the receiver and the completion handle
    pub fn into_parts(self) -> (mpsc::Receiver<T>, Stage) {
        (self.results, self.stage)
    }

    /// Discard remaining results and wait for the stage
    pub async fn wait(mut self) -> GitResult<()> {
        while self.results.recv().await.is_some() {}
        self.stage.wait().await
    }
}

/// Keep the first error of several stage results
pub(crate) fn first_error(results: impl IntoIterator<Item = GitResult<()>>) -> GitResult<()> {
    let mut first = None;
    for result in results {
        if let Err(err) = result {
            if first.is_none() {
                first = Some(err);
            } else {
                warn!(error = %err, "Additional pipeline error");
            }
        }
    }
    first.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_returns_first_error() {
        let (err_tx, err_rx) = mpsc::channel(STAGE_ERROR_CAPACITY);
        let task = tokio::spawn(async move {
            let _ = err_tx.send(GitError::InvalidRef("one".into())).await;
            let _ = err_tx.send(GitError::InvalidRef("two".into())).await;
        });
        let stage = Stage::new("test", err_rx, task);

        match stage.wait().await {
            Err(GitError::InvalidRef(name)) => assert_eq!(name, "one"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrapper_drains_results() {
        let (tx, rx) = mpsc::channel(1);
        let (err_tx, err_rx) = mpsc::channel::<GitError>(STAGE_ERROR_CAPACITY);
        let task = tokio::spawn(async move {
            for i in 0..10 {
                if tx.send(i).await.is_err() {
                    break;
                }
            }
            drop(err_tx);
        });
        let wrapper = ChannelWrapper::new(rx, Stage::new("test", err_rx, task));
        assert!(wrapper.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_panicking_stage_is_reported() {
        let (err_tx, err_rx) = mpsc::channel::<GitError>(STAGE_ERROR_CAPACITY);
        let task = tokio::spawn(async move {
            let _keep = err_tx;
            panic!("boom");
        });
        let result = Stage::new("test", err_rx, task).wait().await;
        assert!(matches!(result, Err(GitError::TaskFailed(_))));
    }

    #[test]
    fn test_first_error() {
        assert!(first_error(vec![Ok(()), Ok(())]).is_ok());
        let result = first_error(vec![
            Ok(()),
            Err(GitError::Cancelled),
            Err(GitError::InvalidRef("x".into())),
        ]);
        assert!(matches!(result, Err(GitError::Cancelled)));
    }
}
