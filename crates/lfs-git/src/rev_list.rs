// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Reference enumeration via `git rev-list`
//!
//! Streams the ids of every object reachable from the include refs and not
//! from the exclude refs. Refs are passed on stdin so arbitrarily long lists
//! never hit argument limits.

use crate::channel::{ChannelWrapper, Stage, DEFAULT_CHANNEL_CAPACITY, STAGE_ERROR_CAPACITY};
use crate::error::{GitError, GitResult};
use crate::names::NameMap;
use crate::oid::ObjectId;
use crate::repo::{drain_stderr, finish, GitRepo};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How the include/exclude refs are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanningMode {
    /// Objects reachable from the given refs
    #[default]
    ScanRefs,
    /// Objects reachable from every ref in the repository
    ScanAll,
    /// Objects reachable from the refs but not from a remote's refs
    ScanRangeToRemote,
}

/// Options for one enumeration
#[derive(Debug, Clone)]
pub struct ScanRefsOptions {
    /// Ref interpretation
    pub mode: ScanningMode,
    /// Remote whose refs are excluded in [`ScanningMode::ScanRangeToRemote`]
    pub remote: Option<String>,
    /// Refs excluded in place of the remote's refs, when known
    pub skipped_refs: Vec<String>,
    /// Only look at the tips' trees, skipping blobs deleted along history
    pub skip_deleted_blobs: bool,
    /// Emit commit ids only
    pub commits_only: bool,
    /// Object id → path table filled during enumeration
    pub names: Arc<NameMap>,
    /// Raised to stop the scan early
    pub cancel: CancellationToken,
    /// Capacity of the id channel
    pub channel_capacity: usize,
}

impl Default for ScanRefsOptions {
    fn default() -> Self {
        Self {
            mode: ScanningMode::ScanRefs,
            remote: None,
            skipped_refs: Vec::new(),
            skip_deleted_blobs: false,
            commits_only: false,
            names: Arc::new(NameMap::new()),
            cancel: CancellationToken::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ScanRefsOptions {
    /// Build the `git rev-list` argument list and stdin payload
    pub fn rev_list_args(&self, include: &[String], exclude: &[String]) -> GitResult<(Vec<String>, String)> {
        let mut args = vec!["rev-list".to_string(), "--stdin".to_string()];
        if !self.commits_only {
            args.push("--objects".to_string());
        }

        let mut exclude: Vec<String> = exclude.to_vec();
        match self.mode {
            ScanningMode::ScanRefs => {
                let walk = if self.skip_deleted_blobs { "--no-walk" } else { "--do-walk" };
                args.push(walk.to_string());
            }
            ScanningMode::ScanAll => args.push("--all".to_string()),
            ScanningMode::ScanRangeToRemote => {
                args.push("--ignore-missing".to_string());
                if self.skipped_refs.is_empty() {
                    let remote = self.remote.as_deref().ok_or_else(|| {
                        GitError::InvalidRef("range-to-remote scan without a remote".to_string())
                    })?;
                    args.push("--not".to_string());
                    args.push(format!("--remotes={}", remote));
                } else {
                    exclude.extend(self.skipped_refs.iter().cloned());
                }
            }
        }
        args.push("--".to_string());

        let mut stdin = String::new();
        for r in include {
            stdin.push_str(r);
            stdin.push('\n');
        }
        for r in &exclude {
            stdin.push('^');
            stdin.push_str(r);
            stdin.push('\n');
        }
        Ok((args, stdin))
    }
}

/// Split one rev-list output record into id and optional path
///
/// Paths are raw bytes in git; anything that is not UTF-8 is decoded lossily
/// so a single odd filename never stops the scan.
fn parse_rev_list_line(line: &[u8]) -> GitResult<(ObjectId, Option<String>)> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let (sha, name) = match line.iter().position(|b| *b == b' ') {
        Some(at) => (&line[..at], Some(&line[at + 1..])),
        None => (line, None),
    };
    let protocol = || GitError::Protocol {
        command: "rev-list".to_string(),
        line: String::from_utf8_lossy(line).into_owned(),
    };
    let sha = std::str::from_utf8(sha).map_err(|_| protocol())?;
    let id = ObjectId::from_hex(sha).map_err(|_| protocol())?;
    let name = name
        .filter(|n| !n.is_empty())
        .map(|n| String::from_utf8_lossy(n).into_owned());
    Ok((id, name))
}

/// Start `git rev-list` and stream the ids it prints
///
/// Names are recorded in `opts.names` before their id is sent. A failure to
/// start git is returned directly; everything after that arrives on the
/// stage's error channel.
pub fn rev_list_shas(
    repo: &GitRepo,
    include: &[String],
    exclude: &[String],
    opts: &ScanRefsOptions,
) -> GitResult<ChannelWrapper<ObjectId>> {
    let (args, input) = opts.rev_list_args(include, exclude)?;
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let mut child = repo.spawn(&arg_refs, true)?;
    let stderr = drain_stderr(&mut child);

    let (tx, rx) = mpsc::channel(opts.channel_capacity.max(1));
    let (err_tx, err_rx) = mpsc::channel(STAGE_ERROR_CAPACITY);
    let names = Arc::clone(&opts.names);
    let cancel = opts.cancel.clone();

    let task = tokio::spawn(async move {
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                let _ = err_tx.send(GitError::Io(e)).await;
                return;
            }
            // stdin drops here, which ends git's ref list
        }

        let Some(stdout) = child.stdout.take() else {
            let _ = err_tx
                .send(GitError::Protocol {
                    command: "rev-list".to_string(),
                    line: "stdout unavailable".to_string(),
                })
                .await;
            return;
        };
        let mut reader = BufReader::new(stdout);
        let mut line = Vec::new();
        let mut count = 0usize;

        loop {
            line.clear();
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("rev-list cancelled");
                    let _ = child.kill().await;
                    let _ = err_tx.send(GitError::Cancelled).await;
                    return;
                }
                read = reader.read_until(b'\n', &mut line) => read,
            };

            match read {
                Ok(0) => break,
                Ok(_) => {
                    let (id, name) = match parse_rev_list_line(&line) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            let _ = child.kill().await;
                            let _ = err_tx.send(e).await;
                            return;
                        }
                    };
                    if let Some(name) = name {
                        names.set(&id, &name);
                    }
                    if tx.send(id).await.is_err() {
                        debug!("rev-list consumer went away");
                        let _ = child.kill().await;
                        return;
                    }
                    count += 1;
                }
                Err(e) => {
                    // git may be blocked on a full pipe; stop it before waiting
                    drop(reader);
                    let _ = child.kill().await;
                    let _ = err_tx.send(GitError::Io(e)).await;
                    return;
                }
            }
        }
        drop(reader);

        if let Err(e) = finish("rev-list", child, stderr).await {
            warn!(error = %e, "rev-list failed");
            let _ = err_tx.send(e).await;
            return;
        }
        info!(objects = count, "Enumerated objects");
    });

    Ok(ChannelWrapper::new(rx, Stage::new("rev-list", err_rx, task)))
}
