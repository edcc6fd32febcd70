// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Batch object reading via `git cat-file`
//!
//! Two streaming passes feed the flat scan: `--batch-check` sorts ids into
//! pointer-sized blobs and everything else, then `--batch` fetches the bytes
//! of the pointer-sized ones for parsing. [`ObjectReader`] is the
//! request/response variant used by per-revision tree workers.

use crate::attributes::AttributeMatcher;
use crate::channel::{Stage, DEFAULT_CHANNEL_CAPACITY, STAGE_ERROR_CAPACITY};
use crate::error::{GitError, GitResult, PointerError};
use crate::lockable::LockableMatcher;
use crate::names::NameMap;
use crate::oid::ObjectId;
use crate::pointer::{WrappedPointer, MAX_POINTER_SIZE};
use crate::repo::{drain_stderr, finish, GitRepo};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Object metadata line printed by `git cat-file --batch[-check]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Object id
    pub sha: ObjectId,
    /// Object type (`blob`, `tree`, `commit`, `tag`)
    pub kind: String,
    /// Size in bytes
    pub size: u64,
}

impl ObjectHeader {
    /// Whether this is a blob small enough to hold a pointer
    pub fn is_pointer_sized(&self) -> bool {
        self.kind == "blob" && self.size < MAX_POINTER_SIZE as u64
    }
}

/// One entry of `git cat-file --batch` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEntry {
    /// The requested name does not exist
    Missing(String),
    /// Header plus raw content
    Object(ObjectHeader, Vec<u8>),
}

/// Parse `<sha> <type> <size>`; `Ok(None)` for `<name> missing`
pub fn parse_header(command: &str, line: &str) -> GitResult<Option<ObjectHeader>> {
    let protocol = || GitError::Protocol {
        command: command.to_string(),
        line: line.to_string(),
    };

    let fields: Vec<&str> = line.split(' ').collect();
    match fields.as_slice() {
        [_, "missing"] | [_, "ambiguous"] => Ok(None),
        [sha, kind, size] => {
            let sha = ObjectId::from_hex(sha).map_err(|_| protocol())?;
            let size = size.parse::<u64>().map_err(|_| protocol())?;
            Ok(Some(ObjectHeader {
                sha,
                kind: kind.to_string(),
                size,
            }))
        }
        _ => Err(protocol()),
    }
}

/// Read one `--batch` entry; `Ok(None)` at end of output
pub async fn read_entry<R>(reader: &mut R) -> GitResult<Option<BatchEntry>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let line = line.trim_end_matches('\n');

    let Some(header) = parse_header("cat-file --batch", line)? else {
        let name = line.split(' ').next().unwrap_or_default();
        return Ok(Some(BatchEntry::Missing(name.to_string())));
    };

    let len = usize::try_from(header.size).map_err(|_| GitError::Protocol {
        command: "cat-file --batch".to_string(),
        line: line.to_string(),
    })?;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;

    let mut terminator = [0u8; 1];
    reader.read_exact(&mut terminator).await?;
    if terminator[0] != b'\n' {
        return Err(GitError::Protocol {
            command: "cat-file --batch".to_string(),
            line: format!("missing terminator after {}", header.sha),
        });
    }

    Ok(Some(BatchEntry::Object(header, data)))
}

/// Shared lookup state for the batch stages
#[derive(Debug, Clone)]
pub struct BatchContext {
    /// Names recorded during enumeration
    pub names: Arc<NameMap>,
    /// Lockable path matcher
    pub lockable: LockableMatcher,
    /// When set, small blobs at tracked paths that fail to parse are reported
    pub tracked: Option<Arc<AttributeMatcher>>,
    /// Capacity of the output channels
    pub channel_capacity: usize,
}

impl BatchContext {
    /// Context with no lockable or tracked paths
    pub fn new(names: Arc<NameMap>) -> Self {
        Self {
            names,
            lockable: LockableMatcher::None,
            tracked: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    fn capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }

    fn lockable_name(&self, sha: &ObjectId) -> Option<String> {
        match self.lockable.check(sha, &self.names) {
            (Some(name), true) => Some(name),
            _ => None,
        }
    }
}

/// Output of the `--batch-check` classification pass
#[derive(Debug)]
pub struct BatchCheckOutput {
    /// Ids of pointer-sized blobs
    pub candidates: mpsc::Receiver<ObjectId>,
    /// Names of large blobs at lockable paths
    pub lockable: mpsc::Receiver<String>,
    /// Completion handle
    pub stage: Stage,
}

/// Output of the `--batch` content pass
#[derive(Debug)]
pub struct BatchOutput {
    /// Parsed pointers, or per-object parse failures
    pub pointers: mpsc::Receiver<GitResult<WrappedPointer>>,
    /// Names of non-pointer blobs at lockable paths
    pub lockable: mpsc::Receiver<String>,
    /// Completion handle
    pub stage: Stage,
}

fn take_pipes(child: &mut Child, command: &str) -> GitResult<(ChildStdin, ChildStdout)> {
    let missing = |pipe: &str| GitError::Protocol {
        command: command.to_string(),
        line: format!("{} unavailable", pipe),
    };
    let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
    let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
    Ok((stdin, stdout))
}

/// Write each distinct id to git's stdin, closing it when `ids` ends
fn feed_ids(mut stdin: ChildStdin, mut ids: mpsc::Receiver<ObjectId>) -> JoinHandle<GitResult<usize>> {
    tokio::spawn(async move {
        let mut seen = HashSet::new();
        while let Some(id) = ids.recv().await {
            if !seen.insert(id.clone()) {
                continue;
            }
            stdin.write_all(id.as_str().as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }
        Ok(seen.len())
    })
}

/// Collect the writer's and the process's exit status onto the error channel
async fn settle(
    command: &'static str,
    child: Child,
    stderr: JoinHandle<String>,
    writer: JoinHandle<GitResult<usize>>,
    err_tx: &mpsc::Sender<GitError>,
    aborted: bool,
) {
    let written = writer.await;
    let exited = finish(command, child, stderr).await;
    if aborted {
        return;
    }
    match written {
        Ok(Ok(count)) => debug!(command, objects = count, "Finished writing ids"),
        Ok(Err(e)) => {
            let _ = err_tx.send(e).await;
        }
        Err(e) => {
            let _ = err_tx.send(e.into()).await;
        }
    }
    if let Err(e) = exited {
        warn!(command, error = %e, "git cat-file failed");
        let _ = err_tx.send(e).await;
    }
}

/// Classify `ids` by size with `git cat-file --batch-check`
///
/// Blobs under [`MAX_POINTER_SIZE`] go to `candidates`; larger blobs at
/// lockable paths go to `lockable`. Other object types are dropped.
pub fn cat_file_batch_check(
    repo: &GitRepo,
    ids: mpsc::Receiver<ObjectId>,
    ctx: &BatchContext,
) -> GitResult<BatchCheckOutput> {
    const COMMAND: &str = "cat-file --batch-check";
    let mut child = repo.spawn(&["cat-file", "--batch-check"], true)?;
    let stderr = drain_stderr(&mut child);
    let (stdin, stdout) = take_pipes(&mut child, COMMAND)?;

    let (cand_tx, cand_rx) = mpsc::channel(ctx.capacity());
    let (lock_tx, lock_rx) = mpsc::channel(ctx.capacity());
    let (err_tx, err_rx) = mpsc::channel(STAGE_ERROR_CAPACITY);
    let writer = feed_ids(stdin, ids);
    let ctx = ctx.clone();

    let task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        let mut aborted = false;
        let mut small = 0usize;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    let _ = err_tx.send(e.into()).await;
                    let _ = child.start_kill();
                    aborted = true;
                    break;
                }
            };

            let header = match parse_header(COMMAND, &line) {
                Ok(Some(header)) => header,
                Ok(None) => {
                    debug!(line = %line, "Object missing from batch-check");
                    continue;
                }
                Err(e) => {
                    let _ = err_tx.send(e).await;
                    let _ = child.start_kill();
                    aborted = true;
                    break;
                }
            };

            if header.kind != "blob" {
                continue;
            }

            let sent = if header.is_pointer_sized() {
                small += 1;
                cand_tx.send(header.sha).await.is_ok()
            } else if let Some(name) = ctx.lockable_name(&header.sha) {
                lock_tx.send(name).await.is_ok()
            } else {
                true
            };
            if !sent {
                debug!("batch-check consumer went away");
                let _ = child.start_kill();
                aborted = true;
                break;
            }
        }

        settle(COMMAND, child, stderr, writer, &err_tx, aborted).await;
        info!(candidates = small, "Classified objects");
    });

    Ok(BatchCheckOutput {
        candidates: cand_rx,
        lockable: lock_rx,
        stage: Stage::new(COMMAND, err_rx, task),
    })
}

/// Fetch and parse pointer-sized blobs with `git cat-file --batch`
///
/// Blobs that are not pointers are dropped, unless their path is lockable
/// (sent to `lockable`) or tracked in `ctx.tracked` (sent to `pointers` as a
/// [`GitError::PointerParse`]). Empty blobs are never reported.
pub fn cat_file_batch(
    repo: &GitRepo,
    ids: mpsc::Receiver<ObjectId>,
    ctx: &BatchContext,
) -> GitResult<BatchOutput> {
    const COMMAND: &str = "cat-file --batch";
    let mut child = repo.spawn(&["cat-file", "--batch"], true)?;
    let stderr = drain_stderr(&mut child);
    let (stdin, stdout) = take_pipes(&mut child, COMMAND)?;

    let (ptr_tx, ptr_rx) = mpsc::channel(ctx.capacity());
    let (lock_tx, lock_rx) = mpsc::channel(ctx.capacity());
    let (err_tx, err_rx) = mpsc::channel(STAGE_ERROR_CAPACITY);
    let writer = feed_ids(stdin, ids);
    let ctx = ctx.clone();

    let task = tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut aborted = false;
        let mut found = 0usize;

        loop {
            let (header, data) = match read_entry(&mut reader).await {
                Ok(Some(BatchEntry::Object(header, data))) => (header, data),
                Ok(Some(BatchEntry::Missing(name))) => {
                    debug!(name = %name, "Object missing from batch");
                    continue;
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = err_tx.send(e).await;
                    let _ = child.start_kill();
                    aborted = true;
                    break;
                }
            };

            let name = ctx.names.get(&header.sha).unwrap_or_default();
            let sent = match WrappedPointer::from_blob(header.sha.clone(), name.clone(), &data) {
                Ok(pointer) => {
                    found += 1;
                    ptr_tx.send(Ok(pointer)).await.is_ok()
                }
                Err(PointerError::Empty) => true,
                Err(reason) => {
                    if let Some(lockable) = ctx.lockable_name(&header.sha) {
                        lock_tx.send(lockable).await.is_ok()
                    } else if ctx.tracked.as_ref().is_some_and(|t| t.is_tracked(&name)) {
                        let err = GitError::PointerParse {
                            sha: header.sha.to_string(),
                            name,
                            reason,
                        };
                        ptr_tx.send(Err(err)).await.is_ok()
                    } else {
                        debug!(sha = %header.sha, "Small blob is not a pointer");
                        true
                    }
                }
            };
            if !sent {
                debug!("batch consumer went away");
                let _ = child.start_kill();
                aborted = true;
                break;
            }
        }

        settle(COMMAND, child, stderr, writer, &err_tx, aborted).await;
        info!(pointers = found, "Parsed pointer blobs");
    });

    Ok(BatchOutput {
        pointers: ptr_rx,
        lockable: lock_rx,
        stage: Stage::new(COMMAND, err_rx, task),
    })
}

/// Request/response reader over one `git cat-file --batch` process
#[derive(Debug)]
pub struct ObjectReader {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: JoinHandle<String>,
}

impl ObjectReader {
    /// Start the backing process
    pub fn start(repo: &GitRepo) -> GitResult<Self> {
        let mut child = repo.spawn(&["cat-file", "--batch"], true)?;
        let stderr = drain_stderr(&mut child);
        let (stdin, stdout) = take_pipes(&mut child, "cat-file --batch")?;
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr,
        })
    }

    /// Read one object; `Ok(None)` if it does not exist
    pub async fn read(&mut self, sha: &ObjectId) -> GitResult<Option<(ObjectHeader, Vec<u8>)>> {
        self.stdin.write_all(sha.as_str().as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        match read_entry(&mut self.stdout).await? {
            Some(BatchEntry::Object(header, data)) => Ok(Some((header, data))),
            Some(BatchEntry::Missing(_)) => Ok(None),
            None => Err(GitError::Protocol {
                command: "cat-file --batch".to_string(),
                line: format!("unexpected end of output reading {}", sha),
            }),
        }
    }

    /// Close stdin and wait for the process to exit
    pub async fn close(self) -> GitResult<()> {
        let Self {
            child,
            stdin,
            stdout,
            stderr,
        } = self;
        drop(stdin);
        drop(stdout);
        finish("cat-file --batch", child, stderr).await
    }
}
