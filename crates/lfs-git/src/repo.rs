// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! Repository handle
//!
//! Discovery, ref and range resolution go through git2. Streaming work
//! (`rev-list`, `cat-file`, `ls-tree`) runs the `git` binary under tokio so
//! that its output can be consumed incrementally.

use crate::attributes::AttributeMatcher;
use crate::error::{GitError, GitResult};
use crate::oid::ObjectId;
use git2::{ErrorCode, Oid, Repository};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// A git repository located on disk
#[derive(Debug, Clone)]
pub struct GitRepo {
    git_dir: PathBuf,
    work_dir: Option<PathBuf>,
}

/// Include/exclude refs resolved from a `<ref>` or `<a>..<b>` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefScope {
    /// The argument as given by the user
    pub name: String,
    /// Commits to include
    pub include: Vec<String>,
    /// Commits to exclude
    pub exclude: Vec<String>,
}

impl GitRepo {
    /// Find the repository containing `path`
    pub fn discover(path: impl AsRef<Path>) -> GitResult<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                GitError::RepositoryNotFound(path.display().to_string())
            } else {
                GitError::Git2(e)
            }
        })?;

        let git_dir = repo.path().to_path_buf();
        let work_dir = repo.workdir().map(Path::to_path_buf);
        debug!(git_dir = %git_dir.display(), "Discovered repository");
        Ok(Self { git_dir, work_dir })
    }

    /// The `.git` directory
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The working tree, if the repository is not bare
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    /// Default large-file storage root, `<git-dir>/lfs`
    pub fn default_lfs_dir(&self) -> PathBuf {
        self.git_dir.join("lfs")
    }

    fn open(&self) -> GitResult<Repository> {
        Ok(Repository::open(&self.git_dir)?)
    }

    /// Resolve a revision expression to the commit it names
    pub fn resolve_commit(&self, rev: &str) -> GitResult<ObjectId> {
        let repo = self.open()?;
        let commit = repo
            .revparse_single(rev)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|_| GitError::InvalidRef(rev.to_string()))?;
        ObjectId::from_hex(&commit.id().to_string())
    }

    /// Whether `ancestor` is reachable from `descendant`
    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> GitResult<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        let repo = self.open()?;
        let ancestor = Oid::from_str(ancestor.as_str())?;
        let descendant = Oid::from_str(descendant.as_str())?;
        Ok(repo.graph_descendant_of(descendant, ancestor)?)
    }

    /// Resolve a user-supplied `<ref>` or `<left>..<right>` argument
    ///
    /// A range whose left side is not an ancestor of its right side is
    /// rejected instead of silently scanning unrelated history.
    #[instrument(skip(self))]
    pub fn resolve_scope(&self, arg: &str) -> GitResult<RefScope> {
        if arg.contains("...") {
            return Err(GitError::InvalidRef(arg.to_string()));
        }

        let Some((left, right)) = arg.split_once("..") else {
            let commit = self.resolve_commit(arg)?;
            return Ok(RefScope {
                name: arg.to_string(),
                include: vec![commit.to_string()],
                exclude: Vec::new(),
            });
        };

        let left = if left.is_empty() { "HEAD" } else { left };
        let right = if right.is_empty() { "HEAD" } else { right };
        let left_id = self.resolve_commit(left)?;
        let right_id = self.resolve_commit(right)?;

        if !self.is_ancestor(&left_id, &right_id)? {
            return Err(GitError::InvalidRange {
                left: left.to_string(),
                right: right.to_string(),
            });
        }

        Ok(RefScope {
            name: arg.to_string(),
            include: vec![right_id.to_string()],
            exclude: vec![left_id.to_string()],
        })
    }

    /// Load the working tree's track-pattern attributes
    ///
    /// Bare repositories only consult `info/attributes`.
    pub fn attributes(&self) -> GitResult<AttributeMatcher> {
        match &self.work_dir {
            Some(work_dir) => AttributeMatcher::from_work_tree(work_dir, &self.git_dir),
            None => self.info_attributes(),
        }
    }

    /// Rules from `$GIT_DIR/info/attributes` alone
    pub fn info_attributes(&self) -> GitResult<AttributeMatcher> {
        let mut matcher = AttributeMatcher::new();
        let info = self.git_dir.join("info").join("attributes");
        if info.is_file() {
            let content = std::fs::read_to_string(&info)?;
            matcher.add_source(&content, "");
        }
        Ok(matcher)
    }

    /// All `git config` entries visible from this repository, in file order
    pub async fn config_entries(&self) -> GitResult<Vec<(String, String)>> {
        let output = self.output(&["config", "-z", "--list"]).await?;
        Ok(parse_config_list(&output))
    }

    /// A `git` command bound to this repository
    pub fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("--git-dir").arg(&self.git_dir);
        match &self.work_dir {
            Some(work_dir) => {
                cmd.arg("--work-tree").arg(work_dir).current_dir(work_dir);
            }
            None => {
                cmd.current_dir(&self.git_dir);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Start `git <args>`, optionally with a piped stdin
    pub(crate) fn spawn(&self, args: &[&str], piped_stdin: bool) -> GitResult<Child> {
        let mut cmd = self.command();
        cmd.args(args);
        if piped_stdin {
            cmd.stdin(Stdio::piped());
        }
        debug!(?args, "Spawning git");
        cmd.spawn().map_err(|source| GitError::Spawn {
            command: command_name(args),
            source,
        })
    }

    /// Run `git <args>` to completion and return its stdout
    pub async fn output(&self, args: &[&str]) -> GitResult<Vec<u8>> {
        let mut cmd = self.command();
        cmd.args(args);
        let output = cmd.output().await.map_err(|source| GitError::Spawn {
            command: command_name(args),
            source,
        })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: command_name(args),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Subcommand name used in error messages
pub(crate) fn command_name(args: &[&str]) -> String {
    args.first().copied().unwrap_or("git").to_string()
}

/// Collect a child's stderr in the background so the pipe never fills
pub(crate) fn drain_stderr(child: &mut Child) -> JoinHandle<String> {
    let stderr = child.stderr.take();
    tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut buf).await;
        }
        buf
    })
}

/// Wait for a child to exit and turn a failure status into an error
pub(crate) async fn finish(
    command: &str,
    mut child: Child,
    stderr: JoinHandle<String>,
) -> GitResult<()> {
    let status = child.wait().await?;
    let stderr = stderr.await.unwrap_or_default();
    if status.success() {
        Ok(())
    } else {
        Err(GitError::CommandFailed {
            command: command.to_string(),
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        })
    }
}

/// Parse `git config -z --list` output: `key\nvalue\0` records
pub fn parse_config_list(output: &[u8]) -> Vec<(String, String)> {
    output
        .split(|b| *b == 0)
        .filter(|record| !record.is_empty())
        .map(|record| {
            let record = String::from_utf8_lossy(record);
            match record.split_once('\n') {
                Some((key, value)) => (key.to_ascii_lowercase(), value.to_string()),
                None => (record.to_ascii_lowercase(), String::new()),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_list() {
        let raw = b"user.name\nTest User\0lfs.fetchInclude\nmedia,docs\0core.bare\0";
        let entries = parse_config_list(raw);
        assert_eq!(
            entries,
            vec![
                ("user.name".to_string(), "Test User".to_string()),
                ("lfs.fetchinclude".to_string(), "media,docs".to_string()),
                ("core.bare".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_command_name() {
        assert_eq!(command_name(&["rev-list", "--stdin"]), "rev-list");
        assert_eq!(command_name(&[]), "git");
    }

    #[test]
    fn test_discover_outside_repository() {
        let temp = tempfile::TempDir::new().unwrap();
        let nested = temp.path().join("not-a-repo");
        std::fs::create_dir_all(&nested).unwrap();
        // Only meaningful when the temp dir itself is not inside a repository
        if Repository::discover(&nested).is_err() {
            assert!(matches!(
                GitRepo::discover(&nested),
                Err(GitError::RepositoryNotFound(_))
            ));
        }
    }
}
