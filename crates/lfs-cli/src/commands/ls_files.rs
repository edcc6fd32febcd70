// MediaGit - Git for Media Files
// Copyright (C) 2025 MediaGit Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! `git lfs ls-files` - list the pointers a ref carries

use super::CommandStatus;
use crate::output;
use crate::repo::LfsContext;
use anyhow::{Context, Result};
use clap::Parser;
use lfs_git::{GitResult, ScanRefsOptions, WrappedPointer};
use lfs_store::{collect_pointers, ContentOid, ObjectStore};
use serde::Serialize;
use tracing::debug;

/// Show large files tracked at a ref
///
/// Each line is `<oid> <marker> <path>`, where the marker is `*` when the
/// object is in the local store and `-` when it is not.
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    # Files at HEAD
    git lfs ls-files

    # Files added between two commits
    git lfs ls-files v1.0..v2.0

    # Every pointer reachable from any ref, full OIDs
    git lfs ls-files --all --long")]
pub struct LsFilesCmd {
    /// Show the full 64-character OID
    #[arg(short, long)]
    pub long: bool,

    /// Show only the paths
    #[arg(short, long, conflicts_with = "long")]
    pub name_only: bool,

    /// Scan every ref and its full history
    #[arg(short, long, conflicts_with = "reference")]
    pub all: bool,

    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,

    /// Ref or `<a>..<b>` range (defaults to HEAD)
    #[arg(value_name = "REF")]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
struct FileEntry {
    name: String,
    oid: String,
    size: u64,
    present: bool,
}

impl FileEntry {
    fn new(pointer: WrappedPointer, store: &ObjectStore) -> Self {
        let present = ContentOid::from_hex(&pointer.pointer.oid)
            .map(|oid| store.contains(&oid))
            .unwrap_or(false);
        FileEntry {
            name: pointer.name,
            oid: pointer.pointer.oid,
            size: pointer.pointer.size,
            present,
        }
    }

    fn line(&self, long: bool) -> String {
        let oid = if long {
            self.oid.as_str()
        } else {
            &self.oid[..self.oid.len().min(10)]
        };
        let marker = if self.present { '*' } else { '-' };
        format!("{} {} {}", oid, marker, self.name)
    }
}

impl LsFilesCmd {
    /// List the pointers in scope
    pub async fn execute(&self, ctx: &LfsContext) -> Result<CommandStatus> {
        let scanner = ctx.scanner()?;

        let mut pointers = if self.all {
            let mut found = Vec::new();
            scanner
                .scan_all(&ctx.scan_options(), |item: GitResult<WrappedPointer>| match item {
                    Ok(pointer) => found.push(pointer),
                    Err(e) => debug!(error = %e, "Skipping unparsable blob"),
                })
                .await
                .context("Failed to scan all refs")?;
            found
        } else {
            let arg = self.reference.as_deref().unwrap_or("HEAD");
            let scope = match ctx.resolve(arg) {
                Ok(scope) => scope,
                Err(err) if err.is_scope_error() => {
                    output::error(&err.to_string());
                    return Ok(CommandStatus::ScopeError);
                }
                Err(err) => return Err(err).with_context(|| format!("Failed to resolve {}", arg)),
            };
            // A single ref lists its tree; a range lists what the range added.
            let opts = ScanRefsOptions {
                skip_deleted_blobs: scope.exclude.is_empty(),
                ..ctx.scan_options()
            };
            collect_pointers(&scanner, &scope, &opts)
                .await
                .with_context(|| format!("Failed to scan {}", scope.name))?
        };

        pointers.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.pointer.oid.cmp(&b.pointer.oid))
        });
        pointers.dedup_by(|a, b| a.name == b.name && a.pointer.oid == b.pointer.oid);

        let entries: Vec<FileEntry> = pointers
            .into_iter()
            .map(|pointer| FileEntry::new(pointer, &ctx.store))
            .collect();

        if self.json {
            output::json(&entries)?;
        } else {
            for entry in &entries {
                if self.name_only {
                    output::line(&entry.name);
                } else {
                    output::line(&entry.line(self.long));
                }
            }
        }
        Ok(CommandStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(present: bool) -> FileEntry {
        FileEntry {
            name: "media/clip.mov".to_string(),
            oid: "4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393".to_string(),
            size: 12345,
            present,
        }
    }

    #[test]
    fn test_short_line() {
        assert_eq!(entry(true).line(false), "4d7a214614 * media/clip.mov");
        assert_eq!(entry(false).line(false), "4d7a214614 - media/clip.mov");
    }

    #[test]
    fn test_long_line() {
        assert_eq!(
            entry(true).line(true),
            "4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393 * media/clip.mov"
        );
    }
}
