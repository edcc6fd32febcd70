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

//! `git lfs fsck` - object store integrity and pointer validity

use super::CommandStatus;
use crate::output;
use crate::repo::LfsContext;
use anyhow::{Context, Result};
use clap::Parser;
use lfs_git::{GitError, RefScope};
use lfs_store::{
    collect_pointers, IntegrityChecker, IntegrityOptions, IntegrityReport, PointerReport,
};
use serde::Serialize;
use tracing::info;

/// Check large-file objects and pointers for problems
///
/// With no refs, `--objects` rehashes every object in the local store and
/// `--pointers` looks at `HEAD`. With refs, both look only at what the
/// refs or ranges reach.
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    # Rehash every stored object, quarantining corrupt ones
    git lfs fsck

    # Report corruption without moving anything
    git lfs fsck --dry-run

    # Objects needed by the last three commits
    git lfs fsck HEAD~3..HEAD

    # Non-canonical pointers and tracked files that are not pointers
    git lfs fsck --pointers main

EXIT STATUS:
    0    nothing found
    1    corruption or invalid pointers found
    2    a ref or range could not be resolved
    128  not inside a git repository")]
pub struct FsckCmd {
    /// Check object bytes against their OIDs (default)
    #[arg(long)]
    pub objects: bool,

    /// Check pointers in history for canonical form and presence
    #[arg(long)]
    pub pointers: bool,

    /// Report corrupt objects without moving them to the quarantine area
    #[arg(long)]
    pub dry_run: bool,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,

    /// Refs or `<a>..<b>` ranges to check
    #[arg(value_name = "REF")]
    pub refs: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
struct FsckOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    objects: Option<IntegrityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pointers: Option<PointerReport>,
    scope_errors: Vec<String>,
}

impl FsckOutput {
    fn has_findings(&self) -> bool {
        self.objects.as_ref().is_some_and(|r| !r.is_ok())
            || self.pointers.as_ref().is_some_and(|r| !r.is_ok())
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(objects) = &self.objects {
            lines.extend(objects.lines());
        }
        if let Some(pointers) = &self.pointers {
            lines.extend(pointers.lines());
        }
        lines
    }
}

impl FsckCmd {
    /// Run the selected checks and print the report
    pub async fn execute(&self, ctx: &LfsContext) -> Result<CommandStatus> {
        let check_objects = self.objects || !self.pointers;
        let mut out = FsckOutput::default();

        if check_objects {
            out.objects = Some(self.check_objects(ctx, &mut out.scope_errors).await?);
        }
        if self.pointers {
            out.pointers = Some(self.check_pointers(ctx, &mut out.scope_errors).await?);
        }

        if self.json {
            output::json(&out)?;
        } else {
            for line in out.lines() {
                output::line(&line);
            }
        }
        for err in &out.scope_errors {
            output::error(err);
        }

        let status = if !out.scope_errors.is_empty() {
            CommandStatus::ScopeError
        } else if out.has_findings() {
            CommandStatus::Findings
        } else {
            if !self.json {
                output::line("Git LFS fsck OK");
            }
            CommandStatus::Success
        };
        info!(?status, "fsck finished");
        Ok(status)
    }

    async fn check_objects(
        &self,
        ctx: &LfsContext,
        scope_errors: &mut Vec<String>,
    ) -> Result<IntegrityReport> {
        let checker = IntegrityChecker::new(
            ctx.store.clone(),
            IntegrityOptions {
                dry_run: self.dry_run,
            },
        );

        if self.refs.is_empty() {
            return checker
                .check_store()
                .await
                .context("Failed to check the object store");
        }

        let scanner = ctx.scanner()?;
        let mut pointers = Vec::new();
        for scope in resolve_all(ctx, &self.refs, scope_errors)? {
            let found = collect_pointers(&scanner, &scope, &ctx.scan_options())
                .await
                .with_context(|| format!("Failed to scan {}", scope.name))?;
            pointers.extend(found);
        }
        checker
            .check_pointers(pointers)
            .await
            .context("Failed to check objects")
    }

    async fn check_pointers(
        &self,
        ctx: &LfsContext,
        scope_errors: &mut Vec<String>,
    ) -> Result<PointerReport> {
        let head = ["HEAD".to_string()];
        let args: &[String] = if self.refs.is_empty() { &head } else { &self.refs };

        let scanner = ctx.strict_scanner()?;
        let mut report = PointerReport::default();
        for scope in resolve_all(ctx, args, scope_errors)? {
            let found = lfs_store::check_pointers(&scanner, &scope, &ctx.scan_options())
                .await
                .with_context(|| format!("Failed to check pointers in {}", scope.name))?;
            report.pointers_checked += found.pointers_checked;
            report.findings.extend(found.findings);
        }
        Ok(report)
    }
}

/// Resolve every argument, collecting bad ones instead of failing
fn resolve_all(
    ctx: &LfsContext,
    args: &[String],
    scope_errors: &mut Vec<String>,
) -> Result<Vec<RefScope>> {
    let mut scopes = Vec::new();
    for arg in args {
        match ctx.resolve(arg) {
            Ok(scope) => scopes.push(scope),
            Err(err) if err.is_scope_error() => scope_errors.push(err.to_string()),
            Err(err) => return Err(resolve_failure(arg, err)),
        }
    }
    Ok(scopes)
}

fn resolve_failure(arg: &str, err: GitError) -> anyhow::Error {
    anyhow::Error::new(err).context(format!("Failed to resolve {}", arg))
}
