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

mod commands;
mod output;
mod repo;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::*;
use lfs_git::GitError;
use lfs_observability::{init_tracing_with_config, LogConfig, LogFormat};
use repo::LfsContext;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when no repository encloses the working directory
const EXIT_NOT_A_REPO: u8 = 128;

/// Exit status for usage errors and failures inside a command
const EXIT_FAULT: u8 = 2;

#[derive(Parser)]
#[command(name = "git-lfs")]
#[command(version, about = "Large file pointers in Git history")]
#[command(
    long_about = "Scans Git history for large-file pointers and checks the local object store.
Object contents live outside Git under .git/lfs/objects, addressed by SHA-256."
)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (pretty|compact|json)
    #[arg(long, global = true, value_name = "FORMAT", default_value = "compact")]
    log_format: LogFormat,

    /// Colored output (always|auto|never)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Run as if started in PATH
    #[arg(short = 'C', global = true, value_name = "PATH")]
    directory: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check objects and pointers for corruption
    Fsck(FsckCmd),

    /// Show large files tracked at a ref
    #[command(name = "ls-files")]
    LsFiles(LsFilesCmd),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.color.as_str() {
        "never" => console::set_colors_enabled_stderr(false),
        "always" => console::set_colors_enabled_stderr(true),
        "auto" => {}
        _ => {
            output::error(&format!("Invalid color option: {}", cli.color));
            return ExitCode::from(EXIT_FAULT);
        }
    }

    let mut log_config = LogConfig::new()
        .with_format(cli.log_format)
        .with_color(console::colors_enabled_stderr());
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    if let Err(e) = init_tracing_with_config(log_config) {
        output::warning(&format!("Logging disabled: {}", e));
    }

    match run(cli).await {
        Ok(status) => status.into(),
        Err(e) => report(&e),
    }
}

async fn run(cli: Cli) -> Result<CommandStatus> {
    match cli.command {
        Commands::Fsck(cmd) => {
            let ctx = open(cli.directory).await?;
            cmd.execute(&ctx).await
        }
        Commands::LsFiles(cmd) => {
            let ctx = open(cli.directory).await?;
            cmd.execute(&ctx).await
        }
        Commands::Version => {
            print_version();
            Ok(CommandStatus::Success)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "git-lfs", &mut io::stdout());
            Ok(CommandStatus::Success)
        }
    }
}

async fn open(directory: Option<PathBuf>) -> Result<LfsContext> {
    let start = match directory {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    LfsContext::open(&start).await
}

/// Print a fatal error and pick the exit status for it
fn report(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(GitError::RepositoryNotFound(_)) = cause.downcast_ref::<GitError>() {
            output::error("Not in a git repository.");
            return ExitCode::from(EXIT_NOT_A_REPO);
        }
    }
    tracing::debug!(error = ?err, "Command failed");
    output::error(&format!("{:#}", err));
    ExitCode::from(EXIT_FAULT)
}

fn print_version() {
    println!("git-lfs {}", env!("CARGO_PKG_VERSION"));
    println!("rust-version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("license: {}", env!("CARGO_PKG_LICENSE"));
}
