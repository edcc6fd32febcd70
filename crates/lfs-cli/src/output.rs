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

//! Shared output helpers for CLI commands.
//!
//! Report lines go to stdout unstyled so scripts can match them exactly;
//! errors and warnings go to stderr and may be coloured.

use anyhow::Result;
use console::style;
use serde::Serialize;

/// Print a report line to stdout as-is.
pub fn line(msg: &str) {
    println!("{}", msg);
}

/// Print a value as pretty JSON to stdout.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("error:").for_stderr().red().bold(), msg);
}

/// Print a warning message to stderr.
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("warning:").for_stderr().yellow().bold(), msg);
}
