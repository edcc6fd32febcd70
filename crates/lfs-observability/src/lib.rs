// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Structured logging for the git-lfs tools
//!
//! # Features
//!
//! - **Output formats**: pretty, compact and JSON
//! - **Filtering**: `GIT_LFS_LOG`, then `RUST_LOG`, then the configured level
//! - **stderr only**: stdout stays free for command output
//!
//! # Example
//!
//! ```ignore
//! use lfs_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Compact, None)?;
//! tracing::info!("Scan started");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, DEFAULT_LEVEL, LOG_ENV_VAR};
pub use initialization::{init_tracing, init_tracing_with_config};
