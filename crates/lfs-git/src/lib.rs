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
// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 MediaGit Contributors

//! # Large-file pointer scanning
//!
//! Finds the pointer records that stand in for large files in git history.
//!
//! ## Architecture
//!
//! The scan is a pipeline of tokio tasks joined by bounded channels:
//!
//! - **Reference enumerator** ([`rev_list`]): `git rev-list` over include and
//!   exclude refs, recording the path each blob was found at
//! - **Batch object reader** ([`cat_file`]): `git cat-file --batch-check`
//!   picks out pointer-sized blobs, `git cat-file --batch` reads them
//! - **Pointer parser** ([`pointer`]): decodes and checks canonical form
//! - **Lockable matcher** ([`lockable`]): flags blobs at lockable paths
//! - **Scan coordinator** ([`scanner`]): runs the pipeline flat, or one
//!   worker per revision over [`tree`] listings, and calls back per pointer
//!
//! ## Pointer Format
//!
//! ```text
//! version https://git-lfs.github.com/spec/v1
//! oid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393
//! size 12345
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lfs_git::{GitRepo, GitScanner, ScanRefsOptions};
//! use std::sync::Arc;
//!
//! # async fn run() -> lfs_git::GitResult<()> {
//! let repo = Arc::new(GitRepo::discover(".")?);
//! let scanner = GitScanner::new(repo);
//! let opts = ScanRefsOptions::default();
//!
//! scanner
//!     .scan_refs(&["HEAD".to_string()], &[], &opts, |result| match result {
//!         Ok(pointer) => println!("{} {}", pointer.oid(), pointer.name),
//!         Err(err) => eprintln!("{}", err),
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod cat_file;
pub mod channel;
pub mod error;
pub mod filter;
pub mod lockable;
pub mod names;
pub mod oid;
pub mod pointer;
pub mod repo;
pub mod rev_list;
pub mod scanner;
pub mod tree;

pub use attributes::AttributeMatcher;
pub use channel::{ChannelWrapper, Stage, DEFAULT_CHANNEL_CAPACITY};
pub use error::{GitError, GitResult, PointerError};
pub use filter::{PathFilter, PathPattern};
pub use lockable::{LockableMatcher, NameSet};
pub use names::NameMap;
pub use oid::ObjectId;
pub use pointer::{Pointer, PointerExtension, WrappedPointer, MAX_POINTER_SIZE};
pub use repo::{GitRepo, RefScope};
pub use rev_list::{ScanRefsOptions, ScanningMode};
pub use scanner::{GitScanner, DEFAULT_TREE_CONCURRENCY};
pub use tokio_util::sync::CancellationToken;
pub use tree::AttributeSource;
