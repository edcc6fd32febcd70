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
// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 MediaGit Contributors

//! # Large-file Storage Test Utilities
//!
//! Shared test utilities providing:
//! - CLI command helpers for testing the `git-lfs` binary
//! - Real git repositories in temporary directories for integration tests
//! - Pointer and object fixtures
//! - Custom assertions for the object store and quarantine area

pub mod assertions;
pub mod cli;
pub mod fixtures;
pub mod repo;

// Re-export commonly used items at crate root
pub use assertions::*;
pub use cli::{git_lfs, LfsCommand};
pub use fixtures::TestFixtures;
pub use repo::TestRepo;

// Re-exported for the assertion macros
pub use predicates;
